//! # Playlist Line Codec
//!
//! A [`Decoder`] that splits a playlist byte stream into text lines.
//!
//! Compared to `tokio_util::codec::LinesCodec` it never fails on malformed
//! input: invalid UTF-8 sequences are replaced with U+FFFD, and a line longer
//! than the configured maximum is dropped up to its terminating newline
//! instead of aborting the stream. A dropped line still yields a
//! [`SourceLine::Overlong`] marker so consumers can tell that a line was
//! there. Both `\n` and `\r\n` terminators are accepted and stripped.

use std::cmp;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

/// Default maximum length of a single line (1 MiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// A decoded line of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Text(String),
    /// A line that exceeded the maximum length and was dropped
    Overlong,
}

impl From<String> for SourceLine {
    fn from(line: String) -> Self {
        SourceLine::Text(line)
    }
}

impl From<&str> for SourceLine {
    fn from(line: &str) -> Self {
        SourceLine::Text(line.to_string())
    }
}

impl PartialEq<&str> for SourceLine {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, SourceLine::Text(line) if line == other)
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistLineCodec {
    // Index in the buffer up to which no newline has been found yet.
    next_index: usize,
    max_length: usize,
    is_discarding: bool,
    discarded_lines: u64,
}

impl PlaylistLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// A codec that drops lines longer than `max_length` bytes.
    /// A zero length means unlimited.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length: if max_length == 0 {
                usize::MAX
            } else {
                max_length
            },
            is_discarding: false,
            discarded_lines: 0,
        }
    }

    /// Number of overlong lines dropped so far.
    pub fn discarded_lines(&self) -> u64 {
        self.discarded_lines
    }
}

impl Default for PlaylistLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(bytes: &[u8]) -> SourceLine {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    SourceLine::Text(String::from_utf8_lossy(bytes).into_owned())
}

impl Decoder for PlaylistLineCodec {
    type Item = SourceLine;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<SourceLine>, Self::Error> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline = memchr::memchr(b'\n', &buf[self.next_index..read_to]);

            match (self.is_discarding, newline) {
                (true, Some(offset)) => {
                    // End of the overlong line, resume normal decoding after it
                    buf.advance(offset + self.next_index + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = offset + self.next_index;
                    self.next_index = 0;
                    let line = buf.split_to(newline_index + 1);
                    return Ok(Some(decode_line(&line[..newline_index])));
                }
                (false, None) if buf.len() > self.max_length => {
                    warn!(
                        max_length = self.max_length,
                        "Line exceeds maximum length, discarding it"
                    );
                    self.is_discarding = true;
                    self.discarded_lines += 1;
                    return Ok(Some(SourceLine::Overlong));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<SourceLine>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        // The marker for the line being discarded is already out
        if self.is_discarding {
            buf.clear();
            self.is_discarding = false;
            self.next_index = 0;
            return Ok(None);
        }

        // Last line without a trailing newline
        if buf.is_empty() {
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        self.next_index = 0;
        Ok(Some(decode_line(&line)))
    }
}
