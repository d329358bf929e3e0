use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::classifier::Classification;
use crate::router::Router;

/// A trait defining the interface for playlist output sinks
pub trait OutputSink: Send {
    /// Write one line followed by a newline
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush any buffered data
    fn flush(&mut self) -> io::Result<()>;

    /// Get total bytes written so far
    fn bytes_written(&self) -> u64;

    /// Close the sink, flushing what is left
    fn close(&mut self) -> io::Result<()>;
}

fn write_line_to<W: Write>(writer: &mut W, line: &str) -> io::Result<u64> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(line.len() as u64 + 1)
}

/// A file-based output sink
pub struct FileSink {
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl FileSink {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            bytes_written: 0,
        })
    }
}

impl OutputSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.bytes_written += write_line_to(&mut self.writer, line)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

/// An output sink writing to stdout
pub struct StdoutSink {
    writer: BufWriter<io::Stdout>,
    bytes_written: u64,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            writer: BufWriter::new(io::stdout()),
            bytes_written: 0,
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StdoutSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.bytes_written += write_line_to(&mut self.writer, line)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// An in-memory sink. Clones share the same buffer, so a clone kept by the
/// caller can read what the router wrote.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents written so far, lossily decoded
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        write_line_to(&mut *buffer, line)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.buffer.lock().map(|b| b.len() as u64).unwrap_or(0)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Destination of one output category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to a file, creating parent directories
    File(PathBuf),
    /// Write to stdout
    Stdout,
    /// Do not write this category at all
    Disabled,
}

impl OutputTarget {
    pub fn is_active(&self) -> bool {
        !matches!(self, OutputTarget::Disabled)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::File(path) => Some(path),
            _ => None,
        }
    }

    fn open(&self) -> io::Result<Option<Box<dyn OutputSink>>> {
        match self {
            OutputTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                info!("Creating file output: {}", path.display());
                Ok(Some(Box::new(FileSink::create(path)?)))
            }
            OutputTarget::Stdout => {
                debug!("Creating stdout output");
                Ok(Some(Box::new(StdoutSink::new())))
            }
            OutputTarget::Disabled => Ok(None),
        }
    }
}

/// Maps each classification to its output destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub kept: OutputTarget,
    pub skipped: OutputTarget,
}

impl OutputLayout {
    pub fn new(kept: OutputTarget, skipped: OutputTarget) -> Self {
        Self { kept, skipped }
    }

    /// Both categories as files inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, kept_name: &str, skipped_name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            kept: OutputTarget::File(dir.join(kept_name)),
            skipped: OutputTarget::File(dir.join(skipped_name)),
        }
    }

    pub fn with_skipped(mut self, skipped: OutputTarget) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn with_kept(mut self, kept: OutputTarget) -> Self {
        self.kept = kept;
        self
    }

    pub fn target(&self, classification: Classification) -> &OutputTarget {
        match classification {
            Classification::Kept => &self.kept,
            Classification::Skipped => &self.skipped,
        }
    }

    /// Open every active target and build a router over them.
    ///
    /// If the second target cannot be opened the first one is removed again.
    pub fn open(&self) -> io::Result<Router> {
        let kept = self.kept.open()?;
        let skipped = match self.skipped.open() {
            Ok(sink) => sink,
            Err(e) => {
                drop(kept);
                self.remove_outputs();
                return Err(e);
            }
        };
        Ok(Router::new(kept, skipped))
    }

    /// Best-effort removal of every file target. Errors are ignored.
    pub fn remove_outputs(&self) {
        for path in [&self.kept, &self.skipped]
            .into_iter()
            .filter_map(OutputTarget::path)
        {
            match std::fs::remove_file(path) {
                Ok(()) => info!("Removed partial output: {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {e}", path.display()),
            }
        }
    }
}
