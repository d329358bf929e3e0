//! Line-level structure of a playlist document.
//!
//! Every line is recognized by its prefix alone: the document header, the
//! metadata ("info") line that describes an entry, and everything else,
//! which is a resource line. Blank lines and other `#` directives are
//! resource lines too.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADER_PREFIX: &str = "#EXTM3U";
pub const DEFAULT_INFO_PREFIX: &str = "#EXTINF";

const BOM: char = '\u{feff}';

/// Kind of a single playlist line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Document header
    Header,
    /// Metadata line of an entry
    Info,
    /// Any other line
    Resource,
}

/// Prefixes used to recognize header and metadata lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSyntax {
    pub header_prefix: String,
    pub info_prefix: String,
}

impl Default for PlaylistSyntax {
    fn default() -> Self {
        Self {
            header_prefix: DEFAULT_HEADER_PREFIX.to_string(),
            info_prefix: DEFAULT_INFO_PREFIX.to_string(),
        }
    }
}

impl PlaylistSyntax {
    pub fn new(header_prefix: impl Into<String>, info_prefix: impl Into<String>) -> Self {
        Self {
            header_prefix: header_prefix.into(),
            info_prefix: info_prefix.into(),
        }
    }

    pub fn kind(&self, line: &str) -> LineKind {
        // A byte order mark can only precede the very first line, which is
        // where the header lives.
        let line = line.trim_start_matches(BOM);

        if line.starts_with(self.header_prefix.as_str()) {
            LineKind::Header
        } else if line.starts_with(self.info_prefix.as_str()) {
            LineKind::Info
        } else {
            LineKind::Resource
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_syntax() {
        let syntax = PlaylistSyntax::default();
        assert_eq!(syntax.kind("#EXTM3U"), LineKind::Header);
        assert_eq!(syntax.kind("#EXTM3U url-tvg=\"x\""), LineKind::Header);
        assert_eq!(syntax.kind("\u{feff}#EXTM3U"), LineKind::Header);
        assert_eq!(syntax.kind("#EXTINF:-1,Rai 1"), LineKind::Info);
        assert_eq!(syntax.kind("#EXTVLCOPT:http-user-agent=x"), LineKind::Resource);
        assert_eq!(syntax.kind("   "), LineKind::Resource);
        assert_eq!(syntax.kind(""), LineKind::Resource);
        assert_eq!(syntax.kind("http://example.com/1.ts"), LineKind::Resource);
        assert_eq!(syntax.kind("rtmp://host/live"), LineKind::Resource);
    }

    #[test]
    fn test_custom_prefixes() {
        let syntax = PlaylistSyntax::new("#HEADER", "#META");
        assert_eq!(syntax.kind("#HEADER"), LineKind::Header);
        assert_eq!(syntax.kind("#META lang=\"it\""), LineKind::Info);
        assert_eq!(syntax.kind("#EXTINF:-1,x"), LineKind::Resource);
        assert_eq!(syntax.kind("http://a"), LineKind::Resource);
    }
}
