//! # Sieve
//!
//! A streaming splitter for extended M3U playlists.
//!
//! A playlist is read once, line by line, from a remote URL or a local file.
//! Each metadata line is paired with the resource line that follows it, the
//! entry is classified as kept or skipped, and written to the matching
//! output playlist. Memory use is bounded by the longest line, not by the
//! size of the playlist.
//!
//! ## Features
//!
//! - Streaming HTTP retrieval with connect and read timeouts
//! - Configurable classification rules (attributes, tokens, keywords)
//! - Tolerant pairing of malformed input
//! - Cancellation with cleanup of partial outputs
//!
//! ```no_run
//! use sieve_engine::{
//!     CancellationToken, ClassifierConfig, OutputLayout, PlaylistSource, PlaylistSyntax,
//!     SourceConfig, SplitConfig, Splitter,
//! };
//!
//! # async fn example() -> Result<(), sieve_engine::SieveError> {
//! let source = PlaylistSource::new(SourceConfig::default())?;
//! let splitter = Splitter::new(SplitConfig::new(
//!     PlaylistSyntax::default(),
//!     ClassifierConfig::italian(),
//! ));
//! let layout = OutputLayout::in_dir("LiveTV/MyList", "LiveTV.m3u", "Skipped.m3u");
//!
//! let report = splitter
//!     .split_source(&source, "https://example.com/list.m3u", &layout, CancellationToken::new())
//!     .await?;
//! println!("{}", report.tally);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod error;
pub mod output;
pub mod pairing;
pub mod proxy;
pub mod router;
pub mod source;
pub mod splitter;
pub mod syntax;
#[cfg(test)]
mod test_utils;

pub use builder::SourceConfigBuilder;
pub use classifier::{
    AttributeRule, Classification, Classifier, ClassifierConfig, TokenAnchor, TokenScope,
};
pub use codec::{PlaylistLineCodec, SourceLine};
pub use config::{SourceConfig, SplitConfig};
pub use error::SieveError;
pub use output::{FileSink, MemorySink, OutputLayout, OutputSink, OutputTarget, StdoutSink};
pub use pairing::{Entry, Pairing, PairingEngine, PairingStats, PlaylistItem};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use router::{BytesWritten, Router, Tally};
pub use source::{LineStream, PlaylistSource, SourceLocation, create_client};
pub use splitter::{SplitReport, Splitter};
pub use syntax::{LineKind, PlaylistSyntax};

pub use tokio_util::sync::CancellationToken;
