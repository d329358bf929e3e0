//! # Stream Router
//!
//! Writes paired entries to the sink of their classification and counts
//! them. The header is copied to every active sink exactly once, at the
//! point of the stream where it is first seen. A header that only appears
//! after some entries lands after those entries.

use std::fmt;
use std::io;

use tracing::debug;

use crate::classifier::Classification;
use crate::output::OutputSink;
use crate::pairing::{Entry, PlaylistItem};

/// Number of entries per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub kept: u64,
    pub skipped: u64,
}

impl Tally {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Kept => self.kept += 1,
            Classification::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.kept + self.skipped
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kept={} skipped={}", self.kept, self.skipped)
    }
}

/// Bytes written per category once the router is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BytesWritten {
    pub kept: u64,
    pub skipped: u64,
}

struct Route {
    sink: Box<dyn OutputSink>,
    header_written: bool,
}

impl Route {
    fn new(sink: Box<dyn OutputSink>) -> Self {
        Self {
            sink,
            header_written: false,
        }
    }

    fn write_header(&mut self, header: &str) -> io::Result<()> {
        if !self.header_written {
            self.sink.write_line(header)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_entry(&mut self, entry: &Entry) -> io::Result<()> {
        self.sink.write_line(&entry.info)?;
        self.sink.write_line(&entry.resource)
    }

    fn close(mut self) -> io::Result<u64> {
        self.sink.flush()?;
        self.sink.close()?;
        Ok(self.sink.bytes_written())
    }
}

pub struct Router {
    kept: Option<Route>,
    skipped: Option<Route>,
    tally: Tally,
}

impl Router {
    /// A router over the given sinks. A missing sink disables its category:
    /// its entries are still counted.
    pub fn new(kept: Option<Box<dyn OutputSink>>, skipped: Option<Box<dyn OutputSink>>) -> Self {
        Self {
            kept: kept.map(Route::new),
            skipped: skipped.map(Route::new),
            tally: Tally::default(),
        }
    }

    fn route_for(&mut self, classification: Classification) -> Option<&mut Route> {
        match classification {
            Classification::Kept => self.kept.as_mut(),
            Classification::Skipped => self.skipped.as_mut(),
        }
    }

    /// Handle a single item from the pairing engine.
    pub fn dispatch(&mut self, item: PlaylistItem) -> io::Result<()> {
        match item {
            PlaylistItem::Header(header) => {
                for route in [self.kept.as_mut(), self.skipped.as_mut()]
                    .into_iter()
                    .flatten()
                {
                    route.write_header(&header)?;
                }
            }
            PlaylistItem::Entry(entry) => {
                if let Some(route) = self.route_for(entry.classification) {
                    route.write_entry(&entry)?;
                } else {
                    debug!(classification = %entry.classification, "No active sink, entry only counted");
                }
                self.tally.record(entry.classification);
            }
        }
        Ok(())
    }

    /// Route every item, returning the tally so far.
    pub fn route<I>(&mut self, items: I) -> io::Result<Tally>
    where
        I: IntoIterator<Item = PlaylistItem>,
    {
        for item in items {
            self.dispatch(item)?;
        }
        Ok(self.tally)
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Flush and close every sink.
    pub fn close(self) -> io::Result<BytesWritten> {
        let kept = self.kept.map(Route::close).transpose()?.unwrap_or(0);
        let skipped = self.skipped.map(Route::close).transpose()?.unwrap_or(0);
        Ok(BytesWritten { kept, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierConfig};
    use crate::output::MemorySink;
    use crate::pairing::Pairing;
    use crate::syntax::PlaylistSyntax;

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn bytes_written(&self) -> u64 {
            0
        }
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run(input: &str, kept: Option<&MemorySink>, skipped: Option<&MemorySink>) -> Tally {
        let syntax = PlaylistSyntax::new("#HEADER", "#META");
        let classifier =
            Classifier::new(&ClassifierConfig::default().accept_attribute_values("lang", ["it"]));
        let lines = input.lines().map(str::to_string);

        let mut router = Router::new(
            kept.map(|s| Box::new(s.clone()) as Box<dyn OutputSink>),
            skipped.map(|s| Box::new(s.clone()) as Box<dyn OutputSink>),
        );
        let tally = router
            .route(Pairing::new(lines, &syntax, &classifier))
            .unwrap();
        router.close().unwrap();
        tally
    }

    #[test]
    fn test_routes_by_classification() {
        let kept = MemorySink::new();
        let skipped = MemorySink::new();
        let tally = run(
            "#HEADER\n#META lang=\"it\"\nhttp://a\n#META lang=\"en\"\nhttp://b\n",
            Some(&kept),
            Some(&skipped),
        );

        assert_eq!(tally, Tally { kept: 1, skipped: 1 });
        assert_eq!(kept.contents(), "#HEADER\n#META lang=\"it\"\nhttp://a\n");
        assert_eq!(skipped.contents(), "#HEADER\n#META lang=\"en\"\nhttp://b\n");
    }

    #[test]
    fn test_header_only_outputs() {
        let kept = MemorySink::new();
        let skipped = MemorySink::new();
        let tally = run("#HEADER\n#META lang=\"it\"\n", Some(&kept), Some(&skipped));

        assert_eq!(tally, Tally::default());
        assert_eq!(kept.contents(), "#HEADER\n");
        assert_eq!(skipped.contents(), "#HEADER\n");
    }

    #[test]
    fn test_orphan_is_not_written() {
        let kept = MemorySink::new();
        let skipped = MemorySink::new();
        let tally = run(
            "#HEADER\nhttp://orphan\n#META lang=\"it\"\nhttp://a\n",
            Some(&kept),
            Some(&skipped),
        );

        assert_eq!(tally, Tally { kept: 1, skipped: 0 });
        assert!(!kept.contents().contains("orphan"));
        assert!(!skipped.contents().contains("orphan"));
    }

    #[test]
    fn test_single_active_sink_still_counts() {
        let kept = MemorySink::new();
        let tally = run(
            "#HEADER\n#META lang=\"en\"\nhttp://b\n#META lang=\"it\"\nhttp://a\n",
            Some(&kept),
            None,
        );

        assert_eq!(tally, Tally { kept: 1, skipped: 1 });
        assert_eq!(kept.contents(), "#HEADER\n#META lang=\"it\"\nhttp://a\n");
    }

    #[test]
    fn test_no_header_without_input_header() {
        let kept = MemorySink::new();
        run("#META lang=\"it\"\nhttp://a\n", Some(&kept), None);
        assert_eq!(kept.contents(), "#META lang=\"it\"\nhttp://a\n");
    }

    #[test]
    fn test_order_is_preserved_per_sink() {
        let kept = MemorySink::new();
        let skipped = MemorySink::new();
        let input = "#HEADER\n#META lang=\"it\" n=\"1\"\nhttp://1\n#META lang=\"en\" n=\"2\"\nhttp://2\n\
                     #META lang=\"it\" n=\"3\"\nhttp://3\n#META lang=\"en\" n=\"4\"\nhttp://4\n";
        run(input, Some(&kept), Some(&skipped));

        let kept_urls: Vec<_> = kept
            .contents()
            .lines()
            .filter(|l| l.starts_with("http"))
            .map(str::to_string)
            .collect();
        let skipped_urls: Vec<_> = skipped
            .contents()
            .lines()
            .filter(|l| l.starts_with("http"))
            .map(str::to_string)
            .collect();
        assert_eq!(kept_urls, vec!["http://1", "http://3"]);
        assert_eq!(skipped_urls, vec!["http://2", "http://4"]);
    }

    #[test]
    fn test_same_input_same_output() {
        let input = "#HEADER\n#META lang=\"it\"\nhttp://a\nhttp://x\n#META lang=\"en\"\nhttp://b\n";
        let (kept_a, skipped_a) = (MemorySink::new(), MemorySink::new());
        let (kept_b, skipped_b) = (MemorySink::new(), MemorySink::new());

        let first = run(input, Some(&kept_a), Some(&skipped_a));
        let second = run(input, Some(&kept_b), Some(&skipped_b));

        assert_eq!(first, second);
        assert_eq!(kept_a.contents(), kept_b.contents());
        assert_eq!(skipped_a.contents(), skipped_b.contents());
    }

    #[test]
    fn test_late_header_written_where_seen() {
        let kept = MemorySink::new();
        let skipped = MemorySink::new();
        let tally = run(
            "#META lang=\"it\"\nhttp://a\n#HEADER\n#META lang=\"en\"\nhttp://b\n",
            Some(&kept),
            Some(&skipped),
        );

        assert_eq!(tally.total(), 2);
        assert_eq!(kept.contents(), "#META lang=\"it\"\nhttp://a\n#HEADER\n");
        assert_eq!(skipped.contents(), "#HEADER\n#META lang=\"en\"\nhttp://b\n");
    }

    #[test]
    fn test_write_error_propagates() {
        let syntax = PlaylistSyntax::default();
        let classifier = Classifier::default();
        let mut router = Router::new(None, Some(Box::new(FailingSink)));
        let lines = ["#EXTINF:-1,x", "http://x"].map(str::to_string);

        let result = router.route(Pairing::new(lines.into_iter(), &syntax, &classifier));
        assert!(result.is_err());
    }
}
