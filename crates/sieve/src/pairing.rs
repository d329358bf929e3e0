//! # Pairing Engine
//!
//! Rebuilds logical playlist entries from a raw line stream.
//!
//! An entry is a metadata line immediately followed by its resource line,
//! which is whatever line comes next that is neither a header nor another
//! metadata line. The engine holds at most one pending metadata line, so
//! memory use does not depend on the document size.
//!
//! ## Malformed input
//!
//! - Two metadata lines in a row: the earlier one is dropped, the later one
//!   becomes pending.
//! - A resource line with no pending metadata line is an orphan and dropped.
//! - A metadata line still pending at end of input is dropped.
//! - A line dropped by the decoder for being too long ends the pending
//!   entry: the pending metadata line is dropped, since the lost line was
//!   either its resource or a metadata line replacing it.
//! - Header lines after the first are skipped.
//!
//! None of these fail the stream; they are only counted in [`PairingStats`].

use tracing::{debug, trace};

use crate::classifier::{Classification, Classifier};
use crate::codec::SourceLine;
use crate::syntax::{LineKind, PlaylistSyntax};

/// A complete, classified playlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub info: String,
    pub resource: String,
    pub classification: Classification,
}

/// Output of the pairing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistItem {
    /// The document header, emitted at most once, when first seen
    Header(String),
    Entry(Entry),
}

impl PlaylistItem {
    pub fn is_header(&self) -> bool {
        matches!(self, PlaylistItem::Header(_))
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            PlaylistItem::Entry(entry) => Some(entry),
            PlaylistItem::Header(_) => None,
        }
    }
}

/// Structural counters collected while pairing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingStats {
    /// Lines consumed
    pub lines: u64,
    /// Header lines seen, including duplicates
    pub headers: u64,
    /// Complete entries emitted
    pub entries: u64,
    /// Metadata lines overwritten by a later metadata line
    pub replaced_info: u64,
    /// Metadata lines still pending at end of input
    pub dangling_info: u64,
    /// Resource lines without a preceding metadata line
    pub orphaned_resources: u64,
    /// Header lines after the first
    pub duplicate_headers: u64,
    /// Lines dropped by the decoder for exceeding the maximum length
    pub overlong_lines: u64,
    /// Metadata lines dropped because an overlong line followed them
    pub interrupted_info: u64,
}

impl PairingStats {
    /// Whether any fragment of the input had to be dropped.
    pub fn has_discarded(&self) -> bool {
        self.replaced_info > 0
            || self.dangling_info > 0
            || self.orphaned_resources > 0
            || self.overlong_lines > 0
            || self.interrupted_info > 0
    }
}

/// Push-based pairing state machine.
pub struct PairingEngine<'a> {
    syntax: &'a PlaylistSyntax,
    classifier: &'a Classifier,
    header_emitted: bool,
    pending_info: Option<String>,
    stats: PairingStats,
}

impl<'a> PairingEngine<'a> {
    pub fn new(syntax: &'a PlaylistSyntax, classifier: &'a Classifier) -> Self {
        Self {
            syntax,
            classifier,
            header_emitted: false,
            pending_info: None,
            stats: PairingStats::default(),
        }
    }

    /// Feed one line, returning the item it completes, if any.
    pub fn push(&mut self, line: impl Into<SourceLine>) -> Option<PlaylistItem> {
        self.stats.lines += 1;

        let line = match line.into() {
            SourceLine::Text(line) => line,
            SourceLine::Overlong => {
                self.stats.overlong_lines += 1;
                if let Some(info) = self.pending_info.take() {
                    debug!(info = %info, "Metadata line followed by an overlong line, dropped");
                    self.stats.interrupted_info += 1;
                }
                return None;
            }
        };

        match self.syntax.kind(&line) {
            LineKind::Header => {
                self.stats.headers += 1;
                if self.header_emitted {
                    debug!("Ignoring duplicate header line");
                    self.stats.duplicate_headers += 1;
                    None
                } else {
                    self.header_emitted = true;
                    Some(PlaylistItem::Header(line))
                }
            }
            LineKind::Info => {
                if let Some(previous) = self.pending_info.replace(line) {
                    debug!(info = %previous, "Metadata line without resource, replaced");
                    self.stats.replaced_info += 1;
                }
                None
            }
            LineKind::Resource => match self.pending_info.take() {
                Some(info) => {
                    let classification = self.classifier.classify(&info, &line);
                    trace!(%classification, info = %info, "Entry classified");
                    self.stats.entries += 1;
                    Some(PlaylistItem::Entry(Entry {
                        info,
                        resource: line,
                        classification,
                    }))
                }
                None => {
                    debug!(resource = %line, "Orphaned resource line dropped");
                    self.stats.orphaned_resources += 1;
                    None
                }
            },
        }
    }

    /// Process one line, handing a completed item to `output`.
    pub fn process<E>(
        &mut self,
        line: impl Into<SourceLine>,
        output: &mut dyn FnMut(PlaylistItem) -> Result<(), E>,
    ) -> Result<(), E> {
        match self.push(line) {
            Some(item) => output(item),
            None => Ok(()),
        }
    }

    /// Signal end of input. A pending metadata line is dropped.
    pub fn finish(&mut self) {
        if let Some(info) = self.pending_info.take() {
            debug!(info = %info, "Dangling metadata line at end of input dropped");
            self.stats.dangling_info += 1;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_info.is_some()
    }

    pub fn stats(&self) -> PairingStats {
        self.stats
    }
}

/// Lazy iterator adapter over [`PairingEngine`].
pub struct Pairing<'a, I> {
    lines: I,
    engine: PairingEngine<'a>,
    finished: bool,
}

impl<'a, I> Pairing<'a, I>
where
    I: Iterator,
    I::Item: Into<SourceLine>,
{
    pub fn new(lines: I, syntax: &'a PlaylistSyntax, classifier: &'a Classifier) -> Self {
        Self {
            lines,
            engine: PairingEngine::new(syntax, classifier),
            finished: false,
        }
    }

    pub fn stats(&self) -> PairingStats {
        self.engine.stats()
    }
}

impl<I> Iterator for Pairing<'_, I>
where
    I: Iterator,
    I::Item: Into<SourceLine>,
{
    type Item = PlaylistItem;

    fn next(&mut self) -> Option<PlaylistItem> {
        if self.finished {
            return None;
        }
        for line in self.lines.by_ref() {
            if let Some(item) = self.engine.push(line) {
                return Some(item);
            }
        }
        self.engine.finish();
        self.finished = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;

    fn lines(input: &str) -> Vec<String> {
        input.lines().map(str::to_string).collect()
    }

    fn lang_it() -> Classifier {
        Classifier::new(&ClassifierConfig::default().accept_attribute_values("lang", ["it"]))
    }

    fn pair_all(input: &str) -> (Vec<PlaylistItem>, PairingStats) {
        let syntax = PlaylistSyntax::new("#HEADER", "#META");
        let classifier = lang_it();
        let mut pairing = Pairing::new(lines(input).into_iter(), &syntax, &classifier);
        let items: Vec<_> = pairing.by_ref().collect();
        (items, pairing.stats())
    }

    fn entry(info: &str, resource: &str, classification: Classification) -> PlaylistItem {
        PlaylistItem::Entry(Entry {
            info: info.to_string(),
            resource: resource.to_string(),
            classification,
        })
    }

    #[test]
    fn test_pairs_entries_in_order() {
        let (items, stats) =
            pair_all("#HEADER\n#META lang=\"it\"\nhttp://a\n#META lang=\"en\"\nhttp://b\n");
        assert_eq!(
            items,
            vec![
                PlaylistItem::Header("#HEADER".to_string()),
                entry("#META lang=\"it\"", "http://a", Classification::Kept),
                entry("#META lang=\"en\"", "http://b", Classification::Skipped),
            ]
        );
        assert_eq!(stats.entries, 2);
        assert!(!stats.has_discarded());
    }

    #[test]
    fn test_dangling_info_is_dropped() {
        let (items, stats) = pair_all("#HEADER\n#META lang=\"it\"\n");
        assert_eq!(items, vec![PlaylistItem::Header("#HEADER".to_string())]);
        assert_eq!(stats.dangling_info, 1);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn test_orphaned_resource_is_dropped() {
        let (items, stats) = pair_all("#HEADER\nhttp://orphan\n#META lang=\"it\"\nhttp://a\n");
        assert_eq!(
            items,
            vec![
                PlaylistItem::Header("#HEADER".to_string()),
                entry("#META lang=\"it\"", "http://a", Classification::Kept),
            ]
        );
        assert_eq!(stats.orphaned_resources, 1);
    }

    #[test]
    fn test_last_info_wins() {
        let (items, stats) = pair_all("#META lang=\"en\"\n#META lang=\"it\"\nhttp://a\nhttp://b\n");
        assert_eq!(
            items,
            vec![entry("#META lang=\"it\"", "http://a", Classification::Kept)]
        );
        assert_eq!(stats.replaced_info, 1);
        assert_eq!(stats.orphaned_resources, 1);
    }

    #[test]
    fn test_header_emitted_once() {
        let (items, stats) = pair_all("#HEADER\n#HEADER x\n#META lang=\"it\"\nhttp://a\n");
        assert_eq!(items.iter().filter(|i| i.is_header()).count(), 1);
        assert_eq!(stats.headers, 2);
        assert_eq!(stats.duplicate_headers, 1);
    }

    #[test]
    fn test_no_header_in_input() {
        let (items, _) = pair_all("#META lang=\"it\"\nhttp://a\n");
        assert!(items.iter().all(|i| !i.is_header()));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_directive_after_info_is_the_resource() {
        let (items, stats) =
            pair_all("#HEADER\n#META lang=\"it\"\n#EXTVLCOPT:http-user-agent=VLC\nhttp://a\n");
        assert_eq!(
            items,
            vec![
                PlaylistItem::Header("#HEADER".to_string()),
                entry(
                    "#META lang=\"it\"",
                    "#EXTVLCOPT:http-user-agent=VLC",
                    Classification::Kept
                ),
            ]
        );
        assert_eq!(stats.orphaned_resources, 1);
    }

    #[test]
    fn test_blank_line_after_info_is_the_resource() {
        let (items, stats) = pair_all("#META lang=\"it\"\n\nhttp://a\n\n");
        assert_eq!(items, vec![entry("#META lang=\"it\"", "", Classification::Kept)]);
        assert_eq!(stats.orphaned_resources, 2);
    }

    #[test]
    fn test_overlong_line_drops_pending_info() {
        let syntax = PlaylistSyntax::new("#HEADER", "#META");
        let classifier = lang_it();
        let input = vec![
            SourceLine::from("#HEADER"),
            SourceLine::from("#META lang=\"it\""),
            SourceLine::Overlong,
            SourceLine::from("http://b"),
            SourceLine::from("#META lang=\"it\""),
            SourceLine::from("http://c"),
        ];
        let mut pairing = Pairing::new(input.into_iter(), &syntax, &classifier);
        let items: Vec<_> = pairing.by_ref().collect();

        assert_eq!(
            items,
            vec![
                PlaylistItem::Header("#HEADER".to_string()),
                entry("#META lang=\"it\"", "http://c", Classification::Kept),
            ]
        );
        let stats = pairing.stats();
        assert_eq!(stats.overlong_lines, 1);
        assert_eq!(stats.interrupted_info, 1);
        assert_eq!(stats.orphaned_resources, 1);
        assert!(stats.has_discarded());
    }

    #[test]
    fn test_overlong_line_without_pending_info() {
        let syntax = PlaylistSyntax::default();
        let classifier = Classifier::default();
        let mut engine = PairingEngine::new(&syntax, &classifier);
        assert!(engine.push(SourceLine::Overlong).is_none());
        assert_eq!(engine.stats().overlong_lines, 1);
        assert_eq!(engine.stats().interrupted_info, 0);
    }

    #[test]
    fn test_counts_match_well_formed_entries() {
        let input = "#HEADER\nhttp://orphan\n#META lang=\"it\"\n#META lang=\"en\"\nhttp://1\n\
                     #META lang=\"it\"\nhttp://2\nhttp://orphan2\n#META lang=\"it\"\n";
        let (items, stats) = pair_all(input);
        let entries = items.iter().filter_map(PlaylistItem::as_entry).count();
        assert_eq!(entries, 2);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.orphaned_resources, 2);
        assert_eq!(stats.replaced_info, 1);
        assert_eq!(stats.dangling_info, 1);
    }

    #[test]
    fn test_iterator_is_fused_after_end() {
        let syntax = PlaylistSyntax::default();
        let classifier = Classifier::default();
        let mut pairing = Pairing::new(lines("#EXTINF:-1,a").into_iter(), &syntax, &classifier);
        assert!(pairing.next().is_none());
        assert!(pairing.next().is_none());
        assert_eq!(pairing.stats().dangling_info, 1);
    }

    #[test]
    fn test_process_callback() {
        let syntax = PlaylistSyntax::default();
        let classifier = Classifier::new(&ClassifierConfig::italian());
        let mut engine = PairingEngine::new(&syntax, &classifier);
        let mut output_items = Vec::new();

        let mut output_fn = |item: PlaylistItem| -> Result<(), ()> {
            output_items.push(item);
            Ok(())
        };

        for line in lines("#EXTM3U\n#EXTINF:-1 tvg-id=\"Rai1.it\",Rai 1\nhttp://a\n#EXTINF:-1,BBC One") {
            engine.process(line, &mut output_fn).unwrap();
        }
        assert!(engine.has_pending());
        engine.finish();
        assert!(!engine.has_pending());

        assert_eq!(output_items.len(), 2);
        assert_eq!(
            output_items[1].as_entry().map(|e| e.classification),
            Some(Classification::Kept)
        );
        assert_eq!(engine.stats().dangling_info, 1);
    }
}
