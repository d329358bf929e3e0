//! # Splitter
//!
//! Drives one split run: acquire the source, pair and classify its lines, and
//! route the entries to their outputs.
//!
//! The run is a strict producer/consumer chain. An async producer reads lines
//! from the [`LineStream`] and forwards them, in arrival order, over a bounded
//! channel to a single blocking worker that owns the [`Router`] and its sinks.
//!
//! Any failure (acquisition, read timeout, write error, cancellation) aborts
//! the run. The sinks are closed and the output files of the run are removed,
//! so a failed run never leaves a complete-looking playlist behind.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::codec::SourceLine;
use crate::output::OutputLayout;
use crate::pairing::{Pairing, PairingStats};
use crate::router::{BytesWritten, Router, Tally};
use crate::source::{LineStream, PlaylistSource};
use crate::syntax::PlaylistSyntax;
use crate::{SieveError, SplitConfig};

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitReport {
    pub tally: Tally,
    pub stats: PairingStats,
    /// Raw bytes received from the source
    pub bytes_read: u64,
    /// Lines dropped by the decoder for exceeding the maximum line length
    pub discarded_lines: u64,
    pub bytes_written: BytesWritten,
    pub elapsed: Duration,
}

type WorkerOutput = (Router, std::io::Result<Tally>, PairingStats);

pub struct Splitter {
    syntax: Arc<PlaylistSyntax>,
    classifier: Arc<Classifier>,
    channel_size: usize,
}

impl Splitter {
    pub fn new(config: SplitConfig) -> Self {
        Self {
            classifier: Arc::new(Classifier::new(&config.classifier)),
            syntax: Arc::new(config.syntax),
            channel_size: config.channel_size.max(1),
        }
    }

    /// Acquire `input` from `source` and split it into `layout`.
    pub async fn split_source(
        &self,
        source: &PlaylistSource,
        input: &str,
        layout: &OutputLayout,
        cancel: CancellationToken,
    ) -> Result<SplitReport, SieveError> {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SieveError::Cancelled),
            result = source.open(input) => result,
        };

        match opened {
            Ok(lines) => self.run(lines, layout, cancel).await,
            Err(e) => {
                warn!(error = %e, "Failed to acquire playlist source");
                layout.remove_outputs();
                Err(e)
            }
        }
    }

    /// Split an already opened line stream into `layout`.
    pub async fn run(
        &self,
        mut lines: LineStream,
        layout: &OutputLayout,
        cancel: CancellationToken,
    ) -> Result<SplitReport, SieveError> {
        let start = Instant::now();

        let router = match layout.open() {
            Ok(router) => router,
            Err(e) => {
                layout.remove_outputs();
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel::<SourceLine>(self.channel_size);
        let worker = self.spawn_worker(router, rx);

        let produced = Self::produce(&mut lines, &tx, &cancel).await;
        // Closing the channel ends the worker's input
        drop(tx);

        let joined = worker
            .await
            .map_err(|e| SieveError::Worker(e.to_string()));

        let outcome = match (produced, joined) {
            (_, Err(e)) => Err(e),
            (Err(e), Ok((router, _, _))) => {
                drop(router);
                Err(e)
            }
            (Ok(()), Ok((router, Err(e), _))) => {
                drop(router);
                Err(SieveError::Io(e))
            }
            (Ok(()), Ok((router, Ok(tally), stats))) => router
                .close()
                .map(|bytes_written| (tally, stats, bytes_written))
                .map_err(SieveError::Io),
        };

        match outcome {
            Ok((tally, stats, bytes_written)) => {
                if stats.has_discarded() {
                    warn!(
                        replaced = stats.replaced_info,
                        dangling = stats.dangling_info,
                        orphaned = stats.orphaned_resources,
                        overlong = stats.overlong_lines,
                        interrupted = stats.interrupted_info,
                        "Malformed playlist fragments were dropped"
                    );
                }
                let report = SplitReport {
                    tally,
                    stats,
                    bytes_read: lines.bytes_read(),
                    discarded_lines: lines.discarded_lines(),
                    bytes_written,
                    elapsed: start.elapsed(),
                };
                debug!(?report, "Split finished");
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Split aborted, removing partial outputs");
                layout.remove_outputs();
                Err(e)
            }
        }
    }

    fn spawn_worker(
        &self,
        mut router: Router,
        mut rx: mpsc::Receiver<SourceLine>,
    ) -> tokio::task::JoinHandle<WorkerOutput> {
        let syntax = Arc::clone(&self.syntax);
        let classifier = Arc::clone(&self.classifier);

        tokio::task::spawn_blocking(move || {
            let mut pairing = Pairing::new(
                std::iter::from_fn(|| rx.blocking_recv()),
                &syntax,
                &classifier,
            );
            let result = router.route(pairing.by_ref());
            let stats = pairing.stats();
            (router, result, stats)
        })
    }

    /// Forward lines to the worker until the source is exhausted. Returns
    /// early without error when the worker has stopped receiving.
    async fn produce(
        lines: &mut LineStream,
        tx: &mpsc::Sender<SourceLine>,
        cancel: &CancellationToken,
    ) -> Result<(), SieveError> {
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SieveError::Cancelled),
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                info!(bytes = lines.bytes_read(), "Playlist source exhausted");
                return Ok(());
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SieveError::Cancelled),
                sent = tx.send(line) => {
                    if sent.is_err() {
                        debug!("Worker stopped receiving lines");
                        return Ok(());
                    }
                }
            }
        }
    }
}
