//! Per-phase progress reporting for streaming UIs.
//!
//! Updates are pushed onto an unbounded channel so reporting never blocks
//! the pipeline, and a dropped or broken receiver is silently ignored —
//! the reporter can never abort retrieval.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Named pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Query expansion finished.
    Expansions,
    /// Dense vector retrieval finished.
    Dense,
    /// Lexical pattern retrieval finished.
    Lexical,
    /// Keyword prefilter finished.
    KeywordPrefilter,
    /// BM25 retrieval finished.
    Bm25,
    /// Rank fusion finished.
    Fusion,
    /// Final selection finished.
    Selection,
}

/// One progress event: the phase and its output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Which phase completed.
    pub phase: Phase,

    /// Size of that phase's output (expansions, lists, candidates, hits).
    pub count: usize,
}

/// Sending half handed to the engine.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver to consume updates from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report one phase. Send failures are ignored.
    pub fn report(&self, phase: Phase, count: usize) {
        let _ = self.tx.send(ProgressUpdate { phase, count });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn updates_arrive_in_order() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.report(Phase::Expansions, 3);
        reporter.report(Phase::Fusion, 10);

        assert_eq!(
            rx.recv().await,
            Some(ProgressUpdate { phase: Phase::Expansions, count: 3 })
        );
        assert_eq!(
            rx.recv().await,
            Some(ProgressUpdate { phase: Phase::Fusion, count: 10 })
        );
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_panic() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.report(Phase::Selection, 5);
    }

    #[test]
    fn phases_serialize_snake_case() {
        let json = serde_json::to_string(&Phase::KeywordPrefilter).unwrap();
        assert_eq!(json, "\"keyword_prefilter\"");
    }
}
