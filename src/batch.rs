//! Parallel replay of many snapshots.
//!
//! Traces share no state, so each snapshot is replayed on its own rayon task.
//! Results keep the order of the input.

use std::fmt;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use crate::bench;
use crate::component::Layout;
use crate::config::Tolerances;
use crate::error::{LayoutError, SnapshotError};
use crate::result::TraceResult;
use crate::snapshot::{self, ReplayOutcome, SimulationSnapshot};


pub struct BatchEntry {
    pub id: String,
    pub outcome: Result<ReplayOutcome, SnapshotError>,
}

pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub duration: Duration,
}

impl BatchReport {
    /// Replays that reproduced their snapshot exactly.
    pub fn exact(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, Ok(o) if o.is_exact()))
            .count()
    }

    /// Replays that traced but did not reproduce their snapshot.
    pub fn drifted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, Ok(o) if !o.is_exact()))
            .count()
    }

    /// Snapshots that could not be replayed.
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    pub fn all_exact(&self) -> bool {
        self.exact() == self.entries.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.outcome {
                Ok(o) if o.is_exact() => writeln!(f, "{}  ok", entry.id)?,
                Ok(o) => writeln!(
                    f,
                    "{}  DRIFT  fingerprint {} -> {}  max segment drift {}",
                    entry.id,
                    o.stored_fingerprint,
                    o.snapshot.fingerprint,
                    o.intensity_drift
                        .map_or("n/a (segment count changed)".to_string(), |d| format!("{:.3e}", d))
                )?,
                Err(e) => writeln!(f, "{}  FAILED  {}", entry.id, e)?,
            }
        }
        writeln!(
            f,
            "Replayed {} snapshots in {:.2?}: {} exact, {} drifted, {} failed",
            self.entries.len(),
            self.duration,
            self.exact(),
            self.drifted(),
            self.failed()
        )
    }
}

fn progress_bar(len: usize, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
    )
    .map(|style| style.progress_chars("█▇▆▅▄▃▂▁"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Replays every snapshot in parallel, each with its own recorded tolerances.
/// `progress` draws a progress bar on stderr.
pub fn replay_all(snapshots: &[SimulationSnapshot], progress: bool) -> BatchReport {
    let start = Instant::now();
    let pb = if progress {
        progress_bar(snapshots.len(), "snapshot")
    } else {
        ProgressBar::hidden()
    };

    let entries = snapshots
        .par_iter()
        .map(|stored| {
            let outcome = snapshot::replay_snapshot(stored);
            pb.inc(1);
            BatchEntry {
                id: stored.id.clone(),
                outcome,
            }
        })
        .collect();
    pb.finish_and_clear();

    let report = BatchReport {
        entries,
        duration: start.elapsed(),
    };
    info!(
        snapshots = snapshots.len(),
        exact = report.exact(),
        drifted = report.drifted(),
        failed = report.failed(),
        "batch replay complete"
    );
    report
}

/// Traces independent layouts in parallel.
pub fn trace_all(
    layouts: &[Layout],
    tolerances: &Tolerances,
) -> Vec<Result<TraceResult, LayoutError>> {
    layouts
        .par_iter()
        .map(|layout| bench::trace(layout, tolerances))
        .collect()
}
