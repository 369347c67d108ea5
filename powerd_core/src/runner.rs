use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::sequencer::{Sequencer, TickOutcome};

/// Counters for one `run` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub transitions: u64,
    pub failed_actuations: u64,
    pub source_errors: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Confirmed(report) => {
                self.transitions += 1;
                self.failed_actuations += report.failures().count() as u64;
            }
            TickOutcome::SourceUnavailable(_) => self.source_errors += 1,
            _ => {}
        }
    }
}

/// Tick `seq` every `poll_interval` until `shutdown` fires, its sender is
/// dropped, or `max_ticks` ticks have run.
///
/// A sequence that is already running completes before shutdown is observed.
pub fn run(
    seq: &mut Sequencer,
    poll_interval: Duration,
    shutdown: &Receiver<()>,
    max_ticks: Option<u64>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    tracing::info!(
        poll_ms = poll_interval.as_millis() as u64,
        max_ticks,
        "poll loop start"
    );

    loop {
        if max_ticks.is_some_and(|m| summary.ticks >= m) {
            tracing::info!(ticks = summary.ticks, "tick budget reached");
            break;
        }

        let outcome = seq.tick();
        tracing::trace!(?outcome, "tick");
        summary.record(&outcome);

        if max_ticks.is_some_and(|m| summary.ticks >= m) {
            tracing::info!(ticks = summary.ticks, "tick budget reached");
            break;
        }

        match shutdown.recv_timeout(poll_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) => {
                tracing::info!("shutdown requested");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("shutdown channel closed");
                break;
            }
        }
    }

    tracing::info!(
        ticks = summary.ticks,
        transitions = summary.transitions,
        failed_actuations = summary.failed_actuations,
        source_errors = summary.source_errors,
        "poll loop stopped"
    );
    summary
}
