//! Progress reporting: the trainer emits `(iteration, log_likelihood,
//! elapsed)` to a collaborator-supplied sink after each convergence check.

use std::time::Duration;

/// One progress report emitted by the trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    /// Iteration number (1-indexed) this report was taken at.
    pub iteration: usize,
    /// Pseudo-log-likelihood at this iteration.
    pub log_likelihood: f64,
    /// Wall-clock time elapsed since training started.
    pub elapsed: Duration,
}

/// Receives progress reports from [`crate::trainer::Trainer`]. Implement
/// this to drive a progress bar, a log line, or a cancellation switch.
pub trait ProgressSink {
    /// Called once per convergence check.
    fn report(&mut self, progress: ProgressReport);
}

/// A sink that emits a `tracing` event per report, used when
/// [`Config::verbose`](crate::config::Config::verbose) is set and no
/// other sink is supplied.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn report(&mut self, progress: ProgressReport) {
        tracing::info!(
            iteration = progress.iteration,
            log_likelihood = progress.log_likelihood,
            elapsed_ms = progress.elapsed.as_millis() as u64,
            "training progress"
        );
    }
}

/// A sink that does nothing, used as the default when the caller doesn't
/// want progress reports.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn report(&mut self, _progress: ProgressReport) {}
}

/// A sink that records every report it receives, for tests.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    pub reports: Vec<ProgressReport>,
}

impl ProgressSink for RecordingProgressSink {
    fn report(&mut self, progress: ProgressReport) {
        self.reports.push(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_collects_reports() {
        let mut sink = RecordingProgressSink::default();
        sink.report(ProgressReport {
            iteration: 1,
            log_likelihood: -12.5,
            elapsed: Duration::from_millis(10),
        });
        sink.report(ProgressReport {
            iteration: 2,
            log_likelihood: -10.0,
            elapsed: Duration::from_millis(20),
        });
        assert_eq!(sink.reports.len(), 2);
        assert_eq!(sink.reports[1].iteration, 2);
    }

    #[test]
    fn test_null_sink_accepts_reports() {
        let mut sink = NullProgressSink;
        sink.report(ProgressReport {
            iteration: 1,
            log_likelihood: -1.0,
            elapsed: Duration::from_secs(0),
        });
    }
}
