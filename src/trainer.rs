//! The trainer loop — alternating doc/word sweeps, periodic
//! convergence checks, early stopping, and cooperative cancellation.
//!
//! Cancellation is a simple `Arc<AtomicBool>` flag, checked between sweeps
//! rather than inside one, since a sweep is the smallest unit that leaves
//! the count tables consistent.

use crate::config::Config;
use crate::counts::CountTables;
use crate::error::LdaError;
use crate::likelihood::pseudo_log_likelihood;
use crate::progress::{NullProgressSink, ProgressReport, ProgressSink, TracingProgressSink};
use crate::sweep::{doc_sweep_parallel, word_sweep_parallel};
use crate::token_store::TokenStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A cooperative cancellation switch, checked by the trainer between
/// sweeps. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that starts un-cancelled.
    pub fn new() -> CancellationToken {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Observed by the trainer at its next
    /// between-sweep check point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why training stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `n_iter` was reached.
    MaxIterations,
    /// The relative pseudo-log-likelihood change dropped below
    /// `convergence_tol`.
    Converged,
    /// A [`CancellationToken`] was triggered.
    Cancelled,
}

/// The result of a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOutcome {
    /// Number of doc/word sweep pairs actually run.
    pub iterations_run: usize,
    /// Final pseudo-log-likelihood.
    pub final_log_likelihood: f64,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
}

/// Runs the alternating doc-sweep / word-sweep loop over a corpus.
pub struct Trainer<'a> {
    config: &'a Config,
    v_beta: f64,
    cancellation: CancellationToken,
}

impl<'a> Trainer<'a> {
    /// Build a trainer for the given configuration and vocabulary size
    /// (needed up front for `V*beta`).
    pub fn new(config: &'a Config, n_words: usize) -> Trainer<'a> {
        Trainer {
            config,
            v_beta: config.v_beta(n_words),
            cancellation: CancellationToken::new(),
        }
    }

    /// Share this trainer's cancellation token so a caller can stop
    /// training from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run to completion (or early stop), reporting progress to `sink`
    /// at every `n_check_convergence`-th iteration.
    ///
    /// Returns [`LdaError::Numerical`] if a sweep ever drives the
    /// pseudo-log-likelihood to a non-finite value, naming the iteration
    /// it happened at.
    pub fn fit(
        &self,
        store: &mut TokenStore,
        counts: &mut CountTables,
        sink: &mut dyn ProgressSink,
    ) -> Result<TrainingOutcome, LdaError> {
        let start = Instant::now();
        let alpha = self.config.doc_topic_prior;
        let beta = self.config.topic_word_prior;

        let mut last_checked_ll = pseudo_log_likelihood(counts, beta, self.v_beta);
        let mut final_ll = last_checked_ll;
        let mut stop_reason = StopReason::MaxIterations;
        let mut iterations_run = 0;

        for iter in 1..=self.config.n_iter {
            if self.cancellation.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }
            doc_sweep_parallel(store, counts, alpha, beta, self.v_beta, self.config.seed, iter as u64);

            if self.cancellation.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                iterations_run = iter;
                break;
            }
            word_sweep_parallel(store, counts, alpha, beta, self.v_beta, true, self.config.seed, iter as u64);

            iterations_run = iter;
            final_ll = pseudo_log_likelihood(counts, beta, self.v_beta);
            if !final_ll.is_finite() {
                return Err(LdaError::Numerical { iteration: iter });
            }

            if self.config.verbose {
                tracing::info!(iteration = iter, log_likelihood = final_ll, "sweep complete");
            }

            if iter % self.config.n_check_convergence == 0 {
                sink.report(ProgressReport {
                    iteration: iter,
                    log_likelihood: final_ll,
                    elapsed: start.elapsed(),
                });
                let ratio = last_checked_ll / final_ll - 1.0;
                if ratio.abs() < self.config.convergence_tol {
                    stop_reason = StopReason::Converged;
                    break;
                }
                last_checked_ll = final_ll;
            }
        }

        Ok(TrainingOutcome {
            iterations_run,
            final_log_likelihood: final_ll,
            stop_reason,
        })
    }

    /// Run inference-only sweeps over `store`/`counts`: the word sweep
    /// does not update `n_wk`/`n_k`, so a
    /// fitted model's topic-word distribution is left unchanged while a
    /// new document's `n_dk` settles.
    pub fn infer(&self, store: &mut TokenStore, counts: &mut CountTables) {
        let alpha = self.config.doc_topic_prior;
        let beta = self.config.topic_word_prior;
        for iter in 1..=self.config.n_iter {
            if self.cancellation.is_cancelled() {
                break;
            }
            doc_sweep_parallel(store, counts, alpha, beta, self.v_beta, self.config.seed, iter as u64);
            word_sweep_parallel(store, counts, alpha, beta, self.v_beta, false, self.config.seed, iter as u64);
        }
    }
}

/// Construct the default progress sink used when a caller doesn't supply
/// one of its own: a `tracing`-backed sink when `verbose`, otherwise a
/// no-op sink.
pub fn default_sink(config: &Config) -> Box<dyn ProgressSink> {
    if config.verbose {
        Box::new(TracingProgressSink)
    } else {
        Box::new(NullProgressSink)
    }
}
