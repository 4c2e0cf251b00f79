//! Trainer configuration.
//!
//! `new` takes the parameters with no sane default (topic count, priors);
//! everything else starts at a documented default and is adjusted
//! afterward with plain `set_*` methods.

use crate::error::{LdaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Training configuration for [`crate::model::WarpLda`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of topics, `K`.
    pub n_topics: usize,
    /// Document-topic Dirichlet prior, `alpha`.
    pub doc_topic_prior: f64,
    /// Topic-word Dirichlet prior, `beta`.
    pub topic_word_prior: f64,
    /// Maximum number of doc-sweep + word-sweep iterations.
    pub n_iter: usize,
    /// Relative pseudo-log-likelihood change below which training
    /// early-stops.
    pub convergence_tol: f64,
    /// Check convergence every this many iterations.
    pub n_check_convergence: usize,
    /// Emit a `tracing` event per iteration.
    pub verbose: bool,
    /// Top-level RNG seed.
    pub seed: u64,
}

impl Config {
    /// A configuration with `n_topics`, `doc_topic_prior`, and
    /// `topic_word_prior` set explicitly and everything else defaulted:
    /// `n_iter = 200`, `convergence_tol = 1e-3`, `n_check_convergence = 10`,
    /// `verbose = false`, `seed = 0`.
    pub fn new(n_topics: usize, doc_topic_prior: f64, topic_word_prior: f64) -> Config {
        Config {
            n_topics,
            doc_topic_prior,
            topic_word_prior,
            n_iter: 200,
            convergence_tol: 1e-3,
            n_check_convergence: 10,
            verbose: false,
            seed: 0,
        }
    }

    /// Set the maximum iteration count.
    pub fn set_n_iter(&mut self, n_iter: usize) {
        self.n_iter = n_iter;
    }

    /// Set the early-stop relative tolerance.
    pub fn set_convergence_tol(&mut self, tol: f64) {
        self.convergence_tol = tol;
    }

    /// Set how often (in iterations) convergence is checked.
    pub fn set_n_check_convergence(&mut self, n: usize) {
        self.n_check_convergence = n;
    }

    /// Enable or disable per-iteration `tracing` events.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set the top-level RNG seed.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// `V*beta`, the normalizing term that recurs throughout the count
    /// tables and the proposal densities.
    pub fn v_beta(&self, n_words: usize) -> f64 {
        n_words as f64 * self.topic_word_prior
    }

    /// Reject configurations with non-positive hyperparameters or a zero
    /// topic count.
    pub fn validate(&self) -> Result<()> {
        if self.n_topics == 0 {
            return Err(LdaError::InvalidHyperparameter("n_topics must be at least 1".into()));
        }
        if self.doc_topic_prior <= 0.0 {
            return Err(LdaError::InvalidHyperparameter("doc_topic_prior must be positive".into()));
        }
        if self.topic_word_prior <= 0.0 {
            return Err(LdaError::InvalidHyperparameter("topic_word_prior must be positive".into()));
        }
        if self.n_iter == 0 {
            return Err(LdaError::InvalidHyperparameter("n_iter must be at least 1".into()));
        }
        if self.n_check_convergence == 0 {
            return Err(LdaError::InvalidHyperparameter("n_check_convergence must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Config> {
        let cfg: Config = serde_json::from_str(json).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Config> {
        let cfg: Config = toml::from_str(toml_str).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))?;
        Config::from_toml(&contents)
    }
}
