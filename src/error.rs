//! Error types for the WarpLDA engine.

/// Errors that can occur while configuring, fitting, or querying a model.
#[derive(Debug, thiserror::Error)]
pub enum LdaError {
    /// `K < 1`, `alpha <= 0`, or `beta <= 0`.
    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    /// The input matrix has no tokens or no vocabulary.
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    /// The input matrix carries no column (vocabulary) labels.
    #[error("input matrix has no vocabulary labels")]
    MissingVocabulary,

    /// `transform`'s column labels don't match the labels seen at `fit` time.
    #[error("vocabulary mismatch: expected {expected} columns, got {actual}")]
    VocabularyMismatch {
        /// Vocabulary size at fit time.
        expected: usize,
        /// Vocabulary size of the transform-time input.
        actual: usize,
    },

    /// A distribution or transform accessor was called before `fit`.
    #[error("model has not been fitted yet")]
    NotFitted,

    /// A non-finite value appeared where the sampler guarantees finiteness.
    #[error("non-finite pseudo-log-likelihood at iteration {iteration}")]
    Numerical {
        /// The iteration at which the non-finite value was observed.
        iteration: usize,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LdaError>;
