//! The model façade. `WarpLda` wraps the whole token-store/count-table/
//! trainer pipeline behind `fit_transform` and `transform`, tracking
//! internally whether it has been fit yet so `transform` can reject use
//! before training.

use crate::config::Config;
use crate::counts::CountTables;
use crate::error::{LdaError, Result};
use crate::likelihood::pseudo_log_likelihood;
use crate::linalg::Matrix;
use crate::persist::{self, PersistedModel};
use crate::progress::ProgressSink;
use crate::sparse::CsrMatrix;
use crate::token_store::TokenStore;
use crate::trainer::{default_sink, Trainer};
use std::path::Path;

enum ModelState {
    Uninitialized,
    Fitted { counts: CountTables, vocabulary: Vec<String> },
}

/// A WarpLDA topic model.
pub struct WarpLda {
    config: Config,
    state: ModelState,
}

impl WarpLda {
    /// Construct a model from a validated configuration.
    pub fn new(config: Config) -> Result<WarpLda> {
        config.validate()?;
        Ok(WarpLda {
            config,
            state: ModelState::Uninitialized,
        })
    }

    /// Fit the model on `dtm` and return its document-topic distribution.
    /// `dtm` must carry a vocabulary (column labels); a document-term
    /// matrix built without one is rejected up front by
    /// [`CsrMatrix::from_rows`].
    pub fn fit_transform(&mut self, dtm: &CsrMatrix) -> Result<Matrix<f64>> {
        let vocabulary = dtm.col_labels().to_vec();
        check_non_empty(dtm)?;

        let mut store = TokenStore::build(dtm, self.config.n_topics, self.config.seed);
        let mut counts = CountTables::init_from_store(&store);

        let trainer = Trainer::new(&self.config, dtm.n_cols());
        let mut sink = default_sink(&self.config);
        trainer.fit(&mut store, &mut counts, sink.as_mut())?;

        let theta = doc_topic_distribution(&counts, self.config.doc_topic_prior);
        self.state = ModelState::Fitted { counts, vocabulary };
        Ok(theta)
    }

    /// Fit with an explicit progress sink instead of the config-derived
    /// default.
    pub fn fit_transform_with_sink(&mut self, dtm: &CsrMatrix, sink: &mut dyn ProgressSink) -> Result<Matrix<f64>> {
        let vocabulary = dtm.col_labels().to_vec();
        check_non_empty(dtm)?;

        let mut store = TokenStore::build(dtm, self.config.n_topics, self.config.seed);
        let mut counts = CountTables::init_from_store(&store);

        let trainer = Trainer::new(&self.config, dtm.n_cols());
        trainer.fit(&mut store, &mut counts, sink)?;

        let theta = doc_topic_distribution(&counts, self.config.doc_topic_prior);
        self.state = ModelState::Fitted { counts, vocabulary };
        Ok(theta)
    }

    /// Infer the document-topic distribution of new documents against a
    /// previously fit model, without updating the topic-word
    /// distribution.
    pub fn transform(&self, dtm: &CsrMatrix) -> Result<Matrix<f64>> {
        let (fitted_counts, vocabulary) = match &self.state {
            ModelState::Fitted { counts, vocabulary } => (counts, vocabulary),
            ModelState::Uninitialized => return Err(LdaError::NotFitted),
        };
        dtm.check_vocabulary(vocabulary)?;

        let mut store = TokenStore::build(dtm, self.config.n_topics, self.config.seed);
        let mut counts = CountTables::zeros(dtm.n_rows(), dtm.n_cols(), self.config.n_topics);
        counts.set_global(&fitted_counts.snapshot_global());
        for d in 0..store.n_docs() {
            for tok in store.iter_by_doc(d).to_vec() {
                counts.add_dk(d, tok.z_new as usize);
            }
        }

        let trainer = Trainer::new(&self.config, dtm.n_cols());
        trainer.infer(&mut store, &mut counts);

        Ok(doc_topic_distribution(&counts, self.config.doc_topic_prior))
    }

    /// The fitted topic-word distribution, `phi[k][w] = p(w | topic k)`.
    /// Each row sums to 1.
    pub fn topic_word_distribution(&self) -> Result<Matrix<f64>> {
        match &self.state {
            ModelState::Fitted { counts, .. } => Ok(topic_word_distribution(counts, self.config.topic_word_prior)),
            ModelState::Uninitialized => Err(LdaError::NotFitted),
        }
    }

    /// The fitted model's pseudo-log-likelihood at its current state.
    pub fn log_likelihood(&self) -> Result<f64> {
        match &self.state {
            ModelState::Fitted { counts, .. } => {
                let v_beta = self.config.v_beta(counts.shape().1);
                Ok(pseudo_log_likelihood(counts, self.config.topic_word_prior, v_beta))
            }
            ModelState::Uninitialized => Err(LdaError::NotFitted),
        }
    }

    /// The vocabulary this model was fit against.
    pub fn vocabulary(&self) -> Result<&[String]> {
        match &self.state {
            ModelState::Fitted { vocabulary, .. } => Ok(vocabulary),
            ModelState::Uninitialized => Err(LdaError::NotFitted),
        }
    }

    /// Whether `fit_transform` has been called successfully.
    pub fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fitted { .. })
    }

    /// Serialize the fitted model to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let (counts, vocabulary) = match &self.state {
            ModelState::Fitted { counts, vocabulary } => (counts, vocabulary),
            ModelState::Uninitialized => return Err(LdaError::NotFitted),
        };
        let persisted = PersistedModel {
            n_topics: self.config.n_topics,
            doc_topic_prior: self.config.doc_topic_prior,
            topic_word_prior: self.config.topic_word_prior,
            vocabulary: vocabulary.clone(),
            global_counts: counts.snapshot_global(),
        };
        persist::save(&persisted, path)
    }

    /// Restore a model previously written by [`WarpLda::save`]. Only the
    /// topic-word side is restored; `transform` must be called before
    /// reading a document-topic distribution.
    pub fn load(path: impl AsRef<Path>, config: Config) -> Result<WarpLda> {
        let persisted = persist::load(path)?;
        if persisted.n_topics != config.n_topics {
            return Err(LdaError::InvalidHyperparameter(format!(
                "persisted model has {} topics, configuration asked for {}",
                persisted.n_topics, config.n_topics
            )));
        }
        let n_words = persisted.vocabulary.len();
        let mut counts = CountTables::zeros(0, n_words, config.n_topics);
        counts.set_global(&persisted.global_counts);
        Ok(WarpLda {
            config,
            state: ModelState::Fitted {
                counts,
                vocabulary: persisted.vocabulary,
            },
        })
    }
}

/// Reject a document-term matrix with no documents, no vocabulary, or no
/// tokens at all — any of which leaves the sampler with nothing to do.
fn check_non_empty(dtm: &CsrMatrix) -> Result<()> {
    if dtm.n_rows() == 0 {
        return Err(LdaError::EmptyCorpus("document-term matrix has no rows".into()));
    }
    if dtm.n_cols() == 0 {
        return Err(LdaError::EmptyCorpus("document-term matrix has no vocabulary".into()));
    }
    if dtm.total_tokens() == 0 {
        return Err(LdaError::EmptyCorpus("document-term matrix has no tokens".into()));
    }
    Ok(())
}

fn doc_topic_distribution(counts: &CountTables, alpha: f64) -> Matrix<f64> {
    let (n_topics, _n_words, n_docs) = counts.shape();
    let mut theta = Matrix::zeros(n_docs, n_topics);
    for d in 0..n_docs {
        let row = counts.n_dk_row(d);
        let total: f64 = row.iter().sum::<f64>() + n_topics as f64 * alpha;
        for k in 0..n_topics {
            theta[[d, k]] = (row[k] + alpha) / total;
        }
    }
    theta
}

fn topic_word_distribution(counts: &CountTables, beta: f64) -> Matrix<f64> {
    let (n_topics, n_words, _n_docs) = counts.shape();
    let mut phi = Matrix::zeros(n_topics, n_words);
    for k in 0..n_topics {
        let total: f64 = (0..n_words).map(|w| counts.n_wk(w, k) + beta).sum();
        for w in 0..n_words {
            phi[[k, w]] = (counts.n_wk(w, k) + beta) / total;
        }
    }
    phi
}
