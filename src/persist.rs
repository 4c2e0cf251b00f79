//! Model persistence: serialize a fitted model's count tables to disk and
//! back with `bincode`.

use crate::counts::GlobalSnapshot;
use crate::error::{LdaError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Everything needed to restore a fitted [`crate::model::WarpLda`]
/// without rerunning the sampler: the hyperparameters, the vocabulary,
/// and the global word-topic counts (`n_dk` is per-corpus and is not
/// persisted; `transform` rebuilds it for new documents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub n_topics: usize,
    pub doc_topic_prior: f64,
    pub topic_word_prior: f64,
    pub vocabulary: Vec<String>,
    pub global_counts: GlobalSnapshot,
}

/// Write a persisted model to `path` with `bincode`.
pub fn save(model: &PersistedModel, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, model).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))
}

/// Read a persisted model from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<PersistedModel> {
    let file = File::open(path).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))?;
    let reader = BufReader::new(file);
    bincode::deserialize_from(reader).map_err(|e| LdaError::InvalidHyperparameter(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{Matrix, Vector};

    #[test]
    fn test_save_load_roundtrip() {
        let model = PersistedModel {
            n_topics: 2,
            doc_topic_prior: 0.1,
            topic_word_prior: 0.1,
            vocabulary: vec!["a".into(), "b".into()],
            global_counts: GlobalSnapshot {
                n_wk: Matrix::new(2, 2, vec![3.0, 1.0, 0.0, 4.0]),
                n_k: Vector::new(vec![3.0, 5.0]),
            },
        };
        let dir = std::env::temp_dir();
        let path = dir.join(format!("warplda-test-{}.bin", std::process::id()));
        save(&model, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.vocabulary, model.vocabulary);
        assert_eq!(loaded.global_counts.n_k, model.global_counts.n_k);
        std::fs::remove_file(&path).ok();
    }
}
