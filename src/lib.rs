//! WarpLDA
//!
//! A cache-efficient Metropolis-Hastings-within-Gibbs sampler for Latent
//! Dirichlet Allocation. Rather than the usual per-token conditional
//! draw over all `K` topics, WarpLDA proposes a new topic from two cheap
//! `O(1)` proposal distributions and accepts or rejects it against the
//! true collapsed Gibbs target, alternating between a document-ordered
//! sweep and a word-ordered sweep so that each pass only ever touches one
//! side of the count tables.
//!
//! # Examples
//!
//! ```
//! use warplda::{Config, WarpLda};
//! use warplda::sparse::CsrMatrix;
//!
//! let dtm = CsrMatrix::from_rows(
//!     vec![vec![(0, 5), (1, 2)], vec![(1, 5), (2, 2)]],
//!     3,
//!     vec!["doc-0".into(), "doc-1".into()],
//!     Some(vec!["cat".into(), "dog".into(), "fish".into()]),
//! ).unwrap();
//!
//! let mut config = Config::new(2, 0.1, 0.1);
//! config.set_n_iter(50);
//! let mut model = WarpLda::new(config).unwrap();
//! let doc_topics = model.fit_transform(&dtm).unwrap();
//! assert_eq!(doc_topics.rows(), 2);
//! ```

pub mod config;
pub mod counts;
pub mod distributed;
pub mod error;
pub mod likelihood;
pub mod linalg;
pub mod model;
pub mod persist;
pub mod progress;
pub mod proposal;
pub mod rand_utils;
pub mod sparse;
pub mod sweep;
pub mod token_store;
pub mod trainer;

pub use config::Config;
pub use error::{LdaError, Result};
pub use model::WarpLda;
