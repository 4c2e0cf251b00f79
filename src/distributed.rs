//! The distributed coordinator.
//!
//! Documents are partitioned across workers; each worker owns its shard's
//! `n_dk` rows outright and is never asked to share them. Only `n_wk`/`n_k`
//! cross the wire, as a [`GlobalSnapshot`](crate::counts::GlobalSnapshot):
//! the coordinator broadcasts the current global snapshot, each worker
//! runs a full local sweep (doc sweep, then word sweep) against its own
//! shard and reports back its accumulated delta, and the coordinator
//! reduces all deltas onto the global snapshot by element-wise addition
//! before the next round.
//!
//! Coordination is explicit message passing over `std::sync::mpsc`
//! channels and `std::thread`, one thread per worker, with a full
//! request/response protocol per round. Each worker additionally uses
//! `rayon` internally (via `doc_sweep_parallel`/`word_sweep_parallel`) to
//! sweep its own shard.
//!
//! Each worker's sweeps are seeded from `config.seed` plus its shard id,
//! so a single-shard run reproduces the non-distributed trainer bit for
//! bit and a multi-shard run stays reproducible run to run.

use crate::config::Config;
use crate::counts::{CountTables, GlobalSnapshot};
use crate::likelihood::pseudo_log_likelihood_raw;
use crate::linalg::{Matrix, Vector};
use crate::sparse::CsrMatrix;
use crate::sweep::{doc_sweep_parallel, word_sweep_parallel};
use crate::token_store::TokenStore;
use crate::trainer::StopReason;
use std::sync::mpsc;
use std::thread;

/// One document shard: a worker's private store and counts.
struct Shard {
    id: usize,
    doc_ids: Vec<usize>,
    store: TokenStore,
    counts: CountTables,
}

/// A message from the coordinator to a worker.
enum Command {
    /// Run one round against the given global snapshot.
    Round { iteration: u64, snapshot: GlobalSnapshot },
    /// Stop, reporting this shard's final document-topic rows.
    Finish,
}

/// A message from a worker back to the coordinator.
enum Report {
    /// This round's accumulated change to `n_wk`/`n_k`.
    Delta(GlobalSnapshot),
    /// Final `(doc_id, topic_counts_row)` pairs, sent once after `Finish`.
    Final(Vec<(usize, Vec<f64>)>),
}

/// Partition `dtm`'s documents contiguously across `n_shards` workers.
fn shard_corpus(dtm: &CsrMatrix, n_shards: usize, n_topics: usize, seed: u64) -> Vec<Shard> {
    let n_docs = dtm.n_rows();
    let n_shards = n_shards.max(1).min(n_docs.max(1));
    let base = n_docs / n_shards;
    let rem = n_docs % n_shards;

    let mut shards = Vec::with_capacity(n_shards);
    let mut start = 0;
    for s in 0..n_shards {
        let len = base + if s < rem { 1 } else { 0 };
        let end = start + len;
        let doc_ids: Vec<usize> = (start..end).collect();

        let rows: Vec<Vec<(usize, u32)>> = doc_ids.iter().map(|&d| dtm.row(d).collect()).collect();
        let row_labels: Vec<String> = doc_ids.iter().map(|&d| dtm.row_labels()[d].clone()).collect();
        let shard_dtm = CsrMatrix::from_rows(rows, dtm.n_cols(), row_labels, Some(dtm.col_labels().to_vec()))
            .expect("shard inherits a valid vocabulary from its parent matrix");

        let store = TokenStore::build(&shard_dtm, n_topics, seed.wrapping_add(s as u64));
        let counts = CountTables::init_from_store(&store);
        shards.push(Shard { id: s, doc_ids, store, counts });
        start = end;
    }
    shards
}

/// Outcome of a distributed training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributedOutcome {
    pub rounds_run: usize,
    pub final_log_likelihood: f64,
    pub stop_reason: StopReason,
}

/// Run WarpLDA across `n_workers` threads, each owning a contiguous shard
/// of `dtm`'s documents. Returns the document-topic
/// distribution (rows in `dtm`'s original document order) and the fitted
/// global word-topic counts.
pub fn fit_distributed(
    config: &Config,
    dtm: &CsrMatrix,
    n_workers: usize,
) -> (Matrix<f64>, GlobalSnapshot, DistributedOutcome) {
    let n_topics = config.n_topics;
    let n_words = dtm.n_cols();
    let n_docs = dtm.n_rows();
    let alpha = config.doc_topic_prior;
    let beta = config.topic_word_prior;
    let v_beta = config.v_beta(n_words);

    let shards = shard_corpus(dtm, n_workers, n_topics, config.seed);
    let n_shards = shards.len();

    let mut master = GlobalSnapshot {
        n_wk: Matrix::zeros(n_words, n_topics),
        n_k: Vector::zeros(n_topics),
    };
    for shard in &shards {
        for (dst_row, src_row) in master.n_wk.row_iter_mut().zip(shard.counts.n_wk_matrix().row_iter()) {
            for (d, s) in dst_row.iter_mut().zip(src_row.iter()) {
                *d += s;
            }
        }
    }
    for k in 0..n_topics {
        master.n_k[k] = master.n_wk.col(k).into_iter().sum();
    }

    let (cmd_txs, report_rx): (Vec<mpsc::Sender<Command>>, mpsc::Receiver<Report>) = {
        let (report_tx, report_rx) = mpsc::channel();
        let mut cmd_txs = Vec::with_capacity(n_shards);
        for shard in shards {
            let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
            let report_tx = report_tx.clone();
            let worker_seed = config.seed.wrapping_add(shard.id as u64);
            cmd_txs.push(cmd_tx);
            thread::spawn(move || worker_loop(shard, alpha, beta, v_beta, worker_seed, cmd_rx, report_tx));
        }
        (cmd_txs, report_rx)
    };

    let mut last_checked_ll = pseudo_log_likelihood_raw(&master.n_wk, &master.n_k, n_words, n_topics, beta, v_beta);
    let mut final_ll = last_checked_ll;
    let mut stop_reason = StopReason::MaxIterations;
    let mut rounds_run = 0;

    for iteration in 1..=config.n_iter as u64 {
        for tx in &cmd_txs {
            tx.send(Command::Round {
                iteration,
                snapshot: master.clone(),
            })
            .expect("worker thread alive");
        }
        for _ in 0..n_shards {
            match report_rx.recv().expect("worker sends exactly one report per round") {
                Report::Delta(delta) => {
                    for (dst_row, src_row) in master.n_wk.row_iter_mut().zip(delta.n_wk.row_iter()) {
                        for (d, s) in dst_row.iter_mut().zip(src_row.iter()) {
                            *d += s;
                        }
                    }
                    for k in 0..n_topics {
                        master.n_k[k] += delta.n_k[k];
                    }
                }
                Report::Final(_) => unreachable!("Final only sent in response to Command::Finish"),
            }
        }

        rounds_run = iteration as usize;
        final_ll = pseudo_log_likelihood_raw(&master.n_wk, &master.n_k, n_words, n_topics, beta, v_beta);
        if config.verbose {
            tracing::info!(iteration, log_likelihood = final_ll, "distributed round complete");
        }
        if iteration as usize % config.n_check_convergence == 0 {
            let ratio = last_checked_ll / final_ll - 1.0;
            if ratio.abs() < config.convergence_tol {
                stop_reason = StopReason::Converged;
                break;
            }
            last_checked_ll = final_ll;
        }
    }

    let mut theta = Matrix::zeros(n_docs, n_topics);
    for tx in &cmd_txs {
        tx.send(Command::Finish).expect("worker thread alive");
    }
    for _ in 0..n_shards {
        match report_rx.recv().expect("worker sends its final rows before exiting") {
            Report::Final(rows) => {
                for (d, row) in rows {
                    let total: f64 = row.iter().sum::<f64>() + n_topics as f64 * alpha;
                    for k in 0..n_topics {
                        theta[[d, k]] = (row[k] + alpha) / total;
                    }
                }
            }
            Report::Delta(_) => unreachable!("Delta only sent in response to Command::Round"),
        }
    }

    (
        theta,
        master,
        DistributedOutcome {
            rounds_run,
            final_log_likelihood: final_ll,
            stop_reason,
        },
    )
}

/// Run one worker's command loop. `seed` is this worker's own seed
/// (`config.seed` mixed with its shard id), threaded into every sweep so
/// a single-shard run reproduces the non-distributed trainer exactly and
/// a multi-shard run stays reproducible across runs of the same seed.
fn worker_loop(
    mut shard: Shard,
    alpha: f64,
    beta: f64,
    v_beta: f64,
    seed: u64,
    cmd_rx: mpsc::Receiver<Command>,
    report_tx: mpsc::Sender<Report>,
) {
    while let Ok(command) = cmd_rx.recv() {
        match command {
            Command::Round { iteration, snapshot } => {
                shard.counts.set_global(&snapshot);
                shard.counts.reset_local();
                doc_sweep_parallel(&mut shard.store, &mut shard.counts, alpha, beta, v_beta, seed, iteration);
                word_sweep_parallel(&mut shard.store, &mut shard.counts, alpha, beta, v_beta, true, seed, iteration);
                let delta = shard.counts.local_delta();
                report_tx.send(Report::Delta(delta)).ok();
            }
            Command::Finish => {
                let rows = shard
                    .doc_ids
                    .iter()
                    .enumerate()
                    .map(|(local_d, &global_d)| (global_d, shard.counts.n_dk_row(local_d).to_vec()))
                    .collect();
                report_tx.send(Report::Final(rows)).ok();
                break;
            }
        }
    }
}
