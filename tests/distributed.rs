use warplda::config::Config;
use warplda::distributed::fit_distributed;
use warplda::sparse::CsrMatrix;

fn toy_corpus() -> CsrMatrix {
    let rows: Vec<Vec<(usize, u32)>> = (0..9)
        .map(|d| match d % 3 {
            0 => vec![(0, 8), (1, 1)],
            1 => vec![(1, 8), (2, 1)],
            _ => vec![(2, 8), (0, 1)],
        })
        .collect();
    CsrMatrix::from_rows(
        rows,
        3,
        (0..9).map(|d| format!("d{d}")).collect(),
        Some(vec!["a".into(), "b".into(), "c".into()]),
    )
    .unwrap()
}

#[test]
fn distributed_fit_matches_single_machine_row_count_and_normalization() {
    let mut config = Config::new(3, 0.1, 0.1);
    config.set_n_iter(20);
    config.set_n_check_convergence(5);
    config.set_seed(9);

    let dtm = toy_corpus();
    let (theta, snapshot, outcome) = fit_distributed(&config, &dtm, 3);

    assert_eq!(theta.rows(), dtm.n_rows());
    assert_eq!(snapshot.n_wk.rows(), dtm.n_cols());
    assert_eq!(snapshot.n_k.size(), config.n_topics);
    for d in 0..theta.rows() {
        let sum: f64 = theta.row(d).iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
    assert!(outcome.rounds_run > 0);
}

#[test]
fn distributed_fit_tolerates_more_workers_than_documents() {
    let mut config = Config::new(2, 0.1, 0.1);
    config.set_n_iter(10);
    let dtm = toy_corpus();
    let (theta, _snapshot, _outcome) = fit_distributed(&config, &dtm, 64);
    assert_eq!(theta.rows(), dtm.n_rows());
}
