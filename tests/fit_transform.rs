use warplda::config::Config;
use warplda::sparse::CsrMatrix;
use warplda::{LdaError, WarpLda};

fn news_like_corpus() -> CsrMatrix {
    let rows = vec![
        vec![(0, 12), (1, 3), (2, 1)],
        vec![(0, 9), (1, 4)],
        vec![(2, 10), (3, 5), (0, 1)],
        vec![(2, 8), (3, 6)],
        vec![(4, 11), (5, 4), (1, 1)],
        vec![(4, 7), (5, 6)],
    ];
    CsrMatrix::from_rows(
        rows,
        6,
        (0..6).map(|d| format!("doc-{d}")).collect(),
        Some(vec![
            "rocket".into(),
            "orbit".into(),
            "senate".into(),
            "election".into(),
            "midfield".into(),
            "striker".into(),
        ]),
    )
    .unwrap()
}

#[test]
fn fit_transform_produces_a_valid_document_topic_distribution() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut config = Config::new(3, 0.1, 0.1);
    config.set_n_iter(60);
    config.set_seed(7);
    let mut model = WarpLda::new(config).unwrap();

    let dtm = news_like_corpus();
    let theta = model.fit_transform(&dtm).unwrap();

    assert_eq!(theta.rows(), dtm.n_rows());
    assert_eq!(theta.cols(), 3);
    for d in 0..theta.rows() {
        let row = theta.row(d);
        assert!(row.iter().all(|&p| p >= 0.0 && p <= 1.0));
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

#[test]
fn fit_transform_is_reproducible_given_a_fixed_seed() {
    let dtm = news_like_corpus();

    let mut config_a = Config::new(3, 0.1, 0.1);
    config_a.set_n_iter(40);
    config_a.set_seed(123);
    let mut model_a = WarpLda::new(config_a).unwrap();
    let theta_a = model_a.fit_transform(&dtm).unwrap();

    let mut config_b = Config::new(3, 0.1, 0.1);
    config_b.set_n_iter(40);
    config_b.set_seed(123);
    let mut model_b = WarpLda::new(config_b).unwrap();
    let theta_b = model_b.fit_transform(&dtm).unwrap();

    assert_eq!(theta_a.data(), theta_b.data());
}

#[test]
fn transform_infers_a_held_out_document_against_the_fitted_vocabulary() {
    let mut config = Config::new(2, 0.2, 0.2);
    config.set_n_iter(40);
    let mut model = WarpLda::new(config).unwrap();
    model.fit_transform(&news_like_corpus()).unwrap();

    let held_out = CsrMatrix::from_rows(
        vec![vec![(0, 6), (1, 2)]],
        6,
        vec!["held-out".into()],
        Some(vec![
            "rocket".into(),
            "orbit".into(),
            "senate".into(),
            "election".into(),
            "midfield".into(),
            "striker".into(),
        ]),
    )
    .unwrap();

    let theta = model.transform(&held_out).unwrap();
    assert_eq!(theta.rows(), 1);
    let sum: f64 = theta.row(0).iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn fit_transform_rejects_an_empty_corpus() {
    let mut config = Config::new(2, 0.1, 0.1);
    config.set_n_iter(5);
    let mut model = WarpLda::new(config).unwrap();

    let empty = CsrMatrix::from_rows(vec![], 2, vec![], Some(vec!["a".into(), "b".into()])).unwrap();
    assert!(matches!(model.fit_transform(&empty), Err(LdaError::EmptyCorpus(_))));
}

#[test]
fn new_rejects_invalid_hyperparameters() {
    let config = Config::new(2, -1.0, 0.1);
    assert!(matches!(WarpLda::new(config), Err(LdaError::InvalidHyperparameter(_))));
}
