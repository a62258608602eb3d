use pianoroll_vae::config::TrainConfig;
use pianoroll_vae::data::Dataset;
use pianoroll_vae::layers::Activation;
use pianoroll_vae::logging::Logger;
use pianoroll_vae::math::Matrix;
use pianoroll_vae::models::FEATURE_DIM;
use pianoroll_vae::sweep::{grid_search, run_sweep, SearchSpace};
use pianoroll_vae::VaeError;

fn space(min_dims: Vec<usize>, cutoffs: Vec<usize>) -> SearchSpace {
    SearchSpace {
        latent_dims: vec![20],
        min_dims,
        cutoffs,
        activation: Activation::Relu,
    }
}

#[test]
fn lowest_loss_wins() {
    let space = space(vec![64], vec![1, 2]);
    let outcome = grid_search(
        &space,
        |t| Ok(if t.cutoff == 1 { 0.42 } else { 0.38 }),
        None,
    )
    .unwrap();
    assert_eq!(
        outcome.best_label.as_deref(),
        Some("64 x 128 CUTOFF: 2 LATENT DIM: 20")
    );
    assert_eq!(outcome.best_loss, 0.38);
    assert_eq!(outcome.trials, 2);
}

#[test]
fn trials_run_latent_then_width_then_cutoff() {
    let mut space = space(vec![64, 128], vec![1, 2]);
    space.latent_dims = vec![4, 8];
    let mut seen = Vec::new();
    grid_search(
        &space,
        |t| {
            seen.push((t.index, t.latent_dim, t.min_dim, t.cutoff));
            assert_eq!(t.arch.encoder_dims, vec![t.min_dim, t.min_dim * 2]);
            assert_eq!(t.arch.decoder_dims, vec![t.min_dim * 2, t.min_dim]);
            assert_eq!(t.arch.latent_dim, t.latent_dim);
            Ok(1.0)
        },
        None,
    )
    .unwrap();
    assert_eq!(
        seen,
        vec![
            (0, 4, 64, 1),
            (1, 4, 64, 2),
            (2, 4, 128, 1),
            (3, 4, 128, 2),
            (4, 8, 64, 1),
            (5, 8, 64, 2),
            (6, 8, 128, 1),
            (7, 8, 128, 2),
        ]
    );
}

#[test]
fn ties_keep_the_first_trial() {
    let space = space(vec![64, 128], vec![1]);
    let outcome = grid_search(&space, |_| Ok(0.5), None).unwrap();
    assert_eq!(outcome.best_trial.map(|t| t.min_dim), Some(64));
}

#[test]
fn nan_losses_never_win() {
    let space = space(vec![64, 128], vec![1]);
    let outcome = grid_search(
        &space,
        |t| Ok(if t.min_dim == 64 { f32::NAN } else { 3.0 }),
        None,
    )
    .unwrap();
    assert_eq!(outcome.best_trial.map(|t| t.min_dim), Some(128));

    let all_nan = grid_search(&space, |_| Ok(f32::NAN), None).unwrap();
    assert!(all_nan.best_label.is_none());
    assert!(all_nan.best_loss.is_infinite());
}

#[test]
fn trial_errors_abort_the_sweep() {
    let space = space(vec![64, 128], vec![1]);
    let res = grid_search(
        &space,
        |_| Err(VaeError::Config("boom".into())),
        None,
    );
    assert!(res.is_err());
}

#[test]
fn every_trial_and_the_best_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = Logger::new(
        Some(dir.path().to_string_lossy().into_owned()),
        Some("sweep".into()),
    )
    .unwrap();
    let space = space(vec![64], vec![1, 2, 4]);
    grid_search(&space, |t| Ok(1.0 / t.cutoff as f32), Some(&mut logger)).unwrap();

    let jsonl = std::fs::read_to_string(logger.dir().join("metrics.jsonl")).unwrap();
    let lines: Vec<&str> = jsonl.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[3].contains("\"kind\":\"best\""));
    assert!(lines[3].contains("CUTOFF: 4"));
}

fn piano_rolls(rows: usize, offset: usize) -> Matrix {
    let data = (0..rows * FEATURE_DIM)
        .map(|i| if (i + offset) % 7 == 0 { 1.0 } else { 0.0 })
        .collect();
    Matrix::from_vec(rows, FEATURE_DIM, data)
}

#[test]
fn sweep_log_holds_only_sweep_records() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().to_string_lossy().into_owned();
    let train: Vec<Matrix> = (0..6).map(|i| piano_rolls(4, i)).collect();
    let data = Dataset::from_parts(&train, piano_rolls(4, 6)).unwrap();
    let base = TrainConfig {
        epochs: 2,
        batch_size: 4,
        diagrams: false,
        output_dir: dir.path().to_path_buf(),
        log_dir: Some(log_dir.clone()),
        experiment: Some("sweep".into()),
        ..TrainConfig::default()
    };
    let mut logger = Logger::new(Some(log_dir), Some("sweep".into())).unwrap();
    let mut space = space(vec![2], vec![1, 2]);
    space.latent_dims = vec![2];

    let outcome = run_sweep(&data, &base, &space, Some(&mut logger)).unwrap();
    assert_eq!(outcome.trials, 2);

    let csv = std::fs::read_to_string(logger.dir().join("metrics.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.split(',').count() == 7));
}
