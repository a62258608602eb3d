use pianoroll_vae::anneal::KlAnnealing;
use pianoroll_vae::loss::{kl_divergence, reconstruction_loss, vae_loss};
use pianoroll_vae::math::Matrix;
use pianoroll_vae::VaeError;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn loss_matches_closed_form() {
    let x = Matrix::from_vec(1, 2, vec![1.0, 0.0]);
    let recon = Matrix::from_vec(1, 2, vec![0.5, 0.5]);
    let mean = Matrix::from_vec(1, 2, vec![1.0, 0.0]);
    let log_var = Matrix::zeros(1, 2);

    let out = vae_loss(&x, &recon, &mean, &log_var, 1.0).unwrap();
    let bce = 2.0 * std::f32::consts::LN_2;
    assert!(approx(out.reconstruction, bce));
    // -0.5 * ((1 + 0 - 1 - 1) + (1 + 0 - 0 - 1)) = 0.5
    assert!(approx(out.kl, 0.5));
    assert!(approx(out.total, bce + 0.5));
}

#[test]
fn beta_zero_leaves_only_reconstruction() {
    let x = Matrix::from_vec(2, 3, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    let recon = Matrix::from_vec(2, 3, vec![0.9, 0.2, 0.6, 0.1, 0.3, 0.8]);
    let mean = Matrix::from_vec(2, 2, vec![0.5, -1.5, 2.0, 0.1]);
    let log_var = Matrix::from_vec(2, 2, vec![0.3, -0.7, 1.1, 0.0]);

    let out = vae_loss(&x, &recon, &mean, &log_var, 0.0).unwrap();
    let expected = reconstruction_loss(&x, &recon).iter().sum::<f32>() / 2.0;
    assert!(approx(out.total, expected));
    assert_eq!(out.kl, 0.0);
    assert!(out.grads.mean.data.iter().all(|&g| g == 0.0));
}

#[test]
fn loss_is_non_negative() {
    let x = Matrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]);
    let recon = Matrix::from_vec(2, 2, vec![0.999, 0.001, 0.001, 0.999]);
    let mean = Matrix::from_vec(2, 1, vec![3.0, -2.0]);
    let log_var = Matrix::from_vec(2, 1, vec![-4.0, 2.5]);
    for beta in [0.0, 0.25, 1.0] {
        let out = vae_loss(&x, &recon, &mean, &log_var, beta).unwrap();
        assert!(out.total >= 0.0);
        assert!(out.reconstruction >= 0.0);
        assert!(out.kl >= 0.0);
    }
    assert!(kl_divergence(&mean, &log_var).iter().all(|&k| k >= 0.0));
}

#[test]
fn saturated_predictions_stay_finite() {
    let x = Matrix::from_vec(1, 2, vec![1.0, 0.0]);
    let recon = Matrix::from_vec(1, 2, vec![0.0, 1.0]);
    let z = Matrix::zeros(1, 1);
    let out = vae_loss(&x, &recon, &z, &z, 1.0).unwrap();
    assert!(out.total.is_finite());
    assert!(out.total > 20.0);
}

#[test]
fn shape_mismatch_is_an_error() {
    let x = Matrix::zeros(2, 3);
    let recon = Matrix::zeros(2, 4);
    let z = Matrix::zeros(2, 1);
    assert!(matches!(
        vae_loss(&x, &recon, &z, &z, 1.0),
        Err(VaeError::Shape { .. })
    ));
}

#[test]
fn beta_ramps_linearly_then_holds() {
    let schedule = KlAnnealing::new(4);
    let betas: Vec<f32> = (0..7).map(|e| schedule.beta_at(e)).collect();
    assert_eq!(betas, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0]);
    assert_eq!(schedule.patience(), 800);
    assert_eq!(KlAnnealing::new(1).beta_at(0), 0.0);
    assert_eq!(KlAnnealing::new(1).beta_at(1), 1.0);
}
