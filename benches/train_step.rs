use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pianoroll_vae::config::TrainConfig;
use pianoroll_vae::layers::Activation;
use pianoroll_vae::math::Matrix;
use pianoroll_vae::models::{VaeArchitecture, FEATURE_DIM};
use pianoroll_vae::trainer::TrainingSession;
use rand::Rng;

fn bench_train_step(c: &mut Criterion) {
    let rows = 128;
    let mut rng = rand::thread_rng();
    let data: Vec<f32> = (0..rows * FEATURE_DIM)
        .map(|_| if rng.gen::<f32>() < 0.1 { 1.0 } else { 0.0 })
        .collect();
    let batch = Matrix::from_vec(rows, FEATURE_DIM, data);

    let arch = VaeArchitecture::uniform(vec![256, 128], vec![128, 256], 20, Activation::Relu);
    let cfg = TrainConfig {
        diagrams: false,
        ..TrainConfig::default()
    };
    let mut session = match TrainingSession::new(arch, cfg) {
        Ok(s) => s,
        Err(e) => panic!("failed to build session: {e}"),
    };

    c.bench_function("vae_train_step_128x448", |b| {
        b.iter(|| {
            let loss = session.train_step(black_box(&batch));
            black_box(loss.map(|l| l.total).unwrap_or(f32::NAN));
        });
    });

    c.bench_function("vae_forward_128x448", |b| {
        let mut noise = rand::thread_rng();
        b.iter(|| {
            let out = session.vae.forward(black_box(&batch), &mut noise);
            black_box(out.recon);
        });
    });
}

criterion_group!(benches, bench_train_step);
criterion_main!(benches);
