// benches/soft_body_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use hexvault_scene::engine_lib::config::{SceneConfig, ThemePreset};
use hexvault_scene::engine_lib::scene_logic::SceneState;
use hexvault_scene::engine_lib::soft_body::{self, StepContext};

const POPULATIONS: [usize; 3] = [13, 60, 240];

fn scene_with(blobs: usize) -> SceneState {
    let config = SceneConfig {
        theme: ThemePreset::Cinematic,
        blob_count: Some(blobs),
        seed: Some(0xB10B),
        ..Default::default()
    };
    SceneState::new(&config)
}

fn soft_body_benchmark_fn(c: &mut Criterion) {
    let mut group = c.benchmark_group("SoftBodyStep");
    // Collision resolution is pairwise; 240 shows where that stops fitting a frame.
    for &count in POPULATIONS.iter() {
        let mut state = scene_with(count);
        let mut rng = StdRng::seed_from_u64(7);
        let mut time = 0.0f32;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                time += 1.0 / 60.0;
                let ctx = StepContext {
                    volume: &state.theme.volume,
                    faces: &state.faces,
                    controls: &state.controls,
                    time,
                    dt: 1.0 / 60.0,
                };
                soft_body::step(black_box(&mut state.blobs), &ctx, &mut rng);
            });
        });
    }
    group.finish();

    let mut frames = c.benchmark_group("AdvanceFrame");
    for &count in POPULATIONS.iter() {
        let mut state = scene_with(count);
        frames.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| state.advance_frame(black_box(1.0 / 60.0)));
        });
    }
    frames.finish();
}

criterion_group!(benches, soft_body_benchmark_fn);
criterion_main!(benches);
