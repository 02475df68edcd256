//! Benchmarks for Kinesis signal extraction

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use kinesis_core::{PerformerId, Vec2};
use kinesis_signal::{
    PointerConfig, PointerSample, PointerState, PoseConfig, PoseFeatures, PoseTracker, Viewport,
};
use kinesis_test::{PerformerModel, SyntheticPerformer};

fn sample_frames(count: usize) -> Vec<kinesis_signal::PoseFrame> {
    let mut performer = SyntheticPerformer::new(PerformerId::new(0), PerformerModel::dancer(), 1);
    std::iter::from_fn(|| Some(performer.next_frame(1.0 / 30.0)))
        .flatten()
        .take(count)
        .collect()
}

fn bench_pose_features_update(c: &mut Criterion) {
    let config = PoseConfig::default();
    let frames = sample_frames(256);

    c.bench_function("pose_features_update", |b| {
        let mut features = PoseFeatures::initial(&config);
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % frames.len();
            features = PoseFeatures::update_with(&config, Some(&features), black_box(&frames[i]), 1.0 / 30.0);
            black_box(features.accent())
        })
    });
}

fn bench_pose_tracker_push(c: &mut Criterion) {
    let frames = sample_frames(256);
    let mut tracker = PoseTracker::new(PoseConfig::default());

    c.bench_function("pose_tracker_push", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % frames.len();
            tracker.push(black_box(&frames[i]), 1.0 / 30.0);
            black_box(tracker.joints()[30])
        })
    });
}

fn bench_pointer_update(c: &mut Criterion) {
    let config = PointerConfig::default();
    let viewport = Viewport::new(1920.0, 1080.0);
    let mut state = PointerState::default();

    c.bench_function("pointer_update", |b| {
        let mut x = 0.0f32;
        b.iter(|| {
            x = (x + 7.0) % 1920.0;
            let sample = PointerSample::new(x, 540.0, viewport, 1.0 / 60.0);
            state = state.apply(black_box(&sample), &config);
            black_box(state.position)
        })
    });
}

fn bench_vec2_angle(c: &mut Criterion) {
    let a = Vec2::new(0.42, 0.30);
    let b = Vec2::new(0.38, 0.42);
    let w = Vec2::new(0.36, 0.54);

    c.bench_function("three_point_angle", |bench| {
        bench.iter(|| kinesis_core::three_point_angle(black_box(a), black_box(b), black_box(w)))
    });
}

criterion_group!(
    benches,
    bench_pose_features_update,
    bench_pose_tracker_push,
    bench_pointer_update,
    bench_vec2_angle,
);
criterion_main!(benches);
