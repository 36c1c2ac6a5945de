use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lottie_core::AnimatableValue;
use lottie_data::model::{Keyframe, Property};

fn ramp(count: usize) -> AnimatableValue<f32> {
    let keyframes = (0..count)
        .map(|i| Keyframe {
            e: Some((i + 1) as f32),
            ..Keyframe::at(i as f32, i as f32)
        })
        .collect();
    AnimatableValue::from_property(&Property::animated(keyframes), |v: &f32| *v, 0.0)
}

fn bench_keyframe_evaluation(c: &mut Criterion) {
    let value = ramp(10_000);

    let mut group = c.benchmark_group("AnimatableValue::value_at");
    for &frame in &[100.0, 5000.0, 9990.0] {
        group.bench_with_input(BenchmarkId::new("seek", frame), &frame, |b, &f| {
            b.iter(|| value.value_at(f))
        });
    }
    group.finish();

    // Monotonic playback only scans forward from the last segment.
    c.bench_function("KeyframeEvaluator::evaluate/playback", |b| {
        b.iter(|| {
            let mut evaluator = value.evaluator();
            let mut sum = 0.0;
            for frame in 0..1_000 {
                if let Ok(v) = evaluator.evaluate(frame as f32 * 0.5) {
                    sum += *v;
                }
            }
            sum
        })
    });
}

criterion_group!(benches, bench_keyframe_evaluation);
criterion_main!(benches);
