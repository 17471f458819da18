//! # Scene Benchmark
//!
//! Frame-pass throughput over a populated scene, and hit-testing over a
//! dense grid of interactables.
//!
//! Run with: `cargo bench --package kestrel_ui`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_shared::{Vec2, Vec3};
use kestrel_ui::{
    AnimationSpec, Easing, FlowDirection, Handlers, InputRouter, NodeSettings, RectArea,
    ReplayPolicy, SceneGraph,
};

/// Grid side for the hit-test benchmark.
const GRID: usize = 64;

/// Rows of looping sprites inside flow containers.
fn animated_scene(count: usize) -> SceneGraph {
    let mut scene = SceneGraph::new();
    let rows = (count / 100).max(1);
    for _ in 0..rows {
        let row = scene
            .create_child(
                None,
                &NodeSettings::container(FlowDirection::LeftToRight, 2.0),
            )
            .expect("row");
        for i in 0..100 {
            let spec = AnimationSpec::move_to(Vec3::new(0.0, 10.0, 0.0), 0.5 + i as f32 * 0.01)
                .with_easing(Easing::SineInOut)
                .with_replay(ReplayPolicy::PingPongForever);
            scene
                .create_child(
                    Some(row),
                    &NodeSettings::sprite("cell")
                        .with_size(Vec2::new(8.0, 8.0))
                        .with_animation(spec),
                )
                .expect("cell");
        }
    }
    scene
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_tick");
    for count in [1_000, 10_000] {
        let mut scene = animated_scene(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                scene.tick(black_box(1.0 / 60.0)).expect("tick");
                scene.late_tick(1.0 / 60.0).expect("late tick");
            });
        });
    }
    group.finish();
}

fn bench_draw_order(c: &mut Criterion) {
    let scene = animated_scene(10_000);
    c.bench_function("draw_order_10k", |b| {
        b.iter(|| black_box(scene.draw_order()));
    });
}

fn bench_hit_test(c: &mut Criterion) {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    for y in 0..GRID {
        for x in 0..GRID {
            let node = scene
                .create_child(
                    None,
                    &NodeSettings::clickable()
                        .with_position(Vec3::new(x as f32 * 10.0, y as f32 * 10.0, 0.0))
                        .with_size(Vec2::new(12.0, 12.0))
                        .with_rotation((x * y % 45) as f32),
                )
                .expect("button");
            router
                .register(&mut scene, node, RectArea::new(), Handlers::new())
                .expect("register");
        }
    }

    c.bench_function("hit_test_4096", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 97) % (GRID * GRID);
            let p = Vec2::new((i % GRID) as f32 * 10.0, (i / GRID) as f32 * 10.0);
            black_box(router.hit_test(&scene, p))
        });
    });
}

criterion_group!(benches, bench_tick, bench_draw_order, bench_hit_test);
criterion_main!(benches);
