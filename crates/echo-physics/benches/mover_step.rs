// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
// criterion_group!/criterion_main! expand to undocumented functions that cannot
// carry #[allow] (attributes on macro invocations are ignored). Crate-level
// suppress is required for benchmark binaries using Criterion.
#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
//! `Mover::step` throughput.
//!
//! # Running
//!
//! ```sh
//! cargo bench --package echo-physics --bench mover_step
//! ```
//!
//! # What This Measures
//!
//! - `step_falling_N`: N spheres dropping onto a plane in a loose grid, so
//!   most steps carry a mix of new, tracked, and resting pairs.
//! - `collide_pairs`: one-off `Mover::collide` queries per shape pair.
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use echo_physics::{Body, Mover, Shape, Vec3};
use std::{hint::black_box, time::Duration};

const DT: f64 = 1.0 / 60.0;

fn build_scene(n: usize) -> Vec<Body> {
    let mut bodies = Vec::with_capacity(n + 1);
    bodies.push(Body::new(Shape::plane(Vec3::UNIT_Y)));
    let side = (n as f64).sqrt().ceil() as usize;
    for i in 0..n {
        let (row, col) = (i / side, i % side);
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.2);
        ball.set_location(Vec3::new(
            col as f64 * 1.1,
            1.0 + (i % 3) as f64 * 0.4,
            row as f64 * 1.1,
        ));
        bodies.push(ball);
    }
    bodies
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_falling");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    for &n in &[10usize, 50, 200] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            // Build and settle for a few steps outside the timed region so
            // the measured steps see established pairs.
            b.iter_batched(
                || {
                    let mut bodies = build_scene(n);
                    let mut mover = Mover::new();
                    for _ in 0..30 {
                        mover.step(&mut bodies, DT);
                    }
                    (mover, bodies)
                },
                |(mut mover, mut bodies)| {
                    mover.step(&mut bodies, DT);
                    black_box(mover.pair_count());
                    black_box(bodies);
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_collide(c: &mut Criterion) {
    let mover = Mover::new();
    let mut sphere = Body::new(Shape::sphere(1.0));
    sphere.set_location(Vec3::new(0.0, 1.9, 0.0));
    let cube = Body::new(Shape::cuboid(1.0, 1.0, 1.0));
    let mut other = Body::new(Shape::cuboid(0.5, 0.5, 0.5));
    other.set_location(Vec3::new(0.2, 1.4, -0.1));
    let mut group = c.benchmark_group("collide_pairs");
    group.bench_function("sphere_box", |b| {
        b.iter(|| black_box(mover.collide(black_box(&sphere), black_box(&cube))));
    });
    group.bench_function("box_box", |b| {
        b.iter(|| black_box(mover.collide(black_box(&other), black_box(&cube))));
    });
    group.finish();
}

criterion_group!(benches, bench_step, bench_collide);
criterion_main!(benches);
