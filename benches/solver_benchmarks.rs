//! Benchmarks for the Omega solver.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use omega_solver::prelude::*;

/// Benchmark a small feasible system with an equality.
fn bench_solve_diophantine(c: &mut Criterion) {
    c.bench_function("solve_diophantine", |b| {
        b.iter(|| {
            let mut solver = OmegaSolver::new();
            let mut pb = Problem::new(2, 0).unwrap();
            pb.init_variables();
            pb.add_equality(black_box(&[-7, 2, 3]), Color::Black).unwrap();
            pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
            pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
            solver.solve_problem(&mut pb, Goal::Unknown, None).unwrap()
        })
    });
}

/// Benchmark the dark-shadow/splintering path on the classic
/// infeasible system.
fn bench_solve_dark_shadow(c: &mut Criterion) {
    c.bench_function("solve_dark_shadow", |b| {
        b.iter(|| {
            let mut solver = OmegaSolver::new();
            let mut pb = Problem::new(2, 0).unwrap();
            pb.init_variables();
            pb.add_inequality(black_box(&[-27, 11, 13]), Color::Black)
                .unwrap();
            pb.add_inequality(&[45, -11, -13], Color::Black).unwrap();
            pb.add_inequality(&[10, 7, -9], Color::Black).unwrap();
            pb.add_inequality(&[4, -7, 9], Color::Black).unwrap();
            solver.solve_problem(&mut pb, Goal::Unknown, None).unwrap()
        })
    });
}

/// Benchmark simplification of a loop-nest style system: a protected
/// distance variable coupled to eliminated iteration variables.
fn bench_simplify_dependence(c: &mut Criterion) {
    c.bench_function("simplify_dependence", |b| {
        b.iter(|| {
            let mut solver = OmegaSolver::new();
            let mut pb = Problem::new(3, 1).unwrap();
            pb.init_variables();
            pb.add_equality(&[0, 1, 1, -1], Color::Black).unwrap();
            pb.add_inequality(&[0, 0, 1, 0], Color::Black).unwrap();
            pb.add_inequality(&[100, 0, -1, 0], Color::Black).unwrap();
            pb.add_inequality(&[0, 0, 0, 1], Color::Black).unwrap();
            pb.add_inequality(&[100, 0, 0, -1], Color::Black).unwrap();
            solver.simplify_problem(black_box(&mut pb)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_solve_diophantine,
    bench_solve_dark_shadow,
    bench_simplify_dependence
);
criterion_main!(benches);
