//! Benchmark for the iLQR solver
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra as na;
use planar_ilqr::plant::{PlanarQuadrotor, State};
use planar_ilqr::solver::{IlqrConfigBuilder, IlqrSolver};

fn make_solver() -> IlqrSolver {
    let config = IlqrConfigBuilder::default()
        .horizon(50)
        .timestep(0.02)
        .input_weight(na::Matrix2::identity() * 0.01)
        .terminal_weight(na::Matrix6::identity() * 1000.0)
        .goal_state(na::vector![0.5, 0.3, 0.0, 0.0, 0.0, 0.0])
        .build()
        .unwrap();
    IlqrSolver::new(PlanarQuadrotor::default(), config)
}

/// One backward pass dominates an outer iteration: it recomputes the discrete
/// linearization (an 8×8 matrix exponential) at every timestep.
fn bench_backward_pass(c: &mut Criterion) {
    let solver = make_solver();
    let inputs = vec![solver.plant().hover_input(); 49];
    let states = solver.rollout(&State::zeros(), &inputs);

    c.bench_function("backward pass, N = 50", |b| {
        b.iter(|| {
            let policy = solver
                .backward_pass(black_box(&states), black_box(&inputs))
                .unwrap();
            black_box(policy);
        });
    });
}

fn bench_full_solve(c: &mut Criterion) {
    let solver = make_solver();
    let guess = vec![solver.plant().hover_input(); 49];
    let x0 = State::zeros();

    c.bench_function("hover-to-goal solve, N = 50", |b| {
        b.iter(|| {
            let solution = solver.solve(black_box(&x0), black_box(&guess)).unwrap();
            black_box(solution.cost);
        });
    });
}

criterion_group!(benches, bench_backward_pass, bench_full_solve);
criterion_main!(benches);
