//! Hover-to-goal trajectory optimization demo for the planar quadrotor.
//! Writes the optimized trajectory to output/ilqr_trajectory.csv.
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

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;

use nalgebra as na;
use planar_ilqr::plant::PlanarQuadrotor;
use planar_ilqr::solver::{IlqrConfigBuilder, IlqrSolution, IlqrSolver};

const HORIZON: usize = 50;
const TIMESTEP: f64 = 0.02;
const GOAL_STATE: na::Vector6<f64> = na::vector![1.0, 0.5, 0.0, 0.0, 0.0, 0.0];

fn make_solver() -> IlqrSolver {
    let config = IlqrConfigBuilder::default()
        .horizon(HORIZON)
        .timestep(TIMESTEP)
        .state_weight(na::Matrix6::identity())
        .input_weight(na::Matrix2::identity() * 0.01)
        .terminal_weight(na::Matrix6::identity() * 1000.0)
        .goal_state(GOAL_STATE)
        .build()
        .expect("Incorrect constant in demo: solver config. Notify developer.");
    IlqrSolver::new(PlanarQuadrotor::default(), config)
}

fn write_results(solver: &IlqrSolver, solution: &IlqrSolution) {
    let output_filename = Path::new("output/ilqr_trajectory.csv");
    println!("Writing results to {}", output_filename.display());
    if let Some(parent) = output_filename.parent() {
        create_dir_all(parent).expect("Incorrect directory structure in demo. Notify developer.");
    }
    let mut file = File::create(output_filename).expect("Failed to create file");
    writeln!(file, "time,x,y,theta,vx,vy,omega,u1,u2").expect("Failed to write header");

    let dt = solver.config().timestep();
    for (k, x) in solution.states.iter().enumerate() {
        // The input trajectory is one entry shorter; pad the final row
        let u = solution
            .inputs
            .get(k)
            .copied()
            .unwrap_or_else(|| na::vector![f64::NAN, f64::NAN]);
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            k as f64 * dt,
            x[0],
            x[1],
            x[2],
            x[3],
            x[4],
            x[5],
            u[0],
            u[1]
        )
        .expect("Failed to write to file");
    }
}

fn main() {
    let solver = make_solver();
    let guess = vec![solver.plant().hover_input(); HORIZON - 1];

    let solution = solver
        .solve(&na::Vector6::zeros(), &guess)
        .expect("Solve faulted");

    for (i, cost) in solution.cost_history.iter().enumerate() {
        println!("iteration {i}: cost {cost}");
    }
    println!(
        "{:?} after {} iterations, final cost {}",
        solution.status, solution.iterations, solution.cost
    );
    let final_state = solution.states[HORIZON - 1];
    println!("final state: {final_state}, goal: {GOAL_STATE}");

    write_results(&solver, &solution);
}
