#![warn(missing_docs)]

//! # Planar Quadrotor iLQR Library
//!
//! This library provides an iterative Linear-Quadratic Regulator (iLQR)
//! trajectory optimizer for a planar quadrotor in Rust.
//!
//! Starting from an initial state and an input-sequence guess, the solver
//! linearizes the nonlinear dynamics about the current nominal trajectory,
//! propagates a quadratic approximation of the optimal cost-to-go backward in
//! time to obtain per-timestep feedback gains and feedforward corrections,
//! rolls the corrected trajectory forward through the true nonlinear
//! dynamics, and repeats until the total cost settles.
//!
//! ## Features
//!
//! - Fully validated solver configuration:
//!   - Horizon, timestep, tolerance, iteration budget and step scale checked
//!     on every mutation.
//!   - Symmetry and definiteness checks on the cost weights, so the backward
//!     recursion starts from a well-posed problem.
//!
//! - Monotone descent:
//!   - A backtracking line search on the feedforward scale accepts only
//!     cost-decreasing steps, so the recorded cost history never increases.
//!
//! - Explicit convergence semantics:
//!   - Soft non-convergence (budget exhausted, cost diverged) still returns
//!     the best trajectory found, tagged with a status for the caller to
//!     check.
//!   - Numerical faults in the backward recursion surface as errors carrying
//!     the timestep, iteration index and last finite cost.
//!
//! - Consistency by construction:
//!   - One immutable plant-parameter struct drives both the forward
//!     simulation and the linearization, so the two can never drift apart.
//!   - The hover equilibrium input is derived from the plant, not supplied
//!     externally.
//!
//! ## Usage
//!
//! ```rust
//! use nalgebra as na;
//! use planar_ilqr::plant::PlanarQuadrotor;
//! use planar_ilqr::solver::{IlqrConfigBuilder, IlqrSolver};
//!
//! let config = IlqrConfigBuilder::default()
//!     .horizon(50)
//!     .timestep(0.02)
//!     .terminal_weight(na::Matrix6::identity() * 100.0)
//!     .goal_state(na::vector![0.5, 0.3, 0.0, 0.0, 0.0, 0.0])
//!     .build()
//!     .expect("Invalid iLQR config");
//!
//! let plant = PlanarQuadrotor::default();
//! let solver = IlqrSolver::new(plant, config);
//!
//! // Hover in place as the initial guess; the solver bends it toward the goal
//! let guess = vec![plant.hover_input(); 49];
//! let solution = solver
//!     .solve(&na::Vector6::zeros(), &guess)
//!     .expect("Solve failed");
//!
//! assert_eq!(solution.states.len(), 50);
//! assert_eq!(solution.inputs.len(), 49);
//! // Soft non-convergence is not an error; check the status explicitly
//! println!(
//!     "converged: {} after {} iterations, cost {}",
//!     solution.is_converged(),
//!     solution.iterations,
//!     solution.cost
//! );
//! ```
//!
//! The returned [`solver::Policy`] holds the gains from the last backward
//! pass and remains useful as a local feedback policy around the converged
//! trajectory.
//!
//! ## License
//!

/// The planar quadrotor plant: parameters, nonlinear dynamics, forward
/// simulation and linearization.
pub mod plant;

/// The quadratic running/terminal cost model and its derivatives.
pub mod cost;

/// The iLQR solver: configuration, backward/forward passes and the iteration
/// loop.
pub mod solver;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
