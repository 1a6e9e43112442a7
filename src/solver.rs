use nalgebra as na;
use thiserror::Error;

use crate::cost::QuadraticCost;
use crate::plant::{FeedbackGain, Input, PlanarQuadrotor, State};

/// Error conditions arising from validating the solver configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum IlqrConfigError {
    /// The horizon must cover at least an initial and a final state.
    #[error("horizon must be at least 2")]
    InvalidHorizon,
    /// The timestep must be positive and finite.
    #[error("timestep must be positive and finite")]
    InvalidTimestep,
    /// Q must be symmetric positive-semidefinite with finite entries.
    #[error("state weight must be symmetric positive-semidefinite")]
    InvalidStateWeight,
    /// R must be symmetric positive-definite with finite entries.
    #[error("input weight must be symmetric positive-definite")]
    InvalidInputWeight,
    /// Qf must be symmetric positive-semidefinite with finite entries.
    #[error("terminal weight must be symmetric positive-semidefinite")]
    InvalidTerminalWeight,
    /// The goal state must have finite entries.
    #[error("goal state must be finite")]
    InvalidGoalState,
    /// The convergence tolerance must be positive and finite.
    #[error("convergence tolerance must be positive and finite")]
    InvalidTolerance,
    /// At least one outer iteration must be allowed.
    #[error("iteration budget must be at least 1")]
    InvalidIterationBudget,
    /// The forward-pass step scale must lie in (0, 1].
    #[error("step scale must lie in (0, 1]")]
    InvalidStepScale,
}

const SYMMETRY_TOLERANCE: f64 = 1e-9;
const EIGENVALUE_TOLERANCE: f64 = -1e-9;

/// Number of times the forward-pass step scale is halved before the line
/// search concludes no improving step exists.
const MAX_BACKTRACKS: usize = 16;

fn is_symmetric_psd(m: &na::Matrix6<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
        && (m - m.transpose()).amax() <= SYMMETRY_TOLERANCE
        && m.symmetric_eigenvalues().min() >= EIGENVALUE_TOLERANCE
}

fn is_symmetric_pd(m: &na::Matrix2<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
        && (m - m.transpose()).amax() <= SYMMETRY_TOLERANCE
        && na::Cholesky::new(*m).is_some()
}

/// Validated configuration of the iLQR solver: horizon, timestep, cost
/// weights, goal state and the iteration/stopping parameters.
///
/// All fields are validated on mutation, so a constructed config is always
/// usable. The cost weights are immutable for the lifetime of a solve; the
/// solver reads the configuration once per `solve` call.
#[derive(Copy, Clone, Debug)]
pub struct IlqrConfig {
    /// Number of states in the trajectory; the input trajectory is one
    /// shorter. Defaults to 50.
    horizon: usize,

    /// Discretization timestep in seconds.
    /// Defaults to 0.02.
    timestep: f64,

    /// Running cost weight on state deviation (Q), symmetric PSD.
    /// Defaults to identity.
    state_weight: na::Matrix6<f64>,

    /// Running cost weight on input deviation (R), symmetric PD.
    /// Defaults to identity.
    input_weight: na::Matrix2<f64>,

    /// Terminal cost weight on state deviation (Qf), symmetric PSD.
    /// Defaults to identity.
    terminal_weight: na::Matrix6<f64>,

    /// Target state the trajectory is steered toward.
    /// Defaults to the origin (level hover at rest).
    goal_state: State,

    /// Stop once the absolute change in total cost between successive outer
    /// iterations falls below this value. Defaults to 1e-4.
    tolerance: f64,

    /// Upper bound on outer iterations. Defaults to 1000.
    max_iterations: usize,

    /// Initial scale α applied to the feedforward correction in the forward
    /// pass. The solver halves α whenever a step fails to decrease the total
    /// cost. Defaults to 1.0 (start from the full step).
    step_scale: f64,
}

impl Default for IlqrConfig {
    fn default() -> Self {
        IlqrConfig {
            horizon: 50,
            timestep: 0.02,
            state_weight: na::Matrix6::identity(),
            input_weight: na::Matrix2::identity(),
            terminal_weight: na::Matrix6::identity(),
            goal_state: State::zeros(),
            tolerance: 1e-4,
            max_iterations: 1000,
            step_scale: 1.0,
        }
    }
}

impl IlqrConfig {
    /// Returns the trajectory horizon N.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Returns the discretization timestep.
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Returns the running cost weight on state deviation.
    pub fn state_weight(&self) -> na::Matrix6<f64> {
        self.state_weight
    }

    /// Returns the running cost weight on input deviation.
    pub fn input_weight(&self) -> na::Matrix2<f64> {
        self.input_weight
    }

    /// Returns the terminal cost weight on state deviation.
    pub fn terminal_weight(&self) -> na::Matrix6<f64> {
        self.terminal_weight
    }

    /// Returns the goal state.
    pub fn goal_state(&self) -> State {
        self.goal_state
    }

    /// Returns the convergence tolerance on the change in total cost.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the outer-iteration budget.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the initial forward-pass feedforward step scale α.
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    /// Sets the trajectory horizon N.
    ///
    /// # Returns
    /// - `Ok(())` if the horizon was set successfully.
    /// - `Err(IlqrConfigError::InvalidHorizon)` if the horizon is below 2.
    pub fn set_horizon(&mut self, horizon: usize) -> Result<(), IlqrConfigError> {
        if horizon < 2 {
            return Err(IlqrConfigError::InvalidHorizon);
        }
        self.horizon = horizon;
        Ok(())
    }

    /// Sets the discretization timestep.
    ///
    /// # Returns
    /// - `Ok(())` if the timestep was set successfully.
    /// - `Err(IlqrConfigError::InvalidTimestep)` if the timestep is
    ///   non-positive or non-finite.
    pub fn set_timestep(&mut self, timestep: f64) -> Result<(), IlqrConfigError> {
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(IlqrConfigError::InvalidTimestep);
        }
        self.timestep = timestep;
        Ok(())
    }

    /// Sets the running cost weight on state deviation (Q).
    ///
    /// # Returns
    /// - `Ok(())` if the weight was set successfully.
    /// - `Err(IlqrConfigError::InvalidStateWeight)` if the matrix is not
    ///   symmetric positive-semidefinite with finite entries.
    pub fn set_state_weight(&mut self, weight: na::Matrix6<f64>) -> Result<(), IlqrConfigError> {
        if !is_symmetric_psd(&weight) {
            return Err(IlqrConfigError::InvalidStateWeight);
        }
        self.state_weight = weight;
        Ok(())
    }

    /// Sets the running cost weight on input deviation (R).
    ///
    /// Positive-definiteness of R is what keeps the backward recursion's Quu
    /// invertible, so it is checked strictly here.
    ///
    /// # Returns
    /// - `Ok(())` if the weight was set successfully.
    /// - `Err(IlqrConfigError::InvalidInputWeight)` if the matrix is not
    ///   symmetric positive-definite with finite entries.
    pub fn set_input_weight(&mut self, weight: na::Matrix2<f64>) -> Result<(), IlqrConfigError> {
        if !is_symmetric_pd(&weight) {
            return Err(IlqrConfigError::InvalidInputWeight);
        }
        self.input_weight = weight;
        Ok(())
    }

    /// Sets the terminal cost weight on state deviation (Qf).
    ///
    /// # Returns
    /// - `Ok(())` if the weight was set successfully.
    /// - `Err(IlqrConfigError::InvalidTerminalWeight)` if the matrix is not
    ///   symmetric positive-semidefinite with finite entries.
    pub fn set_terminal_weight(&mut self, weight: na::Matrix6<f64>) -> Result<(), IlqrConfigError> {
        if !is_symmetric_psd(&weight) {
            return Err(IlqrConfigError::InvalidTerminalWeight);
        }
        self.terminal_weight = weight;
        Ok(())
    }

    /// Sets the goal state.
    ///
    /// # Returns
    /// - `Ok(())` if the goal was set successfully.
    /// - `Err(IlqrConfigError::InvalidGoalState)` if any entry is non-finite.
    pub fn set_goal_state(&mut self, goal: State) -> Result<(), IlqrConfigError> {
        if !goal.iter().all(|v| v.is_finite()) {
            return Err(IlqrConfigError::InvalidGoalState);
        }
        self.goal_state = goal;
        Ok(())
    }

    /// Sets the convergence tolerance on the change in total cost.
    ///
    /// # Returns
    /// - `Ok(())` if the tolerance was set successfully.
    /// - `Err(IlqrConfigError::InvalidTolerance)` if the tolerance is
    ///   non-positive or non-finite.
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<(), IlqrConfigError> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(IlqrConfigError::InvalidTolerance);
        }
        self.tolerance = tolerance;
        Ok(())
    }

    /// Sets the outer-iteration budget.
    ///
    /// # Returns
    /// - `Ok(())` if the budget was set successfully.
    /// - `Err(IlqrConfigError::InvalidIterationBudget)` if the budget is zero.
    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<(), IlqrConfigError> {
        if max_iterations == 0 {
            return Err(IlqrConfigError::InvalidIterationBudget);
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Sets the initial forward-pass feedforward step scale α. The line
    /// search in [`IlqrSolver::solve`] backtracks from this value.
    ///
    /// # Returns
    /// - `Ok(())` if the scale was set successfully.
    /// - `Err(IlqrConfigError::InvalidStepScale)` if the scale is outside
    ///   (0, 1] or non-finite.
    pub fn set_step_scale(&mut self, step_scale: f64) -> Result<(), IlqrConfigError> {
        if !step_scale.is_finite() || step_scale <= 0.0 || step_scale > 1.0 {
            return Err(IlqrConfigError::InvalidStepScale);
        }
        self.step_scale = step_scale;
        Ok(())
    }
}

/// Builder for [`IlqrConfig`]. Every field defaults to the corresponding
/// [`IlqrConfig::default`] value; `build` runs the full validation.
#[derive(Copy, Clone, Debug)]
pub struct IlqrConfigBuilder {
    horizon: usize,
    timestep: f64,
    state_weight: na::Matrix6<f64>,
    input_weight: na::Matrix2<f64>,
    terminal_weight: na::Matrix6<f64>,
    goal_state: State,
    tolerance: f64,
    max_iterations: usize,
    step_scale: f64,
}

impl Default for IlqrConfigBuilder {
    fn default() -> Self {
        let config = IlqrConfig::default();
        IlqrConfigBuilder {
            horizon: config.horizon,
            timestep: config.timestep,
            state_weight: config.state_weight,
            input_weight: config.input_weight,
            terminal_weight: config.terminal_weight,
            goal_state: config.goal_state,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            step_scale: config.step_scale,
        }
    }
}

impl IlqrConfigBuilder {
    /// Sets the trajectory horizon N.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the discretization timestep.
    pub fn timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Sets the running cost weight on state deviation (Q).
    pub fn state_weight(mut self, weight: na::Matrix6<f64>) -> Self {
        self.state_weight = weight;
        self
    }

    /// Sets the running cost weight on input deviation (R).
    pub fn input_weight(mut self, weight: na::Matrix2<f64>) -> Self {
        self.input_weight = weight;
        self
    }

    /// Sets the terminal cost weight on state deviation (Qf).
    pub fn terminal_weight(mut self, weight: na::Matrix6<f64>) -> Self {
        self.terminal_weight = weight;
        self
    }

    /// Sets the goal state.
    pub fn goal_state(mut self, goal: State) -> Self {
        self.goal_state = goal;
        self
    }

    /// Sets the convergence tolerance on the change in total cost.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the outer-iteration budget.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the initial forward-pass feedforward step scale α.
    pub fn step_scale(mut self, step_scale: f64) -> Self {
        self.step_scale = step_scale;
        self
    }

    /// Validates the accumulated settings and produces a config.
    pub fn build(self) -> Result<IlqrConfig, IlqrConfigError> {
        let mut config = IlqrConfig::default();
        config.set_horizon(self.horizon)?;
        config.set_timestep(self.timestep)?;
        config.set_state_weight(self.state_weight)?;
        config.set_input_weight(self.input_weight)?;
        config.set_terminal_weight(self.terminal_weight)?;
        config.set_goal_state(self.goal_state)?;
        config.set_tolerance(self.tolerance)?;
        config.set_max_iterations(self.max_iterations)?;
        config.set_step_scale(self.step_scale)?;
        Ok(config)
    }
}

/// A numerical fault inside the backward recursion. The pass cannot proceed
/// meaningfully past such a fault, so it aborts instead of silently
/// continuing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum NumericalFault {
    /// Quu lost positive-definiteness, so no gain can be computed.
    #[error("Quu is not positive definite at timestep {timestep}")]
    IndefiniteQuu {
        /// Timestep at which the Cholesky factorization of Quu failed.
        timestep: usize,
    },
    /// Non-finite values entered the recursion.
    #[error("non-finite value in the backward recursion at timestep {timestep}")]
    NonFinite {
        /// Timestep at which a non-finite gain or correction appeared.
        timestep: usize,
    },
}

/// Error conditions arising from a solve invocation.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum IlqrError {
    /// The input guess does not match the configured horizon.
    #[error("input guess has length {got} but a horizon of {horizon} requires {expected}")]
    GuessLengthMismatch {
        /// Configured horizon N.
        horizon: usize,
        /// Required guess length, N − 1.
        expected: usize,
        /// Actual guess length.
        got: usize,
    },
    /// Simulating the initial guess already produced a non-finite cost, so
    /// there is no trajectory to improve on.
    #[error("initial rollout produced a non-finite total cost")]
    NonFiniteRollout,
    /// A backward pass aborted; the enclosed fault says where, and the
    /// iteration index and last finite cost say when.
    #[error("{fault} at solver iteration {iteration} (last total cost {last_cost})")]
    Numerical {
        /// The underlying backward-pass fault.
        fault: NumericalFault,
        /// Outer iteration at which the fault occurred.
        iteration: usize,
        /// Total cost of the nominal trajectory the pass was run on.
        last_cost: f64,
    },
}

/// Outcome of the iteration loop. Only `Converged` means the cost change met
/// the tolerance; the other variants still carry a usable trajectory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// The absolute change in total cost fell below the tolerance.
    Converged,
    /// The iteration budget ran out first; the solution is the best found.
    BudgetExhausted,
    /// The total cost became non-finite mid-solve; the solution is the last
    /// trajectory produced.
    Diverged,
}

/// The local feedback policy produced by one backward pass: per-timestep
/// feedback gains K and feedforward corrections d.
///
/// A policy is only valid around the nominal trajectory that produced it and
/// must be recomputed whenever the nominal trajectory changes.
#[derive(Clone, Debug)]
pub struct Policy {
    /// Feedback gains Kₖ, one per timestep 0..N−2.
    pub feedback: Vec<FeedbackGain>,
    /// Feedforward corrections dₖ, one per timestep 0..N−2.
    pub feedforward: Vec<Input>,
}

impl Policy {
    /// An all-zero policy over `len` timesteps. Applying it in a forward pass
    /// reproduces the nominal trajectory unchanged.
    pub fn zeros(len: usize) -> Self {
        Policy {
            feedback: vec![FeedbackGain::zeros(); len],
            feedforward: vec![Input::zeros(); len],
        }
    }
}

/// Result of a solve: the final trajectory, the policy from the last backward
/// pass, and convergence diagnostics.
#[derive(Clone, Debug)]
pub struct IlqrSolution {
    /// State trajectory of length N.
    pub states: Vec<State>,
    /// Input trajectory of length N − 1.
    pub inputs: Vec<Input>,
    /// Gains and corrections from the last backward pass, usable as a local
    /// feedback policy around the returned trajectory.
    pub policy: Policy,
    /// How the iteration loop ended. Check this before trusting the
    /// trajectory; the solver does not fail on soft non-convergence.
    pub status: SolveStatus,
    /// Number of outer iterations performed.
    pub iterations: usize,
    /// Total cost of the returned trajectory.
    pub cost: f64,
    /// Total cost after the initial rollout and after each outer iteration.
    pub cost_history: Vec<f64>,
}

impl IlqrSolution {
    /// Returns true if the cost change met the convergence tolerance.
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// An iterative LQR trajectory optimizer for the planar quadrotor.
///
/// The solver alternates a backward Riccati-style recursion over a quadratic
/// approximation of the value function with a forward rollout of the true
/// nonlinear dynamics under the resulting policy, iterating until the total
/// cost settles.
///
/// `solve` takes `&self` and owns all per-solve buffers, so one solver may
/// serve concurrent solves from multiple threads.
pub struct IlqrSolver {
    plant: PlanarQuadrotor,
    config: IlqrConfig,
}

impl IlqrSolver {
    /// Creates a solver for the given plant under the given configuration.
    pub fn new(plant: PlanarQuadrotor, config: IlqrConfig) -> Self {
        IlqrSolver { plant, config }
    }

    /// Returns the plant being optimized over.
    pub fn plant(&self) -> &PlanarQuadrotor {
        &self.plant
    }

    /// Returns the solver configuration.
    pub fn config(&self) -> &IlqrConfig {
        &self.config
    }

    /// Returns the solver configuration for on-the-fly adjustment between
    /// solves.
    pub fn config_mut(&mut self) -> &mut IlqrConfig {
        &mut self.config
    }

    fn cost_model(&self) -> QuadraticCost {
        // The equilibrium input is derived from the plant's hover thrust, not
        // supplied externally, so cost and plant stay consistent.
        QuadraticCost::new(
            self.config.state_weight,
            self.config.input_weight,
            self.config.terminal_weight,
            self.config.goal_state,
            self.plant.hover_input(),
        )
    }

    /// Simulates the input sequence forward from `x0` through the nonlinear
    /// dynamics, producing a dynamically consistent state trajectory of
    /// length `inputs.len() + 1`.
    pub fn rollout(&self, x0: &State, inputs: &[Input]) -> Vec<State> {
        let dt = self.config.timestep;
        let mut states = Vec::with_capacity(inputs.len() + 1);
        states.push(*x0);
        for u in inputs {
            let next = self.plant.advance(states.last().unwrap_or(x0), u, dt);
            states.push(next);
        }
        states
    }

    /// Runs one backward pass over the nominal trajectory `(states, inputs)`,
    /// producing the feedback/feedforward policy of the associated
    /// linear-quadratic subproblem.
    ///
    /// The value-function expansion (Vx, Vxx) is seeded from the terminal
    /// cost at the final state and propagated from timestep N−2 down to 0.
    /// The discrete linearization is recomputed fresh at every timestep; it
    /// is never cached across outer iterations because the nominal trajectory
    /// changes each iteration.
    ///
    /// # Panics
    ///
    /// Panics if `states` holds fewer than two entries or `inputs` is not
    /// exactly one entry shorter than `states`.
    pub fn backward_pass(
        &self,
        states: &[State],
        inputs: &[Input],
    ) -> Result<Policy, NumericalFault> {
        assert!(
            states.len() >= 2 && inputs.len() == states.len() - 1,
            "trajectory must hold N >= 2 states and N - 1 inputs"
        );
        let cost = self.cost_model();
        let dt = self.config.timestep;
        let n = states.len();

        let mut policy = Policy::zeros(n - 1);

        let mut vx = cost.terminal_grad(&states[n - 1]);
        let mut vxx = cost.terminal_hess();

        for k in (0..n - 1).rev() {
            let (ad, bd) = self.plant.linearize_discrete(&states[k], &inputs[k], dt);

            // Second-order expansion of the action-value function about the
            // nominal (xₖ, uₖ). The cost is exactly quadratic, so the only
            // approximation here is the linearization of the dynamics.
            let qx = cost.running_grad_state(&states[k]) + ad.transpose() * vx;
            let qu = cost.running_grad_input(&inputs[k]) + bd.transpose() * vx;
            let qxx = cost.running_hess_state() + ad.transpose() * vxx * ad;
            let quu = cost.running_hess_input() + bd.transpose() * vxx * bd;
            let qux = bd.transpose() * vxx * ad;

            let chol =
                na::Cholesky::new(quu).ok_or(NumericalFault::IndefiniteQuu { timestep: k })?;
            let gain = -chol.solve(&qux);
            let correction = -chol.solve(&qu);
            if !gain.iter().all(|v| v.is_finite()) || !correction.iter().all(|v| v.is_finite()) {
                return Err(NumericalFault::NonFinite { timestep: k });
            }

            vx = qx - gain.transpose() * quu * correction;
            vxx = qxx - gain.transpose() * quu * gain;

            policy.feedback[k] = gain;
            policy.feedforward[k] = correction;
        }
        Ok(policy)
    }

    /// Rolls a corrected trajectory forward through the true nonlinear
    /// dynamics.
    ///
    /// The initial condition is fixed and never corrected. At each timestep
    /// the state deviation is measured against the *old* nominal trajectory
    /// at the same index, and the input is corrected by the feedback term
    /// plus `step_scale` times the feedforward term. The nominal trajectory
    /// is read-only input.
    ///
    /// # Panics
    ///
    /// Panics if `states` holds fewer than two entries, or `inputs` and the
    /// policy are not exactly one entry shorter than `states`.
    pub fn forward_pass(
        &self,
        states: &[State],
        inputs: &[Input],
        policy: &Policy,
        step_scale: f64,
    ) -> (Vec<State>, Vec<Input>) {
        assert!(
            states.len() >= 2
                && inputs.len() == states.len() - 1
                && policy.feedback.len() == states.len() - 1
                && policy.feedforward.len() == states.len() - 1,
            "trajectory must hold N >= 2 states and N - 1 inputs, gains and corrections"
        );
        let dt = self.config.timestep;
        let n = states.len();

        let mut new_states = Vec::with_capacity(n);
        let mut new_inputs = Vec::with_capacity(n - 1);
        new_states.push(states[0]);

        for k in 0..n - 1 {
            let delta_x = new_states[k] - states[k];
            let input =
                inputs[k] + policy.feedback[k] * delta_x + policy.feedforward[k] * step_scale;
            let next = self.plant.advance(&new_states[k], &input, dt);
            new_states.push(next);
            new_inputs.push(input);
        }
        (new_states, new_inputs)
    }

    /// Computes a locally optimal trajectory from the initial state `x0` and
    /// the input-sequence guess `guess`.
    ///
    /// The guess must have length N − 1 for the configured horizon N; a
    /// mismatch is reported immediately, before any numerical work.
    ///
    /// Each outer iteration runs one backward pass, then a backtracking line
    /// search over the feedforward scale: the forward pass starts at the
    /// configured step scale and the scale is halved until the candidate
    /// trajectory decreases the total cost. Only cost-decreasing candidates
    /// replace the nominal trajectory, so the recorded cost history is
    /// non-increasing. If no scale yields a decrease the nominal trajectory
    /// is locally optimal under the quadratic model and the solve stops.
    ///
    /// The loop stops once the absolute change in total cost between
    /// successive iterations falls below the tolerance, or the iteration
    /// budget is exhausted, or the cost diverges; the latter two are soft
    /// outcomes tagged on [`IlqrSolution::status`] rather than errors, and
    /// still return the last trajectory. Numerical faults inside the backward
    /// recursion abort the solve.
    pub fn solve(&self, x0: &State, guess: &[Input]) -> Result<IlqrSolution, IlqrError> {
        let horizon = self.config.horizon;
        if guess.len() != horizon - 1 {
            return Err(IlqrError::GuessLengthMismatch {
                horizon,
                expected: horizon - 1,
                got: guess.len(),
            });
        }

        let cost = self.cost_model();

        let mut states = self.rollout(x0, guess);
        let mut inputs = guess.to_vec();
        let mut cost_next = cost.trajectory(&states, &inputs);
        if !cost_next.is_finite() {
            return Err(IlqrError::NonFiniteRollout);
        }

        let mut cost_history = vec![cost_next];
        let mut policy = Policy::zeros(horizon - 1);
        let mut iterations = 0;
        let mut status = SolveStatus::BudgetExhausted;

        while iterations < self.config.max_iterations {
            policy = self
                .backward_pass(&states, &inputs)
                .map_err(|fault| IlqrError::Numerical {
                    fault,
                    iteration: iterations,
                    last_cost: cost_next,
                })?;

            // Backtracking line search on the feedforward scale. The nominal
            // trajectory is left untouched until a candidate decreases the
            // total cost; a non-finite candidate cost also triggers
            // backtracking (the comparison below is false for NaN).
            let mut scale = self.config.step_scale;
            let (mut cand_states, mut cand_inputs) =
                self.forward_pass(&states, &inputs, &policy, scale);
            let mut cand_cost = cost.trajectory(&cand_states, &cand_inputs);
            let mut backtracks = 0;
            while !(cand_cost <= cost_next) && backtracks < MAX_BACKTRACKS {
                scale *= 0.5;
                (cand_states, cand_inputs) = self.forward_pass(&states, &inputs, &policy, scale);
                cand_cost = cost.trajectory(&cand_states, &cand_inputs);
                backtracks += 1;
            }
            iterations += 1;

            if !cand_cost.is_finite() {
                // Even the smallest scale blew up; return the candidate so the
                // caller can inspect where the trajectory left the finite
                // region.
                states = cand_states;
                inputs = cand_inputs;
                cost_next = cand_cost;
                cost_history.push(cand_cost);
                status = SolveStatus::Diverged;
                break;
            }
            if cand_cost > cost_next {
                // No scale improved on the nominal trajectory: it is locally
                // optimal as far as this quadratic model can tell. Keep it.
                cost_history.push(cost_next);
                status = SolveStatus::Converged;
                break;
            }

            let cost_prev = cost_next;
            states = cand_states;
            inputs = cand_inputs;
            cost_next = cand_cost;
            cost_history.push(cost_next);

            if (cost_prev - cost_next).abs() < self.config.tolerance {
                status = SolveStatus::Converged;
                break;
            }
        }

        Ok(IlqrSolution {
            states,
            inputs,
            policy,
            status,
            iterations,
            cost: cost_next,
            cost_history,
        })
    }
}
