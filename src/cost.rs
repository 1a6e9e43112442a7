use nalgebra as na;

use crate::plant::{Input, State};

/// Quadratic trajectory-tracking cost
///
///     l(x, u)  = ½(x − x_goal)ᵀ Q (x − x_goal) + ½(u − u_goal)ᵀ R (u − u_goal)
///     Lf(x)    = ½(x − x_goal)ᵀ Qf (x − x_goal)
///
/// The cost is exactly quadratic, so the Hessians are the constant weight
/// matrices and no higher-order terms exist.
#[derive(Copy, Clone, Debug)]
pub struct QuadraticCost {
    state_weight: na::Matrix6<f64>,
    input_weight: na::Matrix2<f64>,
    terminal_weight: na::Matrix6<f64>,
    goal_state: State,
    goal_input: Input,
}

impl QuadraticCost {
    /// Bundles validated weights and goals into a cost model. Validation of
    /// the weights (symmetry, definiteness) is the solver configuration's
    /// responsibility.
    pub fn new(
        state_weight: na::Matrix6<f64>,
        input_weight: na::Matrix2<f64>,
        terminal_weight: na::Matrix6<f64>,
        goal_state: State,
        goal_input: Input,
    ) -> Self {
        QuadraticCost {
            state_weight,
            input_weight,
            terminal_weight,
            goal_state,
            goal_input,
        }
    }

    /// Evaluates the running cost l(x, u) at one timestep.
    pub fn running(&self, x: &State, u: &Input) -> f64 {
        let dx = x - self.goal_state;
        let du = u - self.goal_input;
        0.5 * (dx.dot(&(self.state_weight * dx)) + du.dot(&(self.input_weight * du)))
    }

    /// Evaluates the terminal cost Lf(x).
    pub fn terminal(&self, x: &State) -> f64 {
        let dx = x - self.goal_state;
        0.5 * dx.dot(&(self.terminal_weight * dx))
    }

    /// Gradient of the running cost with respect to the state: Q(x − x_goal).
    pub fn running_grad_state(&self, x: &State) -> State {
        self.state_weight * (x - self.goal_state)
    }

    /// Gradient of the running cost with respect to the input: R(u − u_goal).
    pub fn running_grad_input(&self, u: &Input) -> Input {
        self.input_weight * (u - self.goal_input)
    }

    /// Gradient of the terminal cost: Qf(x − x_goal).
    pub fn terminal_grad(&self, x: &State) -> State {
        self.terminal_weight * (x - self.goal_state)
    }

    /// Hessian of the running cost with respect to the state (the constant Q).
    pub fn running_hess_state(&self) -> na::Matrix6<f64> {
        self.state_weight
    }

    /// Hessian of the running cost with respect to the input (the constant R).
    pub fn running_hess_input(&self) -> na::Matrix2<f64> {
        self.input_weight
    }

    /// Hessian of the terminal cost (the constant Qf).
    pub fn terminal_hess(&self) -> na::Matrix6<f64> {
        self.terminal_weight
    }

    /// Total cost of a trajectory: running cost over timesteps 0..N−2 plus the
    /// terminal cost at N−1.
    pub fn trajectory(&self, states: &[State], inputs: &[Input]) -> f64 {
        let running: f64 = states
            .iter()
            .zip(inputs.iter())
            .map(|(x, u)| self.running(x, u))
            .sum();
        running + states.last().map_or(0.0, |x| self.terminal(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_cost() -> QuadraticCost {
        QuadraticCost::new(
            na::Matrix6::identity() * 2.0,
            na::Matrix2::identity() * 0.5,
            na::Matrix6::identity() * 10.0,
            na::vector![1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            na::vector![4.905, 4.905],
        )
    }

    #[test]
    fn test_cost_vanishes_at_goal() {
        let cost = make_cost();
        let x = na::vector![1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let u = na::vector![4.905, 4.905];

        assert_relative_eq!(cost.running(&x, &u), 0.0);
        assert_relative_eq!(cost.terminal(&x), 0.0);
        assert_relative_eq!(cost.running_grad_state(&x), State::zeros());
        assert_relative_eq!(cost.running_grad_input(&u), Input::zeros());
        assert_relative_eq!(cost.terminal_grad(&x), State::zeros());
    }

    #[test]
    fn test_cost_matches_closed_form() {
        let cost = make_cost();
        let x = na::vector![0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let u = na::vector![4.905, 6.905];

        // ½·2·(1² + 1²) + ½·0.5·2² = 2 + 1
        assert_relative_eq!(cost.running(&x, &u), 3.0);
        // ½·10·(1² + 1²)
        assert_relative_eq!(cost.terminal(&x), 10.0);
    }

    #[test]
    fn test_trajectory_cost_sums_running_and_terminal() {
        let cost = make_cost();
        let x = na::vector![0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let u = na::vector![4.905, 6.905];

        let states = vec![x, x, x];
        let inputs = vec![u, u];
        let expected = 2.0 * cost.running(&x, &u) + cost.terminal(&x);
        assert_relative_eq!(cost.trajectory(&states, &inputs), expected);
    }
}
