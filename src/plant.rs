// Defines the planar quadrotor plant: parameters, dynamics, simulation and linearization
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

use nalgebra as na;

/// Standard gravitational acceleration in m/s².
pub const GRAVITY: f64 = 9.81;

/// Full state of the planar quadrotor: position x, y, orientation θ, and
/// their velocities vx, vy, ω.
pub type State = na::Vector6<f64>;

/// Control input: the two rotor thrusts.
pub type Input = na::Vector2<f64>;

/// Feedback gain mapping a state deviation from nominal to an input correction.
pub type FeedbackGain = na::Matrix2x6<f64>;

/// Physical parameters of a planar quadrotor.
///
/// The same parameter set drives both the forward simulation (`advance`) and
/// the linearization (`linearize`), so the two can never disagree about the
/// plant.
///
/// The dynamics are
/// ┌    ┐   ┌                   ┐
/// │ ẋ  │   │  vx               │
/// │ ẏ  │   │  vy               │
/// │ θ' │ = │  ω                │
/// │ v̇x │   │ −(u₁+u₂)sinθ / m  │
/// │ v̇y │   │  (u₁+u₂)cosθ / m − g │
/// │ ω' │   │  a(u₁−u₂) / I     │
/// └    ┘   └                   ┘
/// where u₁ and u₂ are the rotor thrusts, a is the arm length (rotor offset
/// from the center of mass) and I is the moment of inertia about the
/// out-of-plane axis.
#[derive(Copy, Clone, Debug)]
pub struct PlanarQuadrotor {
    mass: f64,
    arm_length: f64,
    inertia: f64,
}

impl Default for PlanarQuadrotor {
    fn default() -> Self {
        PlanarQuadrotor {
            mass: 1.0,
            arm_length: 0.25,
            inertia: 0.0625,
        }
    }
}

impl PlanarQuadrotor {
    /// Constructs a plant from its physical parameters.
    ///
    /// Returns `None` if any parameter is non-positive or non-finite.
    pub fn new(mass: f64, arm_length: f64, inertia: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(mass) && valid(arm_length) && valid(inertia)).then_some(PlanarQuadrotor {
            mass,
            arm_length,
            inertia,
        })
    }

    /// Returns the vehicle mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Returns the rotor arm length in m.
    pub fn arm_length(&self) -> f64 {
        self.arm_length
    }

    /// Returns the moment of inertia about the out-of-plane axis in kg·m².
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Returns the per-rotor thrust that exactly cancels gravity, i.e. the
    /// equilibrium input for level hover.
    pub fn hover_input(&self) -> Input {
        Input::from_element(0.5 * self.mass * GRAVITY)
    }

    /// Evaluates the continuous-time dynamics ẋ = f(x, u).
    pub fn dynamics(&self, x: &State, u: &Input) -> State {
        let (sin_theta, cos_theta) = x[2].sin_cos();
        let thrust = u[0] + u[1];
        na::vector![
            x[3],
            x[4],
            x[5],
            -thrust * sin_theta / self.mass,
            thrust * cos_theta / self.mass - GRAVITY,
            self.arm_length * (u[0] - u[1]) / self.inertia
        ]
    }

    /// Advances the state by one timestep under a zero-order-held input, using
    /// a classical fourth-order Runge-Kutta step of the nonlinear dynamics.
    ///
    /// This is deterministic: the same (x, u, dt) always produces the same
    /// next state.
    pub fn advance(&self, x: &State, u: &Input, dt: f64) -> State {
        let f = |x: &State| self.dynamics(x, u);
        let k1 = f(x);
        let k2 = f(&(x + k1 * (dt / 2.0)));
        let k3 = f(&(x + k2 * (dt / 2.0)));
        let k4 = f(&(x + k3 * dt));
        x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
    }

    /// Returns the Jacobians (A, B) of the continuous-time dynamics with
    /// respect to the state and the input, evaluated at (x, u).
    pub fn linearize(&self, x: &State, u: &Input) -> (na::Matrix6<f64>, na::Matrix6x2<f64>) {
        let (sin_theta, cos_theta) = x[2].sin_cos();
        let thrust = u[0] + u[1];
        let m = self.mass;

        let mat_a = na::matrix![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0;
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0;
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0;
            0.0, 0.0, -cos_theta * thrust / m, 0.0, 0.0, 0.0;
            0.0, 0.0, -sin_theta * thrust / m, 0.0, 0.0, 0.0;
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0
        ];
        let arm_over_inertia = self.arm_length / self.inertia;
        let mat_b = na::matrix![
            0.0, 0.0;
            0.0, 0.0;
            0.0, 0.0;
            -sin_theta / m, -sin_theta / m;
            cos_theta / m, cos_theta / m;
            arm_over_inertia, -arm_over_inertia
        ];
        (mat_a, mat_b)
    }

    /// Returns the exact zero-order-hold discretization (Ad, Bd) of the
    /// dynamics linearized at (x, u), over one timestep.
    ///
    /// Computed through the augmented-matrix exponential
    ///
    ///     exp( [A B; 0 0] · dt ) = [Ad Bd; 0 I]
    ///
    /// which is the standard continuous-to-discrete state-space conversion.
    pub fn linearize_discrete(
        &self,
        x: &State,
        u: &Input,
        dt: f64,
    ) -> (na::Matrix6<f64>, na::Matrix6x2<f64>) {
        let (mat_a, mat_b) = self.linearize(x, u);

        let mut augmented = na::SMatrix::<f64, 8, 8>::zeros();
        augmented
            .fixed_view_mut::<6, 6>(0, 0)
            .copy_from(&(mat_a * dt));
        augmented
            .fixed_view_mut::<6, 2>(0, 6)
            .copy_from(&(mat_b * dt));
        let expm = augmented.exp();

        let ad = expm.fixed_view::<6, 6>(0, 0).into_owned();
        let bd = expm.fixed_view::<6, 2>(0, 6).into_owned();
        (ad, bd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_nonphysical_parameters() {
        assert!(PlanarQuadrotor::new(1.0, 0.25, 0.0625).is_some());
        assert!(PlanarQuadrotor::new(0.0, 0.25, 0.0625).is_none());
        assert!(PlanarQuadrotor::new(1.0, -0.25, 0.0625).is_none());
        assert!(PlanarQuadrotor::new(1.0, 0.25, f64::NAN).is_none());
    }

    #[test]
    fn test_hover_is_an_equilibrium() {
        let plant = PlanarQuadrotor::default();
        let hover = State::zeros();
        let input = plant.hover_input();

        assert_relative_eq!(plant.dynamics(&hover, &input), State::zeros());
        assert_relative_eq!(plant.advance(&hover, &input, 0.02), hover, epsilon = 1e-12);
    }

    /// The closed-form Jacobians must agree with central finite differences of
    /// the nonlinear dynamics at a generic (non-equilibrium) operating point.
    #[test]
    fn test_jacobians_match_finite_differences() {
        let plant = PlanarQuadrotor::default();
        let x = na::vector![0.1, -0.2, 0.3, 0.4, -0.5, 0.6];
        let u = na::vector![5.2, 4.3];
        let (mat_a, mat_b) = plant.linearize(&x, &u);

        const STEP: f64 = 1e-6;
        for j in 0..6 {
            let mut hi = x;
            let mut lo = x;
            hi[j] += STEP;
            lo[j] -= STEP;
            let column = (plant.dynamics(&hi, &u) - plant.dynamics(&lo, &u)) / (2.0 * STEP);
            assert_relative_eq!(mat_a.column(j).into_owned(), column, epsilon = 1e-6);
        }
        for j in 0..2 {
            let mut hi = u;
            let mut lo = u;
            hi[j] += STEP;
            lo[j] -= STEP;
            let column = (plant.dynamics(&x, &hi) - plant.dynamics(&x, &lo)) / (2.0 * STEP);
            assert_relative_eq!(mat_b.column(j).into_owned(), column, epsilon = 1e-6);
        }
    }

    /// An exact ZOH discretization satisfies the semigroup property: stepping
    /// by dt equals stepping twice by dt/2. A first-order (Euler) conversion
    /// would fail this check.
    #[test]
    fn test_discretization_is_exact_zoh() {
        let plant = PlanarQuadrotor::default();
        let x = na::vector![0.0, 0.0, 0.2, 0.1, 0.0, -0.1];
        let u = na::vector![5.0, 4.8];
        let dt = 0.02;

        let (ad, bd) = plant.linearize_discrete(&x, &u, dt);
        let (ad_half, bd_half) = plant.linearize_discrete(&x, &u, dt / 2.0);

        assert_relative_eq!(ad, ad_half * ad_half, epsilon = 1e-9);
        assert_relative_eq!(bd, ad_half * bd_half + bd_half, epsilon = 1e-9);
    }
}
