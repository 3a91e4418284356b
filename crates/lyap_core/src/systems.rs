//! Reference systems shipped with the engine. Each implements the full
//! variational contract with an analytic Jacobian, so any of them can feed
//! both trajectory and spectrum runs.

use crate::traits::{DynamicalSystem, VariationalSystem};

/// The Lorenz '63 flow. Chaotic at the canonical parameters, with largest
/// exponent approx 0.906.
#[derive(Debug, Clone, Copy)]
pub struct Lorenz {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Default for Lorenz {
    fn default() -> Self {
        Self {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
        }
    }
}

impl DynamicalSystem<f64> for Lorenz {
    fn equation_count(&self) -> usize {
        3
    }

    fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = self.sigma * (x[1] - x[0]);
        out[1] = x[0] * (self.rho - x[2]) - x[1];
        out[2] = x[0] * x[1] - self.beta * x[2];
    }

    fn initial_state(&self, out: &mut [f64]) {
        out[0] = 1.0;
        out[1] = 1.0;
        out[2] = 1.0;
    }
}

impl VariationalSystem<f64> for Lorenz {
    fn tangent_derivatives(&self, _t: f64, x: &[f64], tangent: &[f64], out: &mut [f64]) {
        out[0] = self.sigma * (tangent[1] - tangent[0]);
        out[1] = (self.rho - x[2]) * tangent[0] - tangent[1] - x[0] * tangent[2];
        out[2] = x[1] * tangent[0] + x[0] * tangent[1] - self.beta * tangent[2];
    }
}

/// The Hénon map. At the canonical parameters the exponents are approx
/// (0.419, -1.623) nats per iteration; their sum is ln(b) exactly.
#[derive(Debug, Clone, Copy)]
pub struct Henon {
    pub a: f64,
    pub b: f64,
}

impl Default for Henon {
    fn default() -> Self {
        Self { a: 1.4, b: 0.3 }
    }
}

impl DynamicalSystem<f64> for Henon {
    fn equation_count(&self) -> usize {
        2
    }

    fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = 1.0 - self.a * x[0] * x[0] + x[1];
        out[1] = self.b * x[0];
    }

    fn initial_state(&self, out: &mut [f64]) {
        out[0] = 0.0;
        out[1] = 0.0;
    }
}

impl VariationalSystem<f64> for Henon {
    fn tangent_derivatives(&self, _t: f64, x: &[f64], tangent: &[f64], out: &mut [f64]) {
        out[0] = -2.0 * self.a * x[0] * tangent[0] + tangent[1];
        out[1] = self.b * tangent[0];
    }
}

/// Simple harmonic oscillator, dx/dt = v, dv/dt = -omega^2 x. Conservative;
/// both exponents are zero and omega^2 x^2 + v^2 is invariant.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicOscillator {
    pub omega: f64,
}

impl Default for HarmonicOscillator {
    fn default() -> Self {
        Self { omega: 1.0 }
    }
}

impl DynamicalSystem<f64> for HarmonicOscillator {
    fn equation_count(&self) -> usize {
        2
    }

    fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = -self.omega * self.omega * x[0];
    }

    fn initial_state(&self, out: &mut [f64]) {
        out[0] = 1.0;
        out[1] = 0.0;
    }
}

impl VariationalSystem<f64> for HarmonicOscillator {
    fn tangent_derivatives(&self, _t: f64, _x: &[f64], tangent: &[f64], out: &mut [f64]) {
        out[0] = tangent[1];
        out[1] = -self.omega * self.omega * tangent[0];
    }
}

#[cfg(test)]
mod tests {
    use super::{HarmonicOscillator, Henon, Lorenz};
    use crate::traits::{DynamicalSystem, VariationalSystem};
    use approx::assert_relative_eq;

    /// Central-difference check of the analytic Jacobian, column by column.
    fn assert_jacobian_consistent<S: VariationalSystem<f64>>(system: &S, x: &[f64]) {
        let n = system.equation_count();
        let eps = 1e-6;
        for j in 0..n {
            let mut forward = x.to_vec();
            let mut backward = x.to_vec();
            forward[j] += eps;
            backward[j] -= eps;
            let mut f_plus = vec![0.0; n];
            let mut f_minus = vec![0.0; n];
            system.derivatives(0.0, &forward, &mut f_plus);
            system.derivatives(0.0, &backward, &mut f_minus);

            let mut unit = vec![0.0; n];
            unit[j] = 1.0;
            let mut column = vec![0.0; n];
            system.tangent_derivatives(0.0, x, &unit, &mut column);

            for i in 0..n {
                let estimate = (f_plus[i] - f_minus[i]) / (2.0 * eps);
                assert_relative_eq!(column[i], estimate, epsilon = 1e-6, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn lorenz_jacobian_matches_finite_differences() {
        assert_jacobian_consistent(&Lorenz::default(), &[1.3, -2.1, 17.0]);
    }

    #[test]
    fn henon_jacobian_matches_finite_differences() {
        assert_jacobian_consistent(&Henon::default(), &[0.6, -0.2]);
    }

    #[test]
    fn oscillator_jacobian_matches_finite_differences() {
        assert_jacobian_consistent(&HarmonicOscillator { omega: 2.5 }, &[0.4, -1.1]);
    }

    #[test]
    fn henon_iterates_stay_bounded_from_the_origin() {
        let map = Henon::default();
        let mut x = vec![0.0; 2];
        map.initial_state(&mut x);
        let mut next = vec![0.0; 2];
        for _ in 0..1_000 {
            map.derivatives(0.0, &x, &mut next);
            x.copy_from_slice(&next);
            assert!(x[0].abs() < 2.0 && x[1].abs() < 2.0, "escaped at {x:?}");
        }
    }
}
