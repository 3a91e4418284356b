use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// First-order explicit Euler, repeated `substeps` times per call.
///
/// One `step` call advances time by `substeps * dt`, not by `dt` as the
/// Runge-Kutta steppers do; callers mixing schemes must account for the
/// different increment per call. The repeat count and the step size are
/// separate configuration values.
pub struct MultiEuler<T: Scalar> {
    deriv: Vec<T>,
    substeps: usize,
}

impl<T: Scalar> MultiEuler<T> {
    pub fn new(dim: usize, substeps: usize) -> Self {
        Self {
            deriv: vec![T::zero(); dim],
            substeps,
        }
    }

    pub fn substeps(&self) -> usize {
        self.substeps
    }
}

impl<T: Scalar> Steppable<T> for MultiEuler<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        for _ in 0..self.substeps {
            system.derivatives(*t, state, &mut self.deriv);
            for (y, k) in state.iter_mut().zip(&self.deriv) {
                *y = *y + dt * *k;
            }
            *t = *t + dt;
        }
    }
}

/// Classic Runge-Kutta 4th order. Advances time by exactly `dt` per call.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();
        let t0 = *t;
        let half_dt = dt * half;

        // k1 = f(t, y)
        system.derivatives(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt/2 * k1)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + half_dt * self.k1[i];
        }
        system.derivatives(t0 + half_dt, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt/2 * k2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + half_dt * self.k2[i];
        }
        system.derivatives(t0 + half_dt, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt * k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.derivatives(t0 + dt, &self.tmp, &mut self.k4);

        // y <- y + dt/6 * (k1 + 2 k2 + 2 k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

/// Discrete map stepper: one call is one iterate x_{n+1} = f(x_n).
/// `dt` is the nominal time increment per iterate, conventionally 1.
pub struct DiscreteMap<T: Scalar> {
    tmp: Vec<T>,
}

impl<T: Scalar> DiscreteMap<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for DiscreteMap<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.derivatives(*t, state, &mut self.tmp);
        state.copy_from_slice(&self.tmp);
        *t = *t + dt;
    }
}
