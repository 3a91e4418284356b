use crate::error::ConfigError;
use crate::solvers::{DiscreteMap, MultiEuler, RK4};
use crate::state::{StateMatrix, TangentFlow};
use crate::traits::{DynamicalSystem, Steppable, VariationalSystem};

/// Integration scheme, selected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Explicit Euler applied `substeps` times per [`Integrator::step`]
    /// call; each call advances time by `substeps * dt`.
    MultiEuler { substeps: usize },
    /// Classic 4th-order Runge-Kutta; each call advances time by `dt`.
    Rk4,
    /// Historical alias. The engine this one descends from advertised a
    /// 6th-order scheme whose update was the same 4-stage kernel as
    /// [`Scheme::Rk4`]; configurations selecting it get exactly that
    /// kernel, and no 6th-order accuracy is claimed.
    Rk6Legacy,
    /// Discrete map iteration; `dt` is the time credited per iterate,
    /// conventionally 1.
    Discrete,
}

impl Scheme {
    fn build(self, dim: usize) -> Result<InternalStepper, ConfigError> {
        match self {
            Scheme::MultiEuler { substeps } => {
                if substeps == 0 {
                    return Err(ConfigError::ZeroSubsteps);
                }
                Ok(InternalStepper::MultiEuler(MultiEuler::new(dim, substeps)))
            }
            Scheme::Rk4 | Scheme::Rk6Legacy => Ok(InternalStepper::Rk4(RK4::new(dim))),
            Scheme::Discrete => Ok(InternalStepper::Discrete(DiscreteMap::new(dim))),
        }
    }
}

enum InternalStepper {
    MultiEuler(MultiEuler<f64>),
    Rk4(RK4<f64>),
    Discrete(DiscreteMap<f64>),
}

impl InternalStepper {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) {
        match self {
            InternalStepper::MultiEuler(s) => s.step(system, t, state, dt),
            InternalStepper::Rk4(s) => s.step(system, t, state, dt),
            InternalStepper::Discrete(s) => s.step(system, t, state, dt),
        }
    }
}

/// Advances one system's state matrix with a fixed-step scheme.
///
/// Construction allocates the state matrix and the scheme's scratch
/// buffers, both owned exclusively by this instance. [`Integrator::init`]
/// zeroes the clock and loads initial conditions; [`Integrator::step`]
/// mutates the state in place. There is no terminal state and no validity
/// checking here: divergence stays visible as non-finite entries in the
/// solution, which callers inspect via
/// [`StateMatrix::first_non_finite`].
pub struct Integrator<S> {
    system: S,
    stepper: InternalStepper,
    state: StateMatrix,
    dt: f64,
    time: f64,
}

impl<S: DynamicalSystem<f64>> Integrator<S> {
    /// Trajectory-only integrator: the state matrix is the single
    /// trajectory row.
    pub fn new(system: S, scheme: Scheme, dt: f64) -> Result<Self, ConfigError> {
        let state = StateMatrix::new(system.equation_count(), 0)?;
        Self::assemble(system, scheme, dt, state)
    }

    fn assemble(
        system: S,
        scheme: Scheme,
        dt: f64,
        state: StateMatrix,
    ) -> Result<Self, ConfigError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::BadStepSize(dt));
        }
        let stepper = scheme.build(state.flat_len())?;
        Ok(Self {
            system,
            stepper,
            state,
            dt,
            time: 0.0,
        })
    }

    /// Zeroes the clock and asks the system for its initial conditions.
    /// May be called again to restart the run.
    pub fn init(&mut self) {
        self.time = 0.0;
        self.system.initial_state(self.state.as_mut_slice());
    }

    /// Advances the state matrix by one scheme step.
    pub fn step(&mut self) {
        self.stepper
            .step(&self.system, &mut self.time, self.state.as_mut_slice(), self.dt);
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_size(&self) -> f64 {
        self.dt
    }

    pub fn set_step_size(&mut self, dt: f64) -> Result<(), ConfigError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::BadStepSize(dt));
        }
        self.dt = dt;
        Ok(())
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// The state matrix, inspectable between steps (plotting, export).
    pub fn solution(&self) -> &StateMatrix {
        &self.state
    }

    pub fn solution_mut(&mut self) -> &mut StateMatrix {
        &mut self.state
    }
}

impl<M: VariationalSystem<f64>> Integrator<TangentFlow<M>> {
    /// Full-spectrum integrator: one tangent vector per equation, evolved
    /// jointly with the trajectory.
    pub fn with_spectrum(model: M, scheme: Scheme, dt: f64) -> Result<Self, ConfigError> {
        let count = model.equation_count();
        Self::with_tangent_count(model, scheme, dt, count)
    }

    /// Spectrum integrator tracking only the leading `tangent_count`
    /// exponents.
    pub fn with_tangent_count(
        model: M,
        scheme: Scheme,
        dt: f64,
        tangent_count: usize,
    ) -> Result<Self, ConfigError> {
        let dim = model.equation_count();
        let state = StateMatrix::new(dim, tangent_count)?;
        let flow = TangentFlow::new(model, dim, tangent_count);
        Self::assemble(flow, scheme, dt, state)
    }
}

#[cfg(test)]
mod tests {
    use super::{Integrator, Scheme};
    use crate::error::ConfigError;
    use crate::traits::{DynamicalSystem, VariationalSystem};

    struct Oscillator;

    impl DynamicalSystem<f64> for Oscillator {
        fn equation_count(&self) -> usize {
            2
        }

        fn derivatives(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[1];
            out[1] = -x[0];
        }

        fn initial_state(&self, out: &mut [f64]) {
            out[0] = 1.0;
            out[1] = 0.0;
        }
    }

    impl VariationalSystem<f64> for Oscillator {
        fn tangent_derivatives(&self, _t: f64, _x: &[f64], tangent: &[f64], out: &mut [f64]) {
            out[0] = tangent[1];
            out[1] = -tangent[0];
        }
    }

    struct Pointless;

    impl DynamicalSystem<f64> for Pointless {
        fn equation_count(&self) -> usize {
            0
        }
        fn derivatives(&self, _t: f64, _x: &[f64], _out: &mut [f64]) {}
        fn initial_state(&self, _out: &mut [f64]) {}
    }

    #[test]
    fn construction_rejects_bad_configuration() {
        assert!(matches!(
            Integrator::new(Pointless, Scheme::Rk4, 0.01),
            Err(ConfigError::ZeroDimension)
        ));
        assert!(matches!(
            Integrator::new(Oscillator, Scheme::Rk4, 0.0),
            Err(ConfigError::BadStepSize(_))
        ));
        assert!(matches!(
            Integrator::new(Oscillator, Scheme::Rk4, f64::NAN),
            Err(ConfigError::BadStepSize(_))
        ));
        assert!(matches!(
            Integrator::new(Oscillator, Scheme::MultiEuler { substeps: 0 }, 0.01),
            Err(ConfigError::ZeroSubsteps)
        ));
        assert!(matches!(
            Integrator::with_tangent_count(Oscillator, Scheme::Rk4, 0.01, 3),
            Err(ConfigError::TooManyTangents { .. })
        ));
    }

    #[test]
    fn init_loads_conditions_and_restarts() {
        let mut integrator = Integrator::new(Oscillator, Scheme::Rk4, 0.01).unwrap();
        integrator.init();
        assert_eq!(integrator.solution().trajectory(), &[1.0, 0.0]);
        for _ in 0..10 {
            integrator.step();
        }
        assert!((integrator.time() - 0.1).abs() < 1e-12);
        integrator.init();
        assert_eq!(integrator.time(), 0.0);
        assert_eq!(integrator.solution().trajectory(), &[1.0, 0.0]);
    }

    #[test]
    fn trajectory_follows_the_closed_form() {
        let mut integrator = Integrator::new(Oscillator, Scheme::Rk4, 0.01).unwrap();
        integrator.init();
        for _ in 0..100 {
            integrator.step();
        }
        let x = integrator.solution().trajectory();
        assert!((x[0] - 1.0_f64.cos()).abs() < 1e-6);
        assert!((x[1] + 1.0_f64.sin()).abs() < 1e-6);
    }

    #[test]
    fn spectrum_integrator_carries_identity_tangents() {
        let mut integrator = Integrator::with_spectrum(Oscillator, Scheme::Rk4, 0.01).unwrap();
        integrator.init();
        let state = integrator.solution();
        assert_eq!(state.tangent_count(), 2);
        assert_eq!(state.tangent_vector(0), &[1.0, 0.0]);
        assert_eq!(state.tangent_vector(1), &[0.0, 1.0]);
    }

    #[test]
    fn reduced_tangent_count_tracks_leading_directions_only() {
        let mut integrator =
            Integrator::with_tangent_count(Oscillator, Scheme::Rk4, 0.01, 1).unwrap();
        integrator.init();
        assert_eq!(integrator.solution().tangent_count(), 1);
        assert_eq!(integrator.solution().tangent_vector(0), &[1.0, 0.0]);
        for _ in 0..10 {
            integrator.step();
        }
        assert!(integrator.solution().is_finite());
    }

    #[test]
    fn legacy_rk6_is_the_rk4_kernel() {
        let mut a = Integrator::new(Oscillator, Scheme::Rk4, 0.02).unwrap();
        let mut b = Integrator::new(Oscillator, Scheme::Rk6Legacy, 0.02).unwrap();
        a.init();
        b.init();
        for _ in 0..50 {
            a.step();
            b.step();
        }
        assert_eq!(a.solution().trajectory(), b.solution().trajectory());
        assert_eq!(a.time(), b.time());
    }

    #[test]
    fn step_size_is_adjustable_but_validated() {
        let mut integrator = Integrator::new(Oscillator, Scheme::Rk4, 0.01).unwrap();
        assert_eq!(integrator.step_size(), 0.01);
        integrator.set_step_size(0.05).unwrap();
        assert_eq!(integrator.step_size(), 0.05);
        assert!(matches!(
            integrator.set_step_size(-1.0),
            Err(ConfigError::BadStepSize(_))
        ));
        assert_eq!(integrator.step_size(), 0.05);
    }
}
