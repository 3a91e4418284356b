use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A dynamical system: a flow dx/dt = f(t, x) or a map x_{n+1} = f(x_n).
pub trait DynamicalSystem<T: Scalar> {
    /// Dimension of the state space. Positive and fixed for the system's
    /// lifetime.
    fn equation_count(&self) -> usize;

    /// Evaluates the vector field (flow) or map function into `out`.
    ///
    /// Must be pure with respect to `t` and `x`: the steppers call this
    /// several times per step with intermediate stage states. Non-finite
    /// results are not caught here; detection is the caller's concern.
    fn derivatives(&self, t: T, x: &[T], out: &mut [T]);

    /// Writes the system's canonical starting point into `out`.
    fn initial_state(&self, out: &mut [T]);
}

/// A system that also knows its linearization. Spectrum computations need
/// this; systems without a linearized form support trajectory integration
/// only.
pub trait VariationalSystem<T: Scalar>: DynamicalSystem<T> {
    /// Applies the Jacobian of the dynamics at `(t, x)` to a single tangent
    /// vector: `out = J(t, x) · tangent`.
    fn tangent_derivatives(&self, t: T, x: &[T], tangent: &[T], out: &mut [T]);
}

/// A trait for steppers that can advance a system forward by one step.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
