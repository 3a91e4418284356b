use crate::error::ConfigError;
use crate::traits::{DynamicalSystem, Scalar, VariationalSystem};

/// The state of one integration run: the trajectory row followed by zero or
/// more tangent vectors.
///
/// Layout is a flat row-major matrix of `1 + tangent_count` rows, each of
/// `equation_count` entries. Row 0 is the primary trajectory; row `1 + j`
/// is tangent vector `j`, evolved under the linearized dynamics around the
/// current trajectory point. Full-spectrum runs use `tangent_count ==
/// equation_count`, seeded with the identity basis; a reduced count is
/// valid when only the leading exponents are wanted.
///
/// Allocated once per run and mutated in place every step; never resized.
/// Writers/readers that persist this matrix must follow the same row-major
/// convention.
#[derive(Debug, Clone)]
pub struct StateMatrix {
    equation_count: usize,
    tangent_count: usize,
    data: Vec<f64>,
}

impl StateMatrix {
    pub fn new(equation_count: usize, tangent_count: usize) -> Result<Self, ConfigError> {
        if equation_count == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if tangent_count > equation_count {
            return Err(ConfigError::TooManyTangents {
                equation_count,
                tangent_count,
            });
        }
        Ok(Self {
            equation_count,
            tangent_count,
            data: vec![0.0; equation_count * (1 + tangent_count)],
        })
    }

    pub fn equation_count(&self) -> usize {
        self.equation_count
    }

    pub fn tangent_count(&self) -> usize {
        self.tangent_count
    }

    /// Total number of scalars: trajectory plus tangent block.
    pub fn flat_len(&self) -> usize {
        self.data.len()
    }

    pub fn trajectory(&self) -> &[f64] {
        &self.data[..self.equation_count]
    }

    pub fn trajectory_mut(&mut self) -> &mut [f64] {
        &mut self.data[..self.equation_count]
    }

    /// The tangent block: `tangent_count` contiguous vectors of
    /// `equation_count` entries each.
    pub fn tangent(&self) -> &[f64] {
        &self.data[self.equation_count..]
    }

    pub fn tangent_mut(&mut self) -> &mut [f64] {
        &mut self.data[self.equation_count..]
    }

    pub fn tangent_vector(&self, index: usize) -> &[f64] {
        let n = self.equation_count;
        &self.data[n + index * n..n + (index + 1) * n]
    }

    /// Flattened view for the steppers: trajectory first, then the tangent
    /// block.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// The explicit validity check. Integration itself never clamps or
    /// inspects values, so divergence shows up here as infinities or NaNs.
    pub fn is_finite(&self) -> bool {
        self.first_non_finite().is_none()
    }

    /// Flat index of the first non-finite entry, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.data.iter().position(|v| !v.is_finite())
    }
}

/// Couples a variational system to its tangent dynamics over the flattened
/// state: entries `0..n` are the trajectory, entries `n..n + n*m` the
/// tangent block of [`StateMatrix`].
///
/// Implementing [`DynamicalSystem`] over the augmented state means every
/// stepper advances the trajectory and all tangent vectors simultaneously,
/// with the tangent derivatives evaluated at the same intermediate stage
/// values as the trajectory.
pub struct TangentFlow<S> {
    inner: S,
    dim: usize,
    tangent_count: usize,
}

impl<S> TangentFlow<S> {
    pub fn new(inner: S, dim: usize, tangent_count: usize) -> Self {
        Self {
            inner,
            dim,
            tangent_count,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn state_dimension(&self) -> usize {
        self.dim
    }

    pub fn tangent_count(&self) -> usize {
        self.tangent_count
    }
}

impl<T, S> DynamicalSystem<T> for TangentFlow<S>
where
    T: Scalar,
    S: VariationalSystem<T>,
{
    fn equation_count(&self) -> usize {
        self.dim * (1 + self.tangent_count)
    }

    fn derivatives(&self, t: T, x: &[T], out: &mut [T]) {
        let n = self.dim;
        self.inner.derivatives(t, &x[..n], &mut out[..n]);
        for j in 0..self.tangent_count {
            let offset = n + j * n;
            self.inner.tangent_derivatives(
                t,
                &x[..n],
                &x[offset..offset + n],
                &mut out[offset..offset + n],
            );
        }
    }

    fn initial_state(&self, out: &mut [T]) {
        let n = self.dim;
        self.inner.initial_state(&mut out[..n]);
        // Identity seed: a linearly independent, already orthonormal basis.
        for j in 0..self.tangent_count {
            for i in 0..n {
                out[n + j * n + i] = if i == j { T::one() } else { T::zero() };
            }
        }
    }
}
