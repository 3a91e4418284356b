use thiserror::Error;

/// Configuration failures detected at construction time. Fatal for the run;
/// nothing here is retried.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("system must have at least one equation")]
    ZeroDimension,
    #[error("tangent count {tangent_count} exceeds equation count {equation_count}")]
    TooManyTangents {
        equation_count: usize,
        tangent_count: usize,
    },
    #[error("step size must be positive and finite, got {0}")]
    BadStepSize(f64),
    #[error("the multi-step Euler scheme requires at least one substep")]
    ZeroSubsteps,
}

/// Failures raised while orthonormalizing a tangent basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrthoError {
    #[error("tangent block holds {got} entries, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("norms buffer holds {got} entries, expected {expected}")]
    NormsMismatch { expected: usize, got: usize },
    /// A basis vector collapsed onto the span of its predecessors, so its
    /// pre-normalization norm is zero (or not representable). Substituting
    /// an epsilon here would silently corrupt the spectrum, so the pass
    /// aborts instead.
    #[error("tangent vector {column} collapsed during orthonormalization")]
    DegenerateColumn { column: usize },
}
