//! The `lyap_core` crate is the numerical engine for Lyapunov spectrum
//! analysis: fixed-step integration of a dynamical system jointly with its
//! linearized (tangent-space) equations, periodic re-orthonormalization of
//! the tangent basis, and accumulation of the stretching factors into
//! exponential growth rates.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` /
//!   `VariationalSystem` (flows, maps, and their linearizations),
//!   `Steppable` (fixed-step schemes).
//! - **Solvers**: multi-step Euler, classic RK4 (plus the legacy "RK6"
//!   alias), and a discrete map iterator.
//! - **Orthogonalizers**: classic and modified Gram-Schmidt, Householder QR.
//! - **Spectrum driver**: the integrate/renormalize/accumulate loop, with
//!   the Kaplan-Yorke dimension of the result.
//! - **Run pool**: bounded worker threads for independent whole runs.

pub mod algebra;
pub mod error;
pub mod integrator;
pub mod ortho;
pub mod pool;
pub mod solvers;
pub mod spectrum;
pub mod state;
pub mod systems;
pub mod traits;
