use crate::algebra::{dot, norm};
use crate::error::OrthoError;
use nalgebra::DMatrix;

/// Orthogonalization algorithm, selected at construction time.
///
/// All three produce the same mathematical result: an orthonormal basis
/// spanning the same flags as the input, plus the pre-normalization norm of
/// each vector (the R-diagonal, whose logarithms the spectrum driver
/// accumulates). They differ in how rounding error accumulates when the
/// basis is nearly dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrthoMethod {
    /// Projection coefficients for vector `j` are all computed against the
    /// original vector `j`, then subtracted in one pass. Drifts for nearly
    /// dependent bases; retained for comparability with the modified
    /// variant.
    ClassicGramSchmidt,
    /// Normalizes vector `j` immediately, then removes its component from
    /// every later vector in place before moving on.
    ModifiedGramSchmidt,
    /// Householder QR with the reflection sign chosen from the leading
    /// remaining entry, so the reflector construction never cancels. A
    /// drop-in replacement when the Gram-Schmidt variants accumulate too
    /// much error.
    Householder,
}

/// Re-orthonormalizes the tangent block of a state matrix in place and
/// reports the stretching factors.
///
/// Work buffers are sized once at construction; `perform` allocates
/// nothing. One instance serves one run.
pub struct Orthogonalizer {
    method: OrthoMethod,
    /// Length of each tangent vector (the equation count).
    dim: usize,
    /// Number of tangent vectors.
    count: usize,
    coeffs: Vec<f64>,
    column: Vec<f64>,
    factors: DMatrix<f64>,
    basis: DMatrix<f64>,
    rdiag: Vec<f64>,
}

impl Orthogonalizer {
    pub fn new(method: OrthoMethod, dim: usize, count: usize) -> Self {
        Self {
            method,
            dim,
            count,
            coeffs: vec![0.0; count],
            column: vec![0.0; dim],
            factors: DMatrix::zeros(dim, count),
            basis: DMatrix::zeros(dim, count),
            rdiag: vec![0.0; count],
        }
    }

    pub fn method(&self) -> OrthoMethod {
        self.method
    }

    /// Orthonormalizes the `count` tangent vectors held contiguously in
    /// `tangent` (the layout of [`crate::state::StateMatrix::tangent`]),
    /// writing the pre-normalization norms into `norms` in input order.
    ///
    /// A vector whose residual norm is not representable (the basis has
    /// collapsed near a tangency) aborts the pass with
    /// [`OrthoError::DegenerateColumn`]; no epsilon is substituted.
    pub fn perform(&mut self, tangent: &mut [f64], norms: &mut [f64]) -> Result<(), OrthoError> {
        let expected = self.dim * self.count;
        if tangent.len() != expected {
            return Err(OrthoError::ShapeMismatch {
                expected,
                got: tangent.len(),
            });
        }
        if norms.len() != self.count {
            return Err(OrthoError::NormsMismatch {
                expected: self.count,
                got: norms.len(),
            });
        }
        match self.method {
            OrthoMethod::ClassicGramSchmidt => self.classic(tangent, norms),
            OrthoMethod::ModifiedGramSchmidt => self.modified(tangent, norms),
            OrthoMethod::Householder => self.householder(tangent, norms),
        }
    }

    fn classic(&mut self, tangent: &mut [f64], norms: &mut [f64]) -> Result<(), OrthoError> {
        let n = self.dim;
        for j in 0..self.count {
            let (done, rest) = tangent.split_at_mut(j * n);
            let current = &mut rest[..n];
            self.column.copy_from_slice(current);
            // All coefficients against the original vector, then a single
            // subtraction pass.
            for i in 0..j {
                self.coeffs[i] = dot(&done[i * n..(i + 1) * n], &self.column);
            }
            for i in 0..j {
                let basis = &done[i * n..(i + 1) * n];
                let r = self.coeffs[i];
                for (c, q) in current.iter_mut().zip(basis) {
                    *c -= r * q;
                }
            }
            norms[j] = finalize_column(current, j)?;
        }
        Ok(())
    }

    fn modified(&mut self, tangent: &mut [f64], norms: &mut [f64]) -> Result<(), OrthoError> {
        let n = self.dim;
        for j in 0..self.count {
            let (head, tail) = tangent.split_at_mut((j + 1) * n);
            let current = &mut head[j * n..];
            norms[j] = finalize_column(current, j)?;
            // Deflate every later vector immediately; the norm captured for
            // vector k then reflects all earlier subtractions.
            for k in 0..self.count - j - 1 {
                let target = &mut tail[k * n..(k + 1) * n];
                let r = dot(current, target);
                for (t, q) in target.iter_mut().zip(current.iter()) {
                    *t -= r * q;
                }
            }
        }
        Ok(())
    }

    /// Householder QR over a pre-sized work matrix: vectors load as columns,
    /// successive reflections zero the sub-diagonal, and the basis is
    /// rebuilt by applying the stored reflectors to the identity in reverse
    /// order. Columns are flipped afterwards so the R-diagonal is positive.
    fn householder(&mut self, tangent: &mut [f64], norms: &mut [f64]) -> Result<(), OrthoError> {
        let n = self.dim;
        let m = self.count;
        for j in 0..m {
            for i in 0..n {
                self.factors[(i, j)] = tangent[j * n + i];
            }
        }

        for k in 0..m {
            let mut len_sq = 0.0;
            for i in k..n {
                let x = self.factors[(i, k)];
                len_sq += x * x;
            }
            let len = len_sq.sqrt();
            if !len.is_finite() || len <= f64::EPSILON {
                return Err(OrthoError::DegenerateColumn { column: k });
            }
            // Reflect onto -sign(top) * len; the leading reflector entry is
            // then an addition of like-signed terms.
            let top = self.factors[(k, k)];
            let alpha = if top >= 0.0 { -len } else { len };
            self.factors[(k, k)] = top - alpha;
            self.rdiag[k] = alpha;

            let mut v_sq = 0.0;
            for i in k..n {
                let v = self.factors[(i, k)];
                v_sq += v * v;
            }
            for c in k + 1..m {
                let mut proj = 0.0;
                for i in k..n {
                    proj += self.factors[(i, k)] * self.factors[(i, c)];
                }
                let scale = 2.0 * proj / v_sq;
                for i in k..n {
                    let v = self.factors[(i, k)];
                    self.factors[(i, c)] -= scale * v;
                }
            }
            // Column k now holds the reflector; the diagonal lives in rdiag.
        }

        // Accumulate Q = H_0 .. H_{m-1} applied to the leading identity
        // columns, reflectors in reverse order.
        for c in 0..m {
            for i in 0..n {
                self.basis[(i, c)] = if i == c { 1.0 } else { 0.0 };
            }
        }
        for k in (0..m).rev() {
            let mut v_sq = 0.0;
            for i in k..n {
                let v = self.factors[(i, k)];
                v_sq += v * v;
            }
            for c in 0..m {
                let mut proj = 0.0;
                for i in k..n {
                    proj += self.factors[(i, k)] * self.basis[(i, c)];
                }
                let scale = 2.0 * proj / v_sq;
                for i in k..n {
                    let v = self.factors[(i, k)];
                    self.basis[(i, c)] -= scale * v;
                }
            }
        }

        for k in 0..m {
            let alpha = self.rdiag[k];
            norms[k] = alpha.abs();
            let flip = alpha < 0.0;
            for i in 0..n {
                let q = if flip { -self.basis[(i, k)] } else { self.basis[(i, k)] };
                tangent[k * n + i] = q;
            }
        }
        Ok(())
    }
}

/// Normalizes one residual vector, returning its pre-normalization norm.
fn finalize_column(column: &mut [f64], index: usize) -> Result<f64, OrthoError> {
    let len = norm(column);
    if !len.is_finite() || len <= f64::EPSILON {
        return Err(OrthoError::DegenerateColumn { column: index });
    }
    for v in column.iter_mut() {
        *v /= len;
    }
    Ok(len)
}
