//! Small vector helpers shared by the orthogonalizers and by external
//! consumers (plotting, Poincaré-section code) that work on raw state rows.

/// Euclidean norm of a vector.
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Inner product. Both slices must have the same length.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// The 2D cross term `a.x * b.y - a.y * b.x`, i.e. the determinant of the
/// 2x2 matrix with columns `a` and `b`.
pub fn cross_2d(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Signed angle from `a` to `b` in radians, in `(-pi, pi]`.
pub fn angle_2d(a: [f64; 2], b: [f64; 2]) -> f64 {
    cross_2d(a, b).atan2(a[0] * b[0] + a[1] * b[1])
}
