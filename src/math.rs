//! Mathematical utilities for vector-difference calculations

use nalgebra::{DMatrix, Point3, Vector3};

pub type Mat = DMatrix<f64>;
pub type Vec3 = Vector3<f64>;
pub type Point = Point3<f64>;

/// Unit vector of `v`, or `None` when `v` is shorter than `tol` or not finite
///
/// Every direction normalisation in the solver goes through this so that
/// collapsed edges never feed NaN or Inf back into positions.
pub fn safe_unit(v: &Vec3, tol: f64) -> Option<Vec3> {
    let norm = v.norm();
    if !norm.is_finite() || norm <= tol {
        return None;
    }
    Some(v / norm)
}

/// Unit direction from `from` to `to`, with its length
pub fn direction(from: &Point, to: &Point, tol: f64) -> Option<(Vec3, f64)> {
    let d = to - from;
    let length = d.norm();
    safe_unit(&d, tol).map(|u| (u, length))
}

/// Angle between two vectors in radians, in [0, PI]
///
/// Returns 0 when either vector has no direction.
pub fn angle_between(a: &Vec3, b: &Vec3, tol: f64) -> f64 {
    match (safe_unit(a, tol), safe_unit(b, tol)) {
        (Some(ua), Some(ub)) => ua.dot(&ub).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Sum of Euclidean lengths of a set of vectors
pub fn total_magnitude(vectors: &[Vec3]) -> f64 {
    vectors.iter().map(|v| v.norm()).sum()
}
