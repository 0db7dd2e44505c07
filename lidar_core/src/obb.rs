//! C4 — OBB Estimator (§4.4).
//!
//! 2D PCA via a closed-form eigensolve of the 2x2 XY covariance matrix —
//! small fixed matrices get an analytic solve rather than a call into a
//! general eigensolver, the same way a `Matrix6` inverse elsewhere in
//! this codebase goes through `nalgebra`'s `try_inverse` directly instead
//! of a generic decomposition.

use nalgebra::{Matrix2, Vector2};

use crate::types::{Obb, Point3};

/// Result of the 2D PCA fit, carrying the eigenvalue-degeneracy flag
/// C5 needs for heading disambiguation (§4.4: "vulnerable to ~90 degree
/// swaps when eigenvalues approach equality").
#[derive(Debug, Clone, Copy)]
pub struct ObbResult {
    pub obb: Obb,
    /// True when the two eigenvalues are nearly equal (near-square
    /// footprint): the principal axis is numerically ill-conditioned.
    pub ambiguous: bool,
}

/// Relative eigenvalue gap below which the principal axis is considered
/// ambiguous.
const DEGENERACY_RATIO: f64 = 0.08;

/// Compute the oriented bounding box of a cluster's XY points plus its Z
/// extent. `points_xy` and `z` must have equal, non-zero length.
pub fn compute_obb(points_xy: &[Vector2<f64>], z: &[f64]) -> ObbResult {
    debug_assert_eq!(points_xy.len(), z.len());
    let n = points_xy.len().max(1) as f64;

    let mean: Vector2<f64> = points_xy.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;
    let mut cov = Matrix2::zeros();
    for p in points_xy {
        let d = p - mean;
        cov[(0, 0)] += d.x * d.x;
        cov[(0, 1)] += d.x * d.y;
        cov[(1, 0)] += d.x * d.y;
        cov[(1, 1)] += d.y * d.y;
    }
    if points_xy.len() > 1 {
        cov /= n;
    }

    let (eigval_major, axis_major, eigval_minor) = principal_axis(&cov);
    let ambiguous = {
        let denom = eigval_major.max(1e-12);
        (eigval_major - eigval_minor).abs() / denom < DEGENERACY_RATIO
    };

    let perp = Vector2::new(-axis_major.y, axis_major.x);
    let mut min_proj_major = f64::MAX;
    let mut max_proj_major = f64::MIN;
    let mut min_proj_minor = f64::MAX;
    let mut max_proj_minor = f64::MIN;
    for p in points_xy {
        let d = p - mean;
        let pm = d.dot(&axis_major);
        let pp = d.dot(&perp);
        min_proj_major = min_proj_major.min(pm);
        max_proj_major = max_proj_major.max(pm);
        min_proj_minor = min_proj_minor.min(pp);
        max_proj_minor = max_proj_minor.max(pp);
    }
    let length = (max_proj_major - min_proj_major).max(1e-6);
    let width = (max_proj_minor - min_proj_minor).max(1e-6);

    let z_min = z.iter().cloned().fold(f64::MAX, f64::min);
    let z_max = z.iter().cloned().fold(f64::MIN, f64::max);
    let heading_rad = axis_major.y.atan2(axis_major.x);

    ObbResult {
        obb: Obb {
            heading_rad,
            length,
            width,
            height: (z_max - z_min).max(0.0),
            centre: Point3::new(mean.x, mean.y, (z_max + z_min) / 2.0),
        },
        ambiguous,
    }
}

/// Closed-form eigendecomposition of a symmetric 2x2 matrix. Returns
/// `(largest_eigenvalue, its_unit_eigenvector, smallest_eigenvalue)`.
fn principal_axis(cov: &Matrix2<f64>) -> (f64, Vector2<f64>, f64) {
    let a = cov[(0, 0)];
    let b = cov[(0, 1)];
    let d = cov[(1, 1)];

    let trace = a + d;
    let diff = (a - d) / 2.0;
    let disc = (diff * diff + b * b).max(0.0).sqrt();
    let lambda1 = trace / 2.0 + disc;
    let lambda2 = trace / 2.0 - disc;

    let axis = if b.abs() > 1e-12 {
        Vector2::new(lambda1 - d, b)
    } else if a >= d {
        Vector2::new(1.0, 0.0)
    } else {
        Vector2::new(0.0, 1.0)
    };
    let norm = axis.norm();
    let axis = if norm > 1e-12 { axis / norm } else { Vector2::new(1.0, 0.0) };
    (lambda1, axis, lambda2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(cx: f64, cy: f64, half_l: f64, half_w: f64, heading: f64, n: usize) -> (Vec<Vector2<f64>>, Vec<f64>) {
        let (c, s) = (heading.cos(), heading.sin());
        let mut pts = Vec::new();
        for i in 0..n {
            let t = i as f64 / (n as f64 - 1.0);
            let lx = -half_l + 2.0 * half_l * t;
            for ly in [-half_w, half_w] {
                let x = cx + lx * c - ly * s;
                let y = cy + lx * s + ly * c;
                pts.push(Vector2::new(x, y));
            }
        }
        let z = vec![0.0; pts.len()];
        (pts, z)
    }

    #[test]
    fn recovers_axis_aligned_rectangle() {
        let (pts, z) = rect(0.0, 0.0, 2.0, 1.0, 0.0, 20);
        let res = compute_obb(&pts, &z);
        assert!((res.obb.length - 4.0).abs() < 0.2);
        assert!((res.obb.width - 2.0).abs() < 0.2);
        assert!(!res.ambiguous);
    }

    #[test]
    fn heading_follows_rotation() {
        let (pts, z) = rect(5.0, -3.0, 2.0, 1.0, std::f64::consts::FRAC_PI_4, 20);
        let res = compute_obb(&pts, &z);
        let delta = (res.obb.heading_rad - std::f64::consts::FRAC_PI_4).rem_euclid(std::f64::consts::PI);
        assert!(delta < 0.1 || (std::f64::consts::PI - delta) < 0.1);
    }

    #[test]
    fn near_square_cluster_flagged_ambiguous() {
        let (pts, z) = rect(0.0, 0.0, 1.0, 0.95, 0.0, 20);
        let res = compute_obb(&pts, &z);
        assert!(res.ambiguous);
    }

    #[test]
    fn height_is_z_extent() {
        let (pts, _z) = rect(0.0, 0.0, 1.0, 1.0, 0.0, 4);
        let z = vec![-1.0, 2.0, 0.0, 1.0, -0.5, 1.5, 0.2, 0.3];
        let res = compute_obb(&pts, &z[..pts.len()]);
        assert!((res.obb.height - 3.0).abs() < 1e-9);
    }
}
