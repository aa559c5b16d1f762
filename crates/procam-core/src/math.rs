//! Linear algebra type aliases and homography helpers.

use nalgebra::{Matrix3, Point2, Vector2, Vector3};

/// Scalar type used throughout the workspace (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;

/// Convert a 2D point into homogeneous coordinates `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Apply a homography to a 2D point.
///
/// Returns `None` when the point maps to infinity (homogeneous `w ≈ 0`),
/// which happens for points on the pre-image of the line at infinity of a
/// perspective warp.
pub fn apply_homography(h: &Mat3, p: &Pt2) -> Option<Pt2> {
    let q = h * to_homogeneous(p);
    if q.z.abs() <= Real::EPSILON {
        return None;
    }
    Some(Pt2::new(q.x / q.z, q.y / q.z))
}
