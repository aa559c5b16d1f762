//! Normalized DLT homography estimation.
//!
//! Points are Hartley-normalized (centroid at the origin, mean distance √2)
//! before building the DLT system; this conditioning is what makes the SVD
//! nullspace extraction reliable at pixel scales. See Hartley & Zisserman,
//! Algorithm 4.2.

use nalgebra::DMatrix;
use procam_core::{apply_homography, Mat3, PixelMatch, Pt2, Real};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HomographyError {
    #[error("need at least 4 correspondences, got {0}")]
    NotEnoughMatches(usize),
    #[error("correspondence geometry is degenerate")]
    Degenerate,
}

/// Estimate `H` such that `dst ~ H src` from point correspondences.
pub fn fit_homography(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
    fit_impl(src, dst, None)
}

/// Weighted variant of [`fit_homography`] for IRLS: each correspondence's
/// DLT rows are scaled by `sqrt(weight)`.
pub fn fit_homography_weighted(
    src: &[Pt2],
    dst: &[Pt2],
    weights: &[Real],
) -> Result<Mat3, HomographyError> {
    fit_impl(src, dst, Some(weights))
}

/// Symmetric-free transfer residual `|H·camera − projector|` for one match.
///
/// Returns infinity when the camera point maps to infinity under `H`, so
/// wild candidate models score as outliers everywhere.
pub fn transfer_residual(h: &Mat3, m: &PixelMatch) -> Real {
    match apply_homography(h, &m.camera) {
        Some(q) => (q - m.projector).norm(),
        None => Real::INFINITY,
    }
}

fn fit_impl(src: &[Pt2], dst: &[Pt2], weights: Option<&[Real]>) -> Result<Mat3, HomographyError> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return Err(HomographyError::NotEnoughMatches(n.min(dst.len())));
    }
    if let Some(w) = weights {
        if w.len() != n {
            return Err(HomographyError::NotEnoughMatches(w.len()));
        }
    }

    let (src_norm, t_src) = normalize(src).ok_or(HomographyError::Degenerate)?;
    let (dst_norm, t_dst) = normalize(dst).ok_or(HomographyError::Degenerate)?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 9);
    for i in 0..n {
        let scale = weights.map_or(1.0, |w| w[i].max(0.0).sqrt());
        let (x, y) = (src_norm[i].x, src_norm[i].y);
        let (u, v) = (dst_norm[i].x, dst_norm[i].y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x * scale;
        a[(r0, 1)] = -y * scale;
        a[(r0, 2)] = -scale;
        a[(r0, 6)] = u * x * scale;
        a[(r0, 7)] = u * y * scale;
        a[(r0, 8)] = u * scale;

        a[(r1, 3)] = -x * scale;
        a[(r1, 4)] = -y * scale;
        a[(r1, 5)] = -scale;
        a[(r1, 6)] = v * x * scale;
        a[(r1, 7)] = v * y * scale;
        a[(r1, 8)] = v * scale;
    }

    // Nullspace of A via SVD: the row of V^T for the smallest singular value.
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::Degenerate)?;
    let h_row = v_t.row(v_t.nrows() - 1);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h_row[3 * r + c];
        }
    }

    // Undo the normalization: H = T_dst^-1 · H_norm · T_src.
    let t_dst_inv = t_dst.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut h = t_dst_inv * h_norm * t_src;

    let pivot = h[(2, 2)];
    if pivot.abs() > Real::EPSILON {
        h /= pivot;
    }
    Ok(h)
}

/// Hartley normalization: centroid at the origin, mean distance √2.
fn normalize(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in points {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in points {
        mean_dist += ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
    }
    mean_dist /= n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let s = Real::sqrt(2.0) / mean_dist;
    let t = Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * s, (p.y - cy) * s))
        .collect();
    Some((normalized, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn apply(h: &Mat3, p: &Pt2) -> Pt2 {
        apply_homography(h, p).unwrap()
    }

    #[test]
    fn recovers_a_scale_map() {
        let src = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(100.0, 0.0),
            Pt2::new(100.0, 100.0),
            Pt2::new(0.0, 100.0),
        ];
        let dst: Vec<Pt2> = src.iter().map(|p| Pt2::new(2.0 * p.x, 2.0 * p.y)).collect();
        let h = fit_homography(&src, &dst).unwrap();
        let q = apply(&h, &Pt2::new(25.0, 75.0));
        assert_relative_eq!(q.x, 50.0, epsilon = 1e-9);
        assert_relative_eq!(q.y, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn recovers_a_perspective_map_at_pixel_scale() {
        let gt = Mat3::new(
            1.05, 0.02, 40.0, //
            -0.03, 0.98, 25.0, //
            1e-5, -2e-5, 1.0,
        );
        let mut src = Vec::new();
        for y in (0..480).step_by(60) {
            for x in (0..640).step_by(80) {
                src.push(Pt2::new(x as Real, y as Real));
            }
        }
        let dst: Vec<Pt2> = src.iter().map(|p| apply(&gt, p)).collect();
        let h = fit_homography(&src, &dst).unwrap();

        for p in &src {
            let q = apply(&h, p);
            let expected = apply(&gt, p);
            assert_relative_eq!(q.x, expected.x, epsilon = 1e-6);
            assert_relative_eq!(q.y, expected.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn too_few_matches_is_an_error() {
        let pts = vec![Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0), Pt2::new(1.0, 1.0)];
        assert_eq!(
            fit_homography(&pts, &pts).unwrap_err(),
            HomographyError::NotEnoughMatches(3)
        );
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let pts = vec![Pt2::new(5.0, 5.0); 6];
        assert_eq!(
            fit_homography(&pts, &pts).unwrap_err(),
            HomographyError::Degenerate
        );
    }

    #[test]
    fn zero_weight_matches_are_ignored_by_the_fit() {
        let gt = Mat3::new(1.0, 0.0, 10.0, 0.0, 1.0, -5.0, 0.0, 0.0, 1.0);
        let mut src = Vec::new();
        for y in (0..200).step_by(40) {
            for x in (0..200).step_by(40) {
                src.push(Pt2::new(x as Real, y as Real));
            }
        }
        let mut dst: Vec<Pt2> = src.iter().map(|p| apply(&gt, p)).collect();
        let mut weights = vec![1.0; src.len()];
        // Corrupt two matches and weight them out.
        dst[3] = Pt2::new(500.0, 500.0);
        dst[7] = Pt2::new(-200.0, 300.0);
        weights[3] = 0.0;
        weights[7] = 0.0;

        let h = fit_homography_weighted(&src, &dst, &weights).unwrap();
        let q = apply(&h, &Pt2::new(60.0, 60.0));
        assert_relative_eq!(q.x, 70.0, epsilon = 1e-6);
        assert_relative_eq!(q.y, 55.0, epsilon = 1e-6);
    }

    #[test]
    fn residual_is_infinite_at_the_warp_horizon() {
        let h = Mat3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -1.0, 0.0, 1.0);
        let m = PixelMatch {
            camera: Pt2::new(1.0, 0.0),
            projector: Pt2::new(0.0, 0.0),
        };
        assert!(transfer_residual(&h, &m).is_infinite());
    }
}
