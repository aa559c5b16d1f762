//! Synthetic capture generation.
//!
//! These helpers simulate what a camera would capture while a pattern
//! sequence plays, given a known `proj_from_cam` homography (camera pixel →
//! projector pixel). Tests and examples use them to drive the full
//! decode/solve path against a known ground truth without hardware.

use procam_core::{apply_homography, CorrespondenceMap, Gray8, Mat3, Pt2};

use crate::sequence::PatternSequence;

/// Simulate the captured frame set for one position.
///
/// For every camera pixel the warped projector location is sampled with
/// nearest-neighbour lookup; camera pixels that fall outside the projector
/// raster stay dark in every frame and end up shadow-masked by the decoder.
pub fn simulate_position(
    sequence: &PatternSequence,
    proj_from_cam: &Mat3,
    camera_width: u32,
    camera_height: u32,
) -> Vec<Gray8> {
    sequence
        .kinds()
        .map(|kind| {
            let pattern = sequence.render_kind(kind);
            Gray8::from_fn(camera_width, camera_height, |x, y| {
                match project(sequence, proj_from_cam, x, y) {
                    Some((px, py)) => pattern.get(px, py),
                    None => 0,
                }
            })
        })
        .collect()
}

/// Exact, real-valued correspondence map for a known homography.
///
/// Unlike [`simulate_position`] followed by decoding, this map carries no
/// quantization: it is the ground truth the solver should reproduce.
pub fn exact_map(
    proj_from_cam: &Mat3,
    camera_width: u32,
    camera_height: u32,
    projector_width: u32,
    projector_height: u32,
) -> CorrespondenceMap {
    let mut map = CorrespondenceMap::empty(
        camera_width,
        camera_height,
        projector_width,
        projector_height,
    );
    for y in 0..camera_height {
        for x in 0..camera_width {
            let p = Pt2::new(f64::from(x), f64::from(y));
            let Some(q) = apply_homography(proj_from_cam, &p) else {
                continue;
            };
            if q.x >= 0.0
                && q.y >= 0.0
                && q.x < f64::from(projector_width)
                && q.y < f64::from(projector_height)
            {
                map.set(x, y, q.x as f32, q.y as f32, 1.0);
            }
        }
    }
    map
}

/// Nearest-neighbour projector lookup for a camera pixel, `None` outside
/// the raster.
fn project(
    sequence: &PatternSequence,
    proj_from_cam: &Mat3,
    x: u32,
    y: u32,
) -> Option<(u32, u32)> {
    let p = Pt2::new(f64::from(x), f64::from(y));
    let q = apply_homography(proj_from_cam, &p)?;
    let px = q.x.round();
    let py = q.y.round();
    if px < 0.0 || py < 0.0 || px >= f64::from(sequence.width()) || py >= f64::from(sequence.height())
    {
        return None;
    }
    Some((px as u32, py as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, DecodeOptions};

    #[test]
    fn identity_warp_reproduces_the_raster() {
        let seq = PatternSequence::new(32, 32).unwrap();
        let frames = simulate_position(&seq, &Mat3::identity(), 32, 32);
        let map = decode(&seq, &frames, &DecodeOptions::default()).unwrap();
        assert_eq!(map.valid_count(), 32 * 32);
        assert_eq!(map.get(7, 9), Some((7.0, 9.0)));
    }

    #[test]
    fn shifted_warp_is_recovered_by_the_decoder() {
        let seq = PatternSequence::new(64, 64).unwrap();
        // Camera pixel (x, y) observes projector pixel (x + 8, y + 4).
        let h = Mat3::new(1.0, 0.0, 8.0, 0.0, 1.0, 4.0, 0.0, 0.0, 1.0);
        let frames = simulate_position(&seq, &h, 64, 64);
        let map = decode(&seq, &frames, &DecodeOptions::default()).unwrap();
        assert_eq!(map.get(10, 20), Some((18.0, 24.0)));
        // Camera pixels warping past the raster edge are absent.
        assert!(map.get(60, 20).is_none());
    }

    #[test]
    fn exact_map_matches_the_homography() {
        let h = Mat3::new(1.2, 0.01, 5.0, -0.02, 0.9, 3.0, 1e-5, -1e-5, 1.0);
        let map = exact_map(&h, 40, 40, 128, 128);
        let (px, py) = map.get(10, 12).unwrap();
        let q = apply_homography(&h, &Pt2::new(10.0, 12.0)).unwrap();
        assert!((f64::from(px) - q.x).abs() < 1e-4);
        assert!((f64::from(py) - q.y).abs() < 1e-4);
    }
}
