//! Multi-position, multi-projector calibration solving.
//!
//! Pipeline per projector:
//! 1. subsample each position's correspondence map and assign matches to
//!    projector regions (coordinates become region-local),
//! 2. RANSAC a per-position homography; positions without internal consensus
//!    are rejected as outliers up front,
//! 3. pool the surviving inliers across positions, seed IRLS with the
//!    strongest per-position model, and refine one `proj_from_cam`
//!    homography by weighted normalized DLT,
//! 4. reject positions that disagree with the pooled model, refine once
//!    more, and report per-position and overall residuals.
//!
//! The physical rig is assumed static for the whole session; positions vary
//! the calibration surface and therefore the coverage, not the homography.

use log::{debug, warn};
use procam_core::{
    ransac, CorrespondenceMap, Estimator, Mat3, PixelMatch, Pt2, RansacOptions, Real,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::homography::{fit_homography, fit_homography_weighted, transfer_residual};
use crate::robust::RobustKernel;

/// One projector output's rectangle inside the combined raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ProjectorRegion {
    fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32
            && py >= self.y as f32
            && px < (self.x + self.width) as f32
            && py < (self.y + self.height) as f32
    }

    fn to_local(&self, px: f32, py: f32) -> Pt2 {
        Pt2::new(
            Real::from(px) - Real::from(self.x),
            Real::from(py) - Real::from(self.y),
        )
    }
}

/// How projector outputs tile the combined raster.
///
/// Decoded correspondences live in the combined raster; the solver assigns
/// each match to the region containing it and solves per projector in the
/// region-local frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorLayout {
    regions: Vec<ProjectorRegion>,
}

impl ProjectorLayout {
    /// A single projector covering the whole raster.
    pub fn single(width: u32, height: u32) -> Self {
        Self {
            regions: vec![ProjectorRegion {
                x: 0,
                y: 0,
                width: width.max(1),
                height: height.max(1),
            }],
        }
    }

    /// `count` equal projectors tiled side by side.
    pub fn horizontal(count: usize, width: u32, height: u32) -> Self {
        let count = count.max(1);
        let regions = (0..count)
            .map(|i| ProjectorRegion {
                x: i as u32 * width.max(1),
                y: 0,
                width: width.max(1),
                height: height.max(1),
            })
            .collect();
        Self { regions }
    }

    /// Explicit regions. `None` when empty or any region has a zero side.
    pub fn from_regions(regions: Vec<ProjectorRegion>) -> Option<Self> {
        if regions.is_empty() || regions.iter().any(|r| r.width == 0 || r.height == 0) {
            return None;
        }
        Some(Self { regions })
    }

    pub fn regions(&self) -> &[ProjectorRegion] {
        &self.regions
    }

    pub fn projector_count(&self) -> usize {
        self.regions.len()
    }

    /// Size of the combined raster covering every region.
    pub fn raster_size(&self) -> (u32, u32) {
        let w = self
            .regions
            .iter()
            .map(|r| r.x + r.width)
            .max()
            .unwrap_or(1);
        let h = self
            .regions
            .iter()
            .map(|r| r.y + r.height)
            .max()
            .unwrap_or(1);
        (w, h)
    }

    /// Region index and region-local coordinate for a combined-raster point.
    pub fn assign(&self, px: f32, py: f32) -> Option<(usize, Pt2)> {
        self.regions
            .iter()
            .position(|r| r.contains(px, py))
            .map(|idx| (idx, self.regions[idx].to_local(px, py)))
    }
}

/// Solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Minimum number of positions holding valid correspondences.
    pub min_positions: usize,
    /// Minimum pooled inlier matches per projector.
    pub min_matches: usize,
    /// Pixel stride when subsampling correspondence maps.
    pub sample_stride: u32,
    /// Per-position RANSAC configuration.
    pub ransac: RansacOptions,
    /// IRLS loss kernel for the pooled refinement.
    pub kernel: RobustKernel,
    /// Upper bound on IRLS iterations.
    pub max_irls_iters: usize,
    /// RMS delta below which IRLS counts as converged.
    pub residual_tol: Real,
    /// Positions whose inlier RMS exceeds this (internally, or against the
    /// pooled model) are rejected as outliers.
    pub max_position_rms: Real,
    /// Final per-projector RMS above this fails with `DivergedSolution`.
    pub max_rms: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            min_positions: 3,
            min_matches: 32,
            sample_stride: 4,
            ransac: RansacOptions::default(),
            kernel: RobustKernel::Huber { delta: 1.5 },
            max_irls_iters: 20,
            residual_tol: 1e-6,
            max_position_rms: 3.0,
            max_rms: 2.0,
        }
    }
}

/// Per-position fit statistics for one projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFit {
    pub position: usize,
    pub inliers: usize,
    /// RMS of this position's inliers under the final pooled model.
    pub rms: Real,
}

/// Calibration of one projector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorCalibration {
    /// Index into the layout's regions.
    pub projector: usize,
    /// Homography mapping camera pixels to region-local projector pixels.
    pub proj_from_cam: Mat3,
    /// RMS transfer residual over the pooled inliers, in projector pixels.
    pub rms: Real,
    /// Pooled inlier count the refinement used.
    pub inlier_count: usize,
    /// Total matches assigned to this projector before outlier rejection.
    pub match_count: usize,
    /// Whether IRLS met the residual tolerance within its iteration budget.
    pub converged: bool,
    /// Statistics of the surviving positions.
    pub positions: Vec<PositionFit>,
}

/// A position rejected as an outlier for one projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedPosition {
    pub position: usize,
    pub projector: usize,
    /// Inlier RMS of the failed fit, when a fit existed at all.
    pub rms: Option<Real>,
}

/// The published calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub projectors: Vec<ProjectorCalibration>,
    /// Inlier-count-weighted RMS over all projectors, in projector pixels.
    pub overall_rms: Real,
    /// Positions holding valid correspondences that entered the solve.
    pub positions_used: usize,
    pub rejected_positions: Vec<RejectedPosition>,
    /// Matches dropped as pixel-level outliers within used positions.
    pub rejected_matches: usize,
}

impl CalibrationResult {
    /// One-line human summary for status surfaces.
    pub fn summary(&self) -> String {
        format!(
            "{} projector(s), {} position(s), rms {:.3} px",
            self.projectors.len(),
            self.positions_used,
            self.overall_rms
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("need at least {required} positions with valid correspondences, got {positions}")]
    InsufficientData { positions: usize, required: usize },
    #[error(
        "projector {projector}: {matches} usable matches cannot constrain the model (need {required})"
    )]
    InsufficientMatches {
        projector: usize,
        matches: usize,
        required: usize,
    },
    #[error("projector {projector}: residual {rms:.3} px did not converge below {bound:.3} px")]
    DivergedSolution {
        projector: usize,
        rms: Real,
        bound: Real,
    },
}

/// Homography RANSAC estimator over pixel matches.
struct HomographyEstimator;

impl Estimator for HomographyEstimator {
    type Datum = PixelMatch;
    type Model = Mat3;

    const MIN_SAMPLES: usize = 4;

    fn fit(data: &[PixelMatch], sample: &[usize]) -> Option<Mat3> {
        let src: Vec<Pt2> = sample.iter().map(|&i| data[i].camera).collect();
        let dst: Vec<Pt2> = sample.iter().map(|&i| data[i].projector).collect();
        fit_homography(&src, &dst).ok()
    }

    fn residual(model: &Mat3, datum: &PixelMatch) -> Real {
        transfer_residual(model, datum)
    }

    fn is_degenerate(data: &[PixelMatch], sample: &[usize]) -> bool {
        // Any three collinear camera points make the minimal fit unstable.
        for i in 0..sample.len() {
            for j in (i + 1)..sample.len() {
                for k in (j + 1)..sample.len() {
                    let a = data[sample[i]].camera;
                    let b = data[sample[j]].camera;
                    let c = data[sample[k]].camera;
                    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
                    if area.abs() < 1e-6 {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn refit(data: &[PixelMatch], inliers: &[usize]) -> Option<Mat3> {
        let src: Vec<Pt2> = inliers.iter().map(|&i| data[i].camera).collect();
        let dst: Vec<Pt2> = inliers.iter().map(|&i| data[i].projector).collect();
        fit_homography(&src, &dst).ok()
    }
}

/// A position that survived its own consensus check.
struct PositionConsensus {
    position: usize,
    /// Region-local inlier matches.
    inliers: Vec<PixelMatch>,
    /// Matches assigned to the projector before rejection.
    assigned: usize,
    model: Mat3,
}

/// Solve the calibration over all captured positions.
pub fn solve(
    positions: &[&CorrespondenceMap],
    layout: &ProjectorLayout,
    opts: &SolveOptions,
) -> Result<CalibrationResult, SolveError> {
    let usable: Vec<(usize, Vec<PixelMatch>)> = positions
        .iter()
        .enumerate()
        .filter(|(_, map)| map.valid_count() > 0)
        .map(|(idx, map)| (idx, map.matches(opts.sample_stride)))
        .collect();
    if usable.len() < opts.min_positions {
        return Err(SolveError::InsufficientData {
            positions: usable.len(),
            required: opts.min_positions,
        });
    }

    let mut projectors = Vec::with_capacity(layout.projector_count());
    let mut rejected_positions = Vec::new();
    let mut rejected_matches = 0usize;

    for projector in 0..layout.projector_count() {
        let region = layout.regions()[projector];

        // Stage 1: per-position internal consensus.
        let mut kept: Vec<PositionConsensus> = Vec::new();
        for (position, all_matches) in &usable {
            let matches: Vec<PixelMatch> = all_matches
                .iter()
                .filter(|m| region.contains(m.projector.x as f32, m.projector.y as f32))
                .map(|m| PixelMatch {
                    camera: m.camera,
                    projector: region.to_local(m.projector.x as f32, m.projector.y as f32),
                })
                .collect();

            let min_needed = opts.ransac.min_inliers.max(HomographyEstimator::MIN_SAMPLES);
            if matches.len() < min_needed {
                debug!(
                    "projector {projector}: position {position} has only {} matches, rejecting",
                    matches.len()
                );
                rejected_positions.push(RejectedPosition {
                    position: *position,
                    projector,
                    rms: None,
                });
                continue;
            }

            let mut ransac_opts = opts.ransac.clone();
            ransac_opts.seed = opts.ransac.seed.wrapping_add(*position as u64);
            let consensus = ransac::<HomographyEstimator>(&matches, &ransac_opts);

            let Some(model) = consensus.model else {
                warn!("projector {projector}: position {position} found no consensus");
                rejected_positions.push(RejectedPosition {
                    position: *position,
                    projector,
                    rms: None,
                });
                continue;
            };
            if consensus.inlier_rms > opts.max_position_rms {
                warn!(
                    "projector {projector}: position {position} rejected, rms {:.3}",
                    consensus.inlier_rms
                );
                rejected_positions.push(RejectedPosition {
                    position: *position,
                    projector,
                    rms: Some(consensus.inlier_rms),
                });
                continue;
            }

            let inliers: Vec<PixelMatch> =
                consensus.inliers.iter().map(|&i| matches[i]).collect();
            kept.push(PositionConsensus {
                position: *position,
                inliers,
                assigned: matches.len(),
                model,
            });
        }

        // Stage 2: pooled IRLS refinement, seeded from the strongest position.
        let calibration = loop {
            let pooled_count: usize = kept.iter().map(|p| p.inliers.len()).sum();
            let min_needed = opts.min_matches.max(HomographyEstimator::MIN_SAMPLES);
            if pooled_count < min_needed {
                return Err(SolveError::InsufficientMatches {
                    projector,
                    matches: pooled_count,
                    required: opts.min_matches,
                });
            }

            let pooled: Vec<PixelMatch> =
                kept.iter().flat_map(|p| p.inliers.iter().copied()).collect();
            // Seed with the per-position model the whole pool agrees with
            // most; a lone position observing a different warp cannot win
            // this vote against the majority.
            let seed_model = kept
                .iter()
                .map(|p| p.model)
                .max_by_key(|model| {
                    pooled
                        .iter()
                        .filter(|&m| transfer_residual(model, m) <= opts.ransac.inlier_threshold)
                        .count()
                })
                .unwrap_or_else(Mat3::identity);
            let (model, rms, converged) = refine_pooled(seed_model, &pooled, opts);

            // Stage 3: cross-position rejection against the pooled model.
            let mut disagreeing = Vec::new();
            for (idx, pos) in kept.iter().enumerate() {
                let pos_rms = rms_over(&model, &pos.inliers);
                if pos_rms > opts.max_position_rms {
                    disagreeing.push((idx, pos_rms));
                }
            }
            if !disagreeing.is_empty() && disagreeing.len() < kept.len() {
                for &(idx, pos_rms) in disagreeing.iter().rev() {
                    let pos = kept.remove(idx);
                    warn!(
                        "projector {projector}: position {} disagrees with the pooled model (rms {pos_rms:.3})",
                        pos.position
                    );
                    rejected_positions.push(RejectedPosition {
                        position: pos.position,
                        projector,
                        rms: Some(pos_rms),
                    });
                }
                continue; // refine again without the rejected positions
            }

            if rms > opts.max_rms {
                return Err(SolveError::DivergedSolution {
                    projector,
                    rms,
                    bound: opts.max_rms,
                });
            }

            let position_fits = kept
                .iter()
                .map(|p| PositionFit {
                    position: p.position,
                    inliers: p.inliers.len(),
                    rms: rms_over(&model, &p.inliers),
                })
                .collect();
            let match_count: usize = kept.iter().map(|p| p.assigned).sum();
            rejected_matches += match_count - pooled.len();

            debug!(
                "projector {projector}: {} pooled inliers, rms {rms:.4} px, converged {converged}",
                pooled.len()
            );
            break ProjectorCalibration {
                projector,
                proj_from_cam: model,
                rms,
                inlier_count: pooled.len(),
                match_count,
                converged,
                positions: position_fits,
            };
        };

        projectors.push(calibration);
    }

    let weight_sum: usize = projectors.iter().map(|p| p.inlier_count).sum();
    let overall_rms = if weight_sum == 0 {
        Real::INFINITY
    } else {
        let sum_sq: Real = projectors
            .iter()
            .map(|p| p.rms * p.rms * p.inlier_count as Real)
            .sum();
        (sum_sq / weight_sum as Real).sqrt()
    };

    Ok(CalibrationResult {
        projectors,
        overall_rms,
        positions_used: usable.len(),
        rejected_positions,
        rejected_matches,
    })
}

/// IRLS refinement of one projector's pooled inlier matches.
fn refine_pooled(initial: Mat3, pooled: &[PixelMatch], opts: &SolveOptions) -> (Mat3, Real, bool) {
    let src: Vec<Pt2> = pooled.iter().map(|m| m.camera).collect();
    let dst: Vec<Pt2> = pooled.iter().map(|m| m.projector).collect();

    let mut h = initial;
    let mut prev_rms = rms_over(&h, pooled);
    let mut converged = false;

    for _ in 0..opts.max_irls_iters {
        let weights: Vec<Real> = pooled
            .iter()
            .map(|m| {
                let r = transfer_residual(&h, m);
                let r2 = if r.is_finite() { r * r } else { Real::MAX };
                opts.kernel.loss_and_weight(r2).1
            })
            .collect();
        let Ok(next) = fit_homography_weighted(&src, &dst, &weights) else {
            break;
        };
        let next_rms = rms_over(&next, pooled);
        h = next;
        let delta = (prev_rms - next_rms).abs();
        prev_rms = next_rms;
        if delta < opts.residual_tol {
            converged = true;
            break;
        }
    }

    (h, prev_rms, converged)
}

fn rms_over(h: &Mat3, matches: &[PixelMatch]) -> Real {
    if matches.is_empty() {
        return Real::INFINITY;
    }
    let sum_sq: Real = matches
        .iter()
        .map(|m| {
            let r = transfer_residual(h, m);
            if r.is_finite() {
                r * r
            } else {
                Real::MAX
            }
        })
        .sum();
    (sum_sq / matches.len() as Real).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use procam_core::apply_homography;

    fn gt_homography() -> Mat3 {
        Mat3::new(
            1.1, 0.02, 30.0, //
            -0.01, 0.95, 18.0, //
            2e-5, -1e-5, 1.0,
        )
    }

    /// A synthetic position: exact correspondences of `h` over the camera
    /// raster, optionally restricted to a horizontal camera band.
    fn synthetic_map(h: &Mat3, band: Option<(u32, u32)>) -> CorrespondenceMap {
        let (cam_w, cam_h) = (160, 120);
        let (proj_w, proj_h) = (256, 256);
        let mut map = CorrespondenceMap::empty(cam_w, cam_h, proj_w, proj_h);
        for y in 0..cam_h {
            if let Some((lo, hi)) = band {
                if y < lo || y >= hi {
                    continue;
                }
            }
            for x in 0..cam_w {
                let p = Pt2::new(Real::from(x), Real::from(y));
                let Some(q) = apply_homography(h, &p) else {
                    continue;
                };
                if q.x >= 0.0 && q.y >= 0.0 && q.x < Real::from(proj_w) && q.y < Real::from(proj_h)
                {
                    map.set(x, y, q.x as f32, q.y as f32, 1.0);
                }
            }
        }
        map
    }

    fn assert_models_match(found: &Mat3, gt: &Mat3, probe_tol: Real) {
        for &(x, y) in &[(10.0, 10.0), (150.0, 20.0), (80.0, 110.0), (20.0, 90.0)] {
            let p = Pt2::new(x, y);
            let a = apply_homography(found, &p).unwrap();
            let b = apply_homography(gt, &p).unwrap();
            assert!(
                (a - b).norm() < probe_tol,
                "probe ({x},{y}) off by {}",
                (a - b).norm()
            );
        }
    }

    #[test]
    fn noise_free_positions_recover_the_ground_truth() {
        let gt = gt_homography();
        let maps = vec![
            synthetic_map(&gt, Some((0, 50))),
            synthetic_map(&gt, Some((40, 90))),
            synthetic_map(&gt, Some((80, 120))),
        ];
        let refs: Vec<&CorrespondenceMap> = maps.iter().collect();
        let layout = ProjectorLayout::single(256, 256);

        let result = solve(&refs, &layout, &SolveOptions::default()).unwrap();
        assert_eq!(result.projectors.len(), 1);
        assert_eq!(result.positions_used, 3);
        assert!(result.rejected_positions.is_empty());
        assert!(result.overall_rms < 1e-4, "rms {}", result.overall_rms);
        assert!(result.projectors[0].converged);
        assert_eq!(result.projectors[0].positions.len(), 3);
        assert_models_match(&result.projectors[0].proj_from_cam, &gt, 1e-4);
    }

    #[test]
    fn an_inconsistent_position_is_rejected() {
        let gt = gt_homography();
        // The fourth position observes a very different warp; it is
        // internally consistent, so only the cross-position check can
        // catch it.
        let rogue = Mat3::new(0.4, 0.0, 120.0, 0.0, 0.4, 90.0, 0.0, 0.0, 1.0);
        let maps = vec![
            synthetic_map(&gt, None),
            synthetic_map(&gt, None),
            synthetic_map(&gt, None),
            synthetic_map(&rogue, None),
        ];
        let refs: Vec<&CorrespondenceMap> = maps.iter().collect();
        let layout = ProjectorLayout::single(256, 256);

        let result = solve(&refs, &layout, &SolveOptions::default()).unwrap();
        assert_eq!(result.rejected_positions.len(), 1);
        assert_eq!(result.rejected_positions[0].position, 3);
        assert!(result.overall_rms < 1e-4, "rms {}", result.overall_rms);
        assert_models_match(&result.projectors[0].proj_from_cam, &gt, 1e-4);
    }

    #[test]
    fn too_few_positions_is_insufficient_data() {
        let gt = gt_homography();
        let maps = vec![synthetic_map(&gt, None), synthetic_map(&gt, None)];
        let refs: Vec<&CorrespondenceMap> = maps.iter().collect();
        let layout = ProjectorLayout::single(256, 256);

        let err = solve(&refs, &layout, &SolveOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SolveError::InsufficientData {
                positions: 2,
                required: 3
            }
        );
    }

    #[test]
    fn empty_maps_do_not_count_as_positions() {
        let empty = CorrespondenceMap::empty(160, 120, 256, 256);
        let refs: Vec<&CorrespondenceMap> = vec![&empty, &empty, &empty];
        let layout = ProjectorLayout::single(256, 256);

        let err = solve(&refs, &layout, &SolveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SolveError::InsufficientData { positions: 0, .. }
        ));
    }

    #[test]
    fn quantized_correspondences_stay_below_half_a_pixel() {
        let gt = gt_homography();
        // Round projector coordinates to integers, as Gray-code decoding does.
        let mut maps = Vec::new();
        for _ in 0..3 {
            let exact = synthetic_map(&gt, None);
            let (cam_w, cam_h) = exact.camera_size();
            let mut rounded = CorrespondenceMap::empty(cam_w, cam_h, 256, 256);
            for y in 0..cam_h {
                for x in 0..cam_w {
                    if let Some((px, py)) = exact.get(x, y) {
                        rounded.set(x, y, px.round(), py.round(), 1.0);
                    }
                }
            }
            maps.push(rounded);
        }
        let refs: Vec<&CorrespondenceMap> = maps.iter().collect();
        let layout = ProjectorLayout::single(256, 256);

        let result = solve(&refs, &layout, &SolveOptions::default()).unwrap();
        assert!(result.overall_rms < 0.5, "rms {}", result.overall_rms);
        assert_models_match(&result.projectors[0].proj_from_cam, &gt, 0.5);
    }

    #[test]
    fn two_projector_layout_partitions_and_solves_both() {
        // Camera → combined 512x256 raster; each projector is 256 wide.
        let gt = Mat3::new(2.5, 0.0, 10.0, 0.0, 1.8, 8.0, 0.0, 0.0, 1.0);
        let (cam_w, cam_h) = (192, 128);
        let mut maps = Vec::new();
        for _ in 0..3 {
            let mut map = CorrespondenceMap::empty(cam_w, cam_h, 512, 256);
            for y in 0..cam_h {
                for x in 0..cam_w {
                    let p = Pt2::new(Real::from(x), Real::from(y));
                    let q = apply_homography(&gt, &p).unwrap();
                    if q.x >= 0.0 && q.y >= 0.0 && q.x < 512.0 && q.y < 256.0 {
                        map.set(x, y, q.x as f32, q.y as f32, 1.0);
                    }
                }
            }
            maps.push(map);
        }
        let refs: Vec<&CorrespondenceMap> = maps.iter().collect();
        let layout = ProjectorLayout::horizontal(2, 256, 256);

        let result = solve(&refs, &layout, &SolveOptions::default()).unwrap();
        assert_eq!(result.projectors.len(), 2);
        assert!(result.overall_rms < 1e-4);

        // Projector 1 sees the combined warp shifted left by its region.
        let shift = Mat3::new(1.0, 0.0, -256.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let local_gt = shift * gt;
        assert_models_match(&result.projectors[1].proj_from_cam, &local_gt, 1e-4);
    }

    #[test]
    fn layout_raster_size_covers_all_regions() {
        let layout = ProjectorLayout::horizontal(3, 640, 480);
        assert_eq!(layout.raster_size(), (1920, 480));
        assert_eq!(layout.projector_count(), 3);
        assert_eq!(layout.assign(1300.0, 10.0).unwrap().0, 2);
        assert!(layout.assign(2000.0, 10.0).is_none());
    }

    #[test]
    fn options_json_round_trip() {
        let opts = SolveOptions::default();
        let json = serde_json::to_string_pretty(&opts).unwrap();
        let restored: SolveOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.min_positions, opts.min_positions);
        assert_eq!(restored.kernel, opts.kernel);
        assert_eq!(restored.ransac.seed, opts.ransac.seed);
    }
}
