//! Calibration solver for projector/camera correspondence sets.
//!
//! Given the decoded correspondence maps of all captured positions, this
//! crate partitions matches onto projector output regions, rejects outlier
//! positions and pixels (RANSAC), and solves one `proj_from_cam` homography
//! per projector by iteratively re-weighted normalized DLT.

/// Normalized DLT homography estimation.
pub mod homography;
/// Robust IRLS loss kernels.
pub mod robust;
/// The multi-position, multi-projector solver.
pub mod solver;

pub use homography::{fit_homography, fit_homography_weighted, transfer_residual, HomographyError};
pub use robust::RobustKernel;
pub use solver::{
    solve, CalibrationResult, PositionFit, ProjectorCalibration, ProjectorLayout, ProjectorRegion,
    RejectedPosition, SolveError, SolveOptions,
};
