//! High-level entry crate for the `procam-calib` toolbox.
//!
//! A projection-mapping engine points a camera at the surfaces its
//! projectors cover and needs to know, per projector, how projector pixels
//! land in the camera view. This workspace implements the calibration core
//! behind that: a stateful calibrator that, per operator-selected
//! *position*, projects and captures a Gray-code structured-light
//! sequence, decodes per-pixel camera→projector correspondences, and on
//! finalization solves per-projector homographies with robust outlier
//! rejection.
//!
//! The layers, from the bottom up:
//!
//! - [`core`] — math aliases, grayscale frames, correspondence maps, RANSAC;
//! - [`decode`] — pattern sequences and the per-pixel decoder;
//! - [`solve`] — DLT/IRLS homography solving and residual reporting;
//! - [`session`] — pattern sources, sessions, the controller state machine
//!   and the attribute edge.
//!
//! ```no_run
//! use std::time::Duration;
//! use procam::prelude::*;
//!
//! # fn main() -> Result<(), procam::session::CalibrationError> {
//! let controller = CalibrationController::new(CalibratorConfig::default());
//! controller.link_source(Box::new(DirectorySource::new("captures/")))?;
//!
//! controller.command(Command::Calibrate)?;
//! for _ in 0..3 {
//!     controller.command(Command::NextPosition)?;
//!     controller.wait_until_settled(Duration::from_secs(60));
//! }
//! controller.command(Command::FinalizeCalibration)?;
//! controller.wait_until_settled(Duration::from_secs(60));
//!
//! if let Some(result) = controller.result() {
//!     println!("{}", result.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub use procam_core as core;
pub use procam_decode as decode;
pub use procam_session as session;
pub use procam_solve as solve;

/// The commonly-used surface in one import.
pub mod prelude {
    pub use procam_core::{CorrespondenceMap, Gray8, Mat3, PixelMatch, Pt2, Real};
    pub use procam_decode::{decode, DecodeOptions, PatternSequence};
    pub use procam_session::{
        CalibrationController, CalibrationError, CalibratorConfig, Command, ControllerState,
        DirectorySource, MemorySource, PatternSource,
    };
    pub use procam_solve::{CalibrationResult, ProjectorLayout, SolveOptions};
}
