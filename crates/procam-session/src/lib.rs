//! Stateful control surface of the geometric calibrator.
//!
//! This crate owns everything between the attribute transport and the
//! algorithm crates:
//! - [`PatternSource`], the readiness-signalled capture abstraction (with
//!   directory- and memory-backed implementations),
//! - [`CalibrationSession`] and its per-position records,
//! - [`CalibrationController`], the state machine driving capture, decode
//!   and solve,
//! - [`attributes`], the typed translation of the generic string-keyed
//!   attribute surface.
//!
//! A typical embedding links a source, then pulses commands:
//!
//! ```no_run
//! use std::time::Duration;
//! use procam_session::{CalibrationController, CalibratorConfig, Command, DirectorySource};
//!
//! # fn main() -> Result<(), procam_session::CalibrationError> {
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

/// Typed translation of the generic attribute surface.
pub mod attributes;
/// The controller state machine.
pub mod controller;
/// Error taxonomy of the calibration core.
pub mod error;
/// Sessions, position records and the calibrator configuration.
pub mod session;
/// Pattern sources and capture errors.
pub mod source;

pub use attributes::{get_attribute, set_attribute, AttrValue, AttributeError};
pub use controller::{CalibrationController, Command, ControllerState};
pub use error::CalibrationError;
pub use session::{CalibrationSession, CalibratorConfig, DecodeQuality, LogEntry, PositionRecord};
pub use source::{CaptureError, CaptureRequest, DirectorySource, MemorySource, PatternSource};
