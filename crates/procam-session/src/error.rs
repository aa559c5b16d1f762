//! Error taxonomy of the calibration core.
//!
//! Every failure is session-scoped: nothing here is fatal to the hosting
//! process, and a fresh `calibrate` command always recovers.

use procam_decode::DecodeError;
use procam_solve::SolveError;
use thiserror::Error;

use crate::controller::ControllerState;
use crate::source::CaptureError;

/// Errors surfaced by the calibration controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// `calibrate` while a session is already open.
    #[error("a calibration session is already active")]
    AlreadyActive,
    /// `calibrate` without a linked pattern source.
    #[error("no pattern source is linked to the calibrator")]
    SourceNotLinked,
    /// A command arrived while a capture or solve pass was running.
    #[error("calibrator is busy ({state})")]
    Busy { state: ControllerState },
    /// A position or finalize command without an open session.
    #[error("no calibration session is active")]
    NoActiveSession,
    /// A pattern frame never became available for a position.
    #[error("position {position}: capture incomplete at frame {frame}: {reason}")]
    CaptureIncomplete {
        position: usize,
        frame: usize,
        reason: String,
    },
    /// A captured frame disagreed with the rest of its set.
    #[error(
        "position {position}: frame {frame} is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        position: usize,
        frame: usize,
        expected_width: u32,
        expected_height: u32,
        got_width: u32,
        got_height: u32,
    },
    /// Too few positions or correspondences to constrain the model.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    /// The solver residual did not converge within bounds.
    #[error("solution diverged: {0}")]
    DivergedSolution(String),
    /// The operator cancelled the session.
    #[error("calibration aborted")]
    Aborted,
    /// The configuration cannot drive a capture (e.g. an empty layout).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CalibrationError {
    pub(crate) fn capture(position: usize, frame: usize, err: CaptureError) -> Self {
        Self::CaptureIncomplete {
            position,
            frame,
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(position: usize, err: DecodeError) -> Self {
        match &err {
            DecodeError::DimensionMismatch {
                frame,
                expected_width,
                expected_height,
                got_width,
                got_height,
            } => Self::DimensionMismatch {
                position,
                frame: *frame,
                expected_width: *expected_width,
                expected_height: *expected_height,
                got_width: *got_width,
                got_height: *got_height,
            },
            DecodeError::FrameCountMismatch { expected, got } => Self::CaptureIncomplete {
                position,
                frame: (*got).min(*expected),
                reason: err.to_string(),
            },
        }
    }
}

impl From<SolveError> for CalibrationError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::InsufficientData { .. } | SolveError::InsufficientMatches { .. } => {
                Self::InsufficientData(err.to_string())
            }
            SolveError::DivergedSolution { .. } => Self::DivergedSolution(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_errors_map_onto_the_taxonomy() {
        let err: CalibrationError = SolveError::InsufficientData {
            positions: 1,
            required: 3,
        }
        .into();
        assert!(matches!(err, CalibrationError::InsufficientData(_)));

        let err: CalibrationError = SolveError::DivergedSolution {
            projector: 0,
            rms: 7.5,
            bound: 2.0,
        }
        .into();
        assert!(matches!(err, CalibrationError::DivergedSolution(_)));
    }

    #[test]
    fn decode_dimension_errors_keep_their_detail() {
        let err = CalibrationError::decode(
            2,
            DecodeError::DimensionMismatch {
                frame: 5,
                expected_width: 640,
                expected_height: 480,
                got_width: 320,
                got_height: 240,
            },
        );
        assert_eq!(
            err,
            CalibrationError::DimensionMismatch {
                position: 2,
                frame: 5,
                expected_width: 640,
                expected_height: 480,
                got_width: 320,
                got_height: 240,
            }
        );
    }
}
