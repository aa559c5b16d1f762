//! Typed translation of the generic attribute surface.
//!
//! The scene-graph transport addresses objects with string-keyed setters
//! and getters. At this boundary those become a closed set of typed
//! operations on the [`CalibrationController`]; unknown names and
//! mistyped payloads are rejected, never silently accepted.
//!
//! Write attributes: `file`, `calibrate`, `nextPosition`,
//! `finalizeCalibration`, `abortCalibration`, `captureTimeoutMs`,
//! `positionRetries`, `minContrast`.
//! Read attributes: `state`, `lastError`, `positionCount`, `result`,
//! `file`.

use std::path::PathBuf;

use thiserror::Error;

use crate::controller::{CalibrationController, Command};
use crate::error::CalibrationError;
use crate::source::DirectorySource;

/// A generic attribute payload, as the transport delivers it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

impl AttrValue {
    /// Boolean coercion matching the transport's habits: booleans,
    /// integers (non-zero = true) and the strings `"true"`/`"false"`/
    /// `"1"`/`"0"` are accepted.
    fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            AttrValue::Int(value) => Some(*value != 0),
            AttrValue::Str(value) => match value.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            AttrValue::Real(_) => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(value) => Some(*value),
            AttrValue::Str(value) => value.parse().ok(),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// Errors of the attribute edge itself, wrapping core errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    #[error("unknown attribute '{0}'")]
    Unknown(String),
    #[error("attribute '{name}' expects {expected}")]
    InvalidValue {
        name: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Apply one generic attribute write to the calibrator.
///
/// The trigger attributes are pulses: setting them to `true` issues the
/// command, setting them to `false` is a no-op (the transport releases
/// pulses that way).
pub fn set_attribute(
    controller: &CalibrationController,
    name: &str,
    value: &AttrValue,
) -> Result<(), AttributeError> {
    match name {
        "calibrate" => pulse(controller, name, value, Command::Calibrate),
        "nextPosition" => pulse(controller, name, value, Command::NextPosition),
        "finalizeCalibration" => pulse(controller, name, value, Command::FinalizeCalibration),
        "abortCalibration" => pulse(controller, name, value, Command::AbortCalibration),
        "file" => {
            let dir = value.as_str().ok_or(AttributeError::InvalidValue {
                name: name.into(),
                expected: "a directory path string",
            })?;
            let dir = PathBuf::from(dir);
            controller.update_config(|config| config.asset_dir = Some(dir.clone()))?;
            // Mirror the scene graph's `image_list` convenience: a file
            // attribute on an unlinked calibrator links a directory source.
            if !controller.has_source() {
                controller.link_source(Box::new(DirectorySource::new(dir)))?;
            }
            Ok(())
        }
        "captureTimeoutMs" => {
            let ms = positive_int(name, value)?;
            controller.update_config(|config| config.capture_timeout_ms = ms as u64)?;
            Ok(())
        }
        "positionRetries" => {
            let retries = non_negative_int(name, value)?;
            controller.update_config(|config| config.position_retries = retries as u32)?;
            Ok(())
        }
        "minContrast" => {
            let contrast = non_negative_int(name, value)?;
            if contrast > i64::from(u8::MAX) {
                return Err(AttributeError::InvalidValue {
                    name: name.into(),
                    expected: "an integer in 0..=255",
                });
            }
            controller.update_config(|config| config.decode.min_contrast = contrast as u8)?;
            Ok(())
        }
        _ => Err(AttributeError::Unknown(name.into())),
    }
}

/// Answer one generic attribute read.
pub fn get_attribute(
    controller: &CalibrationController,
    name: &str,
) -> Result<AttrValue, AttributeError> {
    match name {
        "state" => Ok(AttrValue::Str(controller.state().to_string())),
        "lastError" => Ok(AttrValue::Str(
            controller
                .last_error()
                .map(|err| err.to_string())
                .unwrap_or_default(),
        )),
        "positionCount" => Ok(AttrValue::Int(controller.position_count() as i64)),
        "result" => {
            let json = controller
                .result()
                .map(|result| serde_json::to_string(&result).unwrap_or_default())
                .unwrap_or_default();
            Ok(AttrValue::Str(json))
        }
        "file" => Ok(AttrValue::Str(
            controller
                .config()
                .asset_dir
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        )),
        _ => Err(AttributeError::Unknown(name.into())),
    }
}

fn pulse(
    controller: &CalibrationController,
    name: &str,
    value: &AttrValue,
    command: Command,
) -> Result<(), AttributeError> {
    let triggered = value.as_bool().ok_or(AttributeError::InvalidValue {
        name: name.into(),
        expected: "a boolean pulse",
    })?;
    if triggered {
        controller.command(command)?;
    }
    Ok(())
}

fn positive_int(name: &str, value: &AttrValue) -> Result<i64, AttributeError> {
    match value.as_int() {
        Some(v) if v > 0 => Ok(v),
        _ => Err(AttributeError::InvalidValue {
            name: name.into(),
            expected: "a positive integer",
        }),
    }
}

fn non_negative_int(name: &str, value: &AttrValue) -> Result<i64, AttributeError> {
    match value.as_int() {
        Some(v) if v >= 0 => Ok(v),
        _ => Err(AttributeError::InvalidValue {
            name: name.into(),
            expected: "a non-negative integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerState;
    use crate::session::CalibratorConfig;

    fn controller() -> CalibrationController {
        CalibrationController::new(CalibratorConfig::default())
    }

    #[test]
    fn unknown_attributes_are_rejected() {
        let ctl = controller();
        assert_eq!(
            set_attribute(&ctl, "warp", &AttrValue::Bool(true)).unwrap_err(),
            AttributeError::Unknown("warp".into())
        );
        assert_eq!(
            get_attribute(&ctl, "warp").unwrap_err(),
            AttributeError::Unknown("warp".into())
        );
    }

    #[test]
    fn string_pulses_are_coerced() {
        let ctl = controller();
        // The reference transport sends "true" strings for pulses; without
        // a linked source the command itself is rejected, proving the
        // coercion reached the controller.
        let err = set_attribute(&ctl, "calibrate", &AttrValue::Str("true".into())).unwrap_err();
        assert_eq!(
            err,
            AttributeError::Calibration(CalibrationError::SourceNotLinked)
        );
        // A released pulse is a no-op.
        set_attribute(&ctl, "calibrate", &AttrValue::Str("false".into())).unwrap();
        assert_eq!(ctl.state(), ControllerState::Idle);
    }

    #[test]
    fn file_attribute_links_a_directory_source() {
        let ctl = controller();
        assert!(!ctl.has_source());
        set_attribute(&ctl, "file", &AttrValue::Str("/tmp/captures".into())).unwrap();
        assert!(ctl.has_source());
        assert_eq!(
            get_attribute(&ctl, "file").unwrap(),
            AttrValue::Str("/tmp/captures".into())
        );
    }

    #[test]
    fn config_attributes_update_the_config() {
        let ctl = controller();
        set_attribute(&ctl, "captureTimeoutMs", &AttrValue::Int(250)).unwrap();
        set_attribute(&ctl, "positionRetries", &AttrValue::Int(5)).unwrap();
        set_attribute(&ctl, "minContrast", &AttrValue::Int(40)).unwrap();

        let config = ctl.config();
        assert_eq!(config.capture_timeout_ms, 250);
        assert_eq!(config.position_retries, 5);
        assert_eq!(config.decode.min_contrast, 40);
    }

    #[test]
    fn mistyped_payloads_are_invalid() {
        let ctl = controller();
        assert!(matches!(
            set_attribute(&ctl, "captureTimeoutMs", &AttrValue::Int(0)).unwrap_err(),
            AttributeError::InvalidValue { .. }
        ));
        assert!(matches!(
            set_attribute(&ctl, "minContrast", &AttrValue::Int(300)).unwrap_err(),
            AttributeError::InvalidValue { .. }
        ));
        assert!(matches!(
            set_attribute(&ctl, "calibrate", &AttrValue::Str("maybe".into())).unwrap_err(),
            AttributeError::InvalidValue { .. }
        ));
    }

    #[test]
    fn read_path_reports_state_and_counts() {
        let ctl = controller();
        assert_eq!(
            get_attribute(&ctl, "state").unwrap(),
            AttrValue::Str("idle".into())
        );
        assert_eq!(
            get_attribute(&ctl, "positionCount").unwrap(),
            AttrValue::Int(0)
        );
        assert_eq!(get_attribute(&ctl, "lastError").unwrap(), AttrValue::Str(String::new()));
        assert_eq!(get_attribute(&ctl, "result").unwrap(), AttrValue::Str(String::new()));
    }
}
