//! End-to-end calibration scenario over the attribute surface.
//!
//! Mirrors the operator flow: link a source, `calibrate=true`,
//! `nextPosition=true` three times, `finalizeCalibration=true`, then read
//! the published result back — all against synthetic Gray-code captures
//! with a known camera→projector homography.

use std::time::Duration;

use nalgebra::Matrix3;
use procam_decode::synthetic::simulate_position;
use procam_decode::PatternSequence;
use procam_session::{
    get_attribute, set_attribute, AttrValue, CalibrationController, CalibratorConfig, Command,
    ControllerState, MemorySource,
};
use procam_solve::{CalibrationResult, ProjectorLayout};

const SETTLE: Duration = Duration::from_secs(60);
const RASTER: u32 = 128;
const CAMERA: u32 = 96;

fn ground_truth() -> Matrix3<f64> {
    // A mild perspective warp keeping the camera view inside the raster.
    Matrix3::new(
        1.1, 0.03, 6.0, //
        -0.02, 1.05, 4.0, //
        1e-4, -5e-5, 1.0,
    )
}

fn controller_over_synthetic_captures(positions: usize) -> CalibrationController {
    let sequence = PatternSequence::new(RASTER, RASTER).unwrap();
    let mut source = MemorySource::default();
    for _ in 0..positions {
        source.push_position(simulate_position(
            &sequence,
            &ground_truth(),
            CAMERA,
            CAMERA,
        ));
    }

    let mut config = CalibratorConfig::default();
    config.layout = ProjectorLayout::single(RASTER, RASTER);
    let controller = CalibrationController::new(config);
    controller.link_source(Box::new(source)).unwrap();
    controller
}

fn pulse(controller: &CalibrationController, name: &str) {
    set_attribute(controller, name, &AttrValue::Str("true".into())).unwrap();
}

#[test]
fn scripted_scenario_reaches_half_pixel_accuracy() {
    let controller = controller_over_synthetic_captures(3);

    pulse(&controller, "calibrate");
    assert_eq!(
        get_attribute(&controller, "state").unwrap(),
        AttrValue::Str("awaitingPosition".into())
    );

    for expected in 1..=3 {
        pulse(&controller, "nextPosition");
        assert_eq!(
            controller.wait_until_settled(SETTLE),
            ControllerState::AwaitingPosition
        );
        assert_eq!(
            get_attribute(&controller, "positionCount").unwrap(),
            AttrValue::Int(expected)
        );
        assert_eq!(
            get_attribute(&controller, "lastError").unwrap(),
            AttrValue::Str(String::new())
        );
    }

    pulse(&controller, "finalizeCalibration");
    assert_eq!(controller.wait_until_settled(SETTLE), ControllerState::Idle);

    // The result is readable through the same attribute path.
    let AttrValue::Str(json) = get_attribute(&controller, "result").unwrap() else {
        panic!("result attribute should be a string");
    };
    assert!(!json.is_empty(), "no result published");
    let result: CalibrationResult = serde_json::from_str(&json).unwrap();

    assert_eq!(result.projectors.len(), 1);
    assert_eq!(result.positions_used, 3);
    assert!(
        result.overall_rms < 0.5,
        "reprojection rms {} px exceeds the half-pixel budget",
        result.overall_rms
    );

    // The recovered warp matches the ground truth where the camera looks.
    let gt = ground_truth();
    let found = result.projectors[0].proj_from_cam;
    for &(x, y) in &[(8.0, 8.0), (80.0, 12.0), (45.0, 88.0), (12.0, 60.0)] {
        let p = nalgebra::Point2::new(x, y);
        let a = procam_core::apply_homography(&found, &p).unwrap();
        let b = procam_core::apply_homography(&gt, &p).unwrap();
        assert!(
            (a - b).norm() < 0.5,
            "probe ({x},{y}) off by {}",
            (a - b).norm()
        );
    }
}

#[test]
fn next_position_is_rejected_outside_a_session() {
    let controller = controller_over_synthetic_captures(3);

    // Before calibrate.
    let err = set_attribute(&controller, "nextPosition", &AttrValue::Bool(true)).unwrap_err();
    assert!(err.to_string().contains("no calibration session"));

    // Run the full cycle, then try again after finalize.
    pulse(&controller, "calibrate");
    for _ in 0..3 {
        pulse(&controller, "nextPosition");
        controller.wait_until_settled(SETTLE);
    }
    pulse(&controller, "finalizeCalibration");
    assert_eq!(controller.wait_until_settled(SETTLE), ControllerState::Idle);

    let err = set_attribute(&controller, "nextPosition", &AttrValue::Bool(true)).unwrap_err();
    assert!(err.to_string().contains("no calibration session"));
}

#[test]
fn finalize_without_positions_leaves_no_result() {
    let controller = controller_over_synthetic_captures(0);

    pulse(&controller, "calibrate");
    let err =
        set_attribute(&controller, "finalizeCalibration", &AttrValue::Bool(true)).unwrap_err();
    assert!(err.to_string().contains("insufficient data"));

    assert_eq!(
        get_attribute(&controller, "result").unwrap(),
        AttrValue::Str(String::new())
    );
    assert_eq!(controller.state(), ControllerState::AwaitingPosition);

    // The session is still alive; aborting returns to idle.
    controller.command(Command::AbortCalibration).unwrap();
    assert_eq!(controller.state(), ControllerState::Idle);
}
