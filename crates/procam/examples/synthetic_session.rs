//! Run a full calibration session against synthetic captures.
//!
//! Builds an in-memory source whose frames are Gray-code patterns warped by
//! a known homography, drives the controller through three positions, and
//! prints the solved calibration next to the ground truth.

use std::time::Duration;

use procam::decode::synthetic::simulate_position;
use procam::decode::PatternSequence;
use procam::prelude::*;

fn main() {
    let raster = 256;
    let camera = 192;
    // Ground truth: camera pixel → projector pixel.
    let ground_truth = Mat3::new(
        1.15, 0.02, 12.0, //
        -0.01, 1.08, 9.0, //
        5e-5, -2e-5, 1.0,
    );

    let sequence = PatternSequence::new(raster, raster).expect("non-empty raster");
    let mut source = MemorySource::default();
    for _ in 0..3 {
        source.push_position(simulate_position(&sequence, &ground_truth, camera, camera));
    }

    let mut config = CalibratorConfig::default();
    config.layout = ProjectorLayout::single(raster, raster);
    let controller = CalibrationController::new(config);
    controller
        .link_source(Box::new(source))
        .expect("controller is idle");

    controller.command(Command::Calibrate).expect("calibrate");
    for position in 0..3 {
        controller
            .command(Command::NextPosition)
            .expect("next position");
        controller.wait_until_settled(Duration::from_secs(120));
        println!(
            "position {position}: {} captured, state {}",
            controller.position_count(),
            controller.state()
        );
    }

    controller
        .command(Command::FinalizeCalibration)
        .expect("finalize");
    controller.wait_until_settled(Duration::from_secs(120));

    let result = controller.result().expect("calibration published");
    println!("solved: {}", result.summary());
    println!("ground truth:\n{ground_truth:.4}");
    println!(
        "recovered (projector 0):\n{:.4}",
        result.projectors[0].proj_from_cam
    );
}
