//! Calibration CLI: drive a full session over pre-recorded captures.
//!
//! Point it at a capture workspace (`pos_0/pattern_00.png`, ...) and it
//! runs calibrate → one position per `pos_*` directory → finalize, then
//! prints the calibration report as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use procam_session::{
    CalibrationController, CalibratorConfig, Command, ControllerState, DirectorySource,
};
use procam_solve::CalibrationResult;

/// How long one capture or solve pass may run before the CLI gives up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Parser)]
#[command(author, version, about = "Structured-light projector calibration from captured frames")]
struct Args {
    /// Capture workspace containing pos_<n>/pattern_<k>.png sets.
    #[arg(long)]
    captures: PathBuf,

    /// Optional JSON calibrator configuration (layout, thresholds, solver).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of positions to ingest; defaults to the pos_* directories
    /// present under --captures.
    #[arg(long)]
    positions: Option<usize>,
}

fn main() {
    env_logger::init();
    match run(Args::parse()) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: cannot serialize the report: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<CalibrationResult> {
    let config = load_config(args.config.as_deref())?;
    let source = DirectorySource::new(&args.captures);
    let positions = args.positions.unwrap_or_else(|| source.position_count());
    if positions == 0 {
        bail!(
            "no pos_* capture directories found under {}",
            args.captures.display()
        );
    }

    let controller = CalibrationController::new(config);
    controller.link_source(Box::new(source))?;
    controller.command(Command::Calibrate)?;

    for position in 0..positions {
        controller.command(Command::NextPosition)?;
        controller.wait_until_settled(SETTLE_TIMEOUT);
        let captured = controller.position_count();
        if captured != position + 1 {
            let reason = controller
                .last_error()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "capture did not complete".into());
            bail!("position {position} failed: {reason}");
        }
    }

    controller.command(Command::FinalizeCalibration)?;
    match controller.wait_until_settled(SETTLE_TIMEOUT) {
        ControllerState::Idle => controller
            .result()
            .context("controller returned to idle without a result"),
        state => {
            let reason = controller
                .last_error()
                .map(|err| err.to_string())
                .unwrap_or_else(|| format!("controller stuck in state {state}"));
            bail!("calibration failed: {reason}");
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<CalibratorConfig> {
    let Some(path) = path else {
        return Ok(CalibratorConfig::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("cannot parse config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;
    use procam_decode::synthetic::simulate_position;
    use procam_decode::PatternSequence;
    use procam_solve::ProjectorLayout;
    use std::path::Path;

    const RASTER: u32 = 64;
    const CAMERA: u32 = 64;

    fn write_captures(root: &Path, positions: usize) {
        let sequence = PatternSequence::new(RASTER, RASTER).unwrap();
        let warp = Matrix3::new(0.9, 0.0, 2.0, 0.0, 0.9, 1.0, 0.0, 0.0, 1.0);
        for position in 0..positions {
            let dir = root.join(format!("pos_{position}"));
            std::fs::create_dir_all(&dir).unwrap();
            for (frame, image) in simulate_position(&sequence, &warp, CAMERA, CAMERA)
                .iter()
                .enumerate()
            {
                image::save_buffer(
                    dir.join(format!("pattern_{frame:02}.png")),
                    image.as_slice(),
                    image.width(),
                    image.height(),
                    image::ExtendedColorType::L8,
                )
                .unwrap();
            }
        }
    }

    fn layout_config(dir: &Path) -> PathBuf {
        let mut config = CalibratorConfig::default();
        config.layout = ProjectorLayout::single(RASTER, RASTER);
        let path = dir.join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        path
    }

    #[test]
    fn calibrates_a_recorded_workspace() {
        let dir = tempfile::tempdir().unwrap();
        write_captures(dir.path(), 3);
        let config = layout_config(dir.path());

        let result = run(Args {
            captures: dir.path().to_path_buf(),
            config: Some(config),
            positions: None,
        })
        .unwrap();

        assert_eq!(result.positions_used, 3);
        assert!(result.overall_rms < 0.5, "rms {}", result.overall_rms);
    }

    #[test]
    fn an_empty_workspace_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Args {
            captures: dir.path().to_path_buf(),
            config: None,
            positions: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("no pos_*"));
    }

    #[test]
    fn a_missing_frame_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_captures(dir.path(), 3);
        let config = layout_config(dir.path());
        // Remove one frame from the second position.
        std::fs::remove_file(dir.path().join("pos_1").join("pattern_03.png")).unwrap();

        let err = run(Args {
            captures: dir.path().to_path_buf(),
            config: Some(config),
            positions: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("position 1 failed"), "{err}");
    }
}
