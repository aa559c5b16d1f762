//! Calibration sessions and their per-position records.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use procam_core::{CorrespondenceMap, Real};
use procam_decode::DecodeOptions;
use procam_solve::{ProjectorLayout, SolveOptions};
use serde::{Deserialize, Serialize};

/// Configuration of the calibrator, snapshotted into each session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratorConfig {
    /// Projector output regions tiling the combined raster; the pattern
    /// sequence covers the whole raster.
    pub layout: ProjectorLayout,
    /// Upper bound on a single frame capture wait.
    pub capture_timeout_ms: u64,
    /// Additional attempts after a failed position capture.
    pub position_retries: u32,
    /// Decoder thresholds.
    pub decode: DecodeOptions,
    /// Solver configuration.
    pub solve: SolveOptions,
    /// Directory of pattern/capture assets (set through the `file`
    /// attribute; consumed by directory-backed sources).
    pub asset_dir: Option<PathBuf>,
    /// When set, captured frames are written here as
    /// `pos_<n>/pattern_<k>.png` for offline diagnostics.
    pub dump_dir: Option<PathBuf>,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            layout: ProjectorLayout::single(1024, 768),
            capture_timeout_ms: 5000,
            position_retries: 2,
            decode: DecodeOptions::default(),
            solve: SolveOptions::default(),
            asset_dir: None,
            dump_dir: None,
        }
    }
}

impl CalibratorConfig {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

/// Decode quality of one position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeQuality {
    /// Valid correspondences as a fraction of camera pixels.
    pub valid_fraction: Real,
    /// Mean decode confidence over valid pixels.
    pub mean_confidence: Real,
}

impl DecodeQuality {
    pub fn of(map: &CorrespondenceMap) -> Self {
        Self {
            valid_fraction: map.valid_fraction(),
            mean_confidence: map.mean_confidence(),
        }
    }
}

/// One captured position. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    /// 0-based, monotonically increasing within the session.
    pub index: usize,
    /// Unix timestamp of the capture, seconds.
    pub captured_at: u64,
    pub quality: DecodeQuality,
    pub correspondences: CorrespondenceMap,
}

/// Lightweight operation log entry, kept with the session for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix timestamp of the operation, seconds.
    pub timestamp: u64,
    /// Operation name (e.g. `"calibrate"`, `"nextPosition"`).
    pub operation: String,
    pub success: bool,
    pub notes: Option<String>,
}

impl LogEntry {
    pub fn success(operation: impl Into<String>) -> Self {
        Self {
            timestamp: unix_timestamp(),
            operation: operation.into(),
            success: true,
            notes: None,
        }
    }

    pub fn failure(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: unix_timestamp(),
            operation: operation.into(),
            success: false,
            notes: Some(error.into()),
        }
    }
}

/// One calibrate-to-finalize cycle.
///
/// Owned exclusively by the controller; position records are append-only
/// and never mutated after they are decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSession {
    pub id: u64,
    /// Unix timestamp of session creation, seconds.
    pub created_at: u64,
    /// Configuration snapshot taken when the session opened.
    pub config: CalibratorConfig,
    positions: Vec<PositionRecord>,
    pub log: Vec<LogEntry>,
}

impl CalibrationSession {
    pub fn new(id: u64, config: CalibratorConfig) -> Self {
        Self {
            id,
            created_at: unix_timestamp(),
            config,
            positions: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn positions(&self) -> &[PositionRecord] {
        &self.positions
    }

    /// Index the next captured position will get.
    pub fn next_index(&self) -> usize {
        self.positions.len()
    }

    /// Positions holding at least one valid correspondence.
    pub fn valid_positions(&self) -> usize {
        self.positions
            .iter()
            .filter(|record| record.correspondences.valid_count() > 0)
            .count()
    }

    pub(crate) fn push_position(&mut self, record: PositionRecord) {
        debug_assert_eq!(record.index, self.positions.len());
        self.positions.push(record);
    }
}

/// Current Unix timestamp in seconds (0 when the clock is before the epoch).
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
