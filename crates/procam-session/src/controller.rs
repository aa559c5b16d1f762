//! The calibration controller state machine.
//!
//! One controller drives one calibrator object. Commands are accepted from
//! any thread; capture/decode and the final solve run on a worker thread
//! while the controller reports `CapturingPosition`/`Finalizing`, during
//! which every other command is rejected with `Busy`. Waiting for a
//! captured frame is the only blocking point, and it is bounded by the
//! configured capture timeout — readiness comes from the source, never
//! from a guessed delay.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use procam_core::Gray8;
use procam_decode::{decode, PatternSequence};
use procam_solve::{solve, CalibrationResult};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::session::{
    unix_timestamp, CalibrationSession, CalibratorConfig, DecodeQuality, LogEntry, PositionRecord,
};
use crate::source::{CaptureRequest, PatternSource};

/// Observable state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// No session open. A previous result may still be readable.
    Idle,
    /// Transient: a session is being allocated.
    Calibrating,
    /// Session open, waiting for the operator.
    AwaitingPosition,
    /// A position capture/decode pass is running.
    CapturingPosition,
    /// The solver is running.
    Finalizing,
    /// The last session failed; it is retained for diagnostics.
    Failed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::Calibrating => "calibrating",
            ControllerState::AwaitingPosition => "awaitingPosition",
            ControllerState::CapturingPosition => "capturingPosition",
            ControllerState::Finalizing => "finalizing",
            ControllerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The closed command set of the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a new session (`calibrate=true`).
    Calibrate,
    /// Capture and decode one position (`nextPosition=true`).
    NextPosition,
    /// Solve and publish (`finalizeCalibration=true`).
    FinalizeCalibration,
    /// Discard the in-progress session (`abortCalibration=true`).
    AbortCalibration,
}

struct Cell {
    state: ControllerState,
    config: CalibratorConfig,
    session: Option<CalibrationSession>,
    result: Option<CalibrationResult>,
    last_error: Option<CalibrationError>,
}

struct Shared {
    cell: Mutex<Cell>,
    settled: Condvar,
    source: Mutex<Option<Box<dyn PatternSource>>>,
    abort: AtomicBool,
    session_counter: AtomicU64,
}

/// The state machine behind the calibrator object's attribute surface.
pub struct CalibrationController {
    shared: Arc<Shared>,
}

impl Default for CalibrationController {
    fn default() -> Self {
        Self::new(CalibratorConfig::default())
    }
}

impl CalibrationController {
    pub fn new(config: CalibratorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                cell: Mutex::new(Cell {
                    state: ControllerState::Idle,
                    config,
                    session: None,
                    result: None,
                    last_error: None,
                }),
                settled: Condvar::new(),
                source: Mutex::new(None),
                abort: AtomicBool::new(false),
                session_counter: AtomicU64::new(0),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Source and configuration
    // ─────────────────────────────────────────────────────────────────────

    /// Attach the capture source. Rejected while a session is open.
    pub fn link_source(&self, source: Box<dyn PatternSource>) -> Result<(), CalibrationError> {
        self.require_inactive()?;
        *lock(&self.shared.source) = Some(source);
        Ok(())
    }

    /// Detach the capture source. Rejected while a session is open.
    pub fn unlink_source(&self) -> Result<(), CalibrationError> {
        self.require_inactive()?;
        *lock(&self.shared.source) = None;
        Ok(())
    }

    pub fn has_source(&self) -> bool {
        lock(&self.shared.source).is_some()
    }

    /// Replace the configuration. Rejected while a session is open (the
    /// open session keeps its snapshot).
    pub fn set_config(&self, config: CalibratorConfig) -> Result<(), CalibrationError> {
        self.update_config(|current| *current = config)
    }

    /// Mutate the configuration in place. Rejected while a session is open.
    pub fn update_config(
        &self,
        mutate: impl FnOnce(&mut CalibratorConfig),
    ) -> Result<(), CalibrationError> {
        let mut cell = self.cell();
        match cell.state {
            ControllerState::Idle | ControllerState::Failed => {}
            ControllerState::CapturingPosition | ControllerState::Finalizing => {
                return Err(CalibrationError::Busy { state: cell.state })
            }
            _ => return Err(CalibrationError::AlreadyActive),
        }
        mutate(&mut cell.config);
        Ok(())
    }

    pub fn config(&self) -> CalibratorConfig {
        self.cell().config.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    /// Execute one operator command.
    ///
    /// Rejections are returned synchronously; capture and solve failures
    /// surface later through [`CalibrationController::last_error`] and the
    /// controller state.
    pub fn command(&self, command: Command) -> Result<(), CalibrationError> {
        match command {
            Command::Calibrate => self.start_session(),
            Command::NextPosition => self.start_position(),
            Command::FinalizeCalibration => self.start_finalize(),
            Command::AbortCalibration => self.abort(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> ControllerState {
        self.cell().state
    }

    pub fn last_error(&self) -> Option<CalibrationError> {
        self.cell().last_error.clone()
    }

    /// The most recently published calibration, if any.
    pub fn result(&self) -> Option<CalibrationResult> {
        self.cell().result.clone()
    }

    /// Positions captured so far in the open (or failed) session.
    pub fn position_count(&self) -> usize {
        self.cell()
            .session
            .as_ref()
            .map(|session| session.positions().len())
            .unwrap_or(0)
    }

    pub fn session_id(&self) -> Option<u64> {
        self.cell().session.as_ref().map(|session| session.id)
    }

    /// Snapshot of the open or failed session, for diagnostics.
    pub fn session_diagnostics(&self) -> Option<CalibrationSession> {
        self.cell().session.clone()
    }

    /// Block until no capture or solve pass is running, bounded by
    /// `timeout`. Returns the state observed when waiting stopped.
    pub fn wait_until_settled(&self, timeout: Duration) -> ControllerState {
        let guard = self.cell();
        let (guard, _) = self
            .shared
            .settled
            .wait_timeout_while(guard, timeout, |cell| {
                matches!(
                    cell.state,
                    ControllerState::CapturingPosition | ControllerState::Finalizing
                )
            })
            .unwrap_or_else(|err| err.into_inner());
        guard.state
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────

    fn start_session(&self) -> Result<(), CalibrationError> {
        // State first: while a worker runs it holds the source lock, so the
        // Busy rejection must not touch the source mutex.
        self.require_inactive()?;
        if !self.has_source() {
            return Err(CalibrationError::SourceNotLinked);
        }
        let mut cell = self.cell();
        match cell.state {
            ControllerState::Idle | ControllerState::Failed => {}
            ControllerState::CapturingPosition | ControllerState::Finalizing => {
                return Err(CalibrationError::Busy { state: cell.state })
            }
            _ => return Err(CalibrationError::AlreadyActive),
        }

        cell.state = ControllerState::Calibrating;
        self.shared.abort.store(false, Ordering::SeqCst);
        let id = self.shared.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut session = CalibrationSession::new(id, cell.config.clone());
        session.log.push(LogEntry::success("calibrate"));
        cell.session = Some(session);
        cell.last_error = None;
        cell.state = ControllerState::AwaitingPosition;
        info!("calibration session {id} opened");
        self.shared.settled.notify_all();
        Ok(())
    }

    fn start_position(&self) -> Result<(), CalibrationError> {
        let (index, config) = {
            let mut cell = self.cell();
            match cell.state {
                ControllerState::AwaitingPosition => {}
                ControllerState::CapturingPosition | ControllerState::Finalizing => {
                    return Err(CalibrationError::Busy { state: cell.state })
                }
                _ => return Err(CalibrationError::NoActiveSession),
            }
            let Some(session) = cell.session.as_ref() else {
                return Err(CalibrationError::NoActiveSession);
            };
            let index = session.next_index();
            let config = session.config.clone();
            cell.state = ControllerState::CapturingPosition;
            (index, config)
        };

        debug!("capturing position {index}");
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || capture_worker(&shared, index, &config));
        Ok(())
    }

    fn start_finalize(&self) -> Result<(), CalibrationError> {
        let (session, config) = {
            let mut cell = self.cell();
            match cell.state {
                ControllerState::AwaitingPosition => {}
                ControllerState::CapturingPosition | ControllerState::Finalizing => {
                    return Err(CalibrationError::Busy { state: cell.state })
                }
                _ => return Err(CalibrationError::NoActiveSession),
            }
            let Some(session) = cell.session.take() else {
                return Err(CalibrationError::NoActiveSession);
            };
            if session.valid_positions() == 0 {
                // The session stays open; the operator can still capture.
                cell.session = Some(session);
                return Err(CalibrationError::InsufficientData(
                    "no positions with valid correspondences have been captured".into(),
                ));
            }
            let config = session.config.clone();
            cell.state = ControllerState::Finalizing;
            (session, config)
        };

        info!(
            "finalizing session {} with {} position(s)",
            session.id,
            session.positions().len()
        );
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || finalize_worker(&shared, session, &config));
        Ok(())
    }

    fn abort(&self) -> Result<(), CalibrationError> {
        let mut cell = self.cell();
        match cell.state {
            ControllerState::Idle => Ok(()),
            ControllerState::CapturingPosition | ControllerState::Finalizing => {
                // The worker observes the flag at its next checkpoint and
                // performs the transition itself.
                self.shared.abort.store(true, Ordering::SeqCst);
                Ok(())
            }
            ControllerState::Calibrating
            | ControllerState::AwaitingPosition
            | ControllerState::Failed => {
                info!("calibration aborted by operator");
                cell.session = None;
                cell.last_error = Some(CalibrationError::Aborted);
                cell.state = ControllerState::Idle;
                self.shared.settled.notify_all();
                Ok(())
            }
        }
    }

    fn require_inactive(&self) -> Result<(), CalibrationError> {
        let cell = self.cell();
        match cell.state {
            ControllerState::Idle | ControllerState::Failed => Ok(()),
            ControllerState::CapturingPosition | ControllerState::Finalizing => {
                Err(CalibrationError::Busy { state: cell.state })
            }
            _ => Err(CalibrationError::AlreadyActive),
        }
    }

    fn cell(&self) -> MutexGuard<'_, Cell> {
        lock(&self.shared.cell)
    }
}

/// Mutex lock that survives a poisoned peer; the cell stays consistent
/// because every transition completes under a single lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────
// Workers
// ─────────────────────────────────────────────────────────────────────────

fn capture_worker(shared: &Shared, index: usize, config: &CalibratorConfig) {
    let outcome = run_capture(shared, index, config);
    let mut cell = lock(&shared.cell);
    // Consume the abort flag under the cell lock: a request landing after
    // the last frame-boundary checkpoint still cancels this position, and
    // the abort command only sets the flag while the state says a worker is
    // running, so it cannot leak into the next position.
    let aborted = shared.abort.swap(false, Ordering::SeqCst)
        || matches!(outcome, Err(CalibrationError::Aborted));
    if aborted {
        info!("position {index} capture aborted");
        cell.session = None;
        cell.last_error = Some(CalibrationError::Aborted);
        cell.state = ControllerState::Idle;
    } else {
        match outcome {
            Ok(record) => {
                info!(
                    "position {index} captured: {:.1}% valid, confidence {:.2}",
                    record.quality.valid_fraction * 100.0,
                    record.quality.mean_confidence
                );
                if let Some(session) = cell.session.as_mut() {
                    session.log.push(LogEntry::success("nextPosition"));
                    session.push_position(record);
                }
                cell.state = ControllerState::AwaitingPosition;
            }
            Err(err) => {
                warn!("position {index} failed: {err}");
                if let Some(session) = cell.session.as_mut() {
                    session
                        .log
                        .push(LogEntry::failure("nextPosition", err.to_string()));
                }
                cell.last_error = Some(err);
                cell.state = ControllerState::AwaitingPosition;
            }
        }
    }
    drop(cell);
    shared.settled.notify_all();
}

fn run_capture(
    shared: &Shared,
    index: usize,
    config: &CalibratorConfig,
) -> Result<PositionRecord, CalibrationError> {
    let (raster_w, raster_h) = config.layout.raster_size();
    let sequence = PatternSequence::new(raster_w, raster_h)
        .ok_or_else(|| CalibrationError::InvalidConfig("projector raster is empty".into()))?;

    let mut guard = lock(&shared.source);
    let Some(source) = guard.as_mut() else {
        return Err(CalibrationError::SourceNotLinked);
    };

    let mut attempt = 0;
    loop {
        match capture_position(shared, source.as_mut(), &sequence, index, config) {
            Ok(record) => return Ok(record),
            Err(err @ CalibrationError::Aborted) => return Err(err),
            Err(err) if attempt < config.position_retries => {
                attempt += 1;
                warn!(
                    "position {index} attempt {attempt}/{} failed, retrying: {err}",
                    config.position_retries + 1
                );
            }
            Err(err) => return Err(err),
        }
    }
}

fn capture_position(
    shared: &Shared,
    source: &mut dyn PatternSource,
    sequence: &PatternSequence,
    index: usize,
    config: &CalibratorConfig,
) -> Result<PositionRecord, CalibrationError> {
    source
        .begin_position(index)
        .map_err(|err| CalibrationError::capture(index, 0, err))?;

    let timeout = config.capture_timeout();
    let mut frames = Vec::with_capacity(sequence.frame_count());
    for (frame, kind) in sequence.kinds().enumerate() {
        if shared.abort.load(Ordering::SeqCst) {
            return Err(CalibrationError::Aborted);
        }
        let pattern = sequence.render_kind(kind);
        let request = CaptureRequest {
            position: index,
            frame,
            pattern: &pattern,
            timeout,
        };
        let captured = source
            .capture(&request)
            .map_err(|err| CalibrationError::capture(index, frame, err))?;
        frames.push(captured);
    }

    if let Some(dir) = &config.dump_dir {
        dump_frames(dir, index, &frames);
    }

    let map =
        decode(sequence, &frames, &config.decode).map_err(|err| CalibrationError::decode(index, err))?;
    Ok(PositionRecord {
        index,
        captured_at: unix_timestamp(),
        quality: DecodeQuality::of(&map),
        correspondences: map,
    })
}

fn finalize_worker(shared: &Shared, mut session: CalibrationSession, config: &CalibratorConfig) {
    let maps: Vec<_> = session
        .positions()
        .iter()
        .map(|record| &record.correspondences)
        .collect();
    let outcome = solve(&maps, &config.layout, &config.solve);

    let mut cell = lock(&shared.cell);
    if shared.abort.swap(false, Ordering::SeqCst) {
        info!("finalize aborted, session {} discarded", session.id);
        cell.session = None;
        cell.last_error = Some(CalibrationError::Aborted);
        cell.state = ControllerState::Idle;
    } else {
        match outcome {
            Ok(result) => {
                info!("session {} solved: {}", session.id, result.summary());
                cell.result = Some(result);
                cell.session = None;
                cell.state = ControllerState::Idle;
            }
            Err(err) => {
                let err = CalibrationError::from(err);
                warn!("session {} failed to solve: {err}", session.id);
                session
                    .log
                    .push(LogEntry::failure("finalizeCalibration", err.to_string()));
                cell.session = Some(session);
                cell.last_error = Some(err);
                cell.state = ControllerState::Failed;
            }
        }
    }
    drop(cell);
    shared.settled.notify_all();
}

fn dump_frames(root: &Path, index: usize, frames: &[Gray8]) {
    let dir = root.join(format!("pos_{index}"));
    if let Err(err) = std::fs::create_dir_all(&dir) {
        warn!("cannot create dump directory {}: {err}", dir.display());
        return;
    }
    for (frame, image) in frames.iter().enumerate() {
        let path = dir.join(format!("pattern_{frame:02}.png"));
        if let Err(err) = image::save_buffer(
            &path,
            image.as_slice(),
            image.width(),
            image.height(),
            image::ExtendedColorType::L8,
        ) {
            warn!("cannot dump frame to {}: {err}", path.display());
        }
    }
}
