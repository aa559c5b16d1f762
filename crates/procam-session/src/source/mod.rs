//! Pattern sources: where captured frames come from.
//!
//! The controller never sleeps for a guessed duration and polls nothing:
//! [`PatternSource::capture`] blocks until the frame for one (position,
//! frame) coordinate is available, or fails within the request's bounded
//! timeout. Implementations cover live grabbers (external), pre-recorded
//! directories ([`DirectorySource`]) and in-memory replay
//! ([`MemorySource`]).

use std::time::Duration;

use procam_core::Gray8;
use thiserror::Error;

mod directory;

pub use directory::DirectorySource;

/// Failures a source can report for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The source holds no frame at this coordinate.
    #[error("no frame stored for position {position}, frame {frame}")]
    Missing { position: usize, frame: usize },
    /// The frame did not become ready within the request timeout.
    #[error("frame {frame} not ready after {waited_ms} ms")]
    Timeout { frame: usize, waited_ms: u64 },
    /// Reading or decoding the backing store failed.
    #[error("capture io: {0}")]
    Io(String),
}

/// One frame request during a position capture.
#[derive(Debug)]
pub struct CaptureRequest<'a> {
    /// 0-based position index within the session.
    pub position: usize,
    /// Frame index within the pattern sequence.
    pub frame: usize,
    /// The pattern being projected for this frame. Live sources display it;
    /// pre-recorded sources ignore it.
    pub pattern: &'a Gray8,
    /// Upper bound on how long the source may block.
    pub timeout: Duration,
}

/// Supplier of captured camera frames for projected patterns.
pub trait PatternSource: Send {
    /// Called once before a position's frames are requested.
    fn begin_position(&mut self, _position: usize) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Block until the captured frame for `request` is available, bounded by
    /// `request.timeout`.
    fn capture(&mut self, request: &CaptureRequest<'_>) -> Result<Gray8, CaptureError>;
}

/// Preloaded frame sets, one `Vec<Gray8>` per position.
///
/// Used for tests and for replaying captures that already live in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    positions: Vec<Vec<Gray8>>,
}

impl MemorySource {
    pub fn new(positions: Vec<Vec<Gray8>>) -> Self {
        Self { positions }
    }

    /// Append one position's frame set.
    pub fn push_position(&mut self, frames: Vec<Gray8>) {
        self.positions.push(frames);
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

impl PatternSource for MemorySource {
    fn capture(&mut self, request: &CaptureRequest<'_>) -> Result<Gray8, CaptureError> {
        self.positions
            .get(request.position)
            .and_then(|frames| frames.get(request.frame))
            .cloned()
            .ok_or(CaptureError::Missing {
                position: request.position,
                frame: request.frame,
            })
    }
}
