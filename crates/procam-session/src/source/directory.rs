//! File-backed pattern source.
//!
//! Reads pre-recorded captures laid out as the capture workspace writes
//! them:
//!
//! ```text
//! <root>/pos_0/pattern_00.png
//! <root>/pos_0/pattern_01.png
//! ...
//! <root>/pos_1/pattern_00.png
//! ```
//!
//! Frames may be PNG or JPEG; anything the `image` crate can open is
//! converted to 8-bit grayscale.

use std::path::{Path, PathBuf};

use procam_core::Gray8;

use super::{CaptureError, CaptureRequest, PatternSource};

/// A directory of pre-recorded capture sets.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of consecutive `pos_<n>` directories present under the root.
    pub fn position_count(&self) -> usize {
        let mut count = 0;
        while self.root.join(format!("pos_{count}")).is_dir() {
            count += 1;
        }
        count
    }

    fn frame_path(&self, position: usize, frame: usize) -> Option<PathBuf> {
        let dir = self.root.join(format!("pos_{position}"));
        for ext in ["png", "jpg", "jpeg"] {
            let path = dir.join(format!("pattern_{frame:02}.{ext}"));
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }
}

impl PatternSource for DirectorySource {
    fn capture(&mut self, request: &CaptureRequest<'_>) -> Result<Gray8, CaptureError> {
        let path = self
            .frame_path(request.position, request.frame)
            .ok_or(CaptureError::Missing {
                position: request.position,
                frame: request.frame,
            })?;
        load_gray(&path)
    }
}

fn load_gray(path: &Path) -> Result<Gray8, CaptureError> {
    let image = image::open(path).map_err(|err| CaptureError::Io(err.to_string()))?;
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    Gray8::from_raw(width, height, luma.into_raw())
        .ok_or_else(|| CaptureError::Io(format!("unexpected buffer size in {}", path.display())))
}
