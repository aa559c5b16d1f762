//! Camera→projector correspondence data model.
//!
//! A [`CorrespondenceMap`] stores, for every camera pixel of one captured
//! position, the decoded projector coordinate it observed — or nothing.
//! Every entry is either valid with an in-range projector coordinate or
//! absent; there are no silently-wrong correspondences.

use serde::{Deserialize, Serialize};

use crate::math::{Pt2, Real};

/// A single camera→projector pixel correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelMatch {
    /// Camera pixel coordinate.
    pub camera: Pt2,
    /// Projector pixel coordinate observed at that camera pixel.
    pub projector: Pt2,
}

/// Dense per-pixel decoded correspondences for one captured position.
///
/// Projector coordinates are stored as `f32` so that sub-pixel decoders (or
/// exact synthetic data) lose nothing; binary Gray-code decoding fills in
/// integer-valued coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceMap {
    camera_width: u32,
    camera_height: u32,
    projector_width: u32,
    projector_height: u32,
    proj_x: Vec<f32>,
    proj_y: Vec<f32>,
    confidence: Vec<f32>,
    valid: Vec<bool>,
}

impl CorrespondenceMap {
    /// Create a map with every entry absent.
    pub fn empty(
        camera_width: u32,
        camera_height: u32,
        projector_width: u32,
        projector_height: u32,
    ) -> Self {
        let len = camera_width as usize * camera_height as usize;
        Self {
            camera_width,
            camera_height,
            projector_width,
            projector_height,
            proj_x: vec![0.0; len],
            proj_y: vec![0.0; len],
            confidence: vec![0.0; len],
            valid: vec![false; len],
        }
    }

    /// Assemble a map from per-pixel arrays (row-major, camera resolution).
    ///
    /// Returns `None` when any array length disagrees with the camera
    /// dimensions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        camera_width: u32,
        camera_height: u32,
        projector_width: u32,
        projector_height: u32,
        proj_x: Vec<f32>,
        proj_y: Vec<f32>,
        confidence: Vec<f32>,
        valid: Vec<bool>,
    ) -> Option<Self> {
        let len = camera_width as usize * camera_height as usize;
        if proj_x.len() != len
            || proj_y.len() != len
            || confidence.len() != len
            || valid.len() != len
        {
            return None;
        }
        Some(Self {
            camera_width,
            camera_height,
            projector_width,
            projector_height,
            proj_x,
            proj_y,
            confidence,
            valid,
        })
    }

    /// Record a valid correspondence at camera pixel `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, proj_x: f32, proj_y: f32, confidence: f32) {
        let idx = self.index(x, y);
        self.proj_x[idx] = proj_x;
        self.proj_y[idx] = proj_y;
        self.confidence[idx] = confidence;
        self.valid[idx] = true;
    }

    /// Decoded projector coordinate at camera pixel `(x, y)`, if any.
    pub fn get(&self, x: u32, y: u32) -> Option<(f32, f32)> {
        let idx = self.index(x, y);
        self.valid[idx].then(|| (self.proj_x[idx], self.proj_y[idx]))
    }

    /// Decode confidence at camera pixel `(x, y)` (0 when absent).
    pub fn confidence(&self, x: u32, y: u32) -> f32 {
        let idx = self.index(x, y);
        if self.valid[idx] {
            self.confidence[idx]
        } else {
            0.0
        }
    }

    /// Camera resolution `(width, height)`.
    pub fn camera_size(&self) -> (u32, u32) {
        (self.camera_width, self.camera_height)
    }

    /// Projector raster resolution `(width, height)`.
    pub fn projector_size(&self) -> (u32, u32) {
        (self.projector_width, self.projector_height)
    }

    /// Number of valid entries.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Valid entries as a fraction of all camera pixels.
    pub fn valid_fraction(&self) -> Real {
        if self.valid.is_empty() {
            return 0.0;
        }
        self.valid_count() as Real / self.valid.len() as Real
    }

    /// Mean confidence over valid entries (0 when no entry is valid).
    pub fn mean_confidence(&self) -> Real {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (idx, &ok) in self.valid.iter().enumerate() {
            if ok {
                sum += Real::from(self.confidence[idx]);
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as Real
        }
    }

    /// Subsample valid correspondences on a pixel stride (clamped to ≥ 1).
    ///
    /// The output order is deterministic (row-major over the camera raster).
    pub fn matches(&self, stride: u32) -> Vec<PixelMatch> {
        let stride = stride.max(1);
        let mut out = Vec::new();
        let mut y = 0;
        while y < self.camera_height {
            let mut x = 0;
            while x < self.camera_width {
                if let Some((px, py)) = self.get(x, y) {
                    out.push(PixelMatch {
                        camera: Pt2::new(Real::from(x), Real::from(y)),
                        projector: Pt2::new(Real::from(px), Real::from(py)),
                    });
                }
                x += stride;
            }
            y += stride;
        }
        out
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.camera_width && y < self.camera_height,
            "camera pixel out of bounds"
        );
        y as usize * self.camera_width as usize + x as usize
    }
}
