//! Per-pixel Gray-code decoding of one position's captured frames.
//!
//! Each camera pixel is decoded independently of every other pixel: the
//! white/black references give its local contrast (shadow masking), each
//! bit is thresholded against its own inverse frame, and the recovered Gray
//! codes become a projector coordinate. Pixels that cannot be decoded with
//! confidence are marked absent — an undecidable pixel never fails the
//! position, and never produces a wrong correspondence.

use log::debug;
use procam_core::{CorrespondenceMap, Gray8};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::{gray_decode, PatternSequence};

/// Structural decode failures. Low-confidence pixels are not errors; they
/// are recovered locally by marking the pixel absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected} captured frames, got {got}")]
    FrameCountMismatch { expected: usize, got: usize },
    #[error(
        "frame {frame} is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        frame: usize,
        expected_width: u32,
        expected_height: u32,
        got_width: u32,
        got_height: u32,
    },
}

/// Per-pixel decoding thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Minimum white-minus-black intensity for a pixel to be considered lit
    /// by the projector at all (shadow mask).
    pub min_contrast: u8,
    /// Minimum intensity separation between a bit frame and its inverse for
    /// the bit to be decidable.
    pub min_bit_separation: u8,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            min_contrast: 24,
            min_bit_separation: 4,
        }
    }
}

struct RowDecode {
    proj_x: Vec<f32>,
    proj_y: Vec<f32>,
    confidence: Vec<f32>,
    valid: Vec<bool>,
}

/// Decode one position's ordered captured frames into a correspondence map.
///
/// `frames` must hold exactly [`PatternSequence::frame_count`] images in
/// projection order, all at the same (camera) resolution. Decoding the same
/// input twice yields an identical map.
pub fn decode(
    sequence: &PatternSequence,
    frames: &[Gray8],
    opts: &DecodeOptions,
) -> Result<CorrespondenceMap, DecodeError> {
    let expected = sequence.frame_count();
    if frames.len() != expected {
        return Err(DecodeError::FrameCountMismatch {
            expected,
            got: frames.len(),
        });
    }

    let (cam_w, cam_h) = frames[0].dimensions();
    for (index, frame) in frames.iter().enumerate() {
        let (w, h) = frame.dimensions();
        if (w, h) != (cam_w, cam_h) {
            return Err(DecodeError::DimensionMismatch {
                frame: index,
                expected_width: cam_w,
                expected_height: cam_h,
                got_width: w,
                got_height: h,
            });
        }
    }

    let rows: Vec<RowDecode> = (0..cam_h)
        .into_par_iter()
        .map(|y| decode_row(sequence, frames, opts, y))
        .collect();

    let len = cam_w as usize * cam_h as usize;
    let mut proj_x = Vec::with_capacity(len);
    let mut proj_y = Vec::with_capacity(len);
    let mut confidence = Vec::with_capacity(len);
    let mut valid = Vec::with_capacity(len);
    for row in rows {
        proj_x.extend(row.proj_x);
        proj_y.extend(row.proj_y);
        confidence.extend(row.confidence);
        valid.extend(row.valid);
    }

    let map = CorrespondenceMap::from_parts(
        cam_w,
        cam_h,
        sequence.width(),
        sequence.height(),
        proj_x,
        proj_y,
        confidence,
        valid,
    )
    .unwrap_or_else(|| CorrespondenceMap::empty(cam_w, cam_h, sequence.width(), sequence.height()));

    debug!(
        "decoded {}x{} frame set: {:.1}% valid",
        cam_w,
        cam_h,
        map.valid_fraction() * 100.0
    );
    Ok(map)
}

fn decode_row(
    sequence: &PatternSequence,
    frames: &[Gray8],
    opts: &DecodeOptions,
    y: u32,
) -> RowDecode {
    let width = frames[0].width() as usize;
    let mut row = RowDecode {
        proj_x: vec![0.0; width],
        proj_y: vec![0.0; width],
        confidence: vec![0.0; width],
        valid: vec![false; width],
    };
    for x in 0..width as u32 {
        if let Some((px, py, conf)) = decode_pixel(sequence, frames, opts, x, y) {
            let idx = x as usize;
            row.proj_x[idx] = px as f32;
            row.proj_y[idx] = py as f32;
            row.confidence[idx] = conf;
            row.valid[idx] = true;
        }
    }
    row
}

fn decode_pixel(
    sequence: &PatternSequence,
    frames: &[Gray8],
    opts: &DecodeOptions,
    x: u32,
    y: u32,
) -> Option<(u32, u32, f32)> {
    let white = frames[0].get(x, y);
    let black = frames[1].get(x, y);
    let contrast = white.saturating_sub(black);
    if contrast < opts.min_contrast {
        return None;
    }

    let mut min_separation = u8::MAX;
    let mut read_axis = |first_frame: usize, bits: u32| -> Option<u32> {
        let mut code = 0u32;
        for bit in 0..bits as usize {
            let lit = frames[first_frame + 2 * bit].get(x, y);
            let inverse = frames[first_frame + 2 * bit + 1].get(x, y);
            let separation = lit.abs_diff(inverse);
            if separation < opts.min_bit_separation {
                return None;
            }
            min_separation = min_separation.min(separation);
            code = (code << 1) | u32::from(lit > inverse);
        }
        Some(gray_decode(code))
    };

    let x_frames = 2;
    let y_frames = 2 + 2 * sequence.bits_x() as usize;
    let px = read_axis(x_frames, sequence.bits_x())?;
    let py = read_axis(y_frames, sequence.bits_y())?;
    if px >= sequence.width() || py >= sequence.height() {
        return None;
    }

    let confidence = (f32::from(min_separation) / f32::from(contrast)).min(1.0);
    Some((px, py, confidence))
}
