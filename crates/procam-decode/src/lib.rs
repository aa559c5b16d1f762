//! Structured-light pattern sequences and the correspondence decoder.
//!
//! This crate defines:
//! - [`PatternSequence`], the binary Gray-code frame sequence projected for
//!   one capture position (white/black references plus one frame and its
//!   inverse per code bit),
//! - [`decode`], which turns one position's ordered captured frames into a
//!   [`procam_core::CorrespondenceMap`],
//! - [`synthetic`], homography-driven capture simulation for tests and
//!   examples.
//!
//! Decoding is per-pixel independent and runs row-parallel over rayon; the
//! output is deterministic for a given input.

pub mod decode;
pub mod sequence;
/// Synthetic capture generation for tests and examples.
pub mod synthetic;

pub use decode::{decode, DecodeError, DecodeOptions};
pub use sequence::{gray_decode, gray_encode, FrameKind, PatternSequence};
