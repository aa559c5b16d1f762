//! Core primitives for `procam-calib`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Mat3`, ...),
//! - an owned 8-bit grayscale frame buffer ([`Gray8`]),
//! - the camera→projector correspondence data model ([`CorrespondenceMap`]),
//! - a generic RANSAC engine ([`ransac`], [`Estimator`]).

/// Camera→projector correspondence data model.
pub mod correspondence;
/// Owned grayscale frame buffers.
pub mod frame;
/// Linear algebra type aliases and homography helpers.
pub mod math;
/// Generic RANSAC engine and traits.
pub mod ransac;

pub use correspondence::*;
pub use frame::*;
pub use math::*;
pub use ransac::*;
