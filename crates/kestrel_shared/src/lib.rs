//! # Kestrel Shared
//!
//! Geometry used by every layer of the engine.
//!
//! ## Coordinate conventions
//!
//! - Y points **up**: "upper" anchors have a positive Y offset.
//! - Rotations are in **degrees**, counter-clockwise positive.
//! - A [`Rect`] is stored as its lower-left corner plus a size.
//!
//! Everything here is a pure function of its inputs.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod math;

pub use constants::{DEFAULT_DRAG_THRESHOLD, DEFAULT_FIXED_TIMESTEP, EPSILON};
pub use geometry::{Anchor, Padding, Rect, RotatedRect};
pub use math::{Affine2, Vec2, Vec3};
