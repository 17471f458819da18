//! Engine-wide numeric defaults.
//!
//! These are starting values only; hosts override them through
//! configuration.

/// Tolerance used for float comparisons and singular-matrix detection.
pub const EPSILON: f32 = 1e-6;

/// Default fixed simulation step (seconds), 50 Hz.
pub const DEFAULT_FIXED_TIMESTEP: f32 = 0.02;

/// Default pointer travel (world units) before a press becomes a drag.
pub const DEFAULT_DRAG_THRESHOLD: f32 = 8.0;
