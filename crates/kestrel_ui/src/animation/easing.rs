//! Easing curves.
//!
//! Every curve maps 0 to exactly 0 and 1 to exactly 1 (`Instant` is 1
//! everywhere), so an animation that reaches its end lands on its target
//! without floating residue. Overshooting curves (`Back*`, `ElasticOut`)
//! leave the unit range in between.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Easing function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Jump straight to the end value.
    Instant,
    /// Quadratic ease-in.
    QuadIn,
    /// Quadratic ease-out.
    QuadOut,
    /// Quadratic ease-in-out.
    QuadInOut,
    /// Cubic ease-in.
    CubicIn,
    /// Cubic ease-out.
    CubicOut,
    /// Cubic ease-in-out.
    CubicInOut,
    /// Sine ease-in.
    SineIn,
    /// Sine ease-out.
    SineOut,
    /// Sine ease-in-out.
    SineInOut,
    /// Exponential ease-in (accelerating).
    ExponentialIn,
    /// Exponential ease-out (sharp snap to target).
    ExponentialOut,
    /// Exponential ease-in-out.
    ExponentialInOut,
    /// Pulls back before moving forward.
    BackIn,
    /// Overshoots the target then settles.
    BackOut,
    /// Bounces against the target.
    BounceOut,
    /// Springs past the target with a decaying oscillation.
    ElasticOut,
}

const BACK_C1: f32 = 1.701_58;
const BACK_C3: f32 = BACK_C1 + 1.0;

impl Easing {
    /// Applies the easing function to a t value (clamped to 0-1).
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        if self == Self::Instant {
            return 1.0;
        }
        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match self {
            Self::Linear | Self::Instant => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Self::SineOut => (t * FRAC_PI_2).sin(),
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            // 2^(10(t-1))
            Self::ExponentialIn => 2.0_f32.powf(10.0 * (t - 1.0)),
            // 1 - 2^(-10t)
            Self::ExponentialOut => 1.0 - 2.0_f32.powf(-10.0 * t),
            Self::ExponentialInOut => {
                if t < 0.5 {
                    2.0_f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::BackIn => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Self::BackOut => {
                let u = t - 1.0;
                1.0 + BACK_C3 * u * u * u + BACK_C1 * u * u
            }
            Self::BounceOut => bounce_out(t),
            Self::ElasticOut => {
                let c4 = (2.0 * PI) / 3.0;
                2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
        }
    }

    /// Eased fraction for a leg that is played backwards.
    ///
    /// The reverse leg retraces the forward curve in time, so the value at
    /// `x` of a reversed leg equals the forward value at `1 - x`.
    #[inline]
    #[must_use]
    pub fn apply_reversed(self, x: f32) -> f32 {
        self.apply(1.0 - x)
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984_375
    }
}
