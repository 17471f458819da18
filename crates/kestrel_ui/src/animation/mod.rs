//! Animation engine.
//!
//! Each node owns an ordered list of [`Animation`]s. The scene's tick
//! advances them in insertion order and writes the eased value straight
//! into the node, so when two animations drive the same property the one
//! added later wins for that tick.
//!
//! Time is tracked per leg as a normalised fraction. When a looping or
//! ping-pong leg ends mid-step, the overshoot carries into the next leg
//! (at most one leg change per step), which keeps playback independent of
//! the frame rate.

mod easing;
mod track;

pub use easing::Easing;
pub use track::{AnimationKind, Track, TrackValue};

use serde::{Deserialize, Serialize};

use kestrel_shared::{Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::scene::{AnimationId, NodeEvent, SceneNode};
use crate::style::{Color, ColorSpace};

/// What happens when an animation reaches the end of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Stop at the end.
    #[default]
    Once,
    /// Restart from the beginning.
    Loop,
    /// Play backwards once, then stop.
    PingPongOnce,
    /// Alternate direction forever.
    PingPongForever,
}

/// Authoring description of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    /// Length of one leg in seconds.
    pub duration: f32,
    /// Easing curve.
    #[serde(default)]
    pub easing: Easing,
    /// Replay policy.
    #[serde(default)]
    pub replay: ReplayPolicy,
    /// Maximum number of restarts/reversals. `Some(0)` plays a single leg.
    #[serde(default)]
    pub repeat_cap: Option<u32>,
    /// Animated property and values.
    #[serde(flatten)]
    pub kind: AnimationKind,
}

impl AnimationSpec {
    /// Creates a linear, play-once animation.
    #[must_use]
    pub const fn new(duration: f32, kind: AnimationKind) -> Self {
        Self {
            duration,
            easing: Easing::Linear,
            replay: ReplayPolicy::Once,
            repeat_cap: None,
            kind,
        }
    }

    /// Moves to a local position.
    #[must_use]
    pub fn move_to(to: Vec3, duration: f32) -> Self {
        Self::new(duration, AnimationKind::Move { from: None, to })
    }

    /// Scales to a local scale.
    #[must_use]
    pub fn scale_to(to: Vec2, duration: f32) -> Self {
        Self::new(duration, AnimationKind::Scale { from: None, to })
    }

    /// Rotates to an angle in degrees.
    #[must_use]
    pub fn rotate_to(to: f32, duration: f32) -> Self {
        Self::new(duration, AnimationKind::Rotate { from: None, to })
    }

    /// Tweens the colour, in the node's colour space unless `space` is set.
    #[must_use]
    pub fn color_to(to: Color, space: Option<ColorSpace>, duration: f32) -> Self {
        Self::new(
            duration,
            AnimationKind::Color {
                from: None,
                to,
                space,
            },
        )
    }

    /// Tweens alpha only.
    #[must_use]
    pub fn fade_to(to: f32, duration: f32) -> Self {
        Self::new(duration, AnimationKind::Fade { from: None, to })
    }

    /// Tweens the content size.
    #[must_use]
    pub fn resize_to(to: Vec2, duration: f32) -> Self {
        Self::new(duration, AnimationKind::Resize { from: None, to })
    }

    /// Sets the easing curve.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Sets the replay policy.
    #[must_use]
    pub fn with_replay(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }

    /// Caps the number of restarts/reversals.
    #[must_use]
    pub fn with_repeat_cap(mut self, cap: u32) -> Self {
        self.repeat_cap = Some(cap);
        self
    }

    /// Overrides the start value of the payload.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidAnimation`] if `from` is not a value of the
    /// animated property.
    pub fn with_from(mut self, from: TrackValue) -> SceneResult<Self> {
        self.kind = match (self.kind, from) {
            (AnimationKind::Move { to, .. }, TrackValue::Position(f)) => {
                AnimationKind::Move { from: Some(f), to }
            }
            (AnimationKind::Scale { to, .. }, TrackValue::Scale(f)) => {
                AnimationKind::Scale { from: Some(f), to }
            }
            (AnimationKind::Rotate { to, .. }, TrackValue::Rotation(f)) => {
                AnimationKind::Rotate { from: Some(f), to }
            }
            (AnimationKind::Color { to, space, .. }, TrackValue::Color(f)) => {
                AnimationKind::Color {
                    from: Some(f),
                    to,
                    space,
                }
            }
            (AnimationKind::Fade { to, .. }, TrackValue::Alpha(f)) => {
                AnimationKind::Fade { from: Some(f), to }
            }
            (AnimationKind::Resize { to, .. }, TrackValue::Size(f)) => {
                AnimationKind::Resize { from: Some(f), to }
            }
            (kind, from) => {
                return Err(SceneError::InvalidAnimation(format!(
                    "start value {from:?} does not fit {kind:?}"
                )));
            }
        };
        Ok(self)
    }

    /// Checks that the animation can be played.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidAnimation`] for a negative or non-finite
    /// duration, or a non-finite payload.
    pub fn validate(&self) -> SceneResult<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(SceneError::InvalidAnimation(format!(
                "duration must be finite and non-negative, got {}",
                self.duration
            )));
        }
        self.kind.validate()
    }
}

/// Result of advancing an animation by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStep {
    /// Fraction along `from -> to` after easing.
    pub fraction: f32,
    /// The animation reached its final leg end and must be removed.
    pub finished: bool,
}

/// A running animation bound to one node.
#[derive(Debug, Clone)]
pub struct Animation {
    id: AnimationId,
    track: Track,
    duration: f32,
    easing: Easing,
    replay: ReplayPolicy,
    remaining: Option<u32>,
    /// Normalised time within the current leg, before easing.
    elapsed: f32,
    reversed: bool,
}

impl Animation {
    /// Resolves `spec` against the node's current state.
    pub(crate) fn new(id: AnimationId, spec: &AnimationSpec, node: &SceneNode) -> Self {
        Self {
            id,
            track: spec.kind.resolve(node),
            duration: spec.duration,
            easing: spec.easing,
            replay: spec.replay,
            remaining: spec.repeat_cap,
            elapsed: 0.0,
            reversed: false,
        }
    }

    /// Identifier issued by the scene.
    #[must_use]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// Resolved start/end values.
    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Leg length in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Easing curve.
    #[must_use]
    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Replay policy.
    #[must_use]
    pub fn replay(&self) -> ReplayPolicy {
        self.replay
    }

    /// Restarts/reversals left, `None` when uncapped.
    #[must_use]
    pub fn remaining_repeats(&self) -> Option<u32> {
        self.remaining
    }

    /// Normalised time within the current leg, in `[0, 1]`.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// True while playing a ping-pong return leg.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Eased fraction along `from -> to` at the current time.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.reversed {
            self.easing.apply_reversed(self.elapsed)
        } else {
            self.easing.apply(self.elapsed)
        }
    }

    /// Whether a leg end leads to another leg, consuming one repeat if so.
    fn continue_after_leg(&mut self) -> bool {
        let wants_more = match self.replay {
            ReplayPolicy::Once => false,
            ReplayPolicy::Loop | ReplayPolicy::PingPongForever => true,
            ReplayPolicy::PingPongOnce => !self.reversed,
        };
        if !wants_more {
            return false;
        }
        match self.remaining {
            Some(0) => false,
            Some(ref mut n) => {
                *n -= 1;
                true
            }
            None => true,
        }
    }

    /// Advances by `dt` seconds.
    ///
    /// A zero-length animation finishes on its first step whatever its
    /// replay policy.
    pub fn advance(&mut self, dt: f32) -> AnimationStep {
        if self.duration <= 0.0 {
            self.elapsed = 1.0;
            return AnimationStep {
                fraction: self.fraction(),
                finished: true,
            };
        }

        let raw = self.elapsed + dt.max(0.0) / self.duration;
        if raw < 1.0 {
            self.elapsed = raw;
            return AnimationStep {
                fraction: self.fraction(),
                finished: false,
            };
        }

        if self.continue_after_leg() {
            if matches!(
                self.replay,
                ReplayPolicy::PingPongOnce | ReplayPolicy::PingPongForever
            ) {
                self.reversed = !self.reversed;
            }
            self.elapsed = (raw - 1.0).min(1.0);
            AnimationStep {
                fraction: self.fraction(),
                finished: false,
            }
        } else {
            self.elapsed = 1.0;
            AnimationStep {
                fraction: self.fraction(),
                finished: true,
            }
        }
    }

    /// Advances and writes the new value into `node`.
    pub(crate) fn step(&mut self, dt: f32, node: &mut SceneNode) -> (NodeEvent, bool) {
        let step = self.advance(dt);
        (self.track.apply(step.fraction, node), step.finished)
    }
}
