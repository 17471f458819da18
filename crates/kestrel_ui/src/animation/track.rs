//! Animated properties: the authored payload and its resolved start/end pair.

use serde::{Deserialize, Serialize};

use kestrel_shared::{Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::scene::{NodeEvent, SceneNode};
use crate::style::{Color, ColorSpace};

/// Which property an animation drives and where it goes.
///
/// `from` values default to the node's current value when the animation
/// is attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property", rename_all = "snake_case")]
pub enum AnimationKind {
    /// Local position.
    Move {
        /// Start position.
        #[serde(default)]
        from: Option<Vec3>,
        /// End position.
        to: Vec3,
    },
    /// Local scale.
    Scale {
        /// Start scale.
        #[serde(default)]
        from: Option<Vec2>,
        /// End scale.
        to: Vec2,
    },
    /// Local rotation in degrees.
    Rotate {
        /// Start angle.
        #[serde(default)]
        from: Option<f32>,
        /// End angle.
        to: f32,
    },
    /// Full colour.
    Color {
        /// Start colour.
        #[serde(default)]
        from: Option<Color>,
        /// End colour.
        to: Color,
        /// Interpolation space, the node's own space when unset.
        #[serde(default)]
        space: Option<ColorSpace>,
    },
    /// Alpha channel only.
    Fade {
        /// Start alpha.
        #[serde(default)]
        from: Option<f32>,
        /// End alpha.
        to: f32,
    },
    /// Content size.
    Resize {
        /// Start size.
        #[serde(default)]
        from: Option<Vec2>,
        /// End size.
        to: Vec2,
    },
}

impl AnimationKind {
    /// Rejects payloads containing NaN or infinities.
    pub(crate) fn validate(&self) -> SceneResult<()> {
        let finite = |values: &[f32]| values.iter().all(|v| v.is_finite());
        let ok = match *self {
            Self::Move { from, to } => {
                finite(&to.to_array()) && from.map_or(true, |f| finite(&f.to_array()))
            }
            Self::Scale { from, to } | Self::Resize { from, to } => {
                finite(&to.to_array()) && from.map_or(true, |f| finite(&f.to_array()))
            }
            Self::Rotate { from, to } | Self::Fade { from, to } => {
                to.is_finite() && from.map_or(true, f32::is_finite)
            }
            Self::Color { from, to, .. } => {
                finite(&to.to_array()) && from.map_or(true, |f| finite(&f.to_array()))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SceneError::InvalidAnimation(format!(
                "non-finite payload in {self:?}"
            )))
        }
    }

    /// Fills in missing start values from the node's current state.
    pub(crate) fn resolve(&self, node: &SceneNode) -> Track {
        match *self {
            Self::Move { from, to } => Track::Position {
                from: from.unwrap_or(node.position),
                to,
            },
            Self::Scale { from, to } => Track::Scale {
                from: from.unwrap_or(node.scale),
                to,
            },
            Self::Rotate { from, to } => Track::Rotation {
                from: from.unwrap_or(node.rotation),
                to,
            },
            Self::Color { from, to, space } => Track::Color {
                from: from.unwrap_or(node.color),
                to,
                space: space.unwrap_or(node.color_space),
            },
            Self::Fade { from, to } => Track::Alpha {
                from: from.unwrap_or(node.color.a),
                to,
            },
            Self::Resize { from, to } => Track::Size {
                from: from.unwrap_or(node.size),
                to,
            },
        }
    }
}

/// A resolved start/end pair for one property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track {
    /// Local position.
    Position {
        /// Value at fraction 0.
        from: Vec3,
        /// Value at fraction 1.
        to: Vec3,
    },
    /// Local scale.
    Scale {
        /// Value at fraction 0.
        from: Vec2,
        /// Value at fraction 1.
        to: Vec2,
    },
    /// Local rotation.
    Rotation {
        /// Value at fraction 0.
        from: f32,
        /// Value at fraction 1.
        to: f32,
    },
    /// Colour in a given space.
    Color {
        /// Value at fraction 0.
        from: Color,
        /// Value at fraction 1.
        to: Color,
        /// Interpolation space.
        space: ColorSpace,
    },
    /// Alpha channel.
    Alpha {
        /// Value at fraction 0.
        from: f32,
        /// Value at fraction 1.
        to: f32,
    },
    /// Content size.
    Size {
        /// Value at fraction 0.
        from: Vec2,
        /// Value at fraction 1.
        to: Vec2,
    },
}

/// A sampled property value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    /// Local position.
    Position(Vec3),
    /// Local scale.
    Scale(Vec2),
    /// Local rotation.
    Rotation(f32),
    /// Full colour.
    Color(Color),
    /// Alpha channel.
    Alpha(f32),
    /// Content size.
    Size(Vec2),
}

impl Track {
    /// Value at eased fraction `p` (not clamped, so overshooting curves
    /// overshoot the payload too).
    #[must_use]
    pub fn sample(&self, p: f32) -> TrackValue {
        match *self {
            Self::Position { from, to } => TrackValue::Position(from.lerp(to, p)),
            Self::Scale { from, to } => TrackValue::Scale(from.lerp(to, p)),
            Self::Rotation { from, to } => TrackValue::Rotation(from + (to - from) * p),
            Self::Color { from, to, space } => TrackValue::Color(from.interpolate(to, p, space)),
            Self::Alpha { from, to } => TrackValue::Alpha(from + (to - from) * p),
            Self::Size { from, to } => TrackValue::Size(from.lerp(to, p)),
        }
    }

    /// Writes the sampled value into the node and returns the change event.
    pub(crate) fn apply(&self, p: f32, node: &mut SceneNode) -> NodeEvent {
        match self.sample(p) {
            TrackValue::Position(v) => {
                node.position = v;
                NodeEvent::TransformChanged
            }
            TrackValue::Scale(v) => {
                node.scale = v;
                NodeEvent::TransformChanged
            }
            TrackValue::Rotation(v) => {
                node.rotation = v;
                NodeEvent::TransformChanged
            }
            TrackValue::Color(c) => {
                node.color = c;
                NodeEvent::ColorChanged { color: c }
            }
            TrackValue::Alpha(a) => {
                node.color.a = a;
                NodeEvent::ColorChanged { color: node.color }
            }
            TrackValue::Size(v) => {
                node.size = v;
                NodeEvent::SizeChanged { size: v }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints() {
        let track = Track::Rotation {
            from: 10.0,
            to: 90.0,
        };
        assert_eq!(track.sample(0.0), TrackValue::Rotation(10.0));
        assert_eq!(track.sample(1.0), TrackValue::Rotation(90.0));
        assert_eq!(track.sample(0.5), TrackValue::Rotation(50.0));
    }

    #[test]
    fn test_non_finite_payload_rejected() {
        let kind = AnimationKind::Fade {
            from: None,
            to: f32::NAN,
        };
        assert!(matches!(
            kind.validate(),
            Err(SceneError::InvalidAnimation(_))
        ));
    }

    #[test]
    fn test_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            anim: AnimationKind,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
            [anim]
            property = "move"
            to = { x = 4.0, y = 2.0 }
            "#,
        )
        .expect("parse");
        assert_eq!(
            parsed.anim,
            AnimationKind::Move {
                from: None,
                to: Vec3::new(4.0, 2.0, 0.0),
            }
        );
    }
}
