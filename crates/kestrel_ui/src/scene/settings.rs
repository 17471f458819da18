//! Declarative node settings.
//!
//! [`NodeSettings`] is what the node factory consumes. Every field has a
//! default so settings can be written sparsely in code or in TOML; which
//! fields a kind accepts is checked before anything is created.

use serde::{Deserialize, Serialize};

use kestrel_shared::{Anchor, Padding, Vec2, Vec3};

use super::node::{Capabilities, NodeKind};
use crate::animation::AnimationSpec;
use crate::error::{SceneError, SceneResult};
use crate::layout::FlowDirection;
use crate::style::{Color, ColorSpace};

/// Construction settings for one node and, optionally, its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Authoring name.
    pub name: String,
    /// Kind of node to create.
    pub kind: NodeKind,
    /// Local position.
    pub position: Vec3,
    /// Local scale.
    pub scale: Vec2,
    /// Local rotation in degrees.
    pub rotation: f32,
    /// Content size.
    pub size: Vec2,
    /// Anchor interpreting `position`.
    pub anchor: Anchor,
    /// Padding around the content.
    pub padding: Padding,
    /// Initial active flag.
    pub active: bool,
    /// Local sorting order.
    pub sorting_order: i32,
    /// Colour override.
    pub color: Option<Color>,
    /// Colour space for colour animations.
    pub color_space: ColorSpace,
    /// Sprite resource name (sprite, clickable and toggle kinds).
    pub sprite: Option<String>,
    /// Flow direction (containers only).
    pub flow: Option<FlowDirection>,
    /// Gap between children (containers only).
    pub spacing: Option<f32>,
    /// Initial toggle state (toggles only).
    pub toggled: Option<bool>,
    /// Animations started with the node.
    pub animations: Vec<AnimationSpec>,
    /// Child nodes, attached in order.
    pub children: Vec<NodeSettings>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: NodeKind::Empty,
            position: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            size: Vec2::ZERO,
            anchor: Anchor::Center,
            padding: Padding::ZERO,
            active: true,
            sorting_order: 0,
            color: None,
            color_space: ColorSpace::Rgb,
            sprite: None,
            flow: None,
            spacing: None,
            toggled: None,
            animations: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl NodeSettings {
    /// Settings for a node of the given kind with all defaults.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Grouping node.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(NodeKind::Empty)
    }

    /// Drawable node backed by `sprite`.
    #[must_use]
    pub fn sprite(sprite: impl Into<String>) -> Self {
        Self::new(NodeKind::Sprite).with_sprite(sprite)
    }

    /// Flow container.
    #[must_use]
    pub fn container(flow: FlowDirection, spacing: f32) -> Self {
        Self {
            flow: Some(flow),
            spacing: Some(spacing),
            ..Self::new(NodeKind::Container)
        }
    }

    /// Clickable node.
    #[must_use]
    pub fn clickable() -> Self {
        Self::new(NodeKind::Clickable)
    }

    /// Toggle node with an initial state.
    #[must_use]
    pub fn toggle(toggled: bool) -> Self {
        Self {
            toggled: Some(toggled),
            ..Self::new(NodeKind::Toggle)
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the local position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the local scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the local rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the content size.
    #[must_use]
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Sets the anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Sets the padding.
    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the initial active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the local sorting order.
    #[must_use]
    pub fn with_sorting_order(mut self, order: i32) -> Self {
        self.sorting_order = order;
        self
    }

    /// Overrides the colour.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the colour space used by colour animations.
    #[must_use]
    pub fn with_color_space(mut self, space: ColorSpace) -> Self {
        self.color_space = space;
        self
    }

    /// Sets the sprite resource name.
    #[must_use]
    pub fn with_sprite(mut self, sprite: impl Into<String>) -> Self {
        self.sprite = Some(sprite.into());
        self
    }

    /// Adds an animation started with the node.
    #[must_use]
    pub fn with_animation(mut self, spec: AnimationSpec) -> Self {
        self.animations.push(spec);
        self
    }

    /// Adds a child.
    #[must_use]
    pub fn with_child(mut self, child: NodeSettings) -> Self {
        self.children.push(child);
        self
    }

    /// Checks this node and its whole subtree.
    ///
    /// # Errors
    ///
    /// [`SceneError::SettingsMismatch`] when a field is given to a kind that
    /// does not accept it, [`SceneError::MissingSetting`] when a required
    /// one is absent, [`SceneError::InvalidAnimation`] for unplayable
    /// animations.
    pub fn validate(&self) -> SceneResult<()> {
        let kind = self.kind;
        let mismatch = |field| Err(SceneError::SettingsMismatch { kind, field });

        if self.sprite.is_some() && !kind.accepts_sprite() {
            return mismatch("sprite");
        }
        if kind == NodeKind::Sprite && self.sprite.is_none() {
            return Err(SceneError::MissingSetting {
                kind,
                field: "sprite",
            });
        }
        if kind != NodeKind::Container {
            if self.flow.is_some() {
                return mismatch("flow");
            }
            if self.spacing.is_some() {
                return mismatch("spacing");
            }
        }
        if let Some(spacing) = self.spacing {
            if !spacing.is_finite() {
                return Err(SceneError::InvalidConfig(format!(
                    "spacing must be finite, got {spacing}"
                )));
            }
        }
        if self.toggled.is_some() && kind != NodeKind::Toggle {
            return mismatch("toggled");
        }

        for spec in &self.animations {
            spec.validate()?;
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }

    /// Capability tags a node built from these settings carries.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = self.kind.capabilities();
        if self.sprite.is_some() {
            caps.set(Capabilities::DRAWABLE);
        }
        caps
    }
}

/// A list of root settings, typically loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Top-level nodes, created in order.
    pub nodes: Vec<NodeSettings>,
}

impl SceneDescription {
    /// Parses a description from TOML.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] if the text does not parse.
    pub fn from_toml_str(text: &str) -> SceneResult<Self> {
        toml::from_str(text).map_err(|e| SceneError::InvalidConfig(e.to_string()))
    }
}
