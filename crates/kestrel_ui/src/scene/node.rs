//! Scene node state and capability tags.

use serde::{Deserialize, Serialize};

use kestrel_shared::{Affine2, Anchor, Padding, Rect, Vec2, Vec3};

use super::id::NodeId;
use crate::animation::Animation;
use crate::layout::FlowLayout;
use crate::style::{Color, ColorSpace};

/// Capability tags (bitfield). Operations check for a capability instead
/// of downcasting through a kind hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Node carries a drawable resource.
    pub const DRAWABLE: u32 = 1 << 0;
    /// Node takes part in hit testing.
    pub const CLICKABLE: u32 = 1 << 1;
    /// Node lays out its children.
    pub const CONTAINER: u32 = 1 << 2;
    /// Node keeps an on/off state flipped by clicks.
    pub const TOGGLE: u32 = 1 << 3;

    /// No capabilities.
    pub const NONE: Self = Self(0);

    /// Creates a tag set from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clears a flag.
    #[inline]
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }
}

/// The closed set of node kinds accepted by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Grouping node with a transform only.
    #[default]
    Empty,
    /// Drawable node backed by a sprite resource.
    Sprite,
    /// Flow layout container.
    Container,
    /// Node meant to receive pointer input.
    Clickable,
    /// Clickable node with a persistent on/off state.
    Toggle,
}

impl NodeKind {
    /// Capability tags implied by the kind alone.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Empty => Capabilities::NONE,
            Self::Sprite => Capabilities::from_bits(Capabilities::DRAWABLE),
            Self::Container => Capabilities::from_bits(Capabilities::CONTAINER),
            Self::Clickable => Capabilities::from_bits(Capabilities::CLICKABLE),
            Self::Toggle => Capabilities::from_bits(Capabilities::CLICKABLE | Capabilities::TOGGLE),
        }
    }

    /// Whether the kind accepts a sprite.
    #[must_use]
    pub const fn accepts_sprite(self) -> bool {
        matches!(self, Self::Sprite | Self::Clickable | Self::Toggle)
    }
}

/// Opaque handle to a resource owned by the external sprite repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle(pub u64);

/// Drawable payload: the authored resource name and, once resolved, its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Resource name as authored.
    pub name: String,
    /// Handle from the repository, `None` until resolved (or when missing).
    pub handle: Option<SpriteHandle>,
}

/// A positioned, styled entity in the scene tree.
///
/// Fields are only writable through [`SceneGraph`](super::SceneGraph) so
/// that every change fires its event and derived state stays consistent.
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) capabilities: Capabilities,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    pub(crate) position: Vec3,
    pub(crate) scale: Vec2,
    pub(crate) rotation: f32,
    pub(crate) size: Vec2,
    pub(crate) center_offset: Vec2,
    pub(crate) anchor: Anchor,
    pub(crate) padding: Padding,

    pub(crate) active: bool,
    pub(crate) showing: bool,
    pub(crate) sorting_order: i32,
    pub(crate) effective_order: i64,

    pub(crate) color: Color,
    pub(crate) color_space: ColorSpace,
    pub(crate) sprite: Option<Sprite>,
    pub(crate) toggled: bool,
    pub(crate) layout: Option<FlowLayout>,

    pub(crate) animations: Vec<Animation>,
    /// Added since this node's last tick; merged at the start of the next one.
    pub(crate) pending_animations: Vec<Animation>,
}

impl SceneNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            name: String::new(),
            kind,
            capabilities: kind.capabilities(),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            size: Vec2::ZERO,
            center_offset: Vec2::ZERO,
            anchor: Anchor::Center,
            padding: Padding::ZERO,
            active: true,
            showing: true,
            sorting_order: 0,
            effective_order: 0,
            color: Color::WHITE,
            color_space: ColorSpace::Rgb,
            sprite: None,
            toggled: false,
            layout: None,
            animations: Vec::new(),
            pending_animations: Vec::new(),
        }
    }

    /// Node identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Authoring name (may be empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind the node was created as.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Capability tags.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Parent, `None` for roots.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in attachment order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local position relative to the parent's origin.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local non-uniform scale.
    #[must_use]
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Local rotation in degrees.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Content size before padding and scale.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Offset of the bounds centre from the anchor point, in local units.
    #[must_use]
    pub fn center_offset(&self) -> Vec2 {
        self.center_offset
    }

    /// Anchor interpreting `position`.
    #[must_use]
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Padding around the content.
    #[must_use]
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// The node's own active flag.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and every ancestor active.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.showing
    }

    /// Author-set sorting order.
    #[must_use]
    pub fn sorting_order(&self) -> i32 {
        self.sorting_order
    }

    /// Sum of the local sorting orders from the root down to this node.
    #[must_use]
    pub fn effective_sorting_order(&self) -> i64 {
        self.effective_order
    }

    /// Current colour.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Colour space used by colour animations that don't specify one.
    #[must_use]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Drawable payload, if any.
    #[must_use]
    pub fn sprite(&self) -> Option<&Sprite> {
        self.sprite.as_ref()
    }

    /// Toggle state (always false for non-toggle nodes).
    #[must_use]
    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Flow layout state for containers.
    #[must_use]
    pub fn layout(&self) -> Option<&FlowLayout> {
        self.layout.as_ref()
    }

    /// Animations currently advancing (excludes ones added since the last tick).
    #[must_use]
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// True while any animation is running or waiting to start.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        !self.animations.is_empty() || !self.pending_animations.is_empty()
    }

    /// Translate * Rotate * Scale relative to the parent.
    #[must_use]
    pub fn local_transform(&self) -> Affine2 {
        Affine2::from_trs(self.position.truncate(), self.rotation, self.scale)
    }

    /// Bounding box (content plus padding) in the node's own unscaled frame.
    ///
    /// Positioned so that the anchor point of the box sits at
    /// `center_offset` minus the anchor's half-extent, i.e. the node origin
    /// is the anchor point for a zero `center_offset`.
    #[must_use]
    pub fn local_bounds(&self) -> Rect {
        let bounds_size = Vec2::new(
            self.size.x + self.padding.horizontal(),
            self.size.y + self.padding.vertical(),
        );
        let center = self.center_offset - self.anchor.direction() * bounds_size * 0.5;
        Rect::from_center(center, bounds_size)
    }

    /// Content rectangle (bounds minus padding) in the node's own frame.
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        let bounds = self.local_bounds();
        Rect::new(
            bounds.x + self.padding.left,
            bounds.y + self.padding.bottom,
            self.size.x,
            self.size.y,
        )
    }

    /// Moves `center_offset` so that the content rectangle is centred on
    /// `center`, whatever the anchor and padding.
    pub(crate) fn center_content_on(&mut self, center: Vec2) {
        let bounds_size = Vec2::new(
            self.size.x + self.padding.horizontal(),
            self.size.y + self.padding.vertical(),
        );
        let bounds_center = center
            + Vec2::new(
                (self.padding.right - self.padding.left) * 0.5,
                (self.padding.top - self.padding.bottom) * 0.5,
            );
        self.center_offset = bounds_center + self.anchor.direction() * bounds_size * 0.5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_flags() {
        let mut caps = NodeKind::Toggle.capabilities();
        assert!(caps.has(Capabilities::CLICKABLE));
        assert!(caps.has(Capabilities::TOGGLE));
        assert!(!caps.has(Capabilities::CONTAINER));

        caps.set(Capabilities::DRAWABLE);
        caps.clear(Capabilities::TOGGLE);
        assert!(caps.has(Capabilities::DRAWABLE));
        assert!(!caps.has(Capabilities::TOGGLE));
    }

    #[test]
    fn test_bounds_follow_anchor() {
        let mut node = SceneNode::new(NodeId(1), NodeKind::Sprite);
        node.size = Vec2::new(10.0, 4.0);

        node.anchor = Anchor::Center;
        assert_eq!(node.local_bounds(), Rect::new(-5.0, -2.0, 10.0, 4.0));

        // Lower-left anchored: the origin is the lower-left corner.
        node.anchor = Anchor::LowerLeft;
        assert_eq!(node.local_bounds(), Rect::new(0.0, 0.0, 10.0, 4.0));
    }

    #[test]
    fn test_padding_grows_bounds_not_content() {
        let mut node = SceneNode::new(NodeId(1), NodeKind::Sprite);
        node.size = Vec2::new(10.0, 10.0);
        node.padding = Padding::uniform(2.0);

        assert_eq!(node.local_bounds().size(), Vec2::new(14.0, 14.0));
        assert_eq!(node.content_rect(), Rect::new(-5.0, -5.0, 10.0, 10.0));
    }

    #[test]
    fn test_center_content_on() {
        let mut node = SceneNode::new(NodeId(1), NodeKind::Container);
        node.size = Vec2::new(20.0, 6.0);
        node.anchor = Anchor::UpperRight;
        node.padding = Padding::new(1.0, 3.0, 0.0, 2.0);

        node.center_content_on(Vec2::new(10.0, 0.0));
        assert!(node.content_rect().center().approx_eq(Vec2::new(10.0, 0.0), 1e-5));
    }
}
