//! Rectangles, anchors and padding.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// One of the nine named reference points of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Top-left corner.
    UpperLeft,
    /// Middle of the top edge.
    UpperCenter,
    /// Top-right corner.
    UpperRight,
    /// Middle of the left edge.
    MiddleLeft,
    /// Centre of the rectangle.
    #[default]
    Center,
    /// Middle of the right edge.
    MiddleRight,
    /// Bottom-left corner.
    LowerLeft,
    /// Middle of the bottom edge.
    LowerCenter,
    /// Bottom-right corner.
    LowerRight,
}

impl Anchor {
    /// All nine anchors, row by row from the top.
    pub const ALL: [Self; 9] = [
        Self::UpperLeft,
        Self::UpperCenter,
        Self::UpperRight,
        Self::MiddleLeft,
        Self::Center,
        Self::MiddleRight,
        Self::LowerLeft,
        Self::LowerCenter,
        Self::LowerRight,
    ];

    /// Unit offset from the centre toward this anchor, y-up.
    ///
    /// Multiply by a half-size to get the anchor point relative to the
    /// centre of a rectangle.
    #[must_use]
    pub const fn direction(self) -> Vec2 {
        match self {
            Self::UpperLeft => Vec2::new(-1.0, 1.0),
            Self::UpperCenter => Vec2::new(0.0, 1.0),
            Self::UpperRight => Vec2::new(1.0, 1.0),
            Self::MiddleLeft => Vec2::new(-1.0, 0.0),
            Self::Center => Vec2::new(0.0, 0.0),
            Self::MiddleRight => Vec2::new(1.0, 0.0),
            Self::LowerLeft => Vec2::new(-1.0, -1.0),
            Self::LowerCenter => Vec2::new(0.0, -1.0),
            Self::LowerRight => Vec2::new(1.0, -1.0),
        }
    }
}

/// Four-sided inset that grows a node's bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    /// Left inset.
    pub left: f32,
    /// Right inset.
    pub right: f32,
    /// Top inset.
    pub top: f32,
    /// Bottom inset.
    pub bottom: f32,
}

impl Padding {
    /// No padding.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates padding from explicit insets.
    #[must_use]
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Same inset on every side.
    #[must_use]
    pub const fn uniform(amount: f32) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    /// Total horizontal inset.
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical inset.
    #[must_use]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Grows `rect` outward by the insets.
    #[must_use]
    pub fn apply(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x - self.left,
            rect.y - self.bottom,
            rect.width + self.horizontal(),
            rect.height + self.vertical(),
        )
    }
}

/// An axis-aligned rectangle, y-up: `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// A zero-sized rect at the origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle centred on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x * 0.5,
            center.y - size.y * 0.5,
            size.x,
            size.y,
        )
    }

    /// Returns the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Returns the size.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Returns the point named by `anchor`.
    #[must_use]
    pub fn corner(&self, anchor: Anchor) -> Vec2 {
        self.center() + anchor.direction() * self.size() * 0.5
    }

    /// Returns true if the point is inside the rectangle (edges included).
    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.top()
    }

    /// Returns true if two rectangles intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.top()
            && self.top() > other.y
    }

    /// Returns the intersection of two rectangles, or None if they don't intersect.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());

        Some(Self::new(x, y, right - x, top - y))
    }

    /// Expands the rectangle by the given amount on all sides.
    #[must_use]
    pub fn expand(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}

/// A rectangle rotated about its centre, used for world-space bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RotatedRect {
    /// Centre in world space.
    pub center: Vec2,
    /// Half width and half height before rotation.
    pub half_extents: Vec2,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
}

impl RotatedRect {
    /// Creates a rotated rectangle.
    #[must_use]
    pub const fn new(center: Vec2, half_extents: Vec2, rotation: f32) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// Full size before rotation.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.half_extents * 2.0
    }

    /// Returns true if the world point lies inside (edges included).
    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        let local = (p - self.center).rotated(-self.rotation);
        local.x.abs() <= self.half_extents.x && local.y.abs() <= self.half_extents.y
    }

    /// World position of the point named by `anchor`.
    #[must_use]
    pub fn corner(&self, anchor: Anchor) -> Vec2 {
        self.center + (anchor.direction() * self.half_extents).rotated(self.rotation)
    }

    /// The four corners, counter-clockwise from lower-left.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.corner(Anchor::LowerLeft),
            self.corner(Anchor::LowerRight),
            self.corner(Anchor::UpperRight),
            self.corner(Anchor::UpperLeft),
        ]
    }

    /// Smallest axis-aligned rectangle containing this one.
    #[must_use]
    pub fn aabb(&self) -> Rect {
        let corners = self.corners();
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = Vec2::new(min.x.min(c.x), min.y.min(c.y));
            max = max.max(*c);
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}
