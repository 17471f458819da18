//! Incremental flow layout for container nodes.
//!
//! A container places each child as it is attached: the first child's
//! leading edge sits on the container origin, every later child starts
//! `spacing` past the trailing edge of the previous one. The container
//! tracks a running main-axis extent and the largest cross-axis extent,
//! so each attachment is O(1). Children that are already placed are
//! never measured again; resizing or detaching one leaves the others
//! where they are.

use serde::{Deserialize, Serialize};

use kestrel_shared::{Affine2, Rect, Vec2};

/// Axis a container flows along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X axis.
    Horizontal,
    /// Y axis.
    Vertical,
}

impl Axis {
    /// Builds a vector from main and cross components.
    #[must_use]
    pub const fn compose(self, main: f32, cross: f32) -> Vec2 {
        match self {
            Self::Horizontal => Vec2::new(main, cross),
            Self::Vertical => Vec2::new(cross, main),
        }
    }

    /// Splits a vector into `(main, cross)`.
    #[must_use]
    pub const fn split(self, v: Vec2) -> (f32, f32) {
        match self {
            Self::Horizontal => (v.x, v.y),
            Self::Vertical => (v.y, v.x),
        }
    }
}

/// Direction children are appended in (y-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    /// Row growing toward +X.
    #[default]
    LeftToRight,
    /// Row growing toward -X.
    RightToLeft,
    /// Column growing toward +Y.
    BottomToTop,
    /// Column growing toward -Y.
    TopToBottom,
}

impl FlowDirection {
    /// Axis of the flow.
    #[must_use]
    pub const fn axis(self) -> Axis {
        match self {
            Self::LeftToRight | Self::RightToLeft => Axis::Horizontal,
            Self::BottomToTop | Self::TopToBottom => Axis::Vertical,
        }
    }

    /// +1 when the flow grows along the positive axis, -1 otherwise.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::LeftToRight | Self::BottomToTop => 1.0,
            Self::RightToLeft | Self::TopToBottom => -1.0,
        }
    }
}

/// Where a newly attached child goes and what the container becomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Child's new local position (x, y) in the container frame.
    pub child_position: Vec2,
    /// Container content size after the placement.
    pub size: Vec2,
    /// Centre of the laid-out content in the container frame.
    pub content_center: Vec2,
}

/// Running layout state of a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLayout {
    direction: FlowDirection,
    spacing: f32,
    count: usize,
    main_extent: f32,
    cross_extent: f32,
}

impl FlowLayout {
    /// Creates an empty layout.
    #[must_use]
    pub const fn new(direction: FlowDirection, spacing: f32) -> Self {
        Self {
            direction,
            spacing,
            count: 0,
            main_extent: 0.0,
            cross_extent: 0.0,
        }
    }

    /// Flow direction.
    #[must_use]
    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    /// Gap between consecutive children.
    #[must_use]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Number of children placed so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Distance from the origin to the trailing edge of the last child.
    #[must_use]
    pub fn main_extent(&self) -> f32 {
        self.main_extent
    }

    /// Largest cross-axis extent of any placed child.
    #[must_use]
    pub fn cross_extent(&self) -> f32 {
        self.cross_extent
    }

    /// Content size of the container.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.direction
            .axis()
            .compose(self.main_extent, self.cross_extent)
    }

    /// Places a child whose extent (relative to its own position, in the
    /// container frame) is `extent`.
    pub fn place(&mut self, extent: Rect) -> Placement {
        let axis = self.direction.axis();
        let sign = self.direction.sign();
        let (main_min, cross_min) = axis.split(Vec2::new(extent.x, extent.y));
        let (main_len, cross_len) = axis.split(extent.size());

        if self.count > 0 {
            self.main_extent += self.spacing;
        }
        let leading = self.main_extent;
        let main_pos = if sign > 0.0 {
            leading - main_min
        } else {
            -leading - (main_min + main_len)
        };
        let cross_pos = -(cross_min + cross_len * 0.5);

        self.main_extent += main_len;
        self.cross_extent = self.cross_extent.max(cross_len);
        self.count += 1;

        tracing::trace!(
            count = self.count,
            main = self.main_extent,
            cross = self.cross_extent,
            "flow placement"
        );

        Placement {
            child_position: axis.compose(main_pos, cross_pos),
            size: self.size(),
            content_center: axis.compose(sign * self.main_extent * 0.5, 0.0),
        }
    }
}

/// Axis-aligned extent of `bounds` after `transform`.
#[must_use]
pub fn transformed_extent(bounds: Rect, transform: Affine2) -> Rect {
    let corners = [
        Vec2::new(bounds.x, bounds.y),
        Vec2::new(bounds.right(), bounds.y),
        Vec2::new(bounds.right(), bounds.top()),
        Vec2::new(bounds.x, bounds.top()),
    ]
    .map(|c| transform.transform_point(c));

    let mut min = corners[0];
    let mut max = corners[0];
    for c in &corners[1..] {
        min = Vec2::new(min.x.min(c.x), min.y.min(c.y));
        max = max.max(*c);
    }
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centered(w: f32, h: f32) -> Rect {
        Rect::from_center(Vec2::ZERO, Vec2::new(w, h))
    }

    #[test]
    fn test_first_child_leading_edge_at_origin() {
        let mut layout = FlowLayout::new(FlowDirection::LeftToRight, 5.0);
        let p = layout.place(centered(10.0, 4.0));
        assert_eq!(p.child_position, Vec2::new(5.0, 0.0));
        assert_eq!(p.size, Vec2::new(10.0, 4.0));
        assert_eq!(p.content_center, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_row_accumulates_with_spacing() {
        let mut layout = FlowLayout::new(FlowDirection::LeftToRight, 2.0);
        layout.place(centered(10.0, 4.0));
        let p = layout.place(centered(6.0, 8.0));
        // Leading edge at 10 + 2.
        assert_eq!(p.child_position, Vec2::new(15.0, 0.0));
        assert_eq!(p.size, Vec2::new(18.0, 8.0));
        assert_eq!(layout.count(), 2);
    }

    #[test]
    fn test_reverse_row_grows_negative() {
        let mut layout = FlowLayout::new(FlowDirection::RightToLeft, 1.0);
        let first = layout.place(centered(4.0, 4.0));
        let second = layout.place(centered(4.0, 4.0));
        assert_eq!(first.child_position, Vec2::new(-2.0, 0.0));
        assert_eq!(second.child_position, Vec2::new(-7.0, 0.0));
        assert_eq!(second.content_center, Vec2::new(-4.5, 0.0));
    }

    #[test]
    fn test_column_top_to_bottom() {
        let mut layout = FlowLayout::new(FlowDirection::TopToBottom, 0.0);
        layout.place(centered(3.0, 2.0));
        let p = layout.place(centered(5.0, 2.0));
        assert_eq!(p.child_position, Vec2::new(0.0, -3.0));
        assert_eq!(p.size, Vec2::new(5.0, 4.0));
    }

    #[test]
    fn test_off_centre_extent_is_recentred_across() {
        let mut layout = FlowLayout::new(FlowDirection::LeftToRight, 0.0);
        // Lower-left anchored child: extent starts at its origin.
        let p = layout.place(Rect::new(0.0, 0.0, 4.0, 2.0));
        assert_eq!(p.child_position, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_transformed_extent_rotation() {
        let rect = centered(4.0, 2.0);
        let extent = transformed_extent(rect, Affine2::from_trs(Vec2::ZERO, 90.0, Vec2::ONE));
        assert!((extent.width - 2.0).abs() < 1e-5);
        assert!((extent.height - 4.0).abs() < 1e-5);
    }
}
