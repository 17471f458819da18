//! Point-in-shape tests over a node's frame.
//!
//! Checkers map the world point into the node's local frame through the
//! inverse world transform, so rotation and scale anywhere in the parent
//! chain are honoured. A node whose world transform is singular (zero
//! scale somewhere) never contains anything.

use kestrel_shared::Vec2;

use crate::scene::{NodeId, SceneGraph};

/// Decides whether a world point falls inside a node's interactable shape.
pub trait AreaChecker {
    /// Returns true if `point` (world space) is inside `node`'s area.
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool;
}

impl<F> AreaChecker for F
where
    F: Fn(&SceneGraph, NodeId, Vec2) -> bool,
{
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool {
        self(scene, node, point)
    }
}

fn local_point(scene: &SceneGraph, node: NodeId, point: Vec2) -> Option<Vec2> {
    scene.to_local(node, point).ok().flatten()
}

/// The node's bounding box, optionally grown by a margin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectArea {
    /// Extra local units on every side.
    pub margin: f32,
}

impl RectArea {
    /// Exact bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self { margin: 0.0 }
    }

    /// Bounds grown by `margin` (shrunk if negative).
    #[must_use]
    pub const fn with_margin(margin: f32) -> Self {
        Self { margin }
    }
}

impl AreaChecker for RectArea {
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool {
        let Some(bounds) = scene.node(node).map(|n| n.local_bounds().expand(self.margin)) else {
            return false;
        };
        local_point(scene, node, point).is_some_and(|p| bounds.contains(p))
    }
}

/// A triangle in the node's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleArea {
    /// Vertices, any winding.
    pub vertices: [Vec2; 3],
}

impl TriangleArea {
    /// Creates a triangle area.
    #[must_use]
    pub const fn new(a: Vec2, b: Vec2, c: Vec2) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }
}

impl AreaChecker for TriangleArea {
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool {
        local_point(scene, node, point).is_some_and(|p| {
            let [a, b, c] = self.vertices;
            let d1 = (b - a).perp_dot(p - a);
            let d2 = (c - b).perp_dot(p - b);
            let d3 = (a - c).perp_dot(p - c);
            let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
            let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
            !(has_neg && has_pos)
        })
    }
}

/// An arbitrary polygon in the node's local frame, even-odd fill rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonArea {
    /// Vertices in order; the last connects back to the first.
    pub points: Vec<Vec2>,
}

impl PolygonArea {
    /// Creates a polygon area.
    #[must_use]
    pub fn new(points: impl Into<Vec<Vec2>>) -> Self {
        Self {
            points: points.into(),
        }
    }
}

impl AreaChecker for PolygonArea {
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        local_point(scene, node, point).is_some_and(|p| {
            let mut inside = false;
            let mut j = self.points.len() - 1;
            for (i, a) in self.points.iter().enumerate() {
                let b = self.points[j];
                if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
                {
                    inside = !inside;
                }
                j = i;
            }
            inside
        })
    }
}

/// A circle in the node's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleArea {
    /// Centre, local units.
    pub center: Vec2,
    /// Radius, local units.
    pub radius: f32,
}

impl CircleArea {
    /// Creates a circle area.
    #[must_use]
    pub const fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl AreaChecker for CircleArea {
    fn contains(&self, scene: &SceneGraph, node: NodeId, point: Vec2) -> bool {
        local_point(scene, node, point)
            .is_some_and(|p| (p - self.center).length_squared() <= self.radius * self.radius)
    }
}
