//! Pointer samples and per-pointer gesture state.

use kestrel_shared::Vec2;

use crate::scene::NodeId;

/// Identifies one pointer stream (mouse, or one finger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

impl PointerId {
    /// The mouse, or the first touch.
    pub const PRIMARY: Self = Self(0);
}

/// Which part of a gesture an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GesturePhase {
    /// Pointer pressed.
    Down,
    /// Pointer moved while pressed, past the jitter threshold.
    Drag,
    /// Pointer released.
    Up,
}

/// What a handler or predicate sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Stream the sample came from.
    pub pointer: PointerId,
    /// Gesture phase.
    pub phase: GesturePhase,
    /// Target node.
    pub node: NodeId,
    /// Current world position.
    pub position: Vec2,
    /// Movement since the previous sample of this gesture.
    pub delta: Vec2,
    /// World position of the initial press.
    pub origin: Vec2,
    /// Cumulative distance travelled since the press.
    pub travel: f32,
    /// `travel` went past the drag threshold at some point in this gesture.
    /// Click semantics layered on `up` should bail out when set.
    pub exceeded_drag_threshold: bool,
}

/// Gesture stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// Pressed, not yet moved past the threshold.
    Pressed,
    /// Moved past the threshold.
    Dragging,
}

/// An in-progress gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gesture {
    pub(crate) state: GestureState,
    /// Exclusive owner, set when `down` was delivered.
    pub(crate) owner: NodeId,
    pub(crate) origin: Vec2,
    pub(crate) last: Vec2,
    pub(crate) travel: f32,
}

impl Gesture {
    pub(crate) fn new(owner: NodeId, origin: Vec2) -> Self {
        Self {
            state: GestureState::Pressed,
            owner,
            origin,
            last: origin,
            travel: 0.0,
        }
    }

    /// Records a sample; returns the delta since the last one.
    pub(crate) fn advance(&mut self, position: Vec2, drag_threshold: f32) -> Vec2 {
        let delta = position - self.last;
        self.travel += delta.length();
        self.last = position;
        if self.travel > drag_threshold {
            self.state = GestureState::Dragging;
        }
        delta
    }

    pub(crate) fn event(&self, pointer: PointerId, phase: GesturePhase, delta: Vec2) -> PointerEvent {
        PointerEvent {
            pointer,
            phase,
            node: self.owner,
            position: self.last,
            delta,
            origin: self.origin,
            travel: self.travel,
            exceeded_drag_threshold: self.state == GestureState::Dragging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_is_cumulative() {
        let mut gesture = Gesture::new(NodeId(1), Vec2::ZERO);
        gesture.advance(Vec2::new(3.0, 4.0), 8.0);
        assert_eq!(gesture.state, GestureState::Pressed);
        // Back to the origin: net zero, travel 10.
        let delta = gesture.advance(Vec2::ZERO, 8.0);
        assert_eq!(delta, Vec2::new(-3.0, -4.0));
        assert_eq!(gesture.travel, 10.0);
        assert_eq!(gesture.state, GestureState::Dragging);
    }
}
