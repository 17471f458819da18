//! Per-node event bus.
//!
//! Each node gets one bus keyed by [`EventKind`]. Handlers receive the
//! node, the event and a [`Commands`] queue; they never see the graph
//! itself, so anything they want to change is deferred until the
//! operation that fired the event has finished.

use std::collections::HashMap;

use kestrel_shared::Vec2;

use super::commands::Commands;
use super::id::{AnimationId, NodeId, SubscriptionId};
use crate::style::Color;

/// Something that happened to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeEvent {
    /// The node's own active flag changed.
    ActiveChanged {
        /// New value.
        active: bool,
    },
    /// The node's showing flag changed (own flag or an ancestor's).
    ShowingChanged {
        /// New value.
        showing: bool,
    },
    /// A child was attached.
    ChildAttached {
        /// The new child.
        child: NodeId,
    },
    /// A child was detached (destroyed).
    ChildDetached {
        /// The former child.
        child: NodeId,
    },
    /// The node is about to be destroyed; its children are still alive.
    BeforeDestroy,
    /// The effective sorting order changed.
    SortingOrderChanged {
        /// New effective order.
        effective: i64,
    },
    /// An animation was attached (it starts on the next tick).
    AnimationAttached {
        /// The animation.
        animation: AnimationId,
    },
    /// An animation reached its end and was removed.
    AnimationCompleted {
        /// The animation.
        animation: AnimationId,
    },
    /// Position, scale, rotation, anchor or padding changed.
    TransformChanged,
    /// Colour changed.
    ColorChanged {
        /// New colour.
        color: Color,
    },
    /// Content size changed.
    SizeChanged {
        /// New size.
        size: Vec2,
    },
    /// Toggle state changed.
    ToggleChanged {
        /// New state.
        toggled: bool,
    },
    /// Variable-step frame tick.
    Tick {
        /// Seconds since the last tick.
        dt: f32,
    },
    /// Fixed-step tick.
    FixedTick {
        /// Fixed step in seconds.
        dt: f32,
    },
    /// Post-animation tick.
    LateTick {
        /// Seconds since the last late tick.
        dt: f32,
    },
}

/// Discriminant of [`NodeEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`NodeEvent::ActiveChanged`].
    ActiveChanged,
    /// See [`NodeEvent::ShowingChanged`].
    ShowingChanged,
    /// See [`NodeEvent::ChildAttached`].
    ChildAttached,
    /// See [`NodeEvent::ChildDetached`].
    ChildDetached,
    /// See [`NodeEvent::BeforeDestroy`].
    BeforeDestroy,
    /// See [`NodeEvent::SortingOrderChanged`].
    SortingOrderChanged,
    /// See [`NodeEvent::AnimationAttached`].
    AnimationAttached,
    /// See [`NodeEvent::AnimationCompleted`].
    AnimationCompleted,
    /// See [`NodeEvent::TransformChanged`].
    TransformChanged,
    /// See [`NodeEvent::ColorChanged`].
    ColorChanged,
    /// See [`NodeEvent::SizeChanged`].
    SizeChanged,
    /// See [`NodeEvent::ToggleChanged`].
    ToggleChanged,
    /// See [`NodeEvent::Tick`].
    Tick,
    /// See [`NodeEvent::FixedTick`].
    FixedTick,
    /// See [`NodeEvent::LateTick`].
    LateTick,
}

impl NodeEvent {
    /// Subscription key of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ActiveChanged { .. } => EventKind::ActiveChanged,
            Self::ShowingChanged { .. } => EventKind::ShowingChanged,
            Self::ChildAttached { .. } => EventKind::ChildAttached,
            Self::ChildDetached { .. } => EventKind::ChildDetached,
            Self::BeforeDestroy => EventKind::BeforeDestroy,
            Self::SortingOrderChanged { .. } => EventKind::SortingOrderChanged,
            Self::AnimationAttached { .. } => EventKind::AnimationAttached,
            Self::AnimationCompleted { .. } => EventKind::AnimationCompleted,
            Self::TransformChanged => EventKind::TransformChanged,
            Self::ColorChanged { .. } => EventKind::ColorChanged,
            Self::SizeChanged { .. } => EventKind::SizeChanged,
            Self::ToggleChanged { .. } => EventKind::ToggleChanged,
            Self::Tick { .. } => EventKind::Tick,
            Self::FixedTick { .. } => EventKind::FixedTick,
            Self::LateTick { .. } => EventKind::LateTick,
        }
    }
}

/// Event handler callback.
pub type EventHandler = Box<dyn FnMut(NodeId, &NodeEvent, &mut Commands)>;

/// Handlers of one node, grouped by event kind in subscription order.
#[derive(Default)]
pub(crate) struct EventBus {
    handlers: HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self, id: SubscriptionId, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push((id, handler));
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for list in self.handlers.values_mut() {
            let before = list.len();
            list.retain(|(sid, _)| *sid != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Calls every handler subscribed to the event's kind.
    pub(crate) fn dispatch(&mut self, node: NodeId, event: &NodeEvent, commands: &mut Commands) {
        if let Some(list) = self.handlers.get_mut(&event.kind()) {
            for (_, handler) in list.iter_mut() {
                handler(node, event, commands);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_dispatch_by_kind() {
        let mut bus = EventBus::default();
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        bus.subscribe(
            SubscriptionId(1),
            EventKind::Tick,
            Box::new(move |_, _, _| seen.set(seen.get() + 1)),
        );

        let mut commands = Commands::default();
        bus.dispatch(NodeId(1), &NodeEvent::Tick { dt: 0.1 }, &mut commands);
        bus.dispatch(NodeId(1), &NodeEvent::LateTick { dt: 0.1 }, &mut commands);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::default();
        bus.subscribe(SubscriptionId(7), EventKind::BeforeDestroy, Box::new(|_, _, _| {}));
        assert!(!bus.is_empty());
        assert!(bus.unsubscribe(SubscriptionId(7)));
        assert!(!bus.unsubscribe(SubscriptionId(7)));
        assert!(bus.is_empty());
    }
}
