//! Identifier types issued by a [`SceneGraph`](super::SceneGraph).

use std::fmt;

/// Unique identifier for a scene node.
///
/// Issued from a per-scene counter that only ever increases, so a handle
/// to a destroyed node is never handed out again and stale use is always
/// detectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an animation attached to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnimationId(pub(crate) u64);

impl AnimationId {
    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle returned by [`SceneGraph::subscribe`](super::SceneGraph::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
