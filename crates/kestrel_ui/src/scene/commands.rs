//! Deferred scene mutations.

use std::collections::VecDeque;
use std::fmt;

use kestrel_shared::Vec3;

use super::graph::SceneGraph;
use super::id::{AnimationId, NodeId};
use crate::animation::AnimationSpec;
use crate::error::SceneResult;
use crate::style::Color;

/// A mutation queued for later.
pub type Command = Box<dyn FnOnce(&mut SceneGraph) -> SceneResult<()>>;

/// Queue of mutations applied once the current operation or traversal
/// completes.
///
/// Commands targeting a node that is gone by the time they run are
/// dropped silently, matching the rule that a destroyed target is an
/// expected outcome, not an error.
#[derive(Default)]
pub struct Commands {
    queue: VecDeque<Command>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("len", &self.queue.len())
            .finish()
    }
}

impl Commands {
    /// Queues an arbitrary mutation.
    pub fn push(&mut self, command: impl FnOnce(&mut SceneGraph) -> SceneResult<()> + 'static) {
        self.queue.push_back(Box::new(command));
    }

    /// Destroys a node and its subtree.
    pub fn destroy(&mut self, node: NodeId) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.destroy(node)?;
            }
            Ok(())
        });
    }

    /// Sets a node's active flag.
    pub fn set_active(&mut self, node: NodeId, active: bool) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.set_active(node, active)?;
            }
            Ok(())
        });
    }

    /// Attaches an animation; it starts on the tick after the one in
    /// which the command runs.
    pub fn add_animation(&mut self, node: NodeId, spec: AnimationSpec) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.add_animation(node, spec)?;
            }
            Ok(())
        });
    }

    /// Removes an animation without firing a completion event.
    pub fn remove_animation(&mut self, node: NodeId, animation: AnimationId) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.remove_animation(node, animation)?;
            }
            Ok(())
        });
    }

    /// Sets a node's local position.
    pub fn set_position(&mut self, node: NodeId, position: Vec3) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.set_position(node, position)?;
            }
            Ok(())
        });
    }

    /// Sets a node's colour.
    pub fn set_color(&mut self, node: NodeId, color: Color) {
        self.push(move |scene| {
            if scene.contains(node) {
                scene.set_color(node, color)?;
            }
            Ok(())
        });
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }
}
