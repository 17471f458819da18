//! Input router: priority hit-testing and down/drag/up dispatch.
//!
//! Every pointer stream runs its own small state machine:
//!
//! ```text
//! Idle --down--> Pressed --move past threshold--> Dragging
//!   ^               |                                 |
//!   +------up-------+----------------up---------------+
//! ```
//!
//! `down` is hit-tested; the winner becomes the gesture owner if its
//! `may_down` chain passes. `drag` and `up` go to the owner only, never
//! re-hit-tested, so a drag that leaves the node keeps controlling it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use kestrel_shared::{Vec2, DEFAULT_DRAG_THRESHOLD};

use super::area::AreaChecker;
use super::pointer::{Gesture, GesturePhase, GestureState, PointerEvent, PointerId};
use crate::error::SceneResult;
use crate::scene::{Capabilities, NodeId, SceneGraph};

/// Router tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Travel (world units) after which a press becomes a drag.
    pub drag_threshold: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
        }
    }
}

/// Behaviour callback.
pub type Callback = Box<dyn FnMut(&mut SceneGraph, &PointerEvent) -> SceneResult<()>>;

/// "May this proceed" predicate. Returning false vetoes the dispatch.
pub type Predicate = Box<dyn FnMut(&SceneGraph, &PointerEvent) -> bool>;

/// Callbacks and predicate chains of one registration.
#[derive(Default)]
pub struct Handlers {
    on_down: Option<Callback>,
    on_drag: Option<Callback>,
    on_up: Option<Callback>,
    may_down: Vec<Predicate>,
    may_drag: Vec<Predicate>,
    may_up: Vec<Predicate>,
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_down", &self.on_down.is_some())
            .field("on_drag", &self.on_drag.is_some())
            .field("on_up", &self.on_up.is_some())
            .field("may_down", &self.may_down.len())
            .field("may_drag", &self.may_drag.len())
            .field("may_up", &self.may_up.len())
            .finish()
    }
}

impl Handlers {
    /// No callbacks, no predicates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the node's toggle state on an `up` that stayed under the drag
    /// threshold.
    #[must_use]
    pub fn toggle() -> Self {
        Self::new().on_up(|scene, event| {
            if event.exceeded_drag_threshold {
                return Ok(());
            }
            let toggled = scene.node(event.node).is_some_and(|n| n.is_toggled());
            scene.set_toggled(event.node, !toggled)
        })
    }

    /// Sets the `down` callback.
    #[must_use]
    pub fn on_down(
        mut self,
        f: impl FnMut(&mut SceneGraph, &PointerEvent) -> SceneResult<()> + 'static,
    ) -> Self {
        self.on_down = Some(Box::new(f));
        self
    }

    /// Sets the `drag` callback.
    #[must_use]
    pub fn on_drag(
        mut self,
        f: impl FnMut(&mut SceneGraph, &PointerEvent) -> SceneResult<()> + 'static,
    ) -> Self {
        self.on_drag = Some(Box::new(f));
        self
    }

    /// Sets the `up` callback.
    #[must_use]
    pub fn on_up(
        mut self,
        f: impl FnMut(&mut SceneGraph, &PointerEvent) -> SceneResult<()> + 'static,
    ) -> Self {
        self.on_up = Some(Box::new(f));
        self
    }

    /// Appends a predicate to the `down` chain.
    #[must_use]
    pub fn may_down(mut self, p: impl FnMut(&SceneGraph, &PointerEvent) -> bool + 'static) -> Self {
        self.may_down.push(Box::new(p));
        self
    }

    /// Appends a predicate to the `drag` chain.
    #[must_use]
    pub fn may_drag(mut self, p: impl FnMut(&SceneGraph, &PointerEvent) -> bool + 'static) -> Self {
        self.may_drag.push(Box::new(p));
        self
    }

    /// Appends a predicate to the `up` chain.
    #[must_use]
    pub fn may_up(mut self, p: impl FnMut(&SceneGraph, &PointerEvent) -> bool + 'static) -> Self {
        self.may_up.push(Box::new(p));
        self
    }

    /// Runs the chain for `phase`, then the callback if every predicate
    /// passed. Returns false on veto.
    fn dispatch(&mut self, scene: &mut SceneGraph, event: &PointerEvent) -> SceneResult<bool> {
        let (chain, callback) = match event.phase {
            GesturePhase::Down => (&mut self.may_down, &mut self.on_down),
            GesturePhase::Drag => (&mut self.may_drag, &mut self.on_drag),
            GesturePhase::Up => (&mut self.may_up, &mut self.on_up),
        };
        if !chain.iter_mut().all(|p| p(&*scene, event)) {
            return Ok(false);
        }
        if let Some(callback) = callback.as_mut() {
            callback(scene, event)?;
        }
        Ok(true)
    }
}

/// Handle returned by [`InputRouter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

struct Registration {
    id: RegistrationId,
    node: NodeId,
    area: Box<dyn AreaChecker>,
    handlers: Handlers,
}

/// Outcome of feeding one pointer sample to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Predicates passed and the callback ran.
    Delivered(NodeId),
    /// A predicate vetoed; nothing ran.
    Vetoed(NodeId),
    /// Pointer moved but has not travelled past the drag threshold.
    Held(NodeId),
    /// Nothing was hit, or no gesture is in progress for the pointer.
    NoTarget,
}

impl Dispatch {
    /// The node involved, if any.
    #[must_use]
    pub const fn target(self) -> Option<NodeId> {
        match self {
            Self::Delivered(n) | Self::Vetoed(n) | Self::Held(n) => Some(n),
            Self::NoTarget => None,
        }
    }

    /// True when a callback ran.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Registry of interactable nodes plus per-pointer gesture state.
///
/// One router per scene, created alongside the [`SceneGraph`] and passed
/// explicitly; there is no global registry.
pub struct InputRouter {
    config: RouterConfig,
    registrations: Vec<Registration>,
    gestures: HashMap<PointerId, (RegistrationId, Gesture)>,
    next_id: u64,
}

impl fmt::Debug for InputRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRouter")
            .field("config", &self.config)
            .field("registrations", &self.registrations.len())
            .field("gestures", &self.gestures.len())
            .finish()
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl InputRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            registrations: Vec::new(),
            gestures: HashMap::new(),
            next_id: 1,
        }
    }

    /// Router configuration.
    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.config
    }

    /// Number of registrations (including ones not yet pruned).
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registers a node as interactable and tags it `CLICKABLE`.
    ///
    /// Later registrations win hit-test ties.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn register(
        &mut self,
        scene: &mut SceneGraph,
        node: NodeId,
        area: impl AreaChecker + 'static,
        handlers: Handlers,
    ) -> SceneResult<RegistrationId> {
        scene.add_capability(node, Capabilities::CLICKABLE)?;
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            node,
            area: Box::new(area),
            handlers,
        });
        debug!(node = %node, registration = id.0, "interactable registered");
        Ok(id)
    }

    /// Removes a registration and any gesture it owns. Returns false if it
    /// was not registered.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.gestures.retain(|_, (owner, _)| *owner != id);
        before != self.registrations.len()
    }

    /// Removes every registration of a node. Returns how many were removed.
    pub fn unregister_node(&mut self, node: NodeId) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.node != node);
        self.gestures.retain(|_, (_, g)| g.owner != node);
        before - self.registrations.len()
    }

    fn prune(&mut self, scene: &SceneGraph) {
        let before = self.registrations.len();
        self.registrations.retain(|r| scene.contains(r.node));
        let pruned = before - self.registrations.len();
        if pruned > 0 {
            debug!(pruned, "dropped registrations of destroyed nodes");
        }
    }

    /// Index of the winning registration at `point`: highest effective
    /// sorting order, then most recent registration. Only showing nodes
    /// tagged `CLICKABLE` take part.
    fn hit_index(&self, scene: &SceneGraph, point: Vec2) -> Option<usize> {
        self.registrations
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let node = scene.node(r.node)?;
                if !node.is_showing()
                    || !node.capabilities().has(Capabilities::CLICKABLE)
                    || !r.area.contains(scene, r.node, point)
                {
                    return None;
                }
                Some((node.effective_sorting_order(), r.id, i))
            })
            .max_by_key(|(order, id, _)| (*order, *id))
            .map(|(_, _, i)| i)
    }

    /// Topmost showing interactable node at `point`.
    #[must_use]
    pub fn hit_test(&self, scene: &SceneGraph, point: Vec2) -> Option<NodeId> {
        self.hit_index(scene, point)
            .map(|i| self.registrations[i].node)
    }

    /// Current gesture owner of a pointer.
    #[must_use]
    pub fn owner(&self, pointer: PointerId) -> Option<NodeId> {
        self.gestures.get(&pointer).map(|(_, g)| g.owner)
    }

    /// True while the pointer is dragging past the threshold.
    #[must_use]
    pub fn is_dragging(&self, pointer: PointerId) -> bool {
        self.gestures
            .get(&pointer)
            .is_some_and(|(_, g)| g.state == GestureState::Dragging)
    }

    /// Drops a pointer's gesture without dispatching. Returns false if
    /// there was none.
    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.gestures.remove(&pointer).is_some()
    }

    /// Pointer pressed at `position`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the `down` callback.
    pub fn pointer_down(
        &mut self,
        scene: &mut SceneGraph,
        pointer: PointerId,
        position: Vec2,
    ) -> SceneResult<Dispatch> {
        self.prune(scene);
        if self.gestures.remove(&pointer).is_some() {
            debug!(pointer = pointer.0, "down without up; previous gesture dropped");
        }

        let Some(index) = self.hit_index(scene, position) else {
            trace!(pointer = pointer.0, x = position.x, y = position.y, "down missed");
            return Ok(Dispatch::NoTarget);
        };
        let registration = &mut self.registrations[index];
        let node = registration.node;
        let gesture = Gesture::new(node, position);
        let event = gesture.event(pointer, GesturePhase::Down, Vec2::ZERO);

        if !registration.handlers.dispatch(scene, &event)? {
            trace!(node = %node, "down vetoed");
            return Ok(Dispatch::Vetoed(node));
        }
        let id = registration.id;
        // Callback may have destroyed the node.
        if scene.contains(node) {
            self.gestures.insert(pointer, (id, gesture));
        }
        trace!(node = %node, "down delivered");
        Ok(Dispatch::Delivered(node))
    }

    /// Pointer moved to `position`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the `drag` callback.
    pub fn pointer_move(
        &mut self,
        scene: &mut SceneGraph,
        pointer: PointerId,
        position: Vec2,
    ) -> SceneResult<Dispatch> {
        let threshold = self.config.drag_threshold;
        let Some((id, gesture)) = self.gestures.get_mut(&pointer) else {
            return Ok(Dispatch::NoTarget);
        };
        let id = *id;
        let owner = gesture.owner;
        if !scene.contains(owner) {
            self.gestures.remove(&pointer);
            return Ok(Dispatch::NoTarget);
        }
        let delta = gesture.advance(position, threshold);
        if gesture.state == GestureState::Pressed {
            return Ok(Dispatch::Held(owner));
        }
        let event = gesture.event(pointer, GesturePhase::Drag, delta);

        let Some(registration) = self.registrations.iter_mut().find(|r| r.id == id) else {
            self.gestures.remove(&pointer);
            return Ok(Dispatch::NoTarget);
        };
        if registration.handlers.dispatch(scene, &event)? {
            Ok(Dispatch::Delivered(owner))
        } else {
            Ok(Dispatch::Vetoed(owner))
        }
    }

    /// Pointer released at `position`. Ends the gesture whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Propagates errors from the `up` callback.
    pub fn pointer_up(
        &mut self,
        scene: &mut SceneGraph,
        pointer: PointerId,
        position: Vec2,
    ) -> SceneResult<Dispatch> {
        let threshold = self.config.drag_threshold;
        let Some((id, mut gesture)) = self.gestures.remove(&pointer) else {
            return Ok(Dispatch::NoTarget);
        };
        let owner = gesture.owner;
        if !scene.contains(owner) {
            return Ok(Dispatch::NoTarget);
        }
        let delta = gesture.advance(position, threshold);
        let event = gesture.event(pointer, GesturePhase::Up, delta);

        let Some(registration) = self.registrations.iter_mut().find(|r| r.id == id) else {
            return Ok(Dispatch::NoTarget);
        };
        if registration.handlers.dispatch(scene, &event)? {
            trace!(node = %owner, travel = event.travel, "up delivered");
            Ok(Dispatch::Delivered(owner))
        } else {
            Ok(Dispatch::Vetoed(owner))
        }
    }
}
