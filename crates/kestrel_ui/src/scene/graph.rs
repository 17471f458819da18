//! The scene graph: node storage, hierarchy, propagation and frame passes.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use kestrel_shared::{Affine2, Anchor, Padding, Rect, RotatedRect, Vec2, Vec3};

use super::commands::Commands;
use super::events::{EventBus, EventKind, NodeEvent};
use super::id::{AnimationId, NodeId, SubscriptionId};
use super::node::{Capabilities, SceneNode, Sprite, SpriteHandle};
use super::settings::{NodeSettings, SceneDescription};
use crate::animation::{Animation, AnimationSpec};
use crate::error::{SceneError, SceneResult};
use crate::layout::{transformed_extent, FlowLayout};
use crate::style::{Color, ColorSpace};

/// Owns every node of one scene.
///
/// This is the process-scoped context for identifiers and event buses:
/// create one per scene (or per test) and drop it at shutdown. All
/// mutation happens through `&mut self`; mutations requested by event
/// handlers are queued as [`Commands`] and applied when the operation
/// that fired the event completes.
pub struct SceneGraph {
    nodes: HashMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    buses: HashMap<NodeId, EventBus>,
    commands: Commands,
    next_id: u64,
    next_animation: u64,
    next_subscription: u64,
    flushing: bool,
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots)
            .field("pending_commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::with_capacity(256),
            roots: Vec::with_capacity(16),
            buses: HashMap::new(),
            commands: Commands::default(),
            next_id: 1,
            next_animation: 1,
            next_subscription: 1,
            flushing: false,
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn missing(&self, id: NodeId) -> SceneError {
        if id.0 != 0 && id.0 < self.next_id {
            SceneError::NodeDestroyed(id)
        } else {
            SceneError::UnknownNode(id)
        }
    }

    fn node_ref(&self, id: NodeId) -> SceneResult<&SceneNode> {
        self.nodes.get(&id).ok_or_else(|| self.missing(id))
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        let missing = self.missing(id);
        self.nodes.get_mut(&id).ok_or(missing)
    }

    /// Returns the node, or `None` if it was destroyed or never existed.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Returns true if the node is alive.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the scene has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes in creation order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of a node in attachment order.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn children(&self, id: NodeId) -> SceneResult<&[NodeId]> {
        Ok(self.node_ref(id)?.children())
    }

    /// Parent of a node.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.node_ref(id)?.parent)
    }

    /// Every live node in depth-first order, roots in creation order.
    pub fn iter_dfs(&self) -> DepthFirst<'_> {
        DepthFirst {
            scene: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// The subtree below `id` in depth-first order (excluding `id`).
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn descendants(&self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        let node = self.node_ref(id)?;
        let iter = DepthFirst {
            scene: self,
            stack: node.children.iter().rev().copied().collect(),
        };
        Ok(iter.collect())
    }

    fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = self.nodes.get(&of).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    // ------------------------------------------------------------------
    // Events and deferred commands
    // ------------------------------------------------------------------

    /// Subscribes to one kind of event on a node.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn subscribe(
        &mut self,
        id: NodeId,
        kind: EventKind,
        handler: impl FnMut(NodeId, &NodeEvent, &mut Commands) + 'static,
    ) -> SceneResult<SubscriptionId> {
        self.node_ref(id)?;
        let subscription = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.buses
            .entry(id)
            .or_default()
            .subscribe(subscription, kind, Box::new(handler));
        Ok(subscription)
    }

    /// Removes a subscription. Returns false if it was not found.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn unsubscribe(&mut self, id: NodeId, subscription: SubscriptionId) -> SceneResult<bool> {
        self.node_ref(id)?;
        let removed = self
            .buses
            .get_mut(&id)
            .is_some_and(|bus| bus.unsubscribe(subscription));
        if self.buses.get(&id).is_some_and(EventBus::is_empty) {
            self.buses.remove(&id);
        }
        Ok(removed)
    }

    fn emit(&mut self, id: NodeId, event: NodeEvent) {
        if let Some(bus) = self.buses.get_mut(&id) {
            bus.dispatch(id, &event, &mut self.commands);
        }
    }

    /// Queues a mutation to run after the current operation.
    pub fn defer(&mut self, command: impl FnOnce(&mut Self) -> SceneResult<()> + 'static) {
        self.commands.push(command);
    }

    /// Runs queued commands until the queue is empty. Commands queued by
    /// commands run in the same flush. Nested calls are no-ops.
    fn flush(&mut self) -> SceneResult<()> {
        if self.flushing {
            return Ok(());
        }
        self.flushing = true;
        let mut result = Ok(());
        while let Some(command) = self.commands.pop() {
            if let Err(err) = command(self) {
                result = Err(err);
                break;
            }
        }
        self.flushing = false;
        result
    }

    // ------------------------------------------------------------------
    // Construction and destruction
    // ------------------------------------------------------------------

    /// Creates a node (and its settings subtree) under `parent`, or as a
    /// root when `parent` is `None`.
    ///
    /// The whole settings tree is validated before anything is created.
    ///
    /// # Errors
    ///
    /// Fails if the parent is gone or the settings are invalid.
    pub fn create_child(
        &mut self,
        parent: Option<NodeId>,
        settings: &NodeSettings,
    ) -> SceneResult<NodeId> {
        if let Some(parent) = parent {
            self.node_ref(parent)?;
        }
        settings.validate()?;
        let id = self.spawn(parent, settings)?;
        self.flush()?;
        Ok(id)
    }

    /// Creates every node of a description under `parent`.
    ///
    /// # Errors
    ///
    /// Fails if the parent is gone or any settings are invalid; nothing is
    /// created in that case.
    pub fn build(
        &mut self,
        parent: Option<NodeId>,
        description: &SceneDescription,
    ) -> SceneResult<Vec<NodeId>> {
        if let Some(parent) = parent {
            self.node_ref(parent)?;
        }
        for settings in &description.nodes {
            settings.validate()?;
        }
        let mut created = Vec::with_capacity(description.nodes.len());
        for settings in &description.nodes {
            created.push(self.spawn(parent, settings)?);
        }
        self.flush()?;
        Ok(created)
    }

    fn spawn(&mut self, parent: Option<NodeId>, settings: &NodeSettings) -> SceneResult<NodeId> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let mut node = SceneNode::new(id, settings.kind);
        node.name.clone_from(&settings.name);
        node.capabilities = settings.capabilities();
        node.position = settings.position;
        node.scale = settings.scale;
        node.rotation = settings.rotation;
        node.size = settings.size;
        node.anchor = settings.anchor;
        node.padding = settings.padding;
        node.active = settings.active;
        node.showing = settings.active;
        node.sorting_order = settings.sorting_order;
        node.effective_order = i64::from(settings.sorting_order);
        node.color = settings.color.unwrap_or(Color::WHITE);
        node.color_space = settings.color_space;
        node.sprite = settings.sprite.clone().map(|name| Sprite { name, handle: None });
        node.toggled = settings.toggled.unwrap_or(false);
        if node.capabilities.has(Capabilities::CONTAINER) {
            node.layout = Some(FlowLayout::new(
                settings.flow.unwrap_or_default(),
                settings.spacing.unwrap_or(0.0),
            ));
        }

        self.nodes.insert(id, node);
        self.roots.push(id);
        debug!(node = %id, kind = ?settings.kind, name = %settings.name, "node created");

        if let Some(parent) = parent {
            self.link(parent, id)?;
        }
        for child in &settings.children {
            self.spawn(Some(id), child)?;
        }
        // After placement and children, so `from` values see the final state.
        for spec in &settings.animations {
            self.attach_animation(id, spec)?;
        }
        Ok(id)
    }

    /// Attaches a root node under `parent`.
    ///
    /// # Errors
    ///
    /// [`SceneError::CyclicAttachment`] if `parent` is `child` or one of its
    /// descendants, [`SceneError::AlreadyAttached`] if `child` already has a
    /// parent, or a missing-node error.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node_ref(parent)?;
        let current = self.node_ref(child)?.parent;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::CyclicAttachment { parent, child });
        }
        if let Some(existing) = current {
            return Err(SceneError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        self.link(parent, child)?;
        debug!(parent = %parent, child = %child, "node attached");
        self.flush()
    }

    fn link(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.roots.retain(|r| *r != child);
        let (parent_showing, parent_order, is_container) = {
            let p = self.node_mut(parent)?;
            p.children.push(child);
            (p.showing, p.effective_order, p.layout.is_some())
        };
        self.node_mut(child)?.parent = Some(parent);

        self.refresh_showing(child, parent_showing);
        self.refresh_order(child, parent_order);
        if is_container {
            self.place_in_layout(parent, child)?;
        }
        self.emit(parent, NodeEvent::ChildAttached { child });
        Ok(())
    }

    /// Destroys a node and its whole subtree, children first.
    ///
    /// # Errors
    ///
    /// Fails if the node is already gone.
    pub fn destroy(&mut self, id: NodeId) -> SceneResult<()> {
        self.node_ref(id)?;
        self.destroy_subtree(id);
        self.flush()
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        self.emit(id, NodeEvent::BeforeDestroy);

        let children = self
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.destroy_subtree(child);
        }

        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                    self.emit(parent, NodeEvent::ChildDetached { child: id });
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.buses.remove(&id);
        debug!(node = %id, "node destroyed");
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    fn parent_showing(&self, node: &SceneNode) -> bool {
        node.parent
            .and_then(|p| self.nodes.get(&p))
            .map_or(true, |p| p.showing)
    }

    fn parent_order(&self, node: &SceneNode) -> i64 {
        node.parent
            .and_then(|p| self.nodes.get(&p))
            .map_or(0, |p| p.effective_order)
    }

    /// Recomputes `showing` below a changed ancestor, stopping wherever the
    /// value does not change.
    fn refresh_showing(&mut self, id: NodeId, parent_showing: bool) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let showing = node.active && parent_showing;
        if showing == node.showing {
            return;
        }
        node.showing = showing;
        let children = node.children.clone();
        self.emit(id, NodeEvent::ShowingChanged { showing });
        for child in children {
            self.refresh_showing(child, showing);
        }
    }

    fn refresh_order(&mut self, id: NodeId, parent_order: i64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let effective = parent_order + i64::from(node.sorting_order);
        if effective == node.effective_order {
            return;
        }
        node.effective_order = effective;
        let children = node.children.clone();
        self.emit(id, NodeEvent::SortingOrderChanged { effective });
        for child in children {
            self.refresh_order(child, effective);
        }
    }

    fn place_in_layout(&mut self, container: NodeId, child: NodeId) -> SceneResult<()> {
        let extent = {
            let c = self.node_ref(child)?;
            transformed_extent(
                c.local_bounds(),
                Affine2::from_trs(Vec2::ZERO, c.rotation, c.scale),
            )
        };
        let placement = {
            let node = self.node_mut(container)?;
            let Some(layout) = node.layout.as_mut() else {
                return Ok(());
            };
            let placement = layout.place(extent);
            node.size = placement.size;
            node.center_content_on(placement.content_center);
            placement
        };
        {
            let c = self.node_mut(child)?;
            c.position = Vec3::from_vec2(placement.child_position, c.position.z);
        }
        self.emit(child, NodeEvent::TransformChanged);
        self.emit(
            container,
            NodeEvent::SizeChanged {
                size: placement.size,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    fn update(
        &mut self,
        id: NodeId,
        apply: impl FnOnce(&mut SceneNode) -> Option<NodeEvent>,
    ) -> SceneResult<()> {
        let event = apply(self.node_mut(id)?);
        if let Some(event) = event {
            self.emit(id, event);
        }
        self.flush()
    }

    /// Sets the local position.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.update(id, |n| {
            n.position = position;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets the local scale.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec2) -> SceneResult<()> {
        self.update(id, |n| {
            n.scale = scale;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets the local rotation in degrees.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_rotation(&mut self, id: NodeId, degrees: f32) -> SceneResult<()> {
        self.update(id, |n| {
            n.rotation = degrees;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets position, rotation and scale together.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        position: Vec3,
        rotation: f32,
        scale: Vec2,
    ) -> SceneResult<()> {
        self.update(id, |n| {
            n.position = position;
            n.rotation = rotation;
            n.scale = scale;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets the content size. Does not re-flow an enclosing container.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_size(&mut self, id: NodeId, size: Vec2) -> SceneResult<()> {
        self.update(id, |n| {
            n.size = size;
            Some(NodeEvent::SizeChanged { size })
        })
    }

    /// Sets the anchor.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_anchor(&mut self, id: NodeId, anchor: Anchor) -> SceneResult<()> {
        self.update(id, |n| {
            n.anchor = anchor;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets the padding.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_padding(&mut self, id: NodeId, padding: Padding) -> SceneResult<()> {
        self.update(id, |n| {
            n.padding = padding;
            Some(NodeEvent::TransformChanged)
        })
    }

    /// Sets the active flag and propagates `showing` to the subtree.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_active(&mut self, id: NodeId, active: bool) -> SceneResult<()> {
        let node = self.node_ref(id)?;
        if node.active == active {
            return Ok(());
        }
        let parent_showing = self.parent_showing(node);
        self.node_mut(id)?.active = active;
        self.emit(id, NodeEvent::ActiveChanged { active });
        self.refresh_showing(id, parent_showing);
        self.flush()
    }

    /// Sets the local sorting order and re-derives effective orders below.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_sorting_order(&mut self, id: NodeId, order: i32) -> SceneResult<()> {
        let node = self.node_ref(id)?;
        if node.sorting_order == order {
            return Ok(());
        }
        let parent_order = self.parent_order(node);
        self.node_mut(id)?.sorting_order = order;
        self.refresh_order(id, parent_order);
        self.flush()
    }

    /// Sets the colour.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_color(&mut self, id: NodeId, color: Color) -> SceneResult<()> {
        self.update(id, |n| {
            n.color = color;
            Some(NodeEvent::ColorChanged { color })
        })
    }

    /// Sets the default colour space for colour animations attached later.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_color_space(&mut self, id: NodeId, space: ColorSpace) -> SceneResult<()> {
        self.update(id, |n| {
            n.color_space = space;
            None
        })
    }

    /// Sets the toggle state.
    ///
    /// # Errors
    ///
    /// [`SceneError::SettingsMismatch`] if the node is not a toggle, or a
    /// missing-node error.
    pub fn set_toggled(&mut self, id: NodeId, toggled: bool) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if !node.capabilities.has(Capabilities::TOGGLE) {
            return Err(SceneError::SettingsMismatch {
                kind: node.kind,
                field: "toggled",
            });
        }
        if node.toggled == toggled {
            return Ok(());
        }
        node.toggled = toggled;
        self.emit(id, NodeEvent::ToggleChanged { toggled });
        self.flush()
    }

    /// Replaces the sprite resource; the handle is cleared until resolved.
    ///
    /// # Errors
    ///
    /// [`SceneError::SettingsMismatch`] if the kind does not accept a
    /// sprite, or a missing-node error.
    pub fn set_sprite(&mut self, id: NodeId, name: impl Into<String>) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if !node.kind.accepts_sprite() {
            return Err(SceneError::SettingsMismatch {
                kind: node.kind,
                field: "sprite",
            });
        }
        node.sprite = Some(Sprite {
            name: name.into(),
            handle: None,
        });
        node.capabilities.set(Capabilities::DRAWABLE);
        Ok(())
    }

    pub(crate) fn add_capability(&mut self, id: NodeId, flag: u32) -> SceneResult<()> {
        self.node_mut(id)?.capabilities.set(flag);
        Ok(())
    }

    /// Adds or removes the `CLICKABLE` tag. A node without it keeps its
    /// router registrations but is skipped by hit testing.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_interactive(&mut self, id: NodeId, interactive: bool) -> SceneResult<()> {
        let caps = &mut self.node_mut(id)?.capabilities;
        if interactive {
            caps.set(Capabilities::CLICKABLE);
        } else {
            caps.clear(Capabilities::CLICKABLE);
        }
        Ok(())
    }

    /// Stores the resolved handle for the node's sprite. No-op for nodes
    /// without a sprite.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn set_sprite_handle(&mut self, id: NodeId, handle: Option<SpriteHandle>) -> SceneResult<()> {
        if let Some(sprite) = self.node_mut(id)?.sprite.as_mut() {
            sprite.handle = handle;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Spatial queries
    // ------------------------------------------------------------------

    /// Composition of every local transform from the root down to `id`.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn world_transform(&self, id: NodeId) -> SceneResult<Affine2> {
        let node = self.node_ref(id)?;
        let mut world = node.local_transform();
        let mut current = node.parent;
        while let Some(parent) = current {
            let p = self.node_ref(parent)?;
            world = p.local_transform() * world;
            current = p.parent;
        }
        Ok(world)
    }

    /// World position of the node origin.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn world_position(&self, id: NodeId) -> SceneResult<Vec2> {
        Ok(self.world_transform(id)?.offset())
    }

    /// World position of the named point of the node's bounding box.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn anchored_position(&self, id: NodeId, anchor: Anchor) -> SceneResult<Vec2> {
        let bounds = self.node_ref(id)?.local_bounds();
        Ok(self
            .world_transform(id)?
            .transform_point(bounds.corner(anchor)))
    }

    /// Bounding box in the node's own frame.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn local_bounds(&self, id: NodeId) -> SceneResult<Rect> {
        Ok(self.node_ref(id)?.local_bounds())
    }

    /// Bounding box in world space.
    ///
    /// Exact for rotation with any scale; under a rotated parent with
    /// non-uniform scale the world shape is a parallelogram and this is
    /// the rectangle spanned by its transformed axes.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn world_bounds(&self, id: NodeId) -> SceneResult<RotatedRect> {
        let bounds = self.node_ref(id)?.local_bounds();
        let world = self.world_transform(id)?;
        Ok(RotatedRect::new(
            world.transform_point(bounds.center()),
            bounds.size() * 0.5 * world.axis_scale(),
            world.rotation_degrees(),
        ))
    }

    /// Maps a world point into the node's frame, `None` when the world
    /// transform is singular.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn to_local(&self, id: NodeId, point: Vec2) -> SceneResult<Option<Vec2>> {
        Ok(self
            .world_transform(id)?
            .inverse()
            .map(|inv| inv.transform_point(point)))
    }

    /// Active and every ancestor active.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn is_showing(&self, id: NodeId) -> SceneResult<bool> {
        Ok(self.node_ref(id)?.showing)
    }

    /// Sum of local sorting orders from the root down to `id`.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn effective_sorting_order(&self, id: NodeId) -> SceneResult<i64> {
        Ok(self.node_ref(id)?.effective_order)
    }

    /// Showing nodes ordered back to front: by effective sorting order,
    /// ties broken by depth-first position.
    #[must_use]
    pub fn draw_order(&self) -> Vec<NodeId> {
        let mut order: Vec<(i64, NodeId)> = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.showing {
                continue;
            }
            order.push((node.effective_order, id));
            stack.extend(node.children.iter().rev().copied());
        }
        order.sort_by_key(|(effective, _)| *effective);
        order.into_iter().map(|(_, id)| id).collect()
    }

    // ------------------------------------------------------------------
    // Animations
    // ------------------------------------------------------------------

    /// Attaches an animation. It starts advancing on the next tick.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidAnimation`] for unplayable parameters, or a
    /// missing-node error.
    pub fn add_animation(&mut self, id: NodeId, spec: AnimationSpec) -> SceneResult<AnimationId> {
        spec.validate()?;
        let animation = self.attach_animation(id, &spec)?;
        self.flush()?;
        Ok(animation)
    }

    fn attach_animation(&mut self, id: NodeId, spec: &AnimationSpec) -> SceneResult<AnimationId> {
        let animation = AnimationId(self.next_animation);
        let node = self.node_mut(id)?;
        let resolved = Animation::new(animation, spec, node);
        node.pending_animations.push(resolved);
        self.next_animation += 1;
        self.emit(id, NodeEvent::AnimationAttached { animation });
        Ok(animation)
    }

    /// Removes an animation without firing a completion event. Returns
    /// false if it was not attached.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn remove_animation(&mut self, id: NodeId, animation: AnimationId) -> SceneResult<bool> {
        let node = self.node_mut(id)?;
        let before = node.animations.len() + node.pending_animations.len();
        node.animations.retain(|a| a.id() != animation);
        node.pending_animations.retain(|a| a.id() != animation);
        Ok(node.animations.len() + node.pending_animations.len() != before)
    }

    /// Animations currently advancing on a node.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn animations(&self, id: NodeId) -> SceneResult<&[Animation]> {
        Ok(self.node_ref(id)?.animations())
    }

    /// True while the node has running or pending animations.
    ///
    /// # Errors
    ///
    /// Fails if the node is gone.
    pub fn is_animating(&self, id: NodeId) -> SceneResult<bool> {
        Ok(self.node_ref(id)?.is_animating())
    }

    // ------------------------------------------------------------------
    // Frame passes
    // ------------------------------------------------------------------

    /// Active nodes in depth-first order; inactive subtrees are skipped.
    fn active_dfs(&self) -> Vec<NodeId> {
        let mut visit = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.active {
                continue;
            }
            visit.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        visit
    }

    /// Variable-step pass: each node advances its animations then fires
    /// `Tick`, parents before children in child-list order.
    ///
    /// # Errors
    ///
    /// Propagates errors from deferred commands run after the pass.
    pub fn tick(&mut self, dt: f32) -> SceneResult<()> {
        let visit = self.active_dfs();
        trace!(nodes = visit.len(), dt, "tick");
        for id in visit {
            self.tick_node(id, dt);
        }
        self.flush()
    }

    fn tick_node(&mut self, id: NodeId, dt: f32) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.pending_animations.is_empty() {
            let mut pending = std::mem::take(&mut node.pending_animations);
            node.animations.append(&mut pending);
        }

        let mut events = Vec::new();
        let mut completed = Vec::new();
        if !node.animations.is_empty() {
            let mut animations = std::mem::take(&mut node.animations);
            animations.retain_mut(|animation| {
                let (event, finished) = animation.step(dt, node);
                events.push(event);
                if finished {
                    completed.push(animation.id());
                }
                !finished
            });
            node.animations = animations;
        }

        for event in events {
            self.emit(id, event);
        }
        for animation in completed {
            trace!(node = %id, animation = animation.raw(), "animation completed");
            self.emit(id, NodeEvent::AnimationCompleted { animation });
        }
        self.emit(id, NodeEvent::Tick { dt });
    }

    /// Fixed-step pass.
    ///
    /// # Errors
    ///
    /// Propagates errors from deferred commands run after the pass.
    pub fn fixed_tick(&mut self, dt: f32) -> SceneResult<()> {
        for id in self.active_dfs() {
            self.emit(id, NodeEvent::FixedTick { dt });
        }
        self.flush()
    }

    /// Post-animation pass.
    ///
    /// # Errors
    ///
    /// Propagates errors from deferred commands run after the pass.
    pub fn late_tick(&mut self, dt: f32) -> SceneResult<()> {
        for id in self.active_dfs() {
            self.emit(id, NodeEvent::LateTick { dt });
        }
        self.flush()
    }
}

/// Depth-first iterator over node IDs.
pub struct DepthFirst<'a> {
    scene: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.scene.nodes.get(&id) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::scene::NodeKind;

    fn empty(scene: &mut SceneGraph, parent: Option<NodeId>) -> NodeId {
        scene
            .create_child(parent, &NodeSettings::empty())
            .expect("create")
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut scene = SceneGraph::new();
        let a = empty(&mut scene, None);
        scene.destroy(a).expect("destroy");
        let b = empty(&mut scene, None);
        assert_ne!(a, b);
        assert_eq!(scene.set_active(a, false), Err(SceneError::NodeDestroyed(a)));
        assert_eq!(
            scene.set_active(NodeId(999), false),
            Err(SceneError::UnknownNode(NodeId(999)))
        );
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let root = empty(&mut scene, None);
        let child = empty(&mut scene, Some(root));
        let grandchild = empty(&mut scene, Some(child));

        assert_eq!(
            scene.attach(grandchild, root),
            Err(SceneError::CyclicAttachment {
                parent: grandchild,
                child: root
            })
        );
        assert_eq!(
            scene.attach(root, root),
            Err(SceneError::CyclicAttachment {
                parent: root,
                child: root
            })
        );
        assert_eq!(
            scene.attach(root, grandchild),
            Err(SceneError::AlreadyAttached {
                child: grandchild,
                parent: child
            })
        );
    }

    #[test]
    fn test_attach_moves_root() {
        let mut scene = SceneGraph::new();
        let a = empty(&mut scene, None);
        let b = empty(&mut scene, None);
        scene.attach(a, b).expect("attach");
        assert_eq!(scene.roots(), &[a]);
        assert_eq!(scene.children(a).expect("alive"), &[b]);
        assert_eq!(scene.parent(b).expect("alive"), Some(a));
    }

    #[test]
    fn test_showing_short_circuits_at_hidden_descendant() {
        let mut scene = SceneGraph::new();
        let root = empty(&mut scene, None);
        let child = empty(&mut scene, Some(root));
        let hidden = scene
            .create_child(Some(child), &NodeSettings::empty().with_active(false))
            .expect("create");
        let leaf = empty(&mut scene, Some(hidden));

        let log = Rc::new(RefCell::new(Vec::new()));
        for id in [child, hidden, leaf] {
            let log = Rc::clone(&log);
            scene
                .subscribe(id, EventKind::ShowingChanged, move |node, _, _| {
                    log.borrow_mut().push(node);
                })
                .expect("subscribe");
        }

        scene.set_active(root, false).expect("set");
        assert_eq!(*log.borrow(), vec![child]);
        assert!(!scene.is_showing(leaf).expect("alive"));

        scene.set_active(root, true).expect("set");
        assert!(scene.is_showing(child).expect("alive"));
        assert!(!scene.is_showing(leaf).expect("alive"));
    }

    #[test]
    fn test_destroy_is_children_first() {
        let mut scene = SceneGraph::new();
        let root = empty(&mut scene, None);
        let a = empty(&mut scene, Some(root));
        let b = empty(&mut scene, Some(a));

        let log = Rc::new(RefCell::new(Vec::new()));
        for id in [root, a, b] {
            let log = Rc::clone(&log);
            scene
                .subscribe(id, EventKind::ChildDetached, move |node, event, _| {
                    if let NodeEvent::ChildDetached { child } = event {
                        log.borrow_mut().push((node, *child));
                    }
                })
                .expect("subscribe");
        }

        scene.destroy(a).expect("destroy");
        assert_eq!(*log.borrow(), vec![(a, b), (root, a)]);
        assert!(!scene.contains(b));
        assert_eq!(scene.children(root).expect("alive"), &[] as &[NodeId]);
    }

    #[test]
    fn test_destroy_from_handler_is_deferred() {
        let mut scene = SceneGraph::new();
        let root = empty(&mut scene, None);
        let a = empty(&mut scene, Some(root));
        let b = empty(&mut scene, Some(root));

        let ticked = Rc::new(RefCell::new(Vec::new()));
        scene
            .subscribe(a, EventKind::Tick, move |_, _, commands| commands.destroy(b))
            .expect("subscribe");
        let seen = Rc::clone(&ticked);
        scene
            .subscribe(b, EventKind::Tick, move |node, _, _| seen.borrow_mut().push(node))
            .expect("subscribe");

        scene.tick(0.016).expect("tick");
        // b still ticked this frame, destroyed once the pass completed.
        assert_eq!(*ticked.borrow(), vec![b]);
        assert!(!scene.contains(b));
    }

    #[test]
    fn test_effective_order_sums_ancestors() {
        let mut scene = SceneGraph::new();
        let root = scene
            .create_child(None, &NodeSettings::empty().with_sorting_order(10))
            .expect("create");
        let child = scene
            .create_child(Some(root), &NodeSettings::empty().with_sorting_order(2))
            .expect("create");
        assert_eq!(scene.effective_sorting_order(child), Ok(12));

        scene.set_sorting_order(root, 1).expect("set");
        assert_eq!(scene.effective_sorting_order(child), Ok(3));
    }

    #[test]
    fn test_draw_order_breaks_ties_depth_first() {
        let mut scene = SceneGraph::new();
        let root = empty(&mut scene, None);
        let a = empty(&mut scene, Some(root));
        let b = empty(&mut scene, Some(root));
        let top = scene
            .create_child(Some(root), &NodeSettings::empty().with_sorting_order(5))
            .expect("create");
        assert_eq!(scene.draw_order(), vec![root, a, b, top]);
    }

    #[test]
    fn test_world_transform_composes_chain() {
        let mut scene = SceneGraph::new();
        let parent = scene
            .create_child(
                None,
                &NodeSettings::empty()
                    .with_position(Vec3::new(10.0, 0.0, 0.0))
                    .with_rotation(90.0)
                    .with_scale(Vec2::splat(2.0)),
            )
            .expect("create");
        let child = scene
            .create_child(
                Some(parent),
                &NodeSettings::empty().with_position(Vec3::new(1.0, 0.0, 0.0)),
            )
            .expect("create");
        let pos = scene.world_position(child).expect("alive");
        assert!(pos.approx_eq(Vec2::new(10.0, 2.0), 1e-4), "{pos:?}");
    }

    #[test]
    fn test_anchored_position_hits_corner() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(
                None,
                &NodeSettings::empty()
                    .with_position(Vec3::new(100.0, 50.0, 0.0))
                    .with_size(Vec2::new(20.0, 10.0))
                    .with_scale(Vec2::new(2.0, 1.0)),
            )
            .expect("create");
        let corner = scene
            .anchored_position(node, Anchor::LowerRight)
            .expect("alive");
        assert!(corner.approx_eq(Vec2::new(120.0, 45.0), 1e-4), "{corner:?}");
    }

    #[test]
    fn test_animation_added_mid_tick_waits_a_frame() {
        let mut scene = SceneGraph::new();
        let node = empty(&mut scene, None);
        let once = Rc::new(RefCell::new(true));
        scene
            .subscribe(node, EventKind::Tick, move |id, _, commands| {
                if once.replace(false) {
                    commands.add_animation(id, AnimationSpec::rotate_to(90.0, 1.0));
                }
            })
            .expect("subscribe");

        scene.tick(0.5).expect("tick");
        assert!(scene.is_animating(node).expect("alive"));
        assert_eq!(scene.node(node).map(SceneNode::rotation), Some(0.0));

        scene.tick(0.5).expect("tick");
        let rotation = scene.node(node).map(SceneNode::rotation).unwrap_or_default();
        assert!((rotation - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_later_animation_wins_same_property() {
        let mut scene = SceneGraph::new();
        let node = empty(&mut scene, None);
        scene
            .add_animation(node, AnimationSpec::rotate_to(100.0, 1.0))
            .expect("add");
        scene
            .add_animation(node, AnimationSpec::rotate_to(-100.0, 1.0))
            .expect("add");
        scene.tick(0.5).expect("tick");
        assert_eq!(scene.node(node).map(SceneNode::rotation), Some(-50.0));
    }

    #[test]
    fn test_inactive_subtree_not_ticked() {
        let mut scene = SceneGraph::new();
        let root = scene
            .create_child(None, &NodeSettings::empty().with_active(false))
            .expect("create");
        let child = empty(&mut scene, Some(root));
        scene
            .add_animation(child, AnimationSpec::rotate_to(90.0, 1.0))
            .expect("add");
        scene.tick(1.0).expect("tick");
        assert!(scene.is_animating(child).expect("alive"));
    }

    #[test]
    fn test_settings_mismatch_creates_nothing() {
        let mut scene = SceneGraph::new();
        let bad = NodeSettings::empty().with_child(NodeSettings::new(NodeKind::Sprite));
        assert!(scene.create_child(None, &bad).is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_set_toggled_requires_toggle() {
        let mut scene = SceneGraph::new();
        let node = empty(&mut scene, None);
        assert!(matches!(
            scene.set_toggled(node, true),
            Err(SceneError::SettingsMismatch { field: "toggled", .. })
        ));
    }
}
