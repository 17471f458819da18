//! # Kestrel Frame Loop
//!
//! One engine owns one scene and one input router.
//!
//! ```text
//! Engine::frame(dt):
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. CLAMP dt to max_delta                                            │
//! │                                                                     │
//! │ 2. DRAIN INBOX                                                      │
//! │    ├─ Remote config replies  -> remote config callback              │
//! │    ├─ Collaborator failures  -> failure callback                    │
//! │    └─ Deferred tasks         -> run against the scene               │
//! │                                                                     │
//! │ 3. TICK         animations advance, Tick fires (depth first)        │
//! │                                                                     │
//! │ 4. FIXED TICKS  accumulator / fixed_timestep, capped                │
//! │                                                                     │
//! │ 5. LATE TICK                                                        │
//! │                                                                     │
//! │ 6. RECORD FrameStats, warn over budget                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pointer input may arrive at any point between frames; it is routed
//! immediately.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace, warn};

use kestrel_shared::Vec2;
use kestrel_ui::{
    AreaChecker, Capabilities, Dispatch, Handlers, InputRouter, NodeId, NodeSettings, PointerId,
    RegistrationId, SceneDescription, SceneGraph, SceneResult,
};

use crate::collaborators::{
    KeyValueStore, MemorySpriteRepository, MemoryStore, RemoteConfig, SpriteRepository, Value,
};
use crate::config::EngineConfig;
use crate::error::{CollaboratorError, EngineResult};
use crate::inbox::{Inbox, InboxMessage, InboxSender};

/// Receives collaborator failures.
pub type FailureHandler = Box<dyn FnMut(&CollaboratorError)>;

/// Applies a remote config reply to the scene.
pub type RemoteConfigHandler =
    Box<dyn FnMut(&mut SceneGraph, &HashMap<String, Value>) -> SceneResult<()>>;

/// Timing and work counts of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number, starting at 0.
    pub frame: u64,
    /// Delta actually used, after clamping.
    pub dt: f32,
    /// Fixed steps run this frame.
    pub fixed_steps: u32,
    /// Inbox messages applied this frame.
    pub inbox_delivered: u32,
    /// Live nodes at the end of the frame.
    pub nodes: usize,
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Variable tick time in microseconds.
    pub tick_us: u64,
    /// Fixed ticks time in microseconds.
    pub fixed_us: u64,
    /// Late tick time in microseconds.
    pub late_us: u64,
}

/// Running totals over many frames.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of variable tick times.
    pub tick_us_sum: u64,
    /// Sum of fixed tick times.
    pub fixed_us_sum: u64,
    /// Sum of late tick times.
    pub late_us_sum: u64,
    /// Fixed steps across all frames.
    pub fixed_steps: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded the budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            tick_us_sum: 0,
            fixed_us_sum: 0,
            late_us_sum: 0,
            fixed_steps: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records one frame against a budget in microseconds.
    pub fn record(&mut self, stats: FrameStats, budget_us: u64) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.tick_us_sum += stats.tick_us;
        self.fixed_us_sum += stats.fixed_us;
        self.late_us_sum += stats.late_us;
        self.fixed_steps += u64::from(stats.fixed_steps);
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if stats.total_us > budget_us {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// The host-facing engine.
pub struct Engine {
    config: EngineConfig,
    scene: SceneGraph,
    router: InputRouter,
    sprites: Box<dyn SpriteRepository>,
    store: Box<dyn KeyValueStore>,
    inbox: Inbox,
    on_failure: Option<FailureHandler>,
    on_remote_config: Option<RemoteConfigHandler>,
    accumulator: f32,
    frame_count: u64,
    stats: FrameStatsAccumulator,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("nodes", &self.scene.len())
            .field("router", &self.router)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine with an empty scene, no sprites and an in-memory
    /// store.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig) if
    /// the config does not validate.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        debug!(?config, "engine created");
        Ok(Self {
            config,
            scene: SceneGraph::new(),
            router: InputRouter::new(config.router_config()),
            sprites: Box::new(MemorySpriteRepository::new()),
            store: Box::new(MemoryStore::new()),
            inbox: Inbox::new(config.inbox_capacity),
            on_failure: None,
            on_remote_config: None,
            accumulator: 0.0,
            frame_count: 0,
            stats: FrameStatsAccumulator::new(),
        })
    }

    /// Replaces the sprite repository.
    #[must_use]
    pub fn with_sprites(mut self, sprites: impl SpriteRepository + 'static) -> Self {
        self.sprites = Box::new(sprites);
        self
    }

    /// Replaces the key/value store.
    #[must_use]
    pub fn with_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Sets the callback that receives collaborator failures.
    pub fn on_failure(&mut self, handler: impl FnMut(&CollaboratorError) + 'static) {
        self.on_failure = Some(Box::new(handler));
    }

    /// Sets the callback that applies remote config replies.
    pub fn on_remote_config(
        &mut self,
        handler: impl FnMut(&mut SceneGraph, &HashMap<String, Value>) -> SceneResult<()> + 'static,
    ) {
        self.on_remote_config = Some(Box::new(handler));
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// The scene, mutably.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// The input router.
    #[must_use]
    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    /// The key/value store.
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        &*self.store
    }

    /// A producer handle for background collaborators.
    #[must_use]
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Accumulated frame statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    fn report(&mut self, error: &CollaboratorError) {
        warn!(%error, "collaborator failure");
        if let Some(handler) = self.on_failure.as_mut() {
            handler(error);
        }
    }

    // ------------------------------------------------------------------
    // Scene construction
    // ------------------------------------------------------------------

    /// Resolves sprite handles for `root` and everything below it. Missing
    /// resources are reported and left unresolved.
    fn resolve_sprites(&mut self, root: NodeId) -> EngineResult<()> {
        let mut subtree = vec![root];
        subtree.extend(self.scene.descendants(root)?);
        for id in subtree {
            let Some(name) = self
                .scene
                .node(id)
                .filter(|n| n.capabilities().has(Capabilities::DRAWABLE))
                .and_then(|n| n.sprite())
                .filter(|s| s.handle.is_none())
                .map(|s| s.name.clone())
            else {
                continue;
            };
            match self.sprites.resolve(&name) {
                Some(handle) => self.scene.set_sprite_handle(id, Some(handle))?,
                None => self.report(&CollaboratorError::MissingAsset(name)),
            }
        }
        Ok(())
    }

    /// Creates a node subtree and resolves its sprites.
    ///
    /// A missing sprite is reported to the failure callback; the node is
    /// still created, without a resource.
    ///
    /// # Errors
    ///
    /// Scene errors from creation.
    pub fn spawn(&mut self, parent: Option<NodeId>, settings: &NodeSettings) -> EngineResult<NodeId> {
        let id = self.scene.create_child(parent, settings)?;
        self.resolve_sprites(id)?;
        Ok(id)
    }

    /// Builds a declarative description and resolves its sprites.
    ///
    /// # Errors
    ///
    /// Scene errors from creation.
    pub fn build(
        &mut self,
        parent: Option<NodeId>,
        description: &SceneDescription,
    ) -> EngineResult<Vec<NodeId>> {
        let roots = self.scene.build(parent, description)?;
        for root in &roots {
            self.resolve_sprites(*root)?;
        }
        Ok(roots)
    }

    /// Swaps a node's sprite and resolves the new one.
    ///
    /// # Errors
    ///
    /// Scene errors if the node is gone or does not take a sprite.
    pub fn set_sprite(&mut self, id: NodeId, name: &str) -> EngineResult<()> {
        self.scene.set_sprite(id, name)?;
        self.resolve_sprites(id)
    }

    /// Persists a value, reporting a refusal as a collaborator failure.
    pub fn persist(&mut self, key: &str, value: Value) -> bool {
        let stored = self.store.set(key, value);
        if !stored {
            self.report(&CollaboratorError::Store(key.to_owned()));
        }
        stored
    }

    /// Asks `remote` for `keys`; the reply is applied on a later frame.
    pub fn fetch_remote_config(&self, remote: &dyn RemoteConfig, keys: &[String]) {
        remote.fetch(keys, self.inbox.sender());
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Registers a node with the input router.
    ///
    /// # Errors
    ///
    /// Scene errors if the node is gone.
    pub fn register(
        &mut self,
        node: NodeId,
        area: impl AreaChecker + 'static,
        handlers: Handlers,
    ) -> EngineResult<RegistrationId> {
        Ok(self.router.register(&mut self.scene, node, area, handlers)?)
    }

    /// Pointer pressed.
    ///
    /// # Errors
    ///
    /// Errors raised by input callbacks.
    pub fn pointer_down(&mut self, pointer: PointerId, position: Vec2) -> EngineResult<Dispatch> {
        Ok(self.router.pointer_down(&mut self.scene, pointer, position)?)
    }

    /// Pointer moved.
    ///
    /// # Errors
    ///
    /// Errors raised by input callbacks.
    pub fn pointer_move(&mut self, pointer: PointerId, position: Vec2) -> EngineResult<Dispatch> {
        Ok(self.router.pointer_move(&mut self.scene, pointer, position)?)
    }

    /// Pointer released.
    ///
    /// # Errors
    ///
    /// Errors raised by input callbacks.
    pub fn pointer_up(&mut self, pointer: PointerId, position: Vec2) -> EngineResult<Dispatch> {
        Ok(self.router.pointer_up(&mut self.scene, pointer, position)?)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Delivers everything queued before the call. A failing task or
    /// handler does not stop the rest of the batch; the first error is
    /// returned once the batch is done.
    fn drain_inbox(&mut self) -> EngineResult<u32> {
        let mut delivered = 0;
        let mut first_error = None;
        for message in self.inbox.drain() {
            delivered += 1;
            let outcome = match message {
                InboxMessage::RemoteConfig(Ok(values)) => {
                    trace!(keys = values.len(), "remote config applied");
                    match self.on_remote_config.as_mut() {
                        Some(handler) => handler(&mut self.scene, &values),
                        None => Ok(()),
                    }
                }
                InboxMessage::RemoteConfig(Err(error)) | InboxMessage::Failure(error) => {
                    self.report(&error);
                    Ok(())
                }
                InboxMessage::Task(task) => task(&mut self.scene),
            };
            if let Err(error) = outcome {
                warn!(%error, "inbox delivery failed");
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(delivered),
        }
    }

    /// Runs one frame.
    ///
    /// # Errors
    ///
    /// Scene errors raised by inbox tasks, callbacks or deferred commands.
    /// An inbox error is returned after the whole inbox has been delivered
    /// and before the passes run; the next frame starts afresh. Other
    /// errors stop the frame where they occur.
    pub fn frame(&mut self, dt: f32) -> EngineResult<FrameStats> {
        let start = Instant::now();
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_delta)
        } else {
            warn!(dt, "non-finite frame delta treated as zero");
            0.0
        };

        let inbox_delivered = self.drain_inbox()?;

        let tick_start = Instant::now();
        self.scene.tick(dt)?;
        let tick_us = tick_start.elapsed().as_micros() as u64;

        let fixed_start = Instant::now();
        let step = self.config.fixed_timestep;
        self.accumulator += dt;
        let mut fixed_steps = 0;
        while self.accumulator >= step && fixed_steps < self.config.max_fixed_steps {
            self.scene.fixed_tick(step)?;
            self.accumulator -= step;
            fixed_steps += 1;
        }
        if self.accumulator >= step {
            let dropped = (self.accumulator / step).floor();
            warn!(
                frame = self.frame_count,
                dropped, "fixed step cap reached, whole steps dropped"
            );
            self.accumulator %= step;
        }
        let fixed_us = fixed_start.elapsed().as_micros() as u64;

        let late_start = Instant::now();
        self.scene.late_tick(dt)?;
        let late_us = late_start.elapsed().as_micros() as u64;

        let stats = FrameStats {
            frame: self.frame_count,
            dt,
            fixed_steps,
            inbox_delivered,
            nodes: self.scene.len(),
            total_us: start.elapsed().as_micros() as u64,
            tick_us,
            fixed_us,
            late_us,
        };
        let budget_us = (self.config.frame_budget_ms * 1000.0) as u64;
        if stats.total_us > budget_us {
            warn!(
                frame = stats.frame,
                total_ms = stats.total_us as f64 / 1000.0,
                budget_ms = self.config.frame_budget_ms,
                "frame exceeded budget"
            );
        }
        self.stats.record(stats, budget_us);
        self.frame_count += 1;
        Ok(stats)
    }
}
