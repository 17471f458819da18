//! # Kestrel UI Core
//!
//! Retained-mode 2D scene graph for real-time interfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        FRAME                             │
//! ├──────────────────────────────────────────────────────────┤
//! │  Pointer samples → InputRouter → hit test → handlers     │
//! │  tick(dt)        → SceneGraph  → animations → events     │
//! │  attach(child)   → container   → incremental layout      │
//! │  deferred Commands applied after every pass              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the frame thread. Nothing here blocks or spawns;
//! collaborators that do I/O hand results back between frames.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod animation;
pub mod error;
pub mod input;
pub mod layout;
pub mod scene;
pub mod style;

pub use animation::{
    Animation, AnimationKind, AnimationSpec, AnimationStep, Easing, ReplayPolicy, Track,
    TrackValue,
};
pub use error::{SceneError, SceneResult};
pub use input::{
    AreaChecker, CircleArea, Dispatch, GesturePhase, Handlers, InputRouter, PointerEvent,
    PointerId, PolygonArea, RectArea, RegistrationId, RouterConfig, TriangleArea,
};
pub use layout::{Axis, FlowDirection, FlowLayout, Placement};
pub use scene::{
    AnimationId, Capabilities, Commands, EventKind, NodeEvent, NodeId, NodeKind, NodeSettings,
    SceneDescription, SceneGraph, SceneNode, Sprite, SpriteHandle, SubscriptionId,
};
pub use style::{Color, ColorSpace, Hsv};
