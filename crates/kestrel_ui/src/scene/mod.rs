//! Scene graph: nodes, hierarchy, events and deferred mutation.

mod commands;
mod events;
mod graph;
mod id;
mod node;
mod settings;

pub use commands::{Command, Commands};
pub use events::{EventHandler, EventKind, NodeEvent};
pub use graph::{DepthFirst, SceneGraph};
pub use id::{AnimationId, NodeId, SubscriptionId};
pub use node::{Capabilities, NodeKind, SceneNode, Sprite, SpriteHandle};
pub use settings::{NodeSettings, SceneDescription};
