//! # Kestrel
//!
//! Host-facing engine for the retained-mode UI core.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                              ENGINE                                │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────────┐  │
//! │  │ InputRouter  │───>│  SceneGraph  │<───│ Inbox (crossbeam)    │  │
//! │  │ (kestrel_ui) │    │ (kestrel_ui) │    │ remote config, tasks │  │
//! │  └──────────────┘    └──────┬───────┘    └──────────▲───────────┘  │
//! │                             │                       │              │
//! │                      ┌──────┴───────┐    ┌──────────┴───────────┐  │
//! │                      │ sprite repo  │    │ key/value store      │  │
//! │                      │ (resolve)    │    │ (parking_lot RwLock) │  │
//! │                      └──────────────┘    └──────────────────────┘  │
//! │                                                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `engine`: frame loop and timing
//! - `config`: TOML engine configuration
//! - `collaborators`: sprite repository, key/value store, remote config
//! - `inbox`: delivery of off-frame results

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod inbox;

pub use kestrel_shared as shared;
pub use kestrel_ui as ui;

pub use collaborators::{
    KeyValueStore, MemorySpriteRepository, MemoryStore, RemoteConfig, SpriteRepository,
    StaticRemoteConfig, Value,
};
pub use config::EngineConfig;
pub use engine::{Engine, FailureHandler, FrameStats, FrameStatsAccumulator, RemoteConfigHandler};
pub use error::{CollaboratorError, EngineError, EngineResult};
pub use inbox::{Inbox, InboxMessage, InboxSender, Task};
