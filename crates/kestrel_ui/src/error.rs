//! # Scene Error Types
//!
//! Only structural-integrity failures are errors. Expected misses (no hit,
//! a vetoed gesture, an animation whose node is gone) are plain values.

use thiserror::Error;

use crate::scene::{NodeId, NodeKind};

/// Errors that can occur while building or mutating a scene.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Attaching would make a node its own ancestor.
    #[error("cyclic attachment: {child} cannot be attached under its descendant {parent}")]
    CyclicAttachment {
        /// The would-be parent.
        parent: NodeId,
        /// The node being attached.
        child: NodeId,
    },

    /// The node already has a parent; re-parenting is not supported.
    #[error("node {child} is already attached to {parent}")]
    AlreadyAttached {
        /// The node being attached.
        child: NodeId,
        /// Its current parent.
        parent: NodeId,
    },

    /// The handle refers to a node that has been destroyed.
    #[error("node {0} has been destroyed")]
    NodeDestroyed(NodeId),

    /// The handle was never issued by this scene.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A settings field was supplied to a kind that does not accept it.
    #[error("settings mismatch: {kind:?} nodes do not accept `{field}`")]
    SettingsMismatch {
        /// Kind being created.
        kind: NodeKind,
        /// Offending field.
        field: &'static str,
    },

    /// A settings field required by the kind is missing.
    #[error("missing setting: {kind:?} nodes require `{field}`")]
    MissingSetting {
        /// Kind being created.
        kind: NodeKind,
        /// Missing field.
        field: &'static str,
    },

    /// Animation parameters cannot be played.
    #[error("invalid animation: {0}")]
    InvalidAnimation(String),

    /// A description or config could not be parsed or validated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
