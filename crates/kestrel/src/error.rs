//! # Engine Error Types
//!
//! `EngineError` stops an engine call. `CollaboratorError` never does: it is
//! handed to the failure callback and the frame carries on.

use thiserror::Error;

use kestrel_ui::SceneError;

/// Errors returned by engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The scene rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Engine configuration is unusable.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// Reading a config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures reported by external collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The sprite repository has no resource by this name.
    #[error("missing asset `{0}`")]
    MissingAsset(String),

    /// A remote fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The key/value store refused a write.
    #[error("store rejected `{0}`")]
    Store(String),

    /// The inbox was full and a reply of this kind was dropped.
    #[error("inbox full, {0} dropped")]
    InboxFull(String),
}

#[cfg(test)]
mod tests {
    use kestrel_ui::{NodeId, NodeSettings, SceneGraph};

    use super::*;

    #[test]
    fn test_scene_error_converts() {
        // A handle issued by another scene is unknown here.
        let mut other = SceneGraph::new();
        let foreign: NodeId = other
            .create_child(None, &NodeSettings::empty())
            .expect("node");
        let scene = SceneGraph::new();

        let err: EngineError = scene.parent(foreign).unwrap_err().into();
        assert!(matches!(err, EngineError::Scene(SceneError::UnknownNode(_))));
        assert_eq!(err.to_string(), format!("unknown node {foreign}"));
    }

    #[test]
    fn test_collaborator_messages() {
        assert_eq!(
            CollaboratorError::MissingAsset("coin".into()).to_string(),
            "missing asset `coin`"
        );
        assert_eq!(
            CollaboratorError::InboxFull("task".into()).to_string(),
            "inbox full, task dropped"
        );
    }
}
