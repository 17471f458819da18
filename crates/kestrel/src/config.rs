//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! fixed_timestep = 0.02
//! max_fixed_steps = 5
//! drag_threshold = 8.0
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use kestrel_shared::{DEFAULT_DRAG_THRESHOLD, DEFAULT_FIXED_TIMESTEP};
use kestrel_ui::RouterConfig;

use crate::error::{EngineError, EngineResult};

/// Frame loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds per fixed step.
    pub fixed_timestep: f32,
    /// Most fixed steps run in one frame; excess whole steps are dropped.
    pub max_fixed_steps: u32,
    /// Frame deltas are clamped to this many seconds (pause/resume spikes).
    pub max_delta: f32,
    /// Pointer travel that turns a press into a drag.
    pub drag_threshold: f32,
    /// Frames slower than this are logged.
    pub frame_budget_ms: f32,
    /// Bounded capacity of the collaborator inbox.
    pub inbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            max_fixed_steps: 5,
            max_delta: 0.1,
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            frame_budget_ms: 16.666,
            inbox_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] on a parse failure or an unusable value.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every field is usable.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> EngineResult<()> {
        fn positive(name: &str, value: f32) -> EngineResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        positive("fixed_timestep", self.fixed_timestep)?;
        positive("max_delta", self.max_delta)?;
        positive("frame_budget_ms", self.frame_budget_ms)?;
        if !self.drag_threshold.is_finite() || self.drag_threshold < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "drag_threshold must be non-negative, got {}",
                self.drag_threshold
            )));
        }
        if self.inbox_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "inbox_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Router settings derived from this config.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            drag_threshold: self.drag_threshold,
        }
    }
}
