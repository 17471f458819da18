//! # External Collaborators
//!
//! Narrow interfaces to the world outside the scene: sprite resources,
//! key/value persistence and remote configuration. In-memory versions are
//! provided for tests and headless hosts.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kestrel_ui::SpriteHandle;

use crate::error::CollaboratorError;
use crate::inbox::{InboxMessage, InboxSender};

/// Resolves authored sprite names to renderer handles.
pub trait SpriteRepository {
    /// Handle for `name`, or `None` if the repository has no such resource.
    fn resolve(&self, name: &str) -> Option<SpriteHandle>;
}

/// A fixed name → handle table.
#[derive(Debug, Default, Clone)]
pub struct MemorySpriteRepository {
    sprites: HashMap<String, SpriteHandle>,
    next: u64,
}

impl MemorySpriteRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, returning its handle. Re-inserting a name keeps
    /// the original handle.
    pub fn insert(&mut self, name: impl Into<String>) -> SpriteHandle {
        let next = &mut self.next;
        *self.sprites.entry(name.into()).or_insert_with(|| {
            *next += 1;
            SpriteHandle(*next)
        })
    }

    /// Builder form of [`MemorySpriteRepository::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// True if there are no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl SpriteRepository for MemorySpriteRepository {
    fn resolve(&self, name: &str) -> Option<SpriteHandle> {
        self.sprites.get(name).copied()
    }
}

/// A stored or fetched value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
}

impl Value {
    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric value; integers widen to float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(i) => Some(i as f64),
            Self::Float(f) => Some(f),
            _ => None,
        }
    }

    /// The text, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Key/value persistence.
///
/// Shared between the frame thread and background producers, so
/// implementations take `&self`.
pub trait KeyValueStore: Send + Sync {
    /// Stored value for `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores a value. Returns false if the store refused it.
    fn set(&self, key: &str, value: Value) -> bool;
}

/// In-memory store behind a read/write lock, with an optional key limit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    max_keys: Option<usize>,
}

impl MemoryStore {
    /// Unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses new keys once it holds `max_keys`.
    #[must_use]
    pub fn with_max_keys(max_keys: usize) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            max_keys: Some(max_keys),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Serialises every entry as a TOML table.
    ///
    /// # Errors
    ///
    /// [`CollaboratorError::Store`] if serialisation fails.
    pub fn to_toml_string(&self) -> Result<String, CollaboratorError> {
        let values = self.values.read();
        toml::to_string(&*values).map_err(|e| CollaboratorError::Store(e.to_string()))
    }

    /// Restores entries from a TOML table, replacing existing keys.
    ///
    /// # Errors
    ///
    /// [`CollaboratorError::Store`] if the text is not a flat table of
    /// scalar values.
    pub fn load_toml_str(&self, text: &str) -> Result<usize, CollaboratorError> {
        let loaded: HashMap<String, Value> =
            toml::from_str(text).map_err(|e| CollaboratorError::Store(e.to_string()))?;
        let count = loaded.len();
        self.values.write().extend(loaded);
        debug!(count, "store restored");
        Ok(count)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> bool {
        let mut values = self.values.write();
        if let Some(max) = self.max_keys {
            if values.len() >= max && !values.contains_key(key) {
                return false;
            }
        }
        values.insert(key.to_owned(), value);
        true
    }
}

/// Source of remotely managed settings.
///
/// `fetch` may answer immediately or from another thread; either way the
/// result reaches the scene through the inbox on a later frame.
pub trait RemoteConfig {
    /// Starts a fetch of `keys` and delivers the outcome to `reply`.
    fn fetch(&self, keys: &[String], reply: InboxSender);
}

/// Remote config answered from a local table.
#[derive(Debug, Clone)]
pub struct StaticRemoteConfig {
    values: Result<HashMap<String, Value>, CollaboratorError>,
}

impl StaticRemoteConfig {
    /// Answers every fetch from `values`.
    #[must_use]
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values: Ok(values) }
    }

    /// Fails every fetch with `reason`.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            values: Err(CollaboratorError::Fetch(reason.into())),
        }
    }
}

impl RemoteConfig for StaticRemoteConfig {
    fn fetch(&self, keys: &[String], reply: InboxSender) {
        let result = self.values.as_ref().map_err(Clone::clone).map(|values| {
            keys.iter()
                .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
                .collect()
        });
        reply.send(InboxMessage::RemoteConfig(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_repository_stable_handles() {
        let mut repo = MemorySpriteRepository::new().with("coin");
        let coin = repo.resolve("coin").expect("coin");
        assert_eq!(repo.insert("coin"), coin);
        assert_ne!(repo.insert("gem"), coin);
        assert_eq!(repo.resolve("missing"), None);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_store_limit() {
        let store = MemoryStore::with_max_keys(1);
        assert!(store.set("volume", Value::Float(0.5)));
        assert!(store.set("volume", Value::Float(0.7)));
        assert!(!store.set("muted", Value::Bool(true)));
        assert_eq!(store.get("volume"), Some(Value::Float(0.7)));
        assert_eq!(store.get("muted"), None);
    }

    #[test]
    fn test_store_toml_snapshot() {
        let store = MemoryStore::new();
        store.set("name", Value::Text("kestrel".into()));
        store.set("level", Value::Int(3));
        store.set("sound", Value::Bool(false));
        let text = store.to_toml_string().expect("serialise");

        let restored = MemoryStore::new();
        assert_eq!(restored.load_toml_str(&text).expect("load"), 3);
        assert_eq!(restored.get("level"), Some(Value::Int(3)));
        assert_eq!(restored.get("name").as_ref().and_then(Value::as_str), Some("kestrel"));
        assert!(restored.load_toml_str("[nested]\nkey = 1").is_err());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
    }
}
