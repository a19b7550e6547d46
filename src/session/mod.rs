//! Session-scoped key/value storage.
//!
//! The instrumented page keeps its "debugger active" flag here so a reload
//! reopens the channel. [`MemorySessionStorage`] stands in for the browser's
//! per-tab storage; hosts can plug in their own [`SessionStorage`].

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Storage backed by a `BTreeMap` behind a `RwLock`. Clones share the same map,
/// so a page rebuilt from the same storage sees what the previous one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemorySessionStorage::new();
        assert!(storage.is_empty());
        storage.set("neos-fusion-debugger-active", "true");
        assert_eq!(storage.get("neos-fusion-debugger-active").as_deref(), Some("true"));
        assert!(storage.contains("neos-fusion-debugger-active"));
        storage.remove("neos-fusion-debugger-active");
        assert!(!storage.contains("neos-fusion-debugger-active"));
        storage.remove("never-set");
    }

    #[test]
    fn overwrite() {
        let storage = MemorySessionStorage::new();
        storage.set("k", "1");
        storage.set("k", "2");
        assert_eq!(storage.get("k").as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let storage = MemorySessionStorage::new();
        let reloaded = storage.clone();
        storage.set("flag", "true");
        assert!(reloaded.contains("flag"));
    }

    #[test]
    fn usable_as_trait_object() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
        storage.set("a", "b");
        assert_eq!(storage.get("a").as_deref(), Some("b"));
    }
}
