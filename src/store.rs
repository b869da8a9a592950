//! Persistent property store seam and the result sink.

use std::collections::HashMap;
use std::sync::Mutex;

use log::info;

/// External persistent-property collaborator, keyed per instance scope.
///
/// Implementations must provide per-key, per-instance isolation;
/// concurrent runs on different instances share nothing else.
pub trait PropertyStore: Send + Sync {
    /// Read the value stored under `key` for `instance`.
    fn get(&self, instance: &str, key: &str) -> Option<String>;

    /// Store `value` under `key` for `instance`.
    fn set(&self, instance: &str, key: &str, value: String);
}

/// In-memory property store.
///
/// Suitable for tests and for callers that flush runtime properties
/// themselves after a run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyStore for MemoryStore {
    fn get(&self, instance: &str, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(&(instance.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&self, instance: &str, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap()
            .insert((instance.to_string(), key.to_string()), value);
    }
}

/// Writes selected call results into the property store.
pub struct ResultSink<'a> {
    store: &'a dyn PropertyStore,
    instance: &'a str,
}

impl<'a> ResultSink<'a> {
    /// Sink writing under `instance`'s scope.
    pub fn new(store: &'a dyn PropertyStore, instance: &'a str) -> Self {
        Self { store, instance }
    }

    /// Store `value` under `key`. An empty key is a no-op, not an
    /// error.
    pub fn store(&self, key: &str, value: &str) {
        if key.is_empty() {
            return;
        }
        info!("Saving result under '{key}'");
        self.store.set(self.instance, key, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("node_1", "version", "IOS 15.2".to_string());

        assert_eq!(store.get("node_1", "version").as_deref(), Some("IOS 15.2"));
        assert_eq!(store.get("node_1", "other"), None);
        // per-instance isolation
        assert_eq!(store.get("node_2", "version"), None);
    }

    #[test]
    fn test_sink_writes_under_instance_scope() {
        let store = MemoryStore::new();
        let sink = ResultSink::new(&store, "node_1");
        sink.store("uptime", "3 days");

        assert_eq!(store.get("node_1", "uptime").as_deref(), Some("3 days"));
    }

    #[test]
    fn test_empty_key_is_noop() {
        let store = MemoryStore::new();
        let sink = ResultSink::new(&store, "node_1");
        sink.store("", "ignored");

        assert!(store.entries.lock().unwrap().is_empty());
    }
}
