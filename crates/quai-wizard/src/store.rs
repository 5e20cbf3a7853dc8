//! Injectable draft persistence.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Key-value persistence for step drafts. Values are JSON strings; the
/// controller owns serialization. Implementations must tolerate unknown
/// keys on `remove` and overwrite on `put`.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

impl<S: DraftStore + ?Sized> DraftStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: String) {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// In-process store. The production embedding backs each session with
/// one of these; tests use it directly.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove_roundtrip() {
        let store = MemoryDraftStore::new();
        assert_eq!(store.get("acc_step1"), None);
        store.put("acc_step1", "{}".to_string());
        assert_eq!(store.get("acc_step1").as_deref(), Some("{}"));
        store.put("acc_step1", "{\"a\":1}".to_string());
        assert_eq!(store.get("acc_step1").as_deref(), Some("{\"a\":1}"));
        store.remove("acc_step1");
        assert_eq!(store.get("acc_step1"), None);
        store.remove("acc_step1");
    }
}
