//! Pluggable map backends holding the store's entries.
//!
//! Implement [`MapBackend`] to bring your own concurrent map.

use serde_json::Value;

/// Trait that a concurrent map must satisfy to hold a [`Store`](crate::Store)'s
/// entries.
///
/// Reads go straight to the backend, so its own synchronization is what makes
/// them safe alongside writers. Writes are additionally serialized by the
/// store's mutation guard; a backend never sees two writers at once.
///
/// Every method works with owned values so the store API stays uniform
/// regardless of how the backend keeps them. Backends that keep values behind
/// an `Arc` (like ShardMap) clone on read.
pub trait MapBackend: Send + Sync {
    /// Insert a key-value pair, returning the previous value if any.
    fn insert(&self, key: String, value: Value) -> Option<Value>;

    /// Look up a value by key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a key, returning its value if it was present.
    fn remove(&self, key: &str) -> Option<Value>;

    /// Snapshot of all entries. Must not hold locks that would block
    /// concurrent readers once returned.
    fn snapshot(&self) -> Vec<(String, Value)>;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Check if a key exists without cloning the value. Override for backends
    /// that can do this cheaply (most can).
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Drop all entries. The default does snapshot + remove which is slow;
    /// override with the backend's native clear when available.
    fn clear(&self) {
        for (k, _) in self.snapshot() {
            self.remove(&k);
        }
    }
}

// ---- ShardMap ----------------------------------------------------------------

impl MapBackend for shardmap::ShardMap<String, Value> {
    fn insert(&self, key: String, value: Value) -> Option<Value> {
        shardmap::ShardMap::insert(self, key, value).map(|arc| (*arc).clone())
    }

    fn get(&self, key: &str) -> Option<Value> {
        shardmap::ShardMap::get(self, &key.to_owned()).map(|arc| (*arc).clone())
    }

    fn remove(&self, key: &str) -> Option<Value> {
        shardmap::ShardMap::remove(self, &key.to_owned()).map(|arc| (*arc).clone())
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        shardmap::ShardMap::iter_snapshot(self)
            .map(|(k, arc_v)| (k, (*arc_v).clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        shardmap::ShardMap::len(self)
    }

    // get() hands back an Arc, so this is only a refcount bump.
    fn contains_key(&self, key: &str) -> bool {
        shardmap::ShardMap::get(self, &key.to_owned()).is_some()
    }
}

// ---- RwLock<HashMap> ---------------------------------------------------------

impl MapBackend for parking_lot::RwLock<std::collections::HashMap<String, Value>> {
    fn insert(&self, key: String, value: Value) -> Option<Value> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    fn clear(&self) {
        self.write().clear()
    }
}

// ---- DashMap (feature-gated) -------------------------------------------------

#[cfg(feature = "dashmap")]
impl MapBackend for dashmap::DashMap<String, Value> {
    fn insert(&self, key: String, value: Value) -> Option<Value> {
        dashmap::DashMap::insert(self, key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        dashmap::DashMap::get(self, key).map(|r| r.value().clone())
    }

    fn remove(&self, key: &str) -> Option<Value> {
        dashmap::DashMap::remove(self, key).map(|(_, v)| v)
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &str) -> bool {
        dashmap::DashMap::contains_key(self, key)
    }

    fn clear(&self) {
        dashmap::DashMap::clear(self)
    }
}
