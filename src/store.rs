//! Core store type, scoped guard, and builder.

use crate::backend::MapBackend;
use crate::error::{kind_of, Error, Result};
use crate::hash::HashAlgorithm;
use crate::persist::{atomic_write, load, overwrite, truncate};
use crate::policy::{DumpPolicy, WriteMode};
use crate::serializer::JsonSerializer;
use crate::DefaultBackend;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Embedded key-value store backed by a single JSON file.
///
/// Keys are strings, values are any [`serde_json::Value`]. Use
/// [`open`](Store::open) for a quick start or [`builder`](Store::builder) to
/// pick a dump policy, write mode, formatting or map backend.
///
/// Every mutation and every dump runs under one mutation guard, so writers
/// never interleave with each other or with a dump in progress. Reads
/// (`get`, `exists`, `query`, `len`) skip the guard and go straight to the
/// backend: they see each writer's effect atomically per key, but a reader
/// racing a [`rename`](Store::rename) may briefly see neither key.
///
/// Durability is caller-driven: call [`dump`](Store::dump), use a
/// [`scope`](Store::scope), or wrap the work in
/// [`run_guarded`](crate::crash::run_guarded).
pub struct Store<M = DefaultBackend> {
    map: M,
    guard: Mutex<()>,
    dumping: AtomicBool,
    path: PathBuf,
    serializer: JsonSerializer,
    policy: DumpPolicy,
    write_mode: WriteMode,
}

impl Store<DefaultBackend> {
    /// Open (or create) a store at `path` with the default backend, manual
    /// dumps, and pretty JSON.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder(path).build()
    }

    /// Start configuring a new store. Call [`.build()`](StoreBuilder::build)
    /// when ready.
    pub fn builder(path: impl AsRef<Path>) -> StoreBuilder<DefaultBackend> {
        StoreBuilder::new(path)
    }
}

impl<M: MapBackend> Store<M> {
    // ---- reads ----

    /// Get the value for `key`, or `None` if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key)
    }

    /// Get the value for `key`, or `default` if absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.map.get(key).unwrap_or_else(|| default.into())
    }

    /// Get the value for `key` converted to `T` through serde. A value that
    /// doesn't fit `T` is a [`Error::Projection`].
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.project(key, serde_json::from_value::<T>)
    }

    /// Get the value for `key` passed through `project`. `None` when the key
    /// is absent (the projection isn't called); `project`'s error becomes
    /// [`Error::Projection`].
    pub fn project<T, E, F>(&self, key: &str, project: F) -> Result<Option<T>>
    where
        E: std::fmt::Display,
        F: FnOnce(Value) -> std::result::Result<T, E>,
    {
        match self.map.get(key) {
            Some(v) => project(v)
                .map(Some)
                .map_err(|e| Error::Projection(format!("{key:?}: {e}"))),
            None => Ok(None),
        }
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.entry_count()
    }

    /// `true` when the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the value at `key`: characters of a string, elements of an
    /// array, or members of an object. Other values have no length.
    pub fn len_of(&self, key: &str) -> Result<usize> {
        let value = self
            .map
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
        match &value {
            Value::String(s) => Ok(s.chars().count()),
            Value::Array(a) => Ok(a.len()),
            Value::Object(o) => Ok(o.len()),
            other => Err(Error::TypeMismatch {
                key: key.to_owned(),
                expected: "string, array or object",
                found: kind_of(other),
            }),
        }
    }

    /// Entries for which `predicate` returns `Ok(true)`, in no particular
    /// order. The first `Err` aborts the query with [`Error::Predicate`].
    pub fn query<F, E>(&self, mut predicate: F) -> Result<Vec<(String, Value)>>
    where
        F: FnMut(&str, &Value) -> std::result::Result<bool, E>,
        E: std::fmt::Display,
    {
        let mut hits = Vec::new();
        for (k, v) in self.map.snapshot() {
            let keep = predicate(&k, &v)
                .map_err(|e| Error::Predicate(format!("at {k:?}: {e}")))?;
            if keep {
                hits.push((k, v));
            }
        }
        Ok(hits)
    }

    /// Infallible [`query`](Self::query).
    #[must_use]
    pub fn filter<F>(&self, mut predicate: F) -> Vec<(String, Value)>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.map
            .snapshot()
            .into_iter()
            .filter(|(k, v)| predicate(k, v))
            .collect()
    }

    /// Snapshot of all key-value pairs.
    #[must_use]
    pub fn iter(&self) -> Vec<(String, Value)> {
        self.map.snapshot()
    }

    /// Snapshot of all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.map.snapshot().into_iter().map(|(k, _)| k).collect()
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- writes ----

    /// Insert or overwrite `key`, returning the previous value if there was one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let (key, value) = (key.into(), value.into());
        self.mutate(|map| Ok(map.insert(key, value)))
    }

    /// Like [`set`](Self::set), but store the hex digest of `value` under
    /// `algorithm` instead of the value itself.
    ///
    /// An unsupported algorithm name stores `value` unchanged; check with
    /// `algorithm.parse::<HashAlgorithm>()` if hashing must have happened.
    /// With a supported algorithm `value` has to be a string.
    pub fn set_hashed(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        algorithm: &str,
    ) -> Result<Option<Value>> {
        let (key, value) = (key.into(), value.into());
        let value = match algorithm.parse::<HashAlgorithm>() {
            Ok(alg) => match value {
                Value::String(s) => Value::String(alg.hex_digest(&s)),
                other => {
                    return Err(Error::TypeMismatch {
                        key,
                        expected: "string",
                        found: kind_of(&other),
                    })
                }
            },
            Err(e) => {
                tracing::debug!(target: "json_store", key = %key, error = %e, "storing raw value");
                value
            }
        };
        self.mutate(|map| Ok(map.insert(key, value)))
    }

    /// Remove `key` and return its value.
    pub fn remove(&self, key: &str) -> Result<Value> {
        self.mutate(|map| {
            map.remove(key)
                .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
        })
    }

    /// Move the value at `key` to `new_key`, replacing whatever `new_key` held.
    pub fn rename(&self, key: &str, new_key: impl Into<String>) -> Result<()> {
        let new_key = new_key.into();
        self.mutate(|map| {
            let value = map
                .remove(key)
                .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
            map.insert(new_key, value);
            Ok(())
        })
    }

    /// Merge `patch` into the top level. Patch entries win over existing ones
    /// with the same key. Returns the resulting entry count.
    pub fn update<I>(&self, patch: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.mutate(|map| {
            for (k, v) in patch {
                map.insert(k, v);
            }
            Ok(map.entry_count())
        })
    }

    /// Merge `patch` into the object stored at `key`, one level down. Returns
    /// the resulting top-level entry count.
    pub fn update_at<I>(&self, key: &str, patch: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.mutate(|map| {
            let current = map
                .get(key)
                .ok_or_else(|| Error::KeyNotFound(key.to_owned()))?;
            let mut nested = match current {
                Value::Object(nested) => nested,
                other => {
                    return Err(Error::TypeMismatch {
                        key: key.to_owned(),
                        expected: "object",
                        found: kind_of(&other),
                    })
                }
            };
            nested.extend(patch);
            map.insert(key.to_owned(), Value::Object(nested));
            Ok(map.entry_count())
        })
    }

    /// Drop all entries. Idempotent.
    pub fn clear(&self) -> Result<()> {
        self.mutate(|map| {
            map.clear();
            Ok(())
        })
    }

    // ---- persistence ----

    /// Rewrite the backing file with the current entries.
    pub fn dump(&self) -> Result<()> {
        self.dump_to(&self.path)
    }

    /// Rewrite `target` with the current entries. No mutation can run while
    /// the snapshot is taken and written; concurrent dumps queue up.
    pub fn dump_to(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        let _guard = self.guard.lock();
        // Stays raised if the write unwinds; the crash boundary checks it.
        self.dumping.store(true, Ordering::SeqCst);
        let written = self.write_snapshot(target);
        self.dumping.store(false, Ordering::SeqCst);
        written
    }

    /// Final dump, then release the store.
    pub fn close(self) -> Result<()> {
        self.dump()
    }

    /// Bind the store to a guard that dumps when it goes out of scope, also
    /// while unwinding from a panic. Use [`ScopedStore::finish`] to get the
    /// dump's error back instead of having it logged.
    pub fn scope(&self) -> ScopedStore<'_, M> {
        ScopedStore {
            store: self,
            armed: true,
        }
    }

    // ---- internal ----

    /// A dump started and never returned: it unwound partway through.
    pub(crate) fn dump_interrupted(&self) -> bool {
        self.dumping.load(Ordering::SeqCst)
    }

    /// Truncate the backing file and write everything out again, both under
    /// the mutation guard so no other dump can be writing in between.
    pub(crate) fn rescue_dump(&self) -> Result<()> {
        let _guard = self.guard.lock();
        self.dumping.store(true, Ordering::SeqCst);
        let written = truncate(&self.path).and_then(|()| self.write_snapshot(&self.path));
        self.dumping.store(false, Ordering::SeqCst);
        written
    }

    #[cfg(test)]
    pub(crate) fn interrupt_dump_for_test(&self) {
        self.dumping.store(true, Ordering::SeqCst);
    }

    fn write_snapshot(&self, target: &Path) -> Result<()> {
        let entries: Map<String, Value> = self.map.snapshot().into_iter().collect();
        let bytes = self.serializer.serialize(&entries)?;
        match self.write_mode {
            WriteMode::Overwrite => overwrite(target, &bytes)?,
            WriteMode::AtomicRename => atomic_write(target, &bytes)?,
        }
        tracing::debug!(
            target: "json_store",
            path = %target.display(),
            entries = entries.len(),
            bytes = bytes.len(),
            "dumped store"
        );
        Ok(())
    }

    fn mutate<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&M) -> Result<R>,
    {
        let out = {
            let _guard = self.guard.lock();
            f(&self.map)?
        };
        if self.policy == DumpPolicy::Immediate {
            self.dump()?;
        }
        Ok(out)
    }
}

impl<M> std::fmt::Debug for Store<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("write_mode", &self.write_mode)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Scoped acquisition
// ---------------------------------------------------------------------------

/// Borrowed store that dumps on every exit path.
///
/// Derefs to [`Store`]. Returned by [`Store::scope`].
pub struct ScopedStore<'a, M: MapBackend> {
    store: &'a Store<M>,
    armed: bool,
}

impl<M: MapBackend> ScopedStore<'_, M> {
    /// Dump now and disarm the drop-time dump, returning the dump's result.
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.store.dump()
    }
}

impl<M: MapBackend> std::ops::Deref for ScopedStore<'_, M> {
    type Target = Store<M>;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl<M: MapBackend> Drop for ScopedStore<'_, M> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.store.dump() {
            tracing::warn!(
                target: "json_store",
                path = %self.store.path.display(),
                error = %e,
                "dump on scope exit failed"
            );
        }
    }
}

impl<M: MapBackend> std::fmt::Debug for ScopedStore<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStore")
            .field("store", self.store)
            .field("armed", &self.armed)
            .finish()
    }
}

/// Open the store at `path`, run `f` against it, and dump on the way out,
/// whether `f` returns `Ok`, returns `Err`, or panics.
///
/// `f`'s error wins over a dump error; after a successful `f` a failed dump is
/// returned.
pub fn with_store<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
where
    F: FnOnce(&Store) -> Result<T>,
{
    let store = Store::open(path)?;
    let scope = store.scope();
    let out = f(&*scope);
    let dumped = scope.finish();
    let value = out?;
    dumped?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`Store`].
///
/// ```rust,no_run
/// use json_store::{DumpPolicy, Store, WriteMode};
///
/// let db = Store::builder("db.json")
///     .policy(DumpPolicy::Immediate)
///     .write_mode(WriteMode::AtomicRename)
///     .pretty(false)
///     .build()
///     .unwrap();
/// ```
pub struct StoreBuilder<M> {
    path: PathBuf,
    policy: DumpPolicy,
    write_mode: WriteMode,
    pretty: bool,
    _marker: PhantomData<M>,
}

impl<M: MapBackend + Default> StoreBuilder<M> {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            policy: DumpPolicy::Manual,
            write_mode: WriteMode::Overwrite,
            pretty: true,
            _marker: PhantomData,
        }
    }

    /// Set the dump policy (default: [`DumpPolicy::Manual`]).
    pub fn policy(mut self, policy: DumpPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set how dumps replace the file (default: [`WriteMode::Overwrite`]).
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Indented, human-readable JSON (default: `true`).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Keep entries in a different map, e.g.
    /// `parking_lot::RwLock<HashMap<String, Value>>`.
    pub fn backend<N: MapBackend + Default>(self) -> StoreBuilder<N> {
        StoreBuilder {
            path: self.path,
            policy: self.policy,
            write_mode: self.write_mode,
            pretty: self.pretty,
            _marker: PhantomData,
        }
    }

    /// Load (or create) the backing file and return the store.
    pub fn build(self) -> Result<Store<M>> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".into()));
        }
        if self.path.is_dir() {
            return Err(Error::Config(format!(
                "store path {} is a directory",
                self.path.display()
            )));
        }

        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::compact()
        };

        let map = M::default();
        let entries = load(&self.path, &serializer)?;
        let count = entries.len();
        for (k, v) in entries {
            map.insert(k, v);
        }
        tracing::debug!(target: "json_store", path = %self.path.display(), entries = count, "loaded store");

        Ok(Store {
            map,
            guard: Mutex::new(()),
            dumping: AtomicBool::new(false),
            path: self.path,
            serializer,
            policy: self.policy,
            write_mode: self.write_mode,
        })
    }
}

impl<M> std::fmt::Debug for StoreBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("write_mode", &self.write_mode)
            .field("pretty", &self.pretty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("json_store_unit_{}.json", name))
    }

    #[test]
    fn interrupted_dump_is_visible() {
        let path = temp_path("flag_raised");
        let _ = std::fs::remove_file(&path);
        let db = Store::open(&path).unwrap();
        assert!(!db.dump_interrupted());

        db.interrupt_dump_for_test();
        assert!(db.dump_interrupted());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn completed_dump_lowers_flag() {
        let path = temp_path("flag_lowered");
        let _ = std::fs::remove_file(&path);
        let db = Store::open(&path).unwrap();
        db.set("a", json!(1)).unwrap();
        db.dump().unwrap();
        assert!(!db.dump_interrupted());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_dump_lowers_flag() {
        let path = temp_path("flag_failed");
        let _ = std::fs::remove_file(&path);
        let db = Store::open(&path).unwrap();
        let bad = std::env::temp_dir().join("json_store_no_such_dir/sub/x.json");
        assert!(matches!(db.dump_to(&bad), Err(Error::Io(_))));
        assert!(!db.dump_interrupted());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn dump_during_unwind_lowers_flag() {
        let path = temp_path("flag_unwind");
        let _ = std::fs::remove_file(&path);
        let db = Store::open(&path).unwrap();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let scope = db.scope();
            scope.set("a", 1).unwrap();
            panic!("caller failed");
        }));
        assert!(res.is_err());
        assert!(!db.dump_interrupted());
        let _ = std::fs::remove_file(&path);
    }
}
