//! Embedded key-value store backed by a single JSON file.
//!
//! Keys are strings, values are any JSON value. The whole mapping lives in
//! memory; persistence is a full rewrite of the file, triggered by the caller
//! ([`Store::dump`]), by leaving a [`scope`](Store::scope), or by the
//! [`crash::run_guarded`] boundary when a dump was cut short by a panic.
//!
//! ```rust,no_run
//! use json_store::Store;
//! use serde_json::json;
//!
//! let db = Store::open("db.json").unwrap();
//! db.set("hello", json!("world")).unwrap();
//! db.set_hashed("password", "hunter2", "sha256").unwrap();
//! db.dump().unwrap();
//! ```
//!
//! **Single-process only.** If multiple processes open the same file they will
//! clobber each other. Threads within one process are fine: every mutation
//! and dump goes through one mutation guard.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod crash;
pub mod error;
pub mod hash;
pub mod persist;
pub mod policy;
pub mod serializer;
pub mod store;

pub use backend::MapBackend;
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use policy::{DumpPolicy, WriteMode};
pub use store::{with_store, ScopedStore, Store, StoreBuilder};

/// Default backend: ShardMap.
pub type DefaultBackend = shardmap::ShardMap<String, serde_json::Value>;
