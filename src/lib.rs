//! ttlkv - In-Process Key-Value Store with Expiration
//!
//! A thread-safe map from string keys to string values where every entry may
//! carry an absolute expiration time. Expired entries disappear lazily on
//! read and are reclaimed in bulk by a background vacuum task. The store can
//! be dumped to and loaded from a line-oriented text snapshot, backed up in
//! a compact binary form, and exported as JSON.
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use ttlkv::{Store, VacuumConfig};
//!
//! let store = Store::with_config(VacuumConfig::disabled());
//! store.put("greeting", "hello");
//! store.put_ttl("session", "abc", Utc::now() + Duration::minutes(5));
//!
//! assert_eq!(store.get("greeting").as_deref(), Some("hello"));
//! print!("{}", store);
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod storage;

pub use config::VacuumConfig;
pub use error::{Error, Result, SnapshotError};
pub use persistence::Compression;
pub use storage::{Entry, Store, StoreStats};
