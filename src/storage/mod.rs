//! Storage Engine
//!
//! In-memory key-value store with per-entry expiration and vacuum.

mod entry;
mod store;
mod vacuum;

pub use entry::Entry;
pub use store::{Store, StoreStats};
