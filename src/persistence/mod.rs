//! Persistence Module
//!
//! Text snapshots, binary backups and JSON export of a store.

mod binary;
mod json;
mod text;

pub use binary::Compression;
pub use text::HEADER;
