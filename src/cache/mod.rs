//! Versioned on-disk cache generations.
//!
//! Cached responses live under one directory per `CacheVersionTag`. At most
//! one generation is authoritative at a time; installs populate a staging
//! directory that only becomes addressable once every precache entry is in
//! place, and activation deletes every generation but the current one.

pub mod storage;
pub mod store;

pub use storage::CacheStorage;
pub use store::{CacheStore, StoredResponse};
