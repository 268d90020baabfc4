//! Cache-aside layer in front of the order repository.
//!
//! The cache is an optimization, never a source of truth: every entry can be rebuilt from the
//! store, entries are deleted (not updated in place) on mutation, and a TTL bounds the staleness
//! of anything that escapes explicit invalidation. Callers treat every cache operation as
//! best-effort.
mod keys;
mod memory;

use std::time::Duration;

pub use keys::{detail_key, list_key, list_prefix, ListOwner};
pub use memory::MemoryCache;

/// The narrow substitution point between the engine and whatever key-value store backs it.
/// List entries are grouped under per-user key prefixes so that invalidation does not need to
/// enumerate filter/page combinations.
pub trait Cache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String, ttl: Duration);
    fn delete(&self, key: &str);
    fn delete_prefix(&self, prefix: &str);
}
