//! Persistent cache for API responses
//!
//! Payloads are stored per request signature and per endpoint (last success),
//! alongside the process-wide rate-limit deadline. Entries never expire on
//! their own: freshness is decided by the reader, which lets stale data serve
//! as a fallback when the API is throttled or unreachable.

mod manager;
mod store;

pub use manager::{data_key, last_success_key, CacheEntry, CacheManager, BLOCKED_UNTIL_KEY};
pub use store::{escape_key, FileStore, KeyValueStore, MemoryStore, StorageError};
