//! Cache manager for persisted API payloads and the rate-limit deadline
//!
//! Wraps a [`KeyValueStore`] with the typed layout the client relies on:
//! per-request entries, one last-success entry per endpoint, and the global
//! `solar_api_blocked_until` deadline. Storage failures are logged and then
//! behave like a miss, so a broken disk never turns cached data into an error.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::store::{KeyValueStore, StorageError};

/// Key holding the rate-limit deadline as epoch milliseconds
pub const BLOCKED_UNTIL_KEY: &str = "solar_api_blocked_until";

/// Prefix for per-request cache entries
const DATA_KEY_PREFIX: &str = "solar_data_";

/// Prefix for per-endpoint last-success entries
const LAST_SUCCESS_KEY_PREFIX: &str = "solar_last_success_";

/// A cached payload with the time it was stored
///
/// Persisted as `{"data": ..., "timestamp": <epoch ms>}`. Entries never expire
/// on their own; freshness is judged by the reader against an endpoint TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The payload returned by the remote API
    pub data: Value,
    /// When the payload was stored, in epoch milliseconds
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: Value, stored_at: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: stored_at.timestamp_millis(),
        }
    }

    /// When the entry was stored
    pub fn stored_at(&self) -> DateTime<Utc> {
        from_millis(self.timestamp)
    }
}

/// Storage key for a specific request's entry
pub fn data_key(endpoint: &str, params_json: &str) -> String {
    format!("{}{}_{}", DATA_KEY_PREFIX, endpoint, params_json)
}

/// Storage key for an endpoint's last successful payload
pub fn last_success_key(endpoint: &str) -> String {
    format!("{}{}", LAST_SUCCESS_KEY_PREFIX, endpoint)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Typed access to the persisted cache layout
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager").finish_non_exhaustive()
    }
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the entry stored under `key`
    ///
    /// Returns `None` if the entry is missing, unreadable, or cannot be parsed.
    pub fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Writes `entry` under `key` unless a newer entry is already stored
    ///
    /// Keeps `timestamp` non-decreasing per key when a slow request finishes
    /// after a faster one for the same key.
    pub fn write_entry(&self, key: &str, entry: &CacheEntry) -> Result<(), StorageError> {
        if let Some(existing) = self.read_entry(key) {
            if existing.timestamp > entry.timestamp {
                tracing::debug!(cache_key = key, "kept newer cache entry");
                return Ok(());
            }
        }
        let json = serde_json::to_string(entry)?;
        self.store.set(key, &json)
    }

    /// Returns the persisted rate-limit deadline, if one is set and parseable
    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(BLOCKED_UNTIL_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "rate-limit state read failed");
                return None;
            }
        };
        raw.trim().parse::<i64>().ok().map(from_millis)
    }

    /// Persists a new rate-limit deadline, replacing any previous one
    pub fn set_blocked_until(&self, until: DateTime<Utc>) -> Result<(), StorageError> {
        self.store
            .set(BLOCKED_UNTIL_KEY, &until.timestamp_millis().to_string())
    }

    /// Removes the rate-limit deadline
    pub fn clear_blocked_until(&self) -> Result<(), StorageError> {
        self.store.remove(BLOCKED_UNTIL_KEY)
    }
}
