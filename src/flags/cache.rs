//! Read-through cache for evaluated flag pages.
//!
//! Backed by a shared Redis store so every instance observes the same
//! entries. Keys are scoped to (tenant, environment); only the canonical
//! unfiltered first page is ever stored (the service layer enforces that
//! gate). The cache is never authoritative: any error or timeout on a
//! cache command degrades to a miss or no-op and the request continues
//! against the database.

use super::types::{CachedFlagPage, Environment};
use crate::app_config::CacheConfig;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;

/// Handle to the shared flag page cache.
///
/// Constructed once at startup and passed to the flag service; holds no
/// global state.
#[derive(Clone)]
pub struct FlagCache {
    client: redis::Client,
    key_prefix: String,
    ttl_seconds: u64,
    command_timeout: Duration,
}

impl FlagCache {
    pub fn new(redis_url: &str, config: &CacheConfig) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            key_prefix: config.key_prefix.clone(),
            ttl_seconds: config.ttl_seconds,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    /// Cache key for one (tenant, environment) pair, e.g. `features:7:prod`.
    pub fn key(&self, tenant_id: i32, env: Environment) -> String {
        format!("{}:{}:{}", self.key_prefix, tenant_id, env.as_str())
    }

    /// Fetch the cached canonical page, if present and decodable.
    pub async fn get_page(&self, tenant_id: i32, env: Environment) -> Option<CachedFlagPage> {
        let key = self.key(tenant_id, env);

        let raw = match timeout(self.command_timeout, self.fetch(&key)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
            Err(_) => {
                log::warn!("Cache read timed out for {}", key);
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(page) => Some(page),
            Err(e) => {
                // An undecodable entry is as good as absent.
                log::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store the canonical page with the configured TTL. Overwrites any
    /// existing entry for the key.
    pub async fn put_page(&self, tenant_id: i32, env: Environment, page: &CachedFlagPage) {
        let key = self.key(tenant_id, env);

        let payload = match serde_json::to_string(page) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to encode cache entry {}: {}", key, e);
                return;
            }
        };

        match timeout(self.command_timeout, self.store(&key, payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Cache write failed for {}: {}", key, e),
            Err(_) => log::warn!("Cache write timed out for {}", key),
        }
    }

    /// Drop the entry for (tenant, environment). Idempotent; safe to call
    /// when no entry exists.
    pub async fn invalidate(&self, tenant_id: i32, env: Environment) {
        let key = self.key(tenant_id, env);

        match timeout(self.command_timeout, self.remove(&key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Cache invalidation failed for {}: {}", key, e),
            Err(_) => log::warn!("Cache invalidation timed out for {}", key),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.client.get_async_connection().await?;
        conn.get(key).await
    }

    async fn store(&self, key: &str, payload: String) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_async_connection().await?;
        conn.set_ex(key, payload, self.ttl_seconds as usize).await
    }

    async fn remove(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_async_connection().await?;
        conn.del(key).await
    }
}
