//! In-memory cache backend.
//!
//! Entries carry an optional deadline measured on the tokio clock. Expired
//! entries are invisible to readers immediately and are physically removed by
//! `cleanup_expired`.

use crate::{CacheError, CacheFactory, CacheInterface, CacheRegistry};
use async_trait::async_trait;
use buy_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|deadline| now >= deadline)
	}
}

/// In-memory cache with per-entry time-to-live.
pub struct MemoryCache {
	store: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryCache {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CacheInterface for MemoryCache {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, CacheError> {
		let store = self.store.read().await;
		match store.get(key) {
			Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value.clone()),
			_ => Err(CacheError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), CacheError> {
		let expires_at = ttl.map(|ttl| Instant::now() + ttl);
		let mut store = self.store.write().await;
		store.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), CacheError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|key, _| !key.starts_with(prefix));
		Ok(before - store.len())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryCacheSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, CacheError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		Ok(before - store.len())
	}
}

/// Configuration schema for MemoryCache; it takes no settings.
pub struct MemoryCacheSchema;

impl ConfigSchema for MemoryCacheSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory cache backend from configuration.
pub fn create_cache(config: &toml::Value) -> Result<Box<dyn CacheInterface>, CacheError> {
	MemoryCacheSchema
		.validate(config)
		.map_err(|e| CacheError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryCache::new()))
}

/// Registry for the memory cache implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = CacheFactory;

	fn factory() -> Self::Factory {
		create_cache
	}
}

impl CacheRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn test_basic_operations() {
		let cache = MemoryCache::new();

		cache
			.set_bytes("k", b"value".to_vec(), None)
			.await
			.unwrap();
		assert_eq!(cache.get_bytes("k").await.unwrap(), b"value".to_vec());

		cache.delete("k").await.unwrap();
		assert!(matches!(cache.get_bytes("k").await, Err(CacheError::NotFound)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_entry_expires() {
		let cache = MemoryCache::new();
		cache
			.set_bytes("k", b"v".to_vec(), Some(Duration::from_secs(10)))
			.await
			.unwrap();

		tokio::time::advance(Duration::from_secs(9)).await;
		assert!(cache.get_bytes("k").await.is_ok());

		tokio::time::advance(Duration::from_secs(1)).await;
		assert!(matches!(cache.get_bytes("k").await, Err(CacheError::NotFound)));
		assert_eq!(cache.cleanup_expired().await.unwrap(), 1);
		assert_eq!(cache.cleanup_expired().await.unwrap(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_delete_prefix() {
		let cache = MemoryCache::new();
		for key in ["orders:a", "orders:b", "quotes:a"] {
			cache.set_bytes(key, vec![1], None).await.unwrap();
		}
		assert_eq!(cache.delete_prefix("orders:").await.unwrap(), 2);
		assert!(cache.get_bytes("quotes:a").await.is_ok());
	}

	#[test]
	fn test_factory_rejects_non_table() {
		let result = create_cache(&toml::Value::String("memory".into()));
		assert!(matches!(result, Err(CacheError::Configuration(_))));
	}
}
