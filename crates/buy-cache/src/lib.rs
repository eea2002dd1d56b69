//! Timed cache module for the simple-buy flow.
//!
//! This module provides a small key-value cache abstraction with per-entry
//! time-to-live, a typed service on top of it, and memoising "timed cache
//! requests" that call a refresh function only when the cached value is
//! missing or expired.

use async_trait::async_trait;
use buy_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

pub mod timed;

pub use timed::{ParameteredTimedCacheRequest, TimedCacheRequest};

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
	/// The key is absent or its entry has expired.
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for cache backends.
#[async_trait]
pub trait CacheInterface: Send + Sync {
	/// Retrieves raw bytes for the given key; expired entries are reported as
	/// [`CacheError::NotFound`].
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, CacheError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), CacheError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), CacheError>;

	/// Deletes every key starting with `prefix`, returning how many were removed.
	async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries, returning the number removed.
	async fn cleanup_expired(&self) -> Result<usize, CacheError> {
		Ok(0)
	}
}

/// Type alias for cache factory functions.
pub type CacheFactory = fn(&toml::Value) -> Result<Box<dyn CacheInterface>, CacheError>;

/// Registry trait for cache implementations.
pub trait CacheRegistry: ImplementationRegistry<Factory = CacheFactory> {}

/// Get all registered cache implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CacheFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

/// Typed cache operations over a backend.
///
/// Values are stored as JSON under `namespace:id` keys.
pub struct CacheService {
	backend: Box<dyn CacheInterface>,
}

impl CacheService {
	pub fn new(backend: Box<dyn CacheInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value with optional time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), CacheError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| CacheError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, ttl)
			.await
	}

	/// Retrieves and deserializes a value.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, CacheError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization(e.to_string()))
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), CacheError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Removes every entry of a namespace.
	pub async fn remove_namespace(&self, namespace: &str) -> Result<usize, CacheError> {
		self.backend
			.delete_prefix(&Self::key(namespace, ""))
			.await
	}

	pub async fn cleanup_expired(&self) -> Result<usize, CacheError> {
		self.backend.cleanup_expired().await
	}
}

/// Spawns a task purging expired entries every `interval`.
///
/// The returned handle should be aborted on shutdown.
pub fn spawn_cleanup(cache: Arc<CacheService>, interval: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		loop {
			ticker.tick().await;
			match cache.cleanup_expired().await {
				Ok(count) if count > 0 => {
					tracing::debug!("Cache cleanup: removed {} expired entries", count);
				},
				Err(e) => {
					tracing::warn!("Cache cleanup failed: {}", e);
				},
				_ => {},
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryCache;

	#[tokio::test(start_paused = true)]
	async fn test_service_round_trip_and_namespace_removal() {
		let service = CacheService::new(Box::new(MemoryCache::new()));

		service
			.store_with_ttl("orders", "a", &vec![1u32, 2, 3], None)
			.await
			.unwrap();
		service
			.store_with_ttl("orders", "b", &vec![4u32], None)
			.await
			.unwrap();
		service
			.store_with_ttl("quotes", "a", &"q-1".to_string(), None)
			.await
			.unwrap();

		let values: Vec<u32> = service.retrieve("orders", "a").await.unwrap();
		assert_eq!(values, vec![1, 2, 3]);

		assert_eq!(service.remove_namespace("orders").await.unwrap(), 2);
		assert!(matches!(
			service.retrieve::<Vec<u32>>("orders", "b").await,
			Err(CacheError::NotFound)
		));
		let quote: String = service.retrieve("quotes", "a").await.unwrap();
		assert_eq!(quote, "q-1");
	}

	#[tokio::test(start_paused = true)]
	async fn test_spawned_cleanup_purges_expired() {
		let service = Arc::new(CacheService::new(Box::new(MemoryCache::new())));
		service
			.store_with_ttl("orders", "a", &1u32, Some(Duration::from_secs(5)))
			.await
			.unwrap();

		let handle = spawn_cleanup(service.clone(), Duration::from_secs(10));
		tokio::time::sleep(Duration::from_secs(11)).await;

		assert_eq!(service.cleanup_expired().await.unwrap(), 0);
		handle.abort();
	}
}
