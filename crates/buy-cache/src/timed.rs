//! Memoising cache requests with a fixed lifetime.
//!
//! A timed cache request wraps a refresh function. The first call, and any
//! call after the lifetime elapsed or after an explicit invalidation, runs the
//! refresh function and caches its result; every other call is answered from
//! the cache. Refresh failures are returned to the caller and never cached.

use crate::{CacheError, CacheService};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

type RefreshFn<K, T, E> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Timed cache keyed by a request parameter.
pub struct ParameteredTimedCacheRequest<K, T, E> {
	cache: Arc<CacheService>,
	namespace: String,
	lifetime: Duration,
	refresh: RefreshFn<K, T, E>,
	_value: PhantomData<fn() -> T>,
}

impl<K, T, E> ParameteredTimedCacheRequest<K, T, E>
where
	K: Serialize + Clone + Send + 'static,
	T: Serialize + DeserializeOwned + Send + 'static,
	E: From<CacheError> + std::fmt::Display + Send + 'static,
{
	pub fn new<F, Fut>(
		cache: Arc<CacheService>,
		namespace: impl Into<String>,
		lifetime: Duration,
		refresh: F,
	) -> Self
	where
		F: Fn(K) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<T, E>> + Send + 'static,
	{
		Self {
			cache,
			namespace: namespace.into(),
			lifetime,
			refresh: Arc::new(move |param| Box::pin(refresh(param))),
			_value: PhantomData,
		}
	}

	fn key_for(&self, param: &K) -> Result<String, CacheError> {
		serde_json::to_string(param).map_err(|e| CacheError::Serialization(e.to_string()))
	}

	/// Returns the cached value for `param`, refreshing it when absent or expired.
	pub async fn get_cached(&self, param: &K) -> Result<T, E> {
		let key = self.key_for(param)?;

		match self.cache.retrieve::<T>(&self.namespace, &key).await {
			Ok(value) => {
				tracing::trace!(namespace = %self.namespace, key = %key, "Cache hit");
				return Ok(value);
			},
			Err(CacheError::NotFound) => {},
			Err(e) => {
				tracing::warn!(namespace = %self.namespace, error = %e, "Discarding unreadable cache entry");
			},
		}

		let fresh = (self.refresh)(param.clone()).await.inspect_err(|e| {
			tracing::debug!(namespace = %self.namespace, error = %e, "Cache refresh failed");
		})?;

		if let Err(e) = self
			.cache
			.store_with_ttl(&self.namespace, &key, &fresh, Some(self.lifetime))
			.await
		{
			tracing::warn!(namespace = %self.namespace, error = %e, "Failed to store refreshed value");
		}

		Ok(fresh)
	}

	/// Drops the cached value for `param`.
	pub async fn invalidate(&self, param: &K) -> Result<(), CacheError> {
		let key = self.key_for(param)?;
		self.cache.remove(&self.namespace, &key).await
	}

	/// Drops every cached value of this request.
	pub async fn invalidate_all(&self) -> Result<usize, CacheError> {
		self.cache.remove_namespace(&self.namespace).await
	}
}

/// Timed cache holding a single value.
pub struct TimedCacheRequest<T, E> {
	inner: ParameteredTimedCacheRequest<(), T, E>,
}

impl<T, E> TimedCacheRequest<T, E>
where
	T: Serialize + DeserializeOwned + Send + 'static,
	E: From<CacheError> + std::fmt::Display + Send + 'static,
{
	pub fn new<F, Fut>(
		cache: Arc<CacheService>,
		namespace: impl Into<String>,
		lifetime: Duration,
		refresh: F,
	) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<T, E>> + Send + 'static,
	{
		Self {
			inner: ParameteredTimedCacheRequest::new(cache, namespace, lifetime, move |()| refresh()),
		}
	}

	pub async fn get_cached(&self) -> Result<T, E> {
		self.inner.get_cached(&()).await
	}

	pub async fn invalidate(&self) -> Result<(), CacheError> {
		self.inner.invalidate(&()).await
	}
}
