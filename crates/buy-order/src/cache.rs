//! Short-lived cache of the custodial order history.

use crate::{OrderError, OrderService};
use buy_cache::{CacheError, CacheService, ParameteredTimedCacheRequest};
use buy_types::{BuyOrder, OrdersFilter};
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "orders";

/// Order listings keyed by filter, refreshed after `lifetime`.
pub struct OrdersCache {
	request: ParameteredTimedCacheRequest<OrdersFilter, Vec<BuyOrder>, OrderError>,
}

impl OrdersCache {
	pub fn new(cache: Arc<CacheService>, orders: Arc<OrderService>, lifetime: Duration) -> Self {
		let request =
			ParameteredTimedCacheRequest::new(cache, NAMESPACE, lifetime, move |filter: OrdersFilter| {
				let orders = orders.clone();
				async move { orders.list_orders(&filter).await }
			});
		Self { request }
	}

	pub async fn orders(&self, filter: &OrdersFilter) -> Result<Vec<BuyOrder>, OrderError> {
		self.request.get_cached(filter).await
	}

	/// Forgets every cached listing; the next read goes to the service.
	pub async fn invalidate(&self) -> Result<(), CacheError> {
		let removed = self.request.invalidate_all().await?;
		tracing::debug!(removed, "Invalidated cached order listings");
		Ok(())
	}
}
