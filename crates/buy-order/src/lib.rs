//! Custodial order module for the simple-buy flow.
//!
//! This module talks to the custodial execution service: it turns a validated
//! buy selection and a quote into an order request, cancels superseded orders
//! and lists past orders. Implementations of the execution service are
//! pluggable and selected by configuration.

use async_trait::async_trait;
use buy_cache::CacheError;
use buy_types::{
	truncate_id, BuyOrder, BuyRequest, ConfigSchema, CustodialOrderRequest,
	ImplementationRegistry, OrderAndQuote, OrderInput, OrderOutput, OrdersFilter, Product, Quote,
	ORDER_STATE_PENDING,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

pub mod cache;

pub use cache::OrdersCache;

/// Re-export implementations
pub mod implementations {
	pub mod mock;
}

/// Errors that can occur during custodial order operations.
#[derive(Debug, Error)]
pub enum OrderError {
	/// Error that occurs during network communication with the execution service.
	#[error("Network error: {0}")]
	Network(String),
	/// The execution service refused the request.
	#[error("Order rejected: {0}")]
	Rejected(String),
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The order request is malformed.
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Cache error: {0}")]
	Cache(String),
}

impl From<CacheError> for OrderError {
	fn from(err: CacheError) -> Self {
		OrderError::Cache(err.to_string())
	}
}

/// Trait defining the interface for custodial execution services.
#[async_trait]
pub trait CustodialInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Creates an order in the given initial state.
	async fn create_order(
		&self,
		request: &CustodialOrderRequest,
		initial_state: &str,
	) -> Result<BuyOrder, OrderError>;

	/// Cancels a pending order.
	async fn cancel_order(&self, order_id: &str) -> Result<(), OrderError>;

	/// Lists past orders, most recent first.
	async fn list_orders(&self, filter: &OrdersFilter) -> Result<Vec<BuyOrder>, OrderError>;
}

/// Type alias for custodial factory functions.
pub type CustodialFactory = fn(&toml::Value) -> Result<Box<dyn CustodialInterface>, OrderError>;

/// Registry trait for custodial implementations.
pub trait CustodialRegistry: ImplementationRegistry<Factory = CustodialFactory> {}

/// Get all registered custodial implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CustodialFactory)> {
	use implementations::mock;

	vec![(mock::Registry::NAME, mock::Registry::factory())]
}

/// Service creating and cancelling custodial buy orders.
pub struct OrderService {
	implementations: HashMap<String, Arc<dyn CustodialInterface>>,
	primary_implementation: String,
}

impl OrderService {
	pub fn new(
		implementations: HashMap<String, Arc<dyn CustodialInterface>>,
		primary_implementation: String,
	) -> Result<Self, OrderError> {
		if !implementations.contains_key(&primary_implementation) {
			return Err(OrderError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary_implementation
			)));
		}

		Ok(Self {
			implementations,
			primary_implementation,
		})
	}

	fn primary(&self) -> Result<&Arc<dyn CustodialInterface>, OrderError> {
		self.implementations
			.get(&self.primary_implementation)
			.ok_or_else(|| {
				OrderError::Configuration(format!(
					"Primary implementation '{}' not available",
					self.primary_implementation
				))
			})
	}

	/// Builds the order request that buys `request.asset` against `quote`.
	pub fn order_request(request: &BuyRequest, quote: &Quote) -> CustodialOrderRequest {
		let payment = request.normalized_payment_method();
		let asset = &request.asset.network_ticker;
		let fiat = &request.amount.currency;

		CustodialOrderRequest {
			quote_id: quote.id.clone(),
			pair: format!("{}-{}", asset, fiat),
			action: Product::Buy.as_str().to_string(),
			input: OrderInput {
				symbol: fiat.clone(),
				amount: request.amount.minor_units_string(),
			},
			output: OrderOutput {
				symbol: asset.clone(),
				amount: None,
			},
			payment_method_id: payment.payment_method_id,
			payment_type: payment.payment_method_type.as_str().to_string(),
			period: request
				.recurring_frequency
				.map(|frequency| frequency.as_str().to_string()),
		}
	}

	/// Creates a pending order funded by `quote` and pairs the two.
	#[instrument(skip_all, fields(quote_id = %truncate_id(&quote.id)))]
	pub async fn create_order(
		&self,
		request: &BuyRequest,
		quote: Quote,
	) -> Result<OrderAndQuote, OrderError> {
		let order_request = Self::order_request(request, &quote);
		let order = self
			.primary()?
			.create_order(&order_request, ORDER_STATE_PENDING)
			.await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			pair = %order.pair,
			status = %order.status,
			"Created buy order"
		);
		Ok(OrderAndQuote { order, quote })
	}

	/// Cancels `order_id`; succeeds immediately when there is nothing to cancel.
	pub async fn cancel_order(&self, order_id: Option<&str>) -> Result<(), OrderError> {
		let Some(order_id) = order_id else {
			return Ok(());
		};

		self.primary()?.cancel_order(order_id).await?;
		tracing::info!(order_id = %truncate_id(order_id), "Cancelled buy order");
		Ok(())
	}

	pub async fn list_orders(&self, filter: &OrdersFilter) -> Result<Vec<BuyOrder>, OrderError> {
		self.primary()?.list_orders(filter).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use buy_types::{
		AssetInfo, BuyOrderDraft, CurrencyPair, FiatValue, PaymentMethodType,
		RecurringBuyFrequency, SelectedPaymentMethod,
	};
	use implementations::mock::{MockCustodial, MockCustodialConfig};
	use rust_decimal::Decimal;

	fn quote() -> Quote {
		Quote {
			id: "quote-1".into(),
			pair: CurrencyPair::new("USD", "BTC"),
			price: Decimal::new(6_500_000, 2),
			fee: Decimal::ZERO,
			created_at: chrono::Utc::now(),
			expires_in_millis: 30_000,
		}
	}

	fn buy(
		payment_method: SelectedPaymentMethod,
		frequency: RecurringBuyFrequency,
	) -> BuyRequest {
		BuyRequest::from_selection(
			Some(AssetInfo::new("BTC", 8)),
			Some(payment_method),
			&BuyOrderDraft::with_amount(FiatValue::from_minor("USD", 10_000)),
			frequency,
		)
		.unwrap()
	}

	fn service() -> OrderService {
		let mut implementations: HashMap<String, Arc<dyn CustodialInterface>> = HashMap::new();
		implementations.insert(
			"mock".into(),
			Arc::new(MockCustodial::new(MockCustodialConfig::default())),
		);
		OrderService::new(implementations, "mock".into()).unwrap()
	}

	#[test]
	fn test_order_request_for_google_pay() {
		let request = buy(
			SelectedPaymentMethod::new("gpay-token", PaymentMethodType::GooglePay),
			RecurringBuyFrequency::OneTime,
		);
		let order_request = OrderService::order_request(&request, &quote());

		assert_eq!(order_request.pair, "BTC-USD");
		assert_eq!(order_request.action, "BUY");
		assert_eq!(order_request.quote_id, "quote-1");
		assert_eq!(order_request.input.symbol, "USD");
		assert_eq!(order_request.input.amount, "10000");
		assert_eq!(order_request.output.symbol, "BTC");
		assert_eq!(order_request.output.amount, None);
		assert_eq!(order_request.payment_type, "PAYMENT_CARD");
		assert_eq!(order_request.payment_method_id, None);
		assert_eq!(order_request.period, None);
	}

	#[test]
	fn test_order_request_for_recurring_card() {
		let request = buy(
			SelectedPaymentMethod::new("card-7", PaymentMethodType::PaymentCard),
			RecurringBuyFrequency::Weekly,
		);
		let order_request = OrderService::order_request(&request, &quote());

		assert_eq!(order_request.payment_method_id.as_deref(), Some("card-7"));
		assert_eq!(order_request.period.as_deref(), Some("WEEKLY"));
	}

	#[tokio::test]
	async fn test_create_pairs_order_with_submitted_quote() {
		let service = service();
		let request = buy(
			SelectedPaymentMethod::new("card-7", PaymentMethodType::PaymentCard),
			RecurringBuyFrequency::OneTime,
		);

		let result = service.create_order(&request, quote()).await.unwrap();
		assert_eq!(result.quote.id, "quote-1");
		assert_eq!(result.order.quote_id.as_deref(), Some("quote-1"));
		assert!(result.order.is_pending());
	}

	#[tokio::test]
	async fn test_cancel_without_id_is_noop() {
		let service = service();
		service.cancel_order(None).await.unwrap();
		assert!(matches!(
			service.cancel_order(Some("missing")).await,
			Err(OrderError::NotFound(_))
		));
	}
}
