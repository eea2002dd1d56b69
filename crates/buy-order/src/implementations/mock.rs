//! In-memory custodial execution service for development and tests.

use crate::{CustodialFactory, CustodialInterface, CustodialRegistry, OrderError};
use async_trait::async_trait;
use buy_types::{
	truncate_id, BuyOrder, ConfigSchema, CustodialOrderRequest, FiatValue, Field, FieldType,
	ImplementationRegistry, OrderStatus, OrdersFilter, PaymentMethodType, Product,
	RecurringBuyFrequency, Schema, ValidationError, ORDER_STATE_PENDING,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Configuration for the mock custodial service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockCustodialConfig {
	/// Rejects every order creation.
	#[serde(default)]
	pub fail_create: bool,
	/// Rejects every cancellation.
	#[serde(default)]
	pub fail_cancel: bool,
}

/// Configuration schema for the mock custodial service.
pub struct MockCustodialSchema;

impl ConfigSchema for MockCustodialSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::new("fail_create", FieldType::Boolean),
				Field::new("fail_cancel", FieldType::Boolean),
			],
		)
		.validate(config)
	}
}

/// Order book kept in memory, oldest order first.
pub struct MockCustodial {
	config: MockCustodialConfig,
	orders: RwLock<Vec<BuyOrder>>,
}

impl MockCustodial {
	pub fn new(config: MockCustodialConfig) -> Self {
		Self {
			config,
			orders: RwLock::new(Vec::new()),
		}
	}

	fn to_order(request: &CustodialOrderRequest) -> Result<BuyOrder, OrderError> {
		if request.action != Product::Buy.as_str() {
			return Err(OrderError::InvalidOrder(format!(
				"Unsupported action {}",
				request.action
			)));
		}
		let minor_units = request.input.amount.parse::<u64>().map_err(|_| {
			OrderError::InvalidOrder(format!(
				"Input amount '{}' is not an integer",
				request.input.amount
			))
		})?;

		Ok(BuyOrder {
			id: uuid::Uuid::new_v4().to_string(),
			pair: request.pair.clone(),
			asset: request.output.symbol.clone(),
			fiat: FiatValue::from_minor(request.input.symbol.clone(), minor_units),
			payment_method_type: request
				.payment_type
				.parse()
				.unwrap_or(PaymentMethodType::Unknown),
			payment_method_id: request.payment_method_id.clone(),
			recurring_frequency: request
				.period
				.as_deref()
				.map(|period| period.parse().unwrap_or(RecurringBuyFrequency::Unknown)),
			status: OrderStatus::Pending,
			quote_id: Some(request.quote_id.clone()),
			created_at: chrono::Utc::now(),
		})
	}
}

#[async_trait]
impl CustodialInterface for MockCustodial {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockCustodialSchema)
	}

	async fn create_order(
		&self,
		request: &CustodialOrderRequest,
		initial_state: &str,
	) -> Result<BuyOrder, OrderError> {
		if self.config.fail_create {
			return Err(OrderError::Rejected("Order creation disabled".to_string()));
		}
		if initial_state != ORDER_STATE_PENDING {
			return Err(OrderError::InvalidOrder(format!(
				"Unsupported initial state {}",
				initial_state
			)));
		}

		let order = Self::to_order(request)?;
		self.orders.write().await.push(order.clone());
		tracing::debug!(order_id = %truncate_id(&order.id), "Mock order stored");
		Ok(order)
	}

	async fn cancel_order(&self, order_id: &str) -> Result<(), OrderError> {
		if self.config.fail_cancel {
			return Err(OrderError::Rejected("Order cancellation disabled".to_string()));
		}

		let mut orders = self.orders.write().await;
		let order = orders
			.iter_mut()
			.find(|order| order.id == order_id)
			.ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

		if !order.is_pending() {
			return Err(OrderError::Rejected(format!(
				"Order {} is {}",
				order_id, order.status
			)));
		}
		order.status = OrderStatus::Cancelled;
		Ok(())
	}

	async fn list_orders(&self, filter: &OrdersFilter) -> Result<Vec<BuyOrder>, OrderError> {
		if filter.product != Product::Buy {
			return Ok(Vec::new());
		}
		let orders = self.orders.read().await;
		Ok(orders
			.iter()
			.rev()
			.filter(|order| filter.matches(order))
			.cloned()
			.collect())
	}
}

/// Factory function to create a mock custodial service from configuration.
pub fn create_custodial(config: &toml::Value) -> Result<Box<dyn CustodialInterface>, OrderError> {
	MockCustodialSchema
		.validate(config)
		.map_err(|e| OrderError::Configuration(format!("Invalid mock config: {}", e)))?;

	let mock_config: MockCustodialConfig = config
		.clone()
		.try_into()
		.map_err(|e| OrderError::Configuration(format!("Invalid mock config: {}", e)))?;

	Ok(Box::new(MockCustodial::new(mock_config)))
}

/// Registry for the mock custodial implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = CustodialFactory;

	fn factory() -> Self::Factory {
		create_custodial
	}
}

impl CustodialRegistry for Registry {}
