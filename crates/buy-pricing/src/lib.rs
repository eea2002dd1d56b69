//! Pricing module for the simple-buy flow.
//!
//! This module provides the interface to the brokerage pricing service and the
//! service that builds buy quote requests from a validated selection. It
//! follows the same trait-based pattern as the other pluggable components.

use async_trait::async_trait;
use buy_types::{
	truncate_id, BuyRequest, ConfigSchema, ImplementationRegistry, Product, Quote, QuoteRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Re-export implementations
pub mod implementations {
	pub mod mock;
}

/// Errors that can occur during pricing operations.
#[derive(Debug, Error)]
pub enum PricingError {
	/// Error that occurs during network communication with the pricing service.
	#[error("Network error: {0}")]
	Network(String),
	/// The pricing service rejected the request.
	#[error("Validation error: {0}")]
	Validation(String),
	/// No price is currently available for the requested pair.
	#[error("Price unavailable: {0}")]
	Unavailable(String),
	#[error("Internal error: {0}")]
	Internal(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for pricing service implementations.
#[async_trait]
pub trait PricingInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Requests a fresh quote.
	///
	/// Every call yields a new quote with its own id and expiry.
	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, PricingError>;
}

/// Type alias for pricing factory functions.
pub type PricingFactory = fn(&toml::Value) -> Result<Box<dyn PricingInterface>, PricingError>;

/// Registry trait for pricing implementations.
pub trait PricingRegistry: ImplementationRegistry<Factory = PricingFactory> {}

/// Get all registered pricing implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PricingFactory)> {
	use implementations::mock;

	vec![(mock::Registry::NAME, mock::Registry::factory())]
}

/// Service that fetches buy quotes from the primary pricing implementation.
pub struct PricingService {
	implementations: HashMap<String, Arc<dyn PricingInterface>>,
	primary_implementation: String,
}

impl PricingService {
	/// Creates a new PricingService.
	///
	/// Fails when `primary_implementation` is not among `implementations`.
	pub fn new(
		implementations: HashMap<String, Arc<dyn PricingInterface>>,
		primary_implementation: String,
	) -> Result<Self, PricingError> {
		if !implementations.contains_key(&primary_implementation) {
			return Err(PricingError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary_implementation
			)));
		}

		Ok(Self {
			implementations,
			primary_implementation,
		})
	}

	/// Builds the quote request for a buy.
	///
	/// The payment method is normalised the same way order requests are, so a
	/// wallet card payment is quoted as a plain card payment without an id.
	pub fn buy_quote_request(request: &BuyRequest) -> QuoteRequest {
		let payment = request.normalized_payment_method();
		QuoteRequest {
			pair: request.pair(),
			amount: request.amount.clone(),
			payment_method_type: payment.payment_method_type,
			payment_method_id: payment.payment_method_id,
			product: Product::Buy,
		}
	}

	/// Fetches a quote for a buy. Errors from the pricing service are returned
	/// unchanged.
	#[instrument(skip_all, fields(pair = %request.pair(), amount = %request.amount))]
	pub async fn quote_for_buy(&self, request: &BuyRequest) -> Result<Quote, PricingError> {
		let implementation = self
			.implementations
			.get(&self.primary_implementation)
			.ok_or_else(|| {
				PricingError::Internal(format!(
					"Primary implementation '{}' not available",
					self.primary_implementation
				))
			})?;

		let quote_request = Self::buy_quote_request(request);
		let quote = implementation.quote(&quote_request).await?;

		tracing::debug!(
			quote_id = %truncate_id(&quote.id),
			price = %quote.price,
			expires_in_ms = quote.millis_to_expire(),
			"Fetched quote"
		);
		Ok(quote)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use buy_types::{
		AssetInfo, BuyOrderDraft, CurrencyPair, FiatValue, PaymentMethodType,
		RecurringBuyFrequency, SelectedPaymentMethod, ValidationError,
	};
	use rust_decimal::Decimal;
	use std::sync::Mutex;

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
			Ok(())
		}
	}

	#[derive(Default)]
	struct RecordingPricing {
		requests: Mutex<Vec<QuoteRequest>>,
	}

	#[async_trait]
	impl PricingInterface for RecordingPricing {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		async fn quote(&self, request: &QuoteRequest) -> Result<Quote, PricingError> {
			self.requests.lock().unwrap().push(request.clone());
			Ok(Quote {
				id: "quote-1".into(),
				pair: request.pair.clone(),
				price: Decimal::ONE,
				fee: Decimal::ZERO,
				created_at: chrono::Utc::now(),
				expires_in_millis: 30_000,
			})
		}
	}

	fn request(payment_method: SelectedPaymentMethod) -> BuyRequest {
		BuyRequest::from_selection(
			Some(AssetInfo::new("BTC", 8)),
			Some(payment_method),
			&BuyOrderDraft::with_amount(FiatValue::from_minor("USD", 10_000)),
			RecurringBuyFrequency::OneTime,
		)
		.unwrap()
	}

	fn service(pricing: Arc<RecordingPricing>) -> PricingService {
		let mut implementations: HashMap<String, Arc<dyn PricingInterface>> = HashMap::new();
		implementations.insert("recording".into(), pricing);
		PricingService::new(implementations, "recording".into()).unwrap()
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let result = PricingService::new(HashMap::new(), "missing".into());
		assert!(matches!(result, Err(PricingError::Configuration(_))));
	}

	#[tokio::test]
	async fn test_google_pay_quoted_as_card_without_id() {
		let pricing = Arc::new(RecordingPricing::default());
		let service = service(pricing.clone());

		let google_pay = SelectedPaymentMethod::new("gpay-token", PaymentMethodType::GooglePay);
		service.quote_for_buy(&request(google_pay)).await.unwrap();

		let sent = pricing.requests.lock().unwrap()[0].clone();
		assert_eq!(sent.payment_method_type, PaymentMethodType::PaymentCard);
		assert_eq!(sent.payment_method_id, None);
		assert_eq!(sent.pair, CurrencyPair::new("USD", "BTC"));
		assert_eq!(sent.amount.minor_units, 10_000);
		assert_eq!(sent.product, Product::Buy);
	}

	#[tokio::test]
	async fn test_card_id_forwarded() {
		let pricing = Arc::new(RecordingPricing::default());
		let service = service(pricing.clone());

		let card = SelectedPaymentMethod::new("card-42", PaymentMethodType::PaymentCard);
		service.quote_for_buy(&request(card)).await.unwrap();

		let sent = pricing.requests.lock().unwrap()[0].clone();
		assert_eq!(sent.payment_method_id.as_deref(), Some("card-42"));
	}
}
