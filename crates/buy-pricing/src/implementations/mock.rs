//! Mock pricing implementation for testing and development.
//!
//! Prices are read from configuration per destination asset, with a fallback
//! for unlisted assets. Each quote gets a random id and the configured
//! lifetime.

use crate::{PricingError, PricingFactory, PricingInterface, PricingRegistry};
use async_trait::async_trait;
use buy_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Quote, QuoteRequest, Schema,
	ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Configuration for the mock pricing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockPricingConfig {
	/// Lifetime of issued quotes.
	#[serde(default = "default_quote_ttl_seconds")]
	pub quote_ttl_seconds: u64,
	/// Asset ticker -> price in the source currency.
	#[serde(default)]
	pub prices: HashMap<String, Decimal>,
	#[serde(default = "default_fallback_price")]
	pub fallback_price: Decimal,
	/// Flat fee added to every quote.
	#[serde(default)]
	pub fee: Decimal,
	/// Makes every quote request fail, for exercising error paths.
	#[serde(default)]
	pub fail_quotes: bool,
}

fn default_quote_ttl_seconds() -> u64 {
	30
}

fn default_fallback_price() -> Decimal {
	Decimal::ONE
}

impl Default for MockPricingConfig {
	fn default() -> Self {
		Self {
			quote_ttl_seconds: default_quote_ttl_seconds(),
			prices: HashMap::new(),
			fallback_price: default_fallback_price(),
			fee: Decimal::ZERO,
			fail_quotes: false,
		}
	}
}

/// Configuration schema for the mock pricing service.
pub struct MockPricingSchema;

fn decimal_string(value: &toml::Value) -> Result<(), String> {
	let raw = value.as_str().ok_or("expected a decimal string")?;
	Decimal::from_str(raw)
		.map(|_| ())
		.map_err(|e| format!("'{}' is not a decimal: {}", raw, e))
}

impl ConfigSchema for MockPricingSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"quote_ttl_seconds",
					FieldType::Integer {
						min: Some(0),
						max: Some(3600),
					},
				),
				Field::new("prices", FieldType::Map(Box::new(FieldType::String))).with_validator(
					|value| match value.as_table() {
						Some(table) => table.values().try_for_each(decimal_string),
						None => Ok(()),
					},
				),
				Field::new("fallback_price", FieldType::String).with_validator(decimal_string),
				Field::new("fee", FieldType::String).with_validator(decimal_string),
				Field::new("fail_quotes", FieldType::Boolean),
			],
		);
		schema.validate(config)
	}
}

/// Mock pricing service.
pub struct MockPricing {
	config: MockPricingConfig,
}

impl MockPricing {
	pub fn new(config: MockPricingConfig) -> Self {
		Self { config }
	}

	fn price_for(&self, asset: &str) -> Decimal {
		self.config
			.prices
			.get(asset)
			.copied()
			.unwrap_or(self.config.fallback_price)
	}
}

#[async_trait]
impl PricingInterface for MockPricing {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockPricingSchema)
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<Quote, PricingError> {
		if self.config.fail_quotes {
			return Err(PricingError::Unavailable(format!(
				"No quotes for {}",
				request.pair
			)));
		}
		if request.amount.is_zero() {
			return Err(PricingError::Validation(
				"Amount must be greater than zero".to_string(),
			));
		}

		Ok(Quote {
			id: uuid::Uuid::new_v4().to_string(),
			pair: request.pair.clone(),
			price: self.price_for(&request.pair.destination),
			fee: self.config.fee,
			created_at: chrono::Utc::now(),
			expires_in_millis: self.config.quote_ttl_seconds * 1000,
		})
	}
}

/// Factory function to create a mock pricing service from configuration.
pub fn create_pricing(config: &toml::Value) -> Result<Box<dyn PricingInterface>, PricingError> {
	MockPricingSchema
		.validate(config)
		.map_err(|e| PricingError::Configuration(format!("Invalid mock config: {}", e)))?;

	let mock_config: MockPricingConfig = config
		.clone()
		.try_into()
		.map_err(|e| PricingError::Configuration(format!("Invalid mock config: {}", e)))?;

	Ok(Box::new(MockPricing::new(mock_config)))
}

/// Registry for the mock pricing implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = PricingFactory;

	fn factory() -> Self::Factory {
		create_pricing
	}
}

impl PricingRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use buy_types::{CurrencyPair, FiatValue, PaymentMethodType, Product};

	fn quote_request(minor_units: u64) -> QuoteRequest {
		QuoteRequest {
			pair: CurrencyPair::new("USD", "BTC"),
			amount: FiatValue::from_minor("USD", minor_units),
			payment_method_type: PaymentMethodType::PaymentCard,
			payment_method_id: None,
			product: Product::Buy,
		}
	}

	#[tokio::test]
	async fn test_configured_price_and_ttl() {
		let config: toml::Value = toml::from_str(
			r#"
quote_ttl_seconds = 15
fee = "1.50"
[prices]
BTC = "65000.00"
"#,
		)
		.unwrap();
		let pricing = create_pricing(&config).unwrap();

		let first = pricing.quote(&quote_request(10_000)).await.unwrap();
		let second = pricing.quote(&quote_request(10_000)).await.unwrap();

		assert_eq!(first.price, Decimal::new(6_500_000, 2));
		assert_eq!(first.fee, Decimal::new(150, 2));
		assert_eq!(first.millis_to_expire(), 15_000);
		assert_ne!(first.id, second.id);
	}

	#[tokio::test]
	async fn test_fallback_price() {
		let pricing = MockPricing::new(MockPricingConfig::default());
		let quote = pricing.quote(&quote_request(500)).await.unwrap();
		assert_eq!(quote.price, Decimal::ONE);
		assert_eq!(quote.seconds_to_expire(), 30);
	}

	#[tokio::test]
	async fn test_failure_modes() {
		let pricing = MockPricing::new(MockPricingConfig::default());
		assert!(matches!(
			pricing.quote(&quote_request(0)).await,
			Err(PricingError::Validation(_))
		));

		let failing = MockPricing::new(MockPricingConfig {
			fail_quotes: true,
			..Default::default()
		});
		assert!(matches!(
			failing.quote(&quote_request(100)).await,
			Err(PricingError::Unavailable(_))
		));
	}

	#[test]
	fn test_invalid_price_rejected() {
		let config: toml::Value = toml::from_str(
			r#"
[prices]
BTC = "lots"
"#,
		)
		.unwrap();
		assert!(matches!(
			create_pricing(&config),
			Err(PricingError::Configuration(_))
		));
	}
}
