//! Builder wiring a controller from configuration and factories.
//!
//! Every implementation listed in the configuration is created through its
//! registered factory (which validates its own section), the primary one is
//! selected, and the services, cache and controller are assembled around it.

use crate::{BuyOrderController, ControllerSettings, SwitchableFlag};
use buy_cache::{CacheError, CacheInterface, CacheService};
use buy_config::Config;
use buy_order::{CustodialInterface, OrderError, OrderService, OrdersCache};
use buy_pricing::{PricingError, PricingInterface, PricingService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while building a controller.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each pluggable component, keyed by implementation name.
pub struct ControllerFactories<PF, OF, CF> {
	pub pricing_factories: HashMap<String, PF>,
	pub custodial_factories: HashMap<String, OF>,
	pub cache_factories: HashMap<String, CF>,
}

/// A ready-to-run buy flow.
pub struct BuyFlow {
	pub controller: BuyOrderController,
	/// Seeded from `flags.quote_refresh`; flips affect the next pipeline.
	pub refresh_flag: Arc<SwitchableFlag>,
	pub cache: Arc<CacheService>,
	pub orders_cache: OrdersCache,
}

pub struct ControllerBuilder {
	config: Config,
}

/// Creates every configured implementation that has a factory.
fn load_implementations<T: ?Sized, E: Display, F>(
	component: &str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<HashMap<String, Box<T>>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if !loaded.contains_key(primary) {
		return Err(BuilderError::MissingComponent(format!(
			"Primary {} '{}' failed to load",
			component, primary
		)));
	}
	Ok(loaded)
}

impl ControllerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<PF, OF, CF>(
		self,
		factories: ControllerFactories<PF, OF, CF>,
	) -> Result<BuyFlow, BuilderError>
	where
		PF: Fn(&toml::Value) -> Result<Box<dyn PricingInterface>, PricingError>,
		OF: Fn(&toml::Value) -> Result<Box<dyn CustodialInterface>, OrderError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CacheInterface>, CacheError>,
	{
		let config = &self.config;

		let pricing_impls = load_implementations(
			"pricing",
			&config.pricing.primary,
			&config.pricing.implementations,
			&factories.pricing_factories,
		)?;
		let pricing = PricingService::new(
			pricing_impls
				.into_iter()
				.map(|(name, implementation)| (name, Arc::from(implementation)))
				.collect(),
			config.pricing.primary.clone(),
		)
		.map_err(|e| BuilderError::Config(e.to_string()))?;

		let custodial_impls = load_implementations(
			"custodial",
			&config.custodial.primary,
			&config.custodial.implementations,
			&factories.custodial_factories,
		)?;
		let orders = Arc::new(
			OrderService::new(
				custodial_impls
					.into_iter()
					.map(|(name, implementation)| (name, Arc::from(implementation)))
					.collect(),
				config.custodial.primary.clone(),
			)
			.map_err(|e| BuilderError::Config(e.to_string()))?,
		);

		let mut cache_impls = load_implementations(
			"cache",
			&config.cache.primary,
			&config.cache.implementations,
			&factories.cache_factories,
		)?;
		let cache_backend = cache_impls.remove(&config.cache.primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("Primary cache '{}'", config.cache.primary))
		})?;
		let cache = Arc::new(CacheService::new(cache_backend));

		let orders_cache = OrdersCache::new(
			cache.clone(),
			orders.clone(),
			Duration::from_secs(config.cache.orders_ttl_seconds),
		);

		let refresh_flag = Arc::new(SwitchableFlag::new(config.flags.quote_refresh));
		let controller = BuyOrderController::new(
			Arc::new(pricing),
			orders,
			refresh_flag.clone(),
			ControllerSettings::from(&config.controller),
		);

		tracing::info!(
			service_id = %config.service.id,
			pricing = %config.pricing.primary,
			custodial = %config.custodial.primary,
			quote_refresh = config.flags.quote_refresh,
			"Buy flow ready"
		);

		Ok(BuyFlow {
			controller,
			refresh_flag,
			cache,
			orders_cache,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{BuyOutcome, RefreshFlag};
	use buy_types::{
		AssetInfo, BuyOrderDraft, FiatValue, OrdersFilter, PaymentMethodType,
		RecurringBuyFrequency, SelectedPaymentMethod,
	};
	use std::str::FromStr;

	type PricingFactory = buy_pricing::PricingFactory;
	type CustodialFactory = buy_order::CustodialFactory;
	type CacheFactory = buy_cache::CacheFactory;

	fn factories() -> ControllerFactories<PricingFactory, CustodialFactory, CacheFactory> {
		ControllerFactories {
			pricing_factories: buy_pricing::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			custodial_factories: buy_order::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			cache_factories: buy_cache::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	const CONFIG: &str = r#"
[service]
id = "builder-test"

[pricing]
primary = "mock"
[pricing.implementations.mock]
quote_ttl_seconds = 10

[custodial]
primary = "mock"
[custodial.implementations.mock]

[flags]
quote_refresh = false
"#;

	#[tokio::test(start_paused = true)]
	async fn test_build_and_run_with_mocks() {
		let config = Config::from_str(CONFIG).unwrap();
		let flow = ControllerBuilder::new(config).build(factories()).unwrap();
		assert!(!flow.refresh_flag.is_refresh_enabled());

		let mut rx = flow.controller.subscribe();
		flow.controller
			.start_or_refresh(
				None,
				Some(AssetInfo::new("BTC", 8)),
				Some(SelectedPaymentMethod::new("card-1", PaymentMethodType::PaymentCard)),
				&BuyOrderDraft::with_amount(FiatValue::from_minor("USD", 5_000)),
				RecurringBuyFrequency::OneTime,
			)
			.unwrap();

		let result = match rx.recv().await.unwrap() {
			BuyOutcome::Success(result) => result,
			other => panic!("expected success, got {:?}", other),
		};
		assert_eq!(result.quote.millis_to_expire(), 10_000);

		let orders = flow.orders_cache.orders(&OrdersFilter::buys()).await.unwrap();
		assert_eq!(orders.len(), 1);
		assert_eq!(orders[0].id, result.order.id);
	}

	#[test]
	fn test_invalid_implementation_config_fails_build() {
		let config = Config::from_str(&CONFIG.replace(
			"quote_ttl_seconds = 10",
			"quote_ttl_seconds = \"ten\"",
		))
		.unwrap();
		let result = ControllerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[test]
	fn test_primary_without_factory_fails_build() {
		let config = Config::from_str(&CONFIG.replace(
			"primary = \"mock\"\n[pricing.implementations.mock]",
			"primary = \"remote\"\n[pricing.implementations.remote]",
		))
		.unwrap();
		let result = ControllerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}
}
