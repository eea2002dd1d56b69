//! Dynamic factory registry for buy flow implementations.
//!
//! Every implementation crate exports its factories through
//! `get_all_implementations()`; this module collects them once and picks the
//! ones named in the configuration.

use buy_cache::CacheFactory;
use buy_config::Config;
use buy_core::{BuyFlow, ControllerBuilder, ControllerFactories};
use buy_order::CustodialFactory;
use buy_pricing::PricingFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub pricing: HashMap<String, PricingFactory>,
	pub custodial: HashMap<String, CustodialFactory>,
	pub cache: HashMap<String, CacheFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			pricing: HashMap::new(),
			custodial: HashMap::new(),
			cache: HashMap::new(),
		}
	}

	pub fn register_pricing(&mut self, name: impl Into<String>, factory: PricingFactory) {
		self.pricing.insert(name.into(), factory);
	}

	pub fn register_custodial(&mut self, name: impl Into<String>, factory: CustodialFactory) {
		self.custodial.insert(name.into(), factory);
	}

	pub fn register_cache(&mut self, name: impl Into<String>, factory: CacheFactory) {
		self.cache.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, registering every implementation on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in buy_pricing::get_all_implementations() {
			tracing::debug!("Registering pricing implementation: {}", name);
			registry.register_pricing(name, factory);
		}

		for (name, factory) in buy_order::get_all_implementations() {
			tracing::debug!("Registering custodial implementation: {}", name);
			registry.register_custodial(name, factory);
		}

		for (name, factory) in buy_cache::get_all_implementations() {
			tracing::debug!("Registering cache implementation: {}", name);
			registry.register_cache(name, factory);
		}

		registry
	})
}

/// Picks the factory for every implementation named in a config section.
///
/// Unknown names abort the build with the list of available ones.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the buy flow from configuration using the registered factories.
pub fn build_flow_from_config(config: Config) -> Result<BuyFlow, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let pricing_factories =
		build_factories!(registry, config.pricing.implementations, pricing, "pricing");
	let custodial_factories = build_factories!(
		registry,
		config.custodial.implementations,
		custodial,
		"custodial"
	);
	let cache_factories = build_factories!(registry, config.cache.implementations, cache, "cache");

	let factories = ControllerFactories {
		pricing_factories,
		custodial_factories,
		cache_factories,
	};

	Ok(ControllerBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	const CONFIG: &str = r#"
[service]
id = "registry-test"

[pricing]
primary = "mock"
[pricing.implementations.mock]

[custodial]
primary = "mock"
[custodial.implementations.mock]
"#;

	#[test]
	fn test_registry_contains_builtin_implementations() {
		let registry = get_registry();
		assert!(registry.pricing.contains_key("mock"));
		assert!(registry.custodial.contains_key("mock"));
		assert!(registry.cache.contains_key("memory"));
	}

	#[tokio::test]
	async fn test_build_flow_from_config() {
		let config = Config::from_str(CONFIG).unwrap();
		let flow = build_flow_from_config(config).unwrap();
		assert_eq!(flow.controller.pending_order_id(), None);
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config = Config::from_str(&CONFIG.replace(
			"primary = \"mock\"\n[pricing.implementations.mock]",
			"primary = \"oracle\"\n[pricing.implementations.oracle]",
		))
		.unwrap();

		let err = build_flow_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown pricing implementation 'oracle'. Available: [mock]"
		);
	}
}
