//! Configuration module for the simple-buy flow.
//!
//! Configuration is read from a TOML file. `${VAR}` and `${VAR:-default}`
//! references are resolved from the environment before parsing, and the parsed
//! configuration is validated before it is handed to the builder.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Pricing service (quote source) implementations.
	pub pricing: PricingConfig,
	/// Custodial execution service implementations.
	pub custodial: CustodialConfig,
	/// Lifecycle controller timing.
	#[serde(default)]
	pub controller: ControllerConfig,
	/// Runtime flag seeds.
	#[serde(default)]
	pub flags: FlagsConfig,
	/// Timed cache backend and lifetimes.
	#[serde(default)]
	pub cache: CacheConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for pricing implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
	/// Which implementation to use for quoting.
	pub primary: String,
	/// Map of implementation names to their raw TOML configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for custodial execution implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustodialConfig {
	/// Which implementation creates and cancels orders.
	pub primary: String,
	/// Map of implementation names to their raw TOML configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Timing of the buy-order lifecycle controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
	/// Pacing gate: minimum spacing between two published outcomes.
	#[serde(default = "default_heartbeat_millis")]
	pub heartbeat_millis: u64,
	/// Lower bound for the quote refresh delay.
	#[serde(default = "default_min_refresh_interval_millis")]
	pub min_refresh_interval_millis: u64,
}

fn default_heartbeat_millis() -> u64 {
	1000
}

fn default_min_refresh_interval_millis() -> u64 {
	1000
}

impl Default for ControllerConfig {
	fn default() -> Self {
		Self {
			heartbeat_millis: default_heartbeat_millis(),
			min_refresh_interval_millis: default_min_refresh_interval_millis(),
		}
	}
}

/// Initial values of runtime flags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagsConfig {
	/// Whether quotes are refreshed until the user confirms.
	#[serde(default = "default_quote_refresh")]
	pub quote_refresh: bool,
}

fn default_quote_refresh() -> bool {
	true
}

impl Default for FlagsConfig {
	fn default() -> Self {
		Self {
			quote_refresh: default_quote_refresh(),
		}
	}
}

/// Configuration for the timed cache backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
	/// Which backend implementation to use.
	#[serde(default = "default_cache_primary")]
	pub primary: String,
	/// Map of backend names to their raw TOML configurations.
	#[serde(default = "default_cache_implementations")]
	pub implementations: HashMap<String, toml::Value>,
	/// Lifetime of cached order listings.
	#[serde(default = "default_orders_ttl_seconds")]
	pub orders_ttl_seconds: u64,
	/// Interval for purging expired entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cache_primary() -> String {
	"memory".to_string()
}

fn default_cache_implementations() -> HashMap<String, toml::Value> {
	HashMap::from([(
		default_cache_primary(),
		toml::Value::Table(toml::map::Map::new()),
	)])
}

fn default_orders_ttl_seconds() -> u64 {
	60
}

fn default_cleanup_interval_seconds() -> u64 {
	300
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			primary: default_cache_primary(),
			implementations: default_cache_implementations(),
			orders_ttl_seconds: default_orders_ttl_seconds(),
			cleanup_interval_seconds: default_cleanup_interval_seconds(),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME` and supports defaults
/// with `${VAR_NAME:-default_value}`. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		tracing::debug!(path = %path.display(), "Read configuration file");
		content.parse()
	}

	/// Validates cross-section constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		validate_primary("pricing", &self.pricing.primary, &self.pricing.implementations)?;
		validate_primary(
			"custodial",
			&self.custodial.primary,
			&self.custodial.implementations,
		)?;
		validate_primary("cache", &self.cache.primary, &self.cache.implementations)?;

		if self.controller.heartbeat_millis == 0 {
			return Err(ConfigError::Validation(
				"controller.heartbeat_millis must be greater than 0".into(),
			));
		}
		if self.controller.heartbeat_millis > 60_000 {
			return Err(ConfigError::Validation(
				"controller.heartbeat_millis cannot exceed 60000".into(),
			));
		}
		if self.controller.min_refresh_interval_millis < self.controller.heartbeat_millis {
			return Err(ConfigError::Validation(
				"controller.min_refresh_interval_millis cannot be below controller.heartbeat_millis"
					.into(),
			));
		}

		if self.cache.orders_ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"cache.orders_ttl_seconds must be greater than 0".into(),
			));
		}
		if self.cache.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"cache.cleanup_interval_seconds must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses, resolves environment variables and validates a TOML string.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[service]
id = "simplebuy-test"

[pricing]
primary = "mock"
[pricing.implementations.mock]
quote_ttl_seconds = 30

[custodial]
primary = "mock"
[custodial.implementations.mock]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("BUY_TEST_HOST", "localhost");
		std::env::set_var("BUY_TEST_PORT", "8080");

		let input = "host = \"${BUY_TEST_HOST}:${BUY_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:8080\"");

		std::env::remove_var("BUY_TEST_HOST");
		std::env::remove_var("BUY_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${BUY_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${BUY_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("BUY_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "simplebuy-test");
		assert_eq!(config.controller.heartbeat_millis, 1000);
		assert_eq!(config.controller.min_refresh_interval_millis, 1000);
		assert!(config.flags.quote_refresh);
		assert_eq!(config.cache.primary, "memory");
		assert!(config.cache.implementations.contains_key("memory"));
		assert_eq!(config.cache.orders_ttl_seconds, 60);
	}

	#[test]
	fn test_flag_from_env() {
		std::env::set_var("BUY_TEST_QUOTE_REFRESH", "false");
		let config_str = format!(
			"{}\n[flags]\nquote_refresh = ${{BUY_TEST_QUOTE_REFRESH:-true}}\n",
			MINIMAL
		);
		let config: Config = config_str.parse().unwrap();
		assert!(!config.flags.quote_refresh);
		std::env::remove_var("BUY_TEST_QUOTE_REFRESH");
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = MINIMAL.replace("[pricing]\nprimary = \"mock\"", "[pricing]\nprimary = \"live\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary pricing 'live' not found in implementations"));
	}

	#[test]
	fn test_zero_heartbeat_rejected() {
		let config_str = format!("{}\n[controller]\nheartbeat_millis = 0\n", MINIMAL);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("heartbeat_millis"));
	}

	#[test]
	fn test_refresh_interval_below_heartbeat_rejected() {
		let config_str = format!(
			"{}\n[controller]\nheartbeat_millis = 2000\nmin_refresh_interval_millis = 0\n",
			MINIMAL
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("min_refresh_interval_millis"));

		let config_str = format!(
			"{}\n[controller]\nheartbeat_millis = 2000\nmin_refresh_interval_millis = 2000\n",
			MINIMAL
		);
		assert!(Config::from_str(&config_str).is_ok());
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = MINIMAL.replace("id = \"simplebuy-test\"", "id = \"  \"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Service ID cannot be empty"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, MINIMAL).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.pricing.primary, "mock");
		assert_eq!(config.custodial.primary, "mock");
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let err = Config::from_file("/nonexistent/simplebuy.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
