//! Asset and fiat value types.
//!
//! Crypto assets are identified by their network ticker, fiat amounts are kept
//! as integer minor units so that order requests never carry rounding noise.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of minor-unit digits for fiat currencies.
pub const DEFAULT_FIAT_DECIMALS: u32 = 2;

/// A crypto asset that can be bought.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetInfo {
	/// Ticker used by the backend (e.g., "BTC", "USDC.MATIC").
	pub network_ticker: String,
	/// Ticker shown to the user.
	pub display_ticker: String,
	/// Number of decimal places of the smallest unit.
	pub precision: u32,
}

impl AssetInfo {
	pub fn new(network_ticker: impl Into<String>, precision: u32) -> Self {
		let network_ticker = network_ticker.into();
		Self {
			display_ticker: network_ticker.clone(),
			network_ticker,
			precision,
		}
	}
}

/// A fiat amount in integer minor units (cents for USD).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiatValue {
	/// ISO currency code.
	pub currency: String,
	/// Amount in minor units.
	pub minor_units: u64,
	/// Number of minor-unit digits.
	#[serde(default = "default_decimals")]
	pub decimals: u32,
}

fn default_decimals() -> u32 {
	DEFAULT_FIAT_DECIMALS
}

impl FiatValue {
	/// Creates a value from minor units using the default two decimals.
	pub fn from_minor(currency: impl Into<String>, minor_units: u64) -> Self {
		Self {
			currency: currency.into(),
			minor_units,
			decimals: DEFAULT_FIAT_DECIMALS,
		}
	}

	/// Creates a value from a major-unit decimal amount.
	///
	/// Returns `None` for negative amounts, amounts with more precision than
	/// the currency supports, or amounts that overflow.
	pub fn from_major(currency: impl Into<String>, major: Decimal) -> Option<Self> {
		if major.is_sign_negative() {
			return None;
		}
		let scaled = major.checked_mul(Decimal::from(10u64.checked_pow(DEFAULT_FIAT_DECIMALS)?))?;
		if scaled.fract() != Decimal::ZERO {
			return None;
		}
		Some(Self::from_minor(currency, scaled.to_u64()?))
	}

	/// Returns the amount in major units.
	pub fn to_major(&self) -> Decimal {
		Decimal::from_i128_with_scale(self.minor_units as i128, self.decimals)
	}

	/// Integer minor-unit string as expected by order requests.
	pub fn minor_units_string(&self) -> String {
		self.minor_units.to_string()
	}

	pub fn is_zero(&self) -> bool {
		self.minor_units == 0
	}
}

impl fmt::Display for FiatValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.to_major(), self.currency)
	}
}

/// A trading pair from a source currency into a destination asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
	pub source: String,
	pub destination: String,
}

impl CurrencyPair {
	pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			destination: destination.into(),
		}
	}

	/// Pair used when buying `asset` with `amount`.
	pub fn buy(amount: &FiatValue, asset: &AssetInfo) -> Self {
		Self::new(amount.currency.clone(), asset.network_ticker.clone())
	}

	/// Returns the backend pair string, `SOURCE-DESTINATION`.
	pub fn raw_value(&self) -> String {
		format!("{}-{}", self.source, self.destination)
	}
}

impl fmt::Display for CurrencyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw_value())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_fiat_from_major() {
		let value = FiatValue::from_major("USD", Decimal::from_str("100").unwrap()).unwrap();
		assert_eq!(value.minor_units, 10_000);
		assert_eq!(value.minor_units_string(), "10000");
		assert_eq!(value.to_major(), Decimal::from_str("100.00").unwrap());
	}

	#[test]
	fn test_fiat_from_major_rejects_sub_cent() {
		assert!(FiatValue::from_major("USD", Decimal::from_str("1.005").unwrap()).is_none());
		assert!(FiatValue::from_major("USD", Decimal::from_str("-1").unwrap()).is_none());
	}

	#[test]
	fn test_buy_pair() {
		let amount = FiatValue::from_minor("EUR", 2500);
		let asset = AssetInfo::new("ETH", 18);
		assert_eq!(CurrencyPair::buy(&amount, &asset).raw_value(), "EUR-ETH");
	}
}
