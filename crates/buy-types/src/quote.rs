//! Price quote types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CurrencyPair, FiatValue, PaymentMethodType};

/// Purpose of a quote or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
	Buy,
	Sell,
	Swap,
}

impl Product {
	pub fn as_str(&self) -> &'static str {
		match self {
			Product::Buy => "BUY",
			Product::Sell => "SELL",
			Product::Swap => "SWAP",
		}
	}
}

impl fmt::Display for Product {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Request sent to a pricing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
	pub pair: CurrencyPair,
	pub amount: FiatValue,
	pub payment_method_type: PaymentMethodType,
	/// Absent when the payment method cannot be referenced by id.
	pub payment_method_id: Option<String>,
	pub product: Product,
}

/// A time-boxed price commitment used to create an order.
///
/// Quotes are immutable once issued; a refresh produces a new quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	pub id: String,
	pub pair: CurrencyPair,
	/// Price of one unit of the destination asset in the source currency.
	pub price: Decimal,
	/// Fee in the source currency.
	pub fee: Decimal,
	pub created_at: DateTime<Utc>,
	/// Countdown until the quote expires, as issued.
	pub expires_in_millis: u64,
}

impl Quote {
	/// Milliseconds until this quote expires.
	pub fn millis_to_expire(&self) -> u64 {
		self.expires_in_millis
	}

	pub fn seconds_to_expire(&self) -> u64 {
		self.expires_in_millis / 1000
	}

	/// Wall-clock expiry time.
	pub fn expires_at(&self) -> DateTime<Utc> {
		self.created_at + chrono::Duration::milliseconds(self.expires_in_millis as i64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expiry_countdown() {
		let created_at = Utc::now();
		let quote = Quote {
			id: "q-1".into(),
			pair: CurrencyPair::new("USD", "BTC"),
			price: Decimal::new(6_500_000, 2),
			fee: Decimal::ZERO,
			created_at,
			expires_in_millis: 30_500,
		};
		assert_eq!(quote.millis_to_expire(), 30_500);
		assert_eq!(quote.seconds_to_expire(), 30);
		assert_eq!(
			quote.expires_at() - created_at,
			chrono::Duration::milliseconds(30_500)
		);
	}
}
