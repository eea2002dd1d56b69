//! Payment method types.
//!
//! The quoting and order APIs accept only a subset of the payment methods a
//! user can pick. Wallet-provided card payments (Google Pay) are quoted and
//! ordered as plain card payments without a payment method id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment method id the client uses for a Google Pay selection.
pub const GOOGLE_PAY_PAYMENT_ID: &str = "GOOGLE_PAY_PAYMENT_ID";
/// Placeholder id for a card that has not been added yet.
pub const UNDEFINED_CARD_PAYMENT_ID: &str = "UNDEFINED_CARD_PAYMENT_ID";
/// Placeholder id for a bank transfer that has not been linked yet.
pub const UNDEFINED_BANK_TRANSFER_PAYMENT_ID: &str = "UNDEFINED_BANK_TRANSFER_PAYMENT_ID";
/// Placeholder id for a bank account that has not been linked yet.
pub const UNDEFINED_BANK_ACCOUNT_ID: &str = "UNDEFINED_BANK_ACCOUNT_ID";

/// Kind of payment method funding an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
	PaymentCard,
	BankTransfer,
	BankAccount,
	Funds,
	GooglePay,
	Unknown,
}

impl PaymentMethodType {
	/// Wire name of the payment method type.
	pub fn as_str(&self) -> &'static str {
		match self {
			PaymentMethodType::PaymentCard => "PAYMENT_CARD",
			PaymentMethodType::BankTransfer => "BANK_TRANSFER",
			PaymentMethodType::BankAccount => "BANK_ACCOUNT",
			PaymentMethodType::Funds => "FUNDS",
			PaymentMethodType::GooglePay => "GOOGLE_PAY",
			PaymentMethodType::Unknown => "UNKNOWN",
		}
	}

	/// Closest type the quoting and order APIs accept.
	pub fn for_quoting(self) -> Self {
		match self {
			PaymentMethodType::GooglePay => PaymentMethodType::PaymentCard,
			other => other,
		}
	}
}

impl fmt::Display for PaymentMethodType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for PaymentMethodType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"PAYMENT_CARD" | "CARD" => Ok(PaymentMethodType::PaymentCard),
			"BANK_TRANSFER" => Ok(PaymentMethodType::BankTransfer),
			"BANK_ACCOUNT" => Ok(PaymentMethodType::BankAccount),
			"FUNDS" => Ok(PaymentMethodType::Funds),
			"GOOGLE_PAY" => Ok(PaymentMethodType::GooglePay),
			other => Err(format!("Unknown payment method type: {}", other)),
		}
	}
}

/// The payment method picked by the user for the current flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPaymentMethod {
	pub id: String,
	pub payment_method_type: PaymentMethodType,
	#[serde(default)]
	pub label: Option<String>,
}

impl SelectedPaymentMethod {
	pub fn new(id: impl Into<String>, payment_method_type: PaymentMethodType) -> Self {
		Self {
			id: id.into(),
			payment_method_type,
			label: None,
		}
	}

	/// Returns the id of a real, already linked payment method.
	///
	/// Placeholder ids for methods the user has not added yet map to `None`.
	pub fn concrete_id(&self) -> Option<&str> {
		match self.id.as_str() {
			UNDEFINED_CARD_PAYMENT_ID | UNDEFINED_BANK_TRANSFER_PAYMENT_ID | UNDEFINED_BANK_ACCOUNT_ID => {
				None
			},
			"" => None,
			id => Some(id),
		}
	}

	/// Payment method as it must be sent to the quoting and order APIs.
	pub fn normalized(&self) -> NormalizedPaymentMethod {
		NormalizedPaymentMethod::new(self.concrete_id(), self.payment_method_type)
	}
}

/// Payment method type and id after API normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPaymentMethod {
	pub payment_method_type: PaymentMethodType,
	pub payment_method_id: Option<String>,
}

impl NormalizedPaymentMethod {
	/// Google Pay is sent as a card payment and its id is dropped.
	pub fn new(payment_method_id: Option<&str>, payment_method_type: PaymentMethodType) -> Self {
		let payment_method_id = if payment_method_type == PaymentMethodType::GooglePay
			|| payment_method_id == Some(GOOGLE_PAY_PAYMENT_ID)
		{
			None
		} else {
			payment_method_id.map(str::to_string)
		};

		Self {
			payment_method_type: payment_method_type.for_quoting(),
			payment_method_id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_google_pay_is_quoted_as_card_without_id() {
		let method = SelectedPaymentMethod::new("gpay-token-1", PaymentMethodType::GooglePay);
		let normalized = method.normalized();
		assert_eq!(normalized.payment_method_type, PaymentMethodType::PaymentCard);
		assert_eq!(normalized.payment_method_id, None);
	}

	#[test]
	fn test_google_pay_id_dropped_for_any_type() {
		let normalized =
			NormalizedPaymentMethod::new(Some(GOOGLE_PAY_PAYMENT_ID), PaymentMethodType::PaymentCard);
		assert_eq!(normalized.payment_method_type, PaymentMethodType::PaymentCard);
		assert!(normalized.payment_method_id.is_none());
	}

	#[test]
	fn test_card_passes_through() {
		let method = SelectedPaymentMethod::new("card-42", PaymentMethodType::PaymentCard);
		let normalized = method.normalized();
		assert_eq!(normalized.payment_method_type, PaymentMethodType::PaymentCard);
		assert_eq!(normalized.payment_method_id.as_deref(), Some("card-42"));
	}

	#[test]
	fn test_placeholder_id_is_not_concrete() {
		let method =
			SelectedPaymentMethod::new(UNDEFINED_CARD_PAYMENT_ID, PaymentMethodType::PaymentCard);
		assert_eq!(method.concrete_id(), None);
		assert_eq!(method.normalized().payment_method_id, None);
	}

	#[test]
	fn test_parse_type() {
		assert_eq!(
			"google_pay".parse::<PaymentMethodType>().unwrap(),
			PaymentMethodType::GooglePay
		);
		assert!("paypal".parse::<PaymentMethodType>().is_err());
	}
}
