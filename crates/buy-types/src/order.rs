//! Custodial buy order types.
//!
//! This module defines the caller-side order draft, the validated buy request
//! derived from it, the request submitted to the custodial execution service
//! and the orders it returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{
	AssetInfo, CurrencyPair, FiatValue, NormalizedPaymentMethod, PaymentMethodType, Product, Quote,
	RecurringBuyFrequency, SelectedPaymentMethod,
};

/// Initial state requested for newly created buy orders.
pub const ORDER_STATE_PENDING: &str = "pending";

/// Order parameters as entered by the user; the amount may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOrderDraft {
	pub amount: Option<FiatValue>,
}

impl BuyOrderDraft {
	pub fn with_amount(amount: FiatValue) -> Self {
		Self {
			amount: Some(amount),
		}
	}
}

/// Reasons a buy selection cannot be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
	#[error("Missing cryptocurrency")]
	MissingAsset,
	#[error("Missing amount")]
	MissingAmount,
	#[error("Missing selected payment method")]
	MissingPaymentMethod,
}

/// A complete buy selection: every part the pricing and order APIs need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyRequest {
	pub asset: AssetInfo,
	pub amount: FiatValue,
	pub payment_method: SelectedPaymentMethod,
	/// `None` for one-time buys.
	pub recurring_frequency: Option<RecurringBuyFrequency>,
}

impl BuyRequest {
	/// Validates a selection, failing on the first missing part.
	pub fn from_selection(
		asset: Option<AssetInfo>,
		payment_method: Option<SelectedPaymentMethod>,
		order: &BuyOrderDraft,
		recurring_frequency: RecurringBuyFrequency,
	) -> Result<Self, InvalidRequest> {
		let asset = asset.ok_or(InvalidRequest::MissingAsset)?;
		let amount = order.amount.clone().ok_or(InvalidRequest::MissingAmount)?;
		let payment_method = payment_method.ok_or(InvalidRequest::MissingPaymentMethod)?;

		Ok(Self {
			asset,
			amount,
			payment_method,
			recurring_frequency: recurring_frequency.as_period(),
		})
	}

	pub fn pair(&self) -> CurrencyPair {
		CurrencyPair::buy(&self.amount, &self.asset)
	}

	pub fn normalized_payment_method(&self) -> NormalizedPaymentMethod {
		self.payment_method.normalized()
	}
}

/// Status of a custodial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Created and awaiting confirmation; cancellable.
	Pending,
	Cancelled,
	Finished,
	Failed,
	Unknown,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Cancelled => "CANCELLED",
			OrderStatus::Finished => "FINISHED",
			OrderStatus::Failed => "FAILED",
			OrderStatus::Unknown => "UNKNOWN",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Input leg of a custodial order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInput {
	pub symbol: String,
	/// Integer amount in minor units.
	pub amount: String,
}

/// Output leg of a custodial order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutput {
	pub symbol: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
}

/// Order creation request submitted to the custodial execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodialOrderRequest {
	pub quote_id: String,
	/// `ASSET-FIAT` pair string.
	pub pair: String,
	pub action: String,
	pub input: OrderInput,
	pub output: OrderOutput,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_method_id: Option<String>,
	pub payment_type: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub period: Option<String>,
}

/// A custodial order as returned by the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOrder {
	pub id: String,
	pub pair: String,
	/// Network ticker of the asset being bought.
	pub asset: String,
	pub fiat: FiatValue,
	pub payment_method_type: PaymentMethodType,
	pub payment_method_id: Option<String>,
	pub recurring_frequency: Option<RecurringBuyFrequency>,
	pub status: OrderStatus,
	pub quote_id: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl BuyOrder {
	pub fn is_pending(&self) -> bool {
		self.status == OrderStatus::Pending
	}
}

/// An order paired with the quote that funded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAndQuote {
	pub order: BuyOrder,
	pub quote: Quote,
}

/// Filter for listing past custodial orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrdersFilter {
	pub product: Product,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
}

impl OrdersFilter {
	pub fn buys() -> Self {
		Self {
			product: Product::Buy,
			status: None,
		}
	}

	pub fn matches(&self, order: &BuyOrder) -> bool {
		self.status.is_none_or(|status| status == order.status)
	}
}
