//! Buy-order lifecycle controller for the simple-buy flow.
//!
//! The controller creates a custodial buy order against a fresh quote and,
//! while the user is looking at the confirmation screen, keeps replacing it
//! with a new order and quote whenever the quote expires. Results are
//! published as [`BuyOutcome`]s on a broadcast channel.

use buy_types::{InvalidRequest, OrderAndQuote};
use thiserror::Error;

pub mod builder;
pub mod controller;
pub mod flags;
pub mod scheduler;

pub use builder::{BuilderError, BuyFlow, ControllerBuilder, ControllerFactories};
pub use controller::{BuyOrderController, ControllerSettings};
pub use flags::{RefreshFlag, StaticFlag, SwitchableFlag};
pub use scheduler::RefreshScheduler;

/// Errors reported by the lifecycle controller.
///
/// `InvalidRequest` is returned directly by
/// [`BuyOrderController::start_or_refresh`]; the other variants end a running
/// pipeline and are published as [`BuyOutcome::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
	#[error("Invalid request: {0}")]
	InvalidRequest(#[from] InvalidRequest),
	#[error("Failed to cancel previous order: {0}")]
	CancellationFailed(String),
	#[error("Failed to fetch quote: {0}")]
	QuoteFetchFailed(String),
	#[error("Failed to create order: {0}")]
	OrderCreateFailed(String),
}

/// One result of a buy pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuyOutcome {
	Success(OrderAndQuote),
	Failure(ControllerError),
}

impl BuyOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, BuyOutcome::Success(_))
	}
}
