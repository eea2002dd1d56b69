//! The task behind one `start_or_refresh` call.

use super::SharedSession;
use crate::{BuyOutcome, ControllerError, RefreshScheduler};
use buy_order::OrderService;
use buy_pricing::PricingService;
use buy_types::{truncate_id, BuyRequest, OrderAndQuote};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::instrument;

pub(super) struct Pipeline {
	pub generation: u64,
	pub request: BuyRequest,
	pub cancel_target: Option<String>,
	pub scheduler: RefreshScheduler,
	pub heartbeat: Duration,
	pub pricing: Arc<PricingService>,
	pub orders: Arc<OrderService>,
	pub session: SharedSession,
	pub outcomes: broadcast::Sender<BuyOutcome>,
}

impl Pipeline {
	/// Runs cycles until one fails, refreshing is off, or the task is aborted.
	pub async fn run(self) {
		let mut pacing = interval_at(Instant::now() + self.heartbeat, self.heartbeat);
		pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

		let mut cancel_target = self.cancel_target.clone();
		let mut cycle = 1u64;

		loop {
			let result = match self.cycle(cycle, cancel_target.as_deref()).await {
				Ok(result) => result,
				Err(error) => {
					tracing::warn!(generation = self.generation, cycle, error = %error, "Buy pipeline failed");
					// A failed refresh still follows an emission of this pipeline.
					if cycle > 1 {
						pacing.tick().await;
					}
					self.publish(BuyOutcome::Failure(error));
					return;
				},
			};

			pacing.tick().await;

			let order_id = result.order.id.clone();
			let delay = self.scheduler.next_delay(&result);
			if !self.publish(BuyOutcome::Success(result)) {
				return;
			}

			let Some(delay) = delay else {
				tracing::debug!(generation = self.generation, "Quote refresh disabled, pipeline done");
				return;
			};

			tracing::debug!(
				order_id = %truncate_id(&order_id),
				delay_ms = delay.as_millis() as u64,
				"Scheduling quote refresh"
			);
			tokio::time::sleep(delay).await;

			cancel_target = Some(order_id);
			cycle += 1;
		}
	}

	/// Cancel the superseded order, fetch a quote, create the new order.
	#[instrument(skip_all, fields(generation = self.generation, cycle = cycle, pair = %self.request.pair()))]
	async fn cycle(
		&self,
		cycle: u64,
		cancel_target: Option<&str>,
	) -> Result<OrderAndQuote, ControllerError> {
		self.orders
			.cancel_order(cancel_target)
			.await
			.map_err(|e| ControllerError::CancellationFailed(e.to_string()))?;

		let quote = self
			.pricing
			.quote_for_buy(&self.request)
			.await
			.map_err(|e| ControllerError::QuoteFetchFailed(e.to_string()))?;

		self.orders
			.create_order(&self.request, quote)
			.await
			.map_err(|e| ControllerError::OrderCreateFailed(e.to_string()))
	}

	/// Publishes `outcome` unless this pipeline has been superseded.
	///
	/// A success also becomes the session's cancellation target. Returns
	/// whether the pipeline is still current.
	fn publish(&self, outcome: BuyOutcome) -> bool {
		let mut session = self.session.lock();
		if session.generation != self.generation {
			tracing::debug!(generation = self.generation, "Dropping outcome of superseded pipeline");
			return false;
		}

		if let BuyOutcome::Success(result) = &outcome {
			session.pending_order_id = Some(result.order.id.clone());
		}
		// No subscribers is not an error; the outcome is simply unobserved.
		self.outcomes.send(outcome).ok();
		true
	}
}
