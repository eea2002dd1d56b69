//! Lifecycle controller for pending buy orders.
//!
//! A controller runs at most one pipeline at a time. Each pipeline cancels the
//! order it supersedes, fetches a quote and creates a new pending order, then
//! optionally repeats whenever the quote expires. Starting a new pipeline or
//! stopping the controller aborts the running one; a generation counter kept
//! with the session state makes sure an aborted pipeline can neither publish
//! nor overwrite the tracked order.

mod pipeline;

use crate::{BuyOutcome, ControllerError, RefreshFlag, RefreshScheduler};
use buy_config::ControllerConfig;
use buy_order::OrderService;
use buy_pricing::PricingService;
use buy_types::{
	AssetInfo, BuyOrderDraft, BuyRequest, RecurringBuyFrequency, SelectedPaymentMethod,
};
use parking_lot::Mutex;
use pipeline::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

const OUTCOME_CHANNEL_CAPACITY: usize = 16;
const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

/// Timing knobs of the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
	/// Minimum spacing between published outcomes.
	pub heartbeat: Duration,
	/// Lower bound for the wait between refresh cycles.
	pub min_refresh_interval: Duration,
}

impl Default for ControllerSettings {
	fn default() -> Self {
		Self {
			heartbeat: Duration::from_secs(1),
			min_refresh_interval: Duration::from_secs(1),
		}
	}
}

impl ControllerSettings {
	/// Raises a zero heartbeat to the smallest usable period.
	fn checked(self) -> Self {
		if self.heartbeat >= MIN_HEARTBEAT {
			return self;
		}
		tracing::warn!(
			heartbeat_ms = self.heartbeat.as_millis() as u64,
			"Heartbeat too short, using {}ms",
			MIN_HEARTBEAT.as_millis()
		);
		Self {
			heartbeat: MIN_HEARTBEAT,
			..self
		}
	}
}

impl From<&ControllerConfig> for ControllerSettings {
	fn from(config: &ControllerConfig) -> Self {
		Self {
			heartbeat: Duration::from_millis(config.heartbeat_millis),
			min_refresh_interval: Duration::from_millis(config.min_refresh_interval_millis),
		}
	}
}

#[derive(Debug, Default)]
struct Session {
	/// Bumped whenever the running pipeline is torn down.
	generation: u64,
	/// Most recently published pending order.
	pending_order_id: Option<String>,
}

type SharedSession = Arc<Mutex<Session>>;

pub struct BuyOrderController {
	pricing: Arc<PricingService>,
	orders: Arc<OrderService>,
	refresh_flag: Arc<dyn RefreshFlag>,
	settings: ControllerSettings,
	session: SharedSession,
	outcomes: broadcast::Sender<BuyOutcome>,
	active: Mutex<Option<JoinHandle<()>>>,
}

impl BuyOrderController {
	pub fn new(
		pricing: Arc<PricingService>,
		orders: Arc<OrderService>,
		refresh_flag: Arc<dyn RefreshFlag>,
		settings: ControllerSettings,
	) -> Self {
		let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
		Self {
			pricing,
			orders,
			refresh_flag,
			settings: settings.checked(),
			session: Arc::new(Mutex::new(Session::default())),
			outcomes,
			active: Mutex::new(None),
		}
	}

	/// Starts a new pipeline for the given selection, replacing any running one.
	///
	/// The selection is validated before anything else happens: an incomplete
	/// selection returns [`ControllerError::InvalidRequest`] and leaves a
	/// running pipeline untouched. Otherwise the running pipeline is aborted
	/// without cancelling its remote order, and a new one is spawned on the
	/// current tokio runtime. It first cancels the tracked pending order, or
	/// `previous_order_id` when nothing is tracked.
	///
	/// Must be called from within a tokio runtime.
	pub fn start_or_refresh(
		&self,
		previous_order_id: Option<&str>,
		asset: Option<AssetInfo>,
		payment_method: Option<SelectedPaymentMethod>,
		order: &BuyOrderDraft,
		recurring_frequency: RecurringBuyFrequency,
	) -> Result<(), ControllerError> {
		let request = BuyRequest::from_selection(asset, payment_method, order, recurring_frequency)?;

		let mut active = self.active.lock();
		if let Some(handle) = active.take() {
			handle.abort();
		}

		let (generation, cancel_target) = {
			let mut session = self.session.lock();
			session.generation += 1;
			let target = session
				.pending_order_id
				.clone()
				.or_else(|| previous_order_id.map(str::to_string));
			(session.generation, target)
		};

		let refresh_enabled = self.refresh_flag.is_refresh_enabled();
		tracing::info!(
			generation,
			pair = %request.pair(),
			amount = %request.amount,
			cancel_target = ?cancel_target,
			refresh = refresh_enabled,
			"Starting buy pipeline"
		);

		let pipeline = Pipeline {
			generation,
			request,
			cancel_target,
			scheduler: RefreshScheduler::new(refresh_enabled, self.settings.min_refresh_interval),
			heartbeat: self.settings.heartbeat,
			pricing: self.pricing.clone(),
			orders: self.orders.clone(),
			session: self.session.clone(),
			outcomes: self.outcomes.clone(),
		};
		*active = Some(tokio::spawn(pipeline.run()));

		Ok(())
	}

	/// Tears down the running pipeline. With `reset_session` the tracked
	/// pending order is forgotten as well, so the next start cancels nothing
	/// unless given an explicit id.
	pub fn stop(&self, reset_session: bool) {
		if let Some(handle) = self.active.lock().take() {
			handle.abort();
		}

		let mut session = self.session.lock();
		session.generation += 1;
		if reset_session {
			session.pending_order_id = None;
		}
		tracing::debug!(generation = session.generation, reset_session, "Stopped buy pipeline");
	}

	/// Receiver for every outcome published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<BuyOutcome> {
		self.outcomes.subscribe()
	}

	/// Outcomes as a stream; outcomes missed by a lagging consumer are skipped.
	pub fn outcomes(&self) -> impl Stream<Item = BuyOutcome> + Send + 'static {
		BroadcastStream::new(self.subscribe()).filter_map(|item| match item {
			Ok(outcome) => Some(outcome),
			Err(BroadcastStreamRecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Outcome subscriber lagged");
				None
			},
		})
	}

	/// The order the next pipeline will cancel, if any.
	pub fn pending_order_id(&self) -> Option<String> {
		self.session.lock().pending_order_id.clone()
	}

	pub fn order_service(&self) -> &Arc<OrderService> {
		&self.orders
	}
}

impl Drop for BuyOrderController {
	fn drop(&mut self) {
		if let Some(handle) = self.active.get_mut().take() {
			handle.abort();
		}
	}
}
