//! Main entry point for the simple-buy service.
//!
//! Runs one buy flow session: it creates a pending order for the selection
//! given on the command line, keeps its quote fresh for a while, logs every
//! outcome, and finally abandons the flow and prints the order history.

use buy_config::Config;
use buy_core::{BuyFlow, BuyOutcome};
use buy_types::{
	truncate_id, AssetInfo, BuyOrderDraft, FiatValue, OrdersFilter, PaymentMethodType,
	RecurringBuyFrequency, SelectedPaymentMethod,
};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio_stream::StreamExt;

mod factory_registry;

/// Command-line arguments for the simple-buy service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Network ticker of the asset to buy
	#[arg(long, default_value = "BTC")]
	asset: String,

	/// Decimal places of the asset
	#[arg(long, default_value_t = 8)]
	asset_precision: u32,

	/// Amount to spend, in major units of the fiat currency
	#[arg(long, default_value = "100.00")]
	amount: String,

	/// Fiat currency to pay with
	#[arg(long, default_value = "USD")]
	currency: String,

	/// Payment method type (PAYMENT_CARD, BANK_TRANSFER, FUNDS, GOOGLE_PAY, ...)
	#[arg(long, default_value = "PAYMENT_CARD")]
	payment_type: String,

	/// Id of a linked payment method
	#[arg(long)]
	payment_method_id: Option<String>,

	/// Recurring frequency (ONE_TIME, DAILY, WEEKLY, BI_WEEKLY, MONTHLY)
	#[arg(long, default_value = "ONE_TIME")]
	recurring: String,

	/// Pending order left over from an earlier session, cancelled first
	#[arg(long)]
	previous_order_id: Option<String>,

	/// How long to keep the order fresh before abandoning the flow
	#[arg(long, default_value_t = 90)]
	run_seconds: u64,
}

/// Buy selection parsed from the command line.
#[derive(Debug)]
struct Selection {
	asset: AssetInfo,
	payment_method: SelectedPaymentMethod,
	order: BuyOrderDraft,
	recurring_frequency: RecurringBuyFrequency,
}

impl Selection {
	fn from_args(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
		let major = Decimal::from_str(&args.amount)
			.map_err(|e| format!("Invalid amount '{}': {}", args.amount, e))?;
		let amount = FiatValue::from_major(args.currency.to_uppercase(), major)
			.ok_or_else(|| format!("Amount '{}' is not a valid fiat value", args.amount))?;
		let payment_type = PaymentMethodType::from_str(&args.payment_type)?;
		let recurring_frequency = RecurringBuyFrequency::from_str(&args.recurring)?;

		Ok(Self {
			asset: AssetInfo::new(args.asset.to_uppercase(), args.asset_precision),
			payment_method: SelectedPaymentMethod::new(
				args.payment_method_id.clone().unwrap_or_default(),
				payment_type,
			),
			order: BuyOrderDraft::with_amount(amount),
			recurring_frequency,
		})
	}
}

/// Main entry point for the simple-buy service.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started simplebuy");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let selection = Selection::from_args(&args)?;
	let flow = factory_registry::build_flow_from_config(config.clone())?;

	let cleanup = buy_cache::spawn_cleanup(
		flow.cache.clone(),
		Duration::from_secs(config.cache.cleanup_interval_seconds),
	);

	run_session(
		&flow,
		selection,
		args.previous_order_id.as_deref(),
		Duration::from_secs(args.run_seconds),
	)
	.await?;

	cleanup.abort();
	tracing::info!("Stopped simplebuy");
	Ok(())
}

/// Drives one flow until it fails, the time is up, or the user interrupts.
async fn run_session(
	flow: &BuyFlow,
	selection: Selection,
	previous_order_id: Option<&str>,
	run_for: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
	let controller = &flow.controller;
	let mut outcomes = Box::pin(controller.outcomes());

	tracing::info!(
		asset = %selection.asset.display_ticker,
		amount = %selection.order.amount.as_ref().map(ToString::to_string).unwrap_or_default(),
		payment_type = %selection.payment_method.payment_method_type,
		recurring = %selection.recurring_frequency,
		"Starting buy flow"
	);
	controller.start_or_refresh(
		previous_order_id,
		Some(selection.asset),
		Some(selection.payment_method),
		&selection.order,
		selection.recurring_frequency,
	)?;

	let deadline = tokio::time::sleep(run_for);
	tokio::pin!(deadline);

	loop {
		tokio::select! {
			Some(outcome) = outcomes.next() => match outcome {
				BuyOutcome::Success(result) => {
					tracing::info!(
						order_id = %truncate_id(&result.order.id),
						quote_id = %truncate_id(&result.quote.id),
						price = %result.quote.price,
						fee = %result.quote.fee,
						expires_in_secs = result.quote.seconds_to_expire(),
						"Order ready for confirmation"
					);
				},
				BuyOutcome::Failure(error) => {
					tracing::error!(error = %error, "Buy flow failed");
					break;
				},
			},
			_ = &mut deadline => {
				tracing::info!("Session time is up");
				break;
			},
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Interrupted");
				break;
			},
		}
	}

	// Abandoning the flow leaves the last order pending on the custodial side.
	let abandoned = controller.pending_order_id();
	controller.stop(true);
	if let Err(e) = controller.order_service().cancel_order(abandoned.as_deref()).await {
		tracing::warn!(error = %e, "Failed to cancel abandoned order");
	}

	flow.orders_cache.invalidate().await?;
	let orders = flow.orders_cache.orders(&OrdersFilter::buys()).await?;
	for order in &orders {
		tracing::info!(
			order_id = %truncate_id(&order.id),
			pair = %order.pair,
			amount = %order.fiat,
			status = %order.status,
			"Order history"
		);
	}

	Ok(())
}
