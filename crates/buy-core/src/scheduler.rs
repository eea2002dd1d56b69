//! Refresh timing for pending orders.
//!
//! An order is only worth keeping while its quote is valid, so the next
//! refresh cycle starts once the latest quote has run out. The wait is
//! recomputed from every new quote and never drops below a floor, which keeps
//! a service issuing already-expired quotes from driving a tight loop.

use buy_types::OrderAndQuote;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
	enabled: bool,
	min_interval: Duration,
}

impl RefreshScheduler {
	pub fn new(enabled: bool, min_interval: Duration) -> Self {
		Self {
			enabled,
			min_interval,
		}
	}

	/// Time to wait after publishing `latest` before the next cycle, or `None`
	/// when the pipeline should end.
	pub fn next_delay(&self, latest: &OrderAndQuote) -> Option<Duration> {
		if !self.enabled {
			return None;
		}
		let until_expiry = Duration::from_millis(latest.quote.millis_to_expire());
		Some(until_expiry.max(self.min_interval))
	}
}
