//! Runtime switch for quote refreshing.

use std::sync::atomic::{AtomicBool, Ordering};

/// Decides whether a new pipeline keeps its quote fresh.
///
/// The controller reads the flag once when a pipeline starts.
pub trait RefreshFlag: Send + Sync {
	fn is_refresh_enabled(&self) -> bool;
}

/// Flag with a value fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct StaticFlag(pub bool);

impl RefreshFlag for StaticFlag {
	fn is_refresh_enabled(&self) -> bool {
		self.0
	}
}

/// Flag that can be flipped while the service runs.
#[derive(Debug, Default)]
pub struct SwitchableFlag {
	enabled: AtomicBool,
}

impl SwitchableFlag {
	pub fn new(enabled: bool) -> Self {
		Self {
			enabled: AtomicBool::new(enabled),
		}
	}

	pub fn set(&self, enabled: bool) {
		self.enabled.store(enabled, Ordering::Relaxed);
	}
}

impl RefreshFlag for SwitchableFlag {
	fn is_refresh_enabled(&self) -> bool {
		self.enabled.load(Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_switchable_flag() {
		let flag = SwitchableFlag::new(true);
		assert!(flag.is_refresh_enabled());
		flag.set(false);
		assert!(!flag.is_refresh_enabled());
		assert!(!StaticFlag(false).is_refresh_enabled());
	}
}
