//! Recurring buy frequencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a buy repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringBuyFrequency {
	#[default]
	OneTime,
	Daily,
	Weekly,
	BiWeekly,
	Monthly,
	Unknown,
}

impl RecurringBuyFrequency {
	pub fn as_str(&self) -> &'static str {
		match self {
			RecurringBuyFrequency::OneTime => "ONE_TIME",
			RecurringBuyFrequency::Daily => "DAILY",
			RecurringBuyFrequency::Weekly => "WEEKLY",
			RecurringBuyFrequency::BiWeekly => "BI_WEEKLY",
			RecurringBuyFrequency::Monthly => "MONTHLY",
			RecurringBuyFrequency::Unknown => "UNKNOWN",
		}
	}

	/// Frequency to attach to an order, `None` for a one-time buy.
	pub fn as_period(self) -> Option<Self> {
		match self {
			RecurringBuyFrequency::OneTime => None,
			other => Some(other),
		}
	}
}

impl fmt::Display for RecurringBuyFrequency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for RecurringBuyFrequency {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().replace('-', "_").as_str() {
			"ONE_TIME" => Ok(RecurringBuyFrequency::OneTime),
			"DAILY" => Ok(RecurringBuyFrequency::Daily),
			"WEEKLY" => Ok(RecurringBuyFrequency::Weekly),
			"BI_WEEKLY" => Ok(RecurringBuyFrequency::BiWeekly),
			"MONTHLY" => Ok(RecurringBuyFrequency::Monthly),
			"UNKNOWN" => Ok(RecurringBuyFrequency::Unknown),
			other => Err(format!("Unknown recurring frequency: {}", other)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_only_one_time_has_no_period() {
		assert_eq!(RecurringBuyFrequency::OneTime.as_period(), None);
		assert_eq!(
			RecurringBuyFrequency::Unknown.as_period(),
			Some(RecurringBuyFrequency::Unknown)
		);
		assert_eq!(
			RecurringBuyFrequency::BiWeekly.as_period(),
			Some(RecurringBuyFrequency::BiWeekly)
		);
	}

	#[test]
	fn test_parse() {
		assert_eq!(
			"bi-weekly".parse::<RecurringBuyFrequency>().unwrap(),
			RecurringBuyFrequency::BiWeekly
		);
	}
}
