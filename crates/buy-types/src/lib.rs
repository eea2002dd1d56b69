//! Common types module for the simple-buy flow.
//!
//! This module defines the domain types shared by every crate in the workspace:
//! assets and fiat values, payment methods, quotes, custodial orders and the
//! order+quote pair published by the lifecycle controller.

/// Crypto assets, fiat values and currency pairs.
pub mod asset;
/// Custodial buy orders, order requests and selection validation.
pub mod order;
/// Payment method types and quoting normalisation.
pub mod payment;
/// Price quotes and quote requests.
pub mod quote;
/// Recurring buy frequencies.
pub mod recurring;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Utility functions for log formatting.
pub mod utils;
/// Configuration validation types for implementation sections.
pub mod validation;

pub use asset::*;
pub use order::*;
pub use payment::*;
pub use quote::*;
pub use recurring::*;
pub use registry::ImplementationRegistry;
pub use utils::truncate_id;
pub use validation::*;
