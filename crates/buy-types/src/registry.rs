//! Registry trait for self-registering implementations.
//!
//! Every pluggable backend (pricing, custodial execution, cache) exposes a
//! `Registry` type implementing this trait so the service can look it up by the
//! name used in configuration.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "mock" for `pricing.implementations.mock`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
