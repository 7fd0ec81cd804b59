//! Composition of several providers behind a single provider.
//!
//! [`MultiProvider`] deduplicates its children by name, initializes them
//! concurrently, forwards lifecycle calls to all of them, and lets a
//! [`Strategy`](openflag_strategies::Strategy) pick which child answers an
//! evaluation. The children's event streams are merged by an
//! [`EventAggregator`] that re-emits every configuration change and
//! publishes health events worst-first.

pub mod aggregator;
pub mod provider;

pub use aggregator::{precedence, EventAggregator};
pub use provider::{MultiProvider, MULTI_PROVIDER_NAME};
