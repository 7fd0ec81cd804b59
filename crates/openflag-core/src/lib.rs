//! Lifecycle orchestration and flag evaluation.
//!
//! The [`Orchestrator`] owns the active provider, the evaluation context and
//! the provider status. It installs providers and reconciles context changes
//! as cancellable background tasks, republishes provider events as status
//! transitions, and hands out [`Client`]s that evaluate flags against
//! whatever provider is current.

pub mod client;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod factory;
pub mod hooks;
pub mod lifecycle;
pub mod memory;
pub mod noop;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::Client;
pub use engine::{Orchestrator, OrchestratorBuilder};
pub use error::CoreError;
pub use event_bus::EventBus;
pub use factory::{create_provider, provider_from_config};
pub use lifecycle::{status_for_event, StatusFlow, StatusStream};
pub use memory::InMemoryProvider;
pub use noop::NoOpProvider;
pub use registry::{OperationKind, OperationRegistry};
