//! Builds providers from configuration.

use crate::memory::InMemoryProvider;
use crate::noop::NoOpProvider;
use openflag_config::{OpenFlagConfig, ProviderConfig, ProviderKind};
use openflag_multi::MultiProvider;
use openflag_types::FeatureProvider;
use std::sync::Arc;
use tracing::info;

/// Create a provider from a single `[[providers]]` entry
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn FeatureProvider> {
	match config.kind {
		ProviderKind::InMemory => Arc::new(InMemoryProvider::from_config(config)),
		ProviderKind::NoOp => Arc::new(NoOpProvider),
	}
}

/// The provider described by the whole configuration.
///
/// No providers yields the no-op provider, one yields that provider, and
/// several are combined into a multi-provider using the configured strategy.
pub fn provider_from_config(config: &OpenFlagConfig) -> Arc<dyn FeatureProvider> {
	let mut providers: Vec<_> = config.providers.iter().map(create_provider).collect();

	match providers.len() {
		0 => Arc::new(NoOpProvider),
		1 => providers.remove(0),
		n => {
			info!(
				"Combining {} providers with {} strategy",
				n, config.multi.strategy
			);
			Arc::new(
				MultiProvider::new(providers, config.multi.strategy)
					.with_event_buffer(config.api.event_buffer),
			)
		}
	}
}
