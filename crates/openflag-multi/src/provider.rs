// openflag-multi/src/provider.rs

use crate::aggregator::EventAggregator;
use async_trait::async_trait;
use futures::future::join_all;
use futures::StreamExt;
use openflag_strategies::{FirstMatchStrategy, Strategy};
use openflag_types::{
	EvaluationContext, EvaluationResult, FeatureProvider, FlagError, FlagResult, ProviderEvent,
	ProviderEventStream, ProviderMetadata, TrackingEventDetails, Value,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

pub const MULTI_PROVIDER_NAME: &str = "multiprovider";

const DEFAULT_EVENT_BUFFER: usize = 64;

/// A provider made of several providers.
pub struct MultiProvider<S = FirstMatchStrategy> {
	providers: Vec<Arc<dyn FeatureProvider>>,
	strategy: S,
	aggregator: Arc<EventAggregator>,
	listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl MultiProvider<FirstMatchStrategy> {
	/// Multi-provider using the first-match strategy.
	pub fn first_match(providers: Vec<Arc<dyn FeatureProvider>>) -> Self {
		Self::new(providers, FirstMatchStrategy)
	}
}

impl<S: Strategy> MultiProvider<S> {
	/// Keeps the first provider of each name; later duplicates are dropped.
	pub fn new(providers: Vec<Arc<dyn FeatureProvider>>, strategy: S) -> Self {
		let mut seen = HashSet::new();
		let mut unique = Vec::with_capacity(providers.len());

		for provider in providers {
			let name = provider.metadata().name;
			if seen.insert(name.clone()) {
				unique.push(provider);
			} else {
				warn!("Dropping duplicate provider {}", name);
			}
		}

		Self {
			providers: unique,
			strategy,
			aggregator: Arc::new(EventAggregator::new(DEFAULT_EVENT_BUFFER)),
			listeners: Mutex::new(Vec::new()),
		}
	}

	/// Capacity of the merged event channel.
	pub fn with_event_buffer(mut self, capacity: usize) -> Self {
		self.aggregator = Arc::new(EventAggregator::new(capacity));
		self
	}

	pub fn providers(&self) -> &[Arc<dyn FeatureProvider>] {
		&self.providers
	}

	pub fn strategy(&self) -> &S {
		&self.strategy
	}

	pub fn child_metadata(&self) -> Vec<ProviderMetadata> {
		self.providers.iter().map(|p| p.metadata()).collect()
	}

	pub fn aggregator(&self) -> &EventAggregator {
		&self.aggregator
	}

	/// Starts one forwarding task per child unless they are already running.
	fn start_listeners(&self) {
		let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
		if !listeners.is_empty() {
			return;
		}

		for provider in &self.providers {
			let name = provider.metadata().name;
			let mut events = provider.observe();
			let aggregator = self.aggregator.clone();

			listeners.push(tokio::spawn(async move {
				while let Some(event) = events.next().await {
					aggregator.record(&name, event);
				}
				debug!("Event stream of provider {} ended", name);
			}));
		}
	}

	fn stop_listeners(&self) {
		let listeners = std::mem::take(
			&mut *self.listeners.lock().unwrap_or_else(PoisonError::into_inner),
		);
		for handle in listeners {
			handle.abort();
		}
	}
}

/// Fatal errors outrank everything; otherwise the first failure is kept.
fn most_severe(current: Option<FlagError>, candidate: FlagError) -> FlagError {
	match current {
		Some(existing) if existing.is_fatal() || !candidate.is_fatal() => existing,
		_ => candidate,
	}
}

#[async_trait]
impl<S: Strategy + 'static> FeatureProvider for MultiProvider<S> {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(MULTI_PROVIDER_NAME)
	}

	async fn initialize(&self, context: Option<&EvaluationContext>) -> FlagResult<()> {
		info!(
			"Initializing {} providers with {} strategy",
			self.providers.len(),
			self.strategy.name()
		);
		self.aggregator.reset();
		self.start_listeners();

		let results = join_all(self.providers.iter().map(|provider| async move {
			(provider.metadata().name, provider.initialize(context).await)
		}))
		.await;

		let mut failure = None;
		for (name, result) in results {
			if let Err(e) = result {
				error!("Provider {} failed to initialize: {}", name, e);
				self.aggregator.record(&name, ProviderEvent::Error(e.info()));
				failure = Some(most_severe(failure, e));
			}
		}

		match failure {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	fn shutdown(&self) {
		self.stop_listeners();
		for provider in &self.providers {
			debug!("Shutting down provider {}", provider.metadata().name);
			provider.shutdown();
		}
	}

	async fn on_context_set(
		&self,
		old_context: Option<&EvaluationContext>,
		new_context: &EvaluationContext,
	) -> FlagResult<()> {
		let results = join_all(self.providers.iter().map(|provider| async move {
			(
				provider.metadata().name,
				provider.on_context_set(old_context, new_context).await,
			)
		}))
		.await;

		let mut failure = None;
		for (name, result) in results {
			if let Err(e) = result {
				warn!("Provider {} failed to apply new context: {}", name, e);
				failure = Some(most_severe(failure, e));
			}
		}

		match failure {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	fn get_boolean_evaluation(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<bool> {
		self.strategy.evaluate(
			&self.providers,
			flag_key,
			default_value,
			context,
			|provider, key, default, ctx| provider.get_boolean_evaluation(key, default, ctx),
		)
	}

	fn get_string_evaluation(
		&self,
		flag_key: &str,
		default_value: String,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<String> {
		self.strategy.evaluate(
			&self.providers,
			flag_key,
			default_value,
			context,
			|provider, key, default, ctx| provider.get_string_evaluation(key, default, ctx),
		)
	}

	fn get_integer_evaluation(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64> {
		self.strategy.evaluate(
			&self.providers,
			flag_key,
			default_value,
			context,
			|provider, key, default, ctx| provider.get_integer_evaluation(key, default, ctx),
		)
	}

	fn get_double_evaluation(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64> {
		self.strategy.evaluate(
			&self.providers,
			flag_key,
			default_value,
			context,
			|provider, key, default, ctx| provider.get_double_evaluation(key, default, ctx),
		)
	}

	fn get_object_evaluation(
		&self,
		flag_key: &str,
		default_value: Value,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value> {
		self.strategy.evaluate(
			&self.providers,
			flag_key,
			default_value,
			context,
			|provider, key, default, ctx| provider.get_object_evaluation(key, default, ctx),
		)
	}

	fn track(
		&self,
		event_name: &str,
		context: Option<&EvaluationContext>,
		details: Option<&TrackingEventDetails>,
	) {
		for provider in &self.providers {
			provider.track(event_name, context, details);
		}
	}

	fn observe(&self) -> ProviderEventStream {
		BroadcastStream::new(self.aggregator.subscribe())
			.filter_map(|item| async move {
				match item {
					Ok(event) => Some(event),
					Err(BroadcastStreamRecvError::Lagged(skipped)) => {
						warn!("Multi-provider event subscriber lagged by {} events", skipped);
						None
					}
				}
			})
			.boxed()
	}
}

impl<S> Drop for MultiProvider<S> {
	fn drop(&mut self) {
		for handle in self
			.listeners
			.get_mut()
			.unwrap_or_else(PoisonError::into_inner)
			.drain(..)
		{
			handle.abort();
		}
	}
}
