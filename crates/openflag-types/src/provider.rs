// openflag-types/src/provider.rs

use crate::{EvaluationContext, EvaluationResult, FlagResult, Hook, ProviderEvent, Structure, Value};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stream of events emitted by a provider.
pub type ProviderEventStream = BoxStream<'static, ProviderEvent>;

/// Descriptive information about a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
	pub name: String,
}

impl ProviderMetadata {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}
}

/// Optional payload attached to a tracking event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingEventDetails {
	pub value: Option<f64>,
	#[serde(default)]
	pub attributes: Structure,
}

impl TrackingEventDetails {
	pub fn with_value(mut self, value: f64) -> Self {
		self.value = Some(value);
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}
}

/// Contract every flag backend satisfies.
///
/// Only `initialize` and `on_context_set` may suspend. Evaluation methods
/// are synchronous: a provider that needs I/O to answer must resolve it ahead
/// of time (typically during initialize or on context change).
#[async_trait]
pub trait FeatureProvider: Send + Sync {
	fn metadata(&self) -> ProviderMetadata;

	/// Hooks contributed by the provider; they run after all other hooks.
	fn hooks(&self) -> Vec<Arc<dyn Hook>> {
		Vec::new()
	}

	/// Prepare the provider for evaluation.
	async fn initialize(&self, context: Option<&EvaluationContext>) -> FlagResult<()>;

	/// Release resources. Must tolerate being called more than once.
	fn shutdown(&self);

	/// Adapt to a new evaluation context.
	async fn on_context_set(
		&self,
		old_context: Option<&EvaluationContext>,
		new_context: &EvaluationContext,
	) -> FlagResult<()>;

	fn get_boolean_evaluation(
		&self,
		flag_key: &str,
		default_value: bool,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<bool>;

	fn get_string_evaluation(
		&self,
		flag_key: &str,
		default_value: String,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<String>;

	fn get_integer_evaluation(
		&self,
		flag_key: &str,
		default_value: i64,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64>;

	fn get_double_evaluation(
		&self,
		flag_key: &str,
		default_value: f64,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64>;

	fn get_object_evaluation(
		&self,
		flag_key: &str,
		default_value: Value,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value>;

	fn track(
		&self,
		_event_name: &str,
		_context: Option<&EvaluationContext>,
		_details: Option<&TrackingEventDetails>,
	) {
	}

	/// Events describing the provider's health. Empty unless overridden.
	fn observe(&self) -> ProviderEventStream {
		Box::pin(futures::stream::empty())
	}
}
