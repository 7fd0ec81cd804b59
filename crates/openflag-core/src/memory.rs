//! In-memory provider backed by a static flag table.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use openflag_config::{FlagConfig, ProviderConfig};
use openflag_types::{
	EvaluationContext, EvaluationResult, EventDetails, FeatureProvider, FlagError, FlagResult,
	ProviderEvaluation, ProviderEvent, ProviderEventStream, ProviderMetadata, Reason, Value,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

const EVENT_BUFFER: usize = 32;

/// Serves flags from a table that can be replaced at runtime.
///
/// Each flag resolves to its default variant, or to the caller's default
/// with `Reason::Disabled` when the flag is disabled.
pub struct InMemoryProvider {
	name: String,
	flags: DashMap<String, FlagConfig>,
	events: broadcast::Sender<ProviderEvent>,
}

impl InMemoryProvider {
	pub fn new<I>(name: impl Into<String>, flags: I) -> Self
	where
		I: IntoIterator<Item = (String, FlagConfig)>,
	{
		let (events, _) = broadcast::channel(EVENT_BUFFER);
		Self {
			name: name.into(),
			flags: flags.into_iter().collect(),
			events,
		}
	}

	pub fn from_config(config: &ProviderConfig) -> Self {
		Self::new(config.name.clone(), config.flags.clone())
	}

	pub fn flag_keys(&self) -> Vec<String> {
		let mut keys: Vec<_> = self.flags.iter().map(|entry| entry.key().clone()).collect();
		keys.sort();
		keys
	}

	/// Inserts or replaces flags and announces the changed keys.
	pub fn update_flags<I>(&self, flags: I)
	where
		I: IntoIterator<Item = (String, FlagConfig)>,
	{
		let mut changed = Vec::new();
		for (key, flag) in flags {
			let replaced = self.flags.insert(key.clone(), flag.clone());
			if replaced.as_ref() != Some(&flag) {
				changed.push(key);
			}
		}

		if changed.is_empty() {
			return;
		}
		debug!("Provider {} changed flags {:?}", self.name, changed);
		self.emit(ProviderEvent::ConfigurationChanged(EventDetails::flags_changed(
			changed,
		)));
	}

	/// Removes a flag, announcing it if it existed.
	pub fn remove_flag(&self, key: &str) -> bool {
		let removed = self.flags.remove(key).is_some();
		if removed {
			self.emit(ProviderEvent::ConfigurationChanged(EventDetails::flags_changed([
				key,
			])));
		}
		removed
	}

	/// Emits an event on this provider's stream.
	pub fn emit(&self, event: ProviderEvent) {
		let _ = self.events.send(event);
	}

	fn resolve<T>(
		&self,
		flag_key: &str,
		default_value: T,
		kind: &str,
		extract: impl FnOnce(&Value) -> Option<T>,
	) -> EvaluationResult<T> {
		let flag = self
			.flags
			.get(flag_key)
			.ok_or_else(|| FlagError::FlagNotFound(format!("Flag {} not found", flag_key)))?;

		if flag.disabled {
			return Ok(ProviderEvaluation::new(default_value).with_reason(Reason::Disabled));
		}

		let value = flag.default_value().ok_or_else(|| {
			FlagError::General(format!(
				"Flag {} has no variant named {}",
				flag_key, flag.default_variant
			))
		})?;

		let resolved = extract(value).ok_or_else(|| {
			FlagError::TypeMismatch(format!(
				"Flag {} is a {}, not a {}",
				flag_key,
				value.type_name(),
				kind
			))
		})?;

		Ok(ProviderEvaluation::new(resolved)
			.with_variant(flag.default_variant.clone())
			.with_reason(Reason::Static))
	}
}

#[async_trait]
impl FeatureProvider for InMemoryProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(&self.name)
	}

	async fn initialize(&self, _context: Option<&EvaluationContext>) -> FlagResult<()> {
		self.emit(ProviderEvent::Ready);
		Ok(())
	}

	fn shutdown(&self) {
		debug!("In-memory provider {} shut down", self.name);
	}

	async fn on_context_set(
		&self,
		_old_context: Option<&EvaluationContext>,
		_new_context: &EvaluationContext,
	) -> FlagResult<()> {
		Ok(())
	}

	fn get_boolean_evaluation(
		&self,
		flag_key: &str,
		default_value: bool,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<bool> {
		self.resolve(flag_key, default_value, "boolean", Value::as_bool)
	}

	fn get_string_evaluation(
		&self,
		flag_key: &str,
		default_value: String,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<String> {
		self.resolve(flag_key, default_value, "string", |v| {
			v.as_str().map(str::to_string)
		})
	}

	fn get_integer_evaluation(
		&self,
		flag_key: &str,
		default_value: i64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64> {
		self.resolve(flag_key, default_value, "integer", Value::as_i64)
	}

	fn get_double_evaluation(
		&self,
		flag_key: &str,
		default_value: f64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64> {
		self.resolve(flag_key, default_value, "double", Value::as_f64)
	}

	fn get_object_evaluation(
		&self,
		flag_key: &str,
		default_value: Value,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value> {
		self.resolve(flag_key, default_value, "object", |v| Some(v.clone()))
	}

	fn observe(&self) -> ProviderEventStream {
		BroadcastStream::new(self.events.subscribe())
			.filter_map(|item| async move { item.ok() })
			.boxed()
	}
}
