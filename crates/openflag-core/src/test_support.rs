//! Scriptable provider and stream helpers for tests.

use crate::lifecycle::StatusStream;
use async_trait::async_trait;
use futures::StreamExt;
use openflag_types::{
	EvaluationContext, EvaluationResult, FeatureProvider, FlagError, FlagResult, Hook,
	ProviderEvaluation, ProviderEvent, ProviderEventStream, ProviderMetadata, Reason, Status,
	TrackingEventDetails, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Provider whose lifecycle timing and outcomes are set by the test.
pub struct TestProvider {
	name: String,
	init_delay: Duration,
	init_result: FlagResult<()>,
	context_delay: Duration,
	context_result: FlagResult<()>,
	evaluation: Option<ProviderEvaluation<bool>>,
	hooks: Vec<Arc<dyn Hook>>,
	events: broadcast::Sender<ProviderEvent>,
	pub init_started: AtomicUsize,
	pub init_completed: AtomicUsize,
	pub context_calls: AtomicUsize,
	pub shutdowns: AtomicUsize,
	pub evaluations: AtomicUsize,
	pub last_context: Mutex<Option<EvaluationContext>>,
	pub tracked: Mutex<Vec<(String, Option<EvaluationContext>)>>,
}

impl TestProvider {
	pub fn new(name: &str) -> Self {
		let (events, _) = broadcast::channel(16);
		Self {
			name: name.to_string(),
			init_delay: Duration::ZERO,
			init_result: Ok(()),
			context_delay: Duration::ZERO,
			context_result: Ok(()),
			evaluation: None,
			hooks: Vec::new(),
			events,
			init_started: AtomicUsize::new(0),
			init_completed: AtomicUsize::new(0),
			context_calls: AtomicUsize::new(0),
			shutdowns: AtomicUsize::new(0),
			evaluations: AtomicUsize::new(0),
			last_context: Mutex::new(None),
			tracked: Mutex::new(Vec::new()),
		}
	}

	pub fn init_delay(mut self, delay: Duration) -> Self {
		self.init_delay = delay;
		self
	}

	pub fn init_error(mut self, error: FlagError) -> Self {
		self.init_result = Err(error);
		self
	}

	pub fn context_delay(mut self, delay: Duration) -> Self {
		self.context_delay = delay;
		self
	}

	pub fn context_error(mut self, error: FlagError) -> Self {
		self.context_result = Err(error);
		self
	}

	/// Boolean evaluation returned for every flag. Without one, every flag
	/// is reported as missing.
	pub fn answering(mut self, evaluation: ProviderEvaluation<bool>) -> Self {
		self.evaluation = Some(evaluation);
		self
	}

	pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
		self.hooks.push(hook);
		self
	}

	pub fn shared(self) -> Arc<Self> {
		Arc::new(self)
	}

	pub fn emit(&self, event: ProviderEvent) {
		let _ = self.events.send(event);
	}

	pub fn count(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl FeatureProvider for TestProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(&self.name)
	}

	fn hooks(&self) -> Vec<Arc<dyn Hook>> {
		self.hooks.clone()
	}

	async fn initialize(&self, _context: Option<&EvaluationContext>) -> FlagResult<()> {
		self.init_started.fetch_add(1, Ordering::SeqCst);
		if !self.init_delay.is_zero() {
			tokio::time::sleep(self.init_delay).await;
		}
		self.init_completed.fetch_add(1, Ordering::SeqCst);
		self.init_result.clone()
	}

	fn shutdown(&self) {
		self.shutdowns.fetch_add(1, Ordering::SeqCst);
	}

	async fn on_context_set(
		&self,
		_old_context: Option<&EvaluationContext>,
		_new_context: &EvaluationContext,
	) -> FlagResult<()> {
		self.context_calls.fetch_add(1, Ordering::SeqCst);
		if !self.context_delay.is_zero() {
			tokio::time::sleep(self.context_delay).await;
		}
		self.context_result.clone()
	}

	fn get_boolean_evaluation(
		&self,
		flag_key: &str,
		_default_value: bool,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<bool> {
		self.evaluations.fetch_add(1, Ordering::SeqCst);
		*self.last_context.lock().unwrap() = context.cloned();
		self.evaluation
			.clone()
			.ok_or_else(|| FlagError::FlagNotFound(flag_key.to_string()))
	}

	fn get_string_evaluation(
		&self,
		_flag_key: &str,
		default_value: String,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<String> {
		self.evaluations.fetch_add(1, Ordering::SeqCst);
		Ok(ProviderEvaluation::new(default_value).with_reason(Reason::Default))
	}

	fn get_integer_evaluation(
		&self,
		flag_key: &str,
		_default_value: i64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64> {
		Err(FlagError::FlagNotFound(flag_key.to_string()))
	}

	fn get_double_evaluation(
		&self,
		flag_key: &str,
		_default_value: f64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64> {
		Err(FlagError::FlagNotFound(flag_key.to_string()))
	}

	fn get_object_evaluation(
		&self,
		flag_key: &str,
		_default_value: Value,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value> {
		Err(FlagError::FlagNotFound(flag_key.to_string()))
	}

	fn track(
		&self,
		event_name: &str,
		context: Option<&EvaluationContext>,
		_details: Option<&TrackingEventDetails>,
	) {
		self.tracked
			.lock()
			.unwrap()
			.push((event_name.to_string(), context.cloned()));
	}

	fn observe(&self) -> ProviderEventStream {
		BroadcastStream::new(self.events.subscribe())
			.filter_map(|item| async move { item.ok() })
			.boxed()
	}
}

/// Collects statuses until the stream has been quiet for a moment.
pub async fn drain(stream: &mut StatusStream) -> Vec<Status> {
	let mut seen = Vec::new();
	while let Ok(Some(status)) = tokio::time::timeout(Duration::from_millis(10), stream.next()).await
	{
		seen.push(status);
	}
	seen
}

/// Collects provider events until the stream has been quiet for a moment.
pub async fn drain_events(stream: &mut ProviderEventStream) -> Vec<ProviderEvent> {
	let mut seen = Vec::new();
	while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(10), stream.next()).await
	{
		seen.push(event);
	}
	seen
}
