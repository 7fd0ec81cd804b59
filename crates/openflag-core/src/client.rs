//! Typed flag evaluation on top of an [`Orchestrator`].

use crate::engine::{Orchestrator, Snapshot};
use crate::hooks::HookChain;
use openflag_types::{
	ClientMetadata, EvaluationContext, FlagError, FlagEvaluationDetails, FlagEvaluationOptions,
	FlagResult, FlagType, FlagValue, Hook, HookContext, HookHints, Status, TrackingEventDetails,
	Value,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace, warn};

/// Application-facing flag client.
///
/// Every evaluation reads the orchestrator's current provider, context and
/// status, so a client stays valid across provider swaps. Evaluations never
/// fail: errors come back as default-valued details carrying the error code.
pub struct Client {
	orchestrator: Orchestrator,
	metadata: ClientMetadata,
	hooks: RwLock<Vec<Arc<dyn Hook>>>,
}

impl Client {
	pub fn new(orchestrator: Orchestrator, domain: Option<String>) -> Self {
		Self {
			orchestrator,
			metadata: ClientMetadata { domain },
			hooks: RwLock::new(Vec::new()),
		}
	}

	pub fn metadata(&self) -> &ClientMetadata {
		&self.metadata
	}

	pub fn provider_status(&self) -> Status {
		self.orchestrator.status()
	}

	/// Hooks that run for every evaluation made through this client.
	pub fn add_hooks<I>(&self, hooks: I)
	where
		I: IntoIterator<Item = Arc<dyn Hook>>,
	{
		self.hooks
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.extend(hooks);
	}

	pub fn get_boolean_value(
		&self,
		flag_key: &str,
		default_value: bool,
		options: Option<&FlagEvaluationOptions>,
	) -> bool {
		self.evaluate(flag_key, default_value, options).value
	}

	pub fn get_boolean_details(
		&self,
		flag_key: &str,
		default_value: bool,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<bool> {
		self.evaluate(flag_key, default_value, options)
	}

	pub fn get_string_value(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		options: Option<&FlagEvaluationOptions>,
	) -> String {
		self.evaluate(flag_key, default_value.into(), options).value
	}

	pub fn get_string_details(
		&self,
		flag_key: &str,
		default_value: impl Into<String>,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<String> {
		self.evaluate(flag_key, default_value.into(), options)
	}

	pub fn get_integer_value(
		&self,
		flag_key: &str,
		default_value: i64,
		options: Option<&FlagEvaluationOptions>,
	) -> i64 {
		self.evaluate(flag_key, default_value, options).value
	}

	pub fn get_integer_details(
		&self,
		flag_key: &str,
		default_value: i64,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<i64> {
		self.evaluate(flag_key, default_value, options)
	}

	pub fn get_double_value(
		&self,
		flag_key: &str,
		default_value: f64,
		options: Option<&FlagEvaluationOptions>,
	) -> f64 {
		self.evaluate(flag_key, default_value, options).value
	}

	pub fn get_double_details(
		&self,
		flag_key: &str,
		default_value: f64,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<f64> {
		self.evaluate(flag_key, default_value, options)
	}

	pub fn get_object_value(
		&self,
		flag_key: &str,
		default_value: Value,
		options: Option<&FlagEvaluationOptions>,
	) -> Value {
		self.evaluate(flag_key, default_value, options).value
	}

	pub fn get_object_details(
		&self,
		flag_key: &str,
		default_value: Value,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<Value> {
		self.evaluate(flag_key, default_value, options)
	}

	/// Records a user action with the active provider.
	pub fn track(&self, event_name: &str, details: Option<&TrackingEventDetails>) {
		let snapshot = self.orchestrator.snapshot();
		if snapshot.status == Status::NotReady {
			debug!("Tracking {} while provider is not ready", event_name);
		}
		snapshot
			.provider
			.track(event_name, snapshot.context.as_ref(), details);
	}

	/// The evaluation pipeline shared by every typed getter.
	pub fn evaluate<T: FlagType>(
		&self,
		flag_key: &str,
		default_value: T,
		options: Option<&FlagEvaluationOptions>,
	) -> FlagEvaluationDetails<T> {
		let snapshot = self.orchestrator.snapshot();
		let api_hooks = self.orchestrator.hooks();
		let client_hooks = self
			.hooks
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();
		let invocation_hooks = options.map(|o| o.hooks.as_slice()).unwrap_or_default();
		let provider_hooks = snapshot.provider.hooks();
		let hooks = HookChain::collect(
			T::KIND,
			[
				api_hooks.as_slice(),
				client_hooks.as_slice(),
				invocation_hooks,
				provider_hooks.as_slice(),
			],
		);
		trace!("Evaluating {} with {} hooks", flag_key, hooks.len());
		let empty_hints = HookHints::new();
		let hints = options.map(|o| &o.hook_hints).unwrap_or(&empty_hints);

		let mut hook_context = HookContext {
			flag_key: flag_key.to_string(),
			flag_value_type: T::KIND,
			default_value: default_value.clone().into(),
			context: snapshot.context.clone().unwrap_or_default(),
			client_metadata: self.metadata.clone(),
			provider_metadata: snapshot.provider.metadata(),
		};

		let outcome = Self::run(
			&snapshot,
			&hooks,
			&mut hook_context,
			hints,
			default_value.clone(),
		);
		let details = match outcome {
			Ok(details) => details,
			Err(e) => {
				debug!("Evaluation of {} failed: {}", flag_key, e);
				hooks.error(&hook_context, &e, hints);
				FlagEvaluationDetails::error(flag_key, default_value, &e)
			}
		};

		hooks.finally_after(&hook_context, &details.clone().map(Into::into), hints);
		details
	}

	fn run<T: FlagType>(
		snapshot: &Snapshot,
		hooks: &HookChain,
		hook_context: &mut HookContext,
		hints: &HookHints,
		default_value: T,
	) -> FlagResult<FlagEvaluationDetails<T>> {
		match &snapshot.status {
			Status::NotReady => {
				return Err(FlagError::ProviderNotReady(
					"Provider is not ready".to_string(),
				))
			}
			Status::Fatal(info) => return Err(FlagError::ProviderFatal(info.message.clone())),
			_ => {}
		}

		hooks.before(hook_context, hints)?;

		let context: &EvaluationContext = &hook_context.context;
		let evaluation = T::resolve(
			snapshot.provider.as_ref(),
			&hook_context.flag_key,
			default_value,
			Some(context),
		)?;

		if let Some(code) = evaluation.error_code {
			let message = evaluation.error_message.unwrap_or_default();
			warn!(
				"Provider returned {} for flag {}: {}",
				code, hook_context.flag_key, message
			);
			return Err(FlagError::from_code(code, message));
		}

		let details =
			FlagEvaluationDetails::from_evaluation(hook_context.flag_key.clone(), evaluation);
		let erased: FlagEvaluationDetails<FlagValue> = details.clone().map(Into::into);
		hooks.after(hook_context, &erased, hints)?;

		Ok(details)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::InMemoryProvider;
	use crate::test_support::TestProvider;
	use openflag_config::FlagConfig;
	use openflag_types::{ErrorCode, FeatureProvider, FlagValueType, ProviderEvaluation, Reason};
	use std::sync::Mutex;
	use std::time::Duration;

	type Log = Arc<Mutex<Vec<String>>>;

	struct Recorder {
		label: &'static str,
		log: Log,
		only: Option<FlagValueType>,
		fail_before: bool,
		extra_context: Option<EvaluationContext>,
	}

	impl Recorder {
		fn new(label: &'static str, log: &Log) -> Self {
			Self {
				label,
				log: log.clone(),
				only: None,
				fail_before: false,
				extra_context: None,
			}
		}

		fn record(&self, stage: &str) {
			self.log
				.lock()
				.unwrap()
				.push(format!("{}:{}", self.label, stage));
		}

		fn shared(self) -> Arc<dyn Hook> {
			Arc::new(self)
		}
	}

	impl Hook for Recorder {
		fn supports(&self, kind: FlagValueType) -> bool {
			self.only.map_or(true, |only| only == kind)
		}

		fn before(
			&self,
			_ctx: &HookContext,
			_hints: &HookHints,
		) -> FlagResult<Option<EvaluationContext>> {
			self.record("before");
			if self.fail_before {
				return Err(FlagError::General("hook refused".into()));
			}
			Ok(self.extra_context.clone())
		}

		fn after(
			&self,
			_ctx: &HookContext,
			_details: &FlagEvaluationDetails<FlagValue>,
			_hints: &HookHints,
		) -> FlagResult<()> {
			self.record("after");
			Ok(())
		}

		fn error(&self, _ctx: &HookContext, _error: &FlagError, _hints: &HookHints) {
			self.record("error");
		}

		fn finally_after(
			&self,
			_ctx: &HookContext,
			_details: &FlagEvaluationDetails<FlagValue>,
			_hints: &HookHints,
		) {
			self.record("finally");
		}
	}

	fn entries(log: &Log) -> Vec<String> {
		log.lock().unwrap().clone()
	}

	async fn ready_with(provider: Arc<dyn FeatureProvider>) -> Orchestrator {
		let orchestrator = Orchestrator::new().unwrap();
		orchestrator
			.set_provider_and_wait(provider, None)
			.await
			.unwrap();
		orchestrator
	}

	#[tokio::test]
	async fn test_evaluates_through_active_provider() {
		let provider = InMemoryProvider::new(
			"local",
			[(
				"checkout".to_string(),
				FlagConfig::new("on").with_variant("on", true),
			)],
		);
		let orchestrator = ready_with(Arc::new(provider)).await;
		let client = orchestrator.client(Some("shop"));

		assert!(client.get_boolean_value("checkout", false, None));
		let details = client.get_boolean_details("checkout", false, None);
		assert_eq!(details.flag_key, "checkout");
		assert_eq!(details.variant.as_deref(), Some("on"));
		assert_eq!(details.reason, Some(Reason::Static));

		let mismatch = client.get_integer_details("checkout", 3, None);
		assert_eq!(mismatch.value, 3);
		assert_eq!(mismatch.error_code, Some(ErrorCode::TypeMismatch));
		assert_eq!(mismatch.reason, Some(Reason::Error));

		let missing = client.get_string_details("unknown", "fallback", None);
		assert_eq!(missing.value, "fallback");
		assert_eq!(missing.error_code, Some(ErrorCode::FlagNotFound));

		assert_eq!(client.metadata().domain.as_deref(), Some("shop"));
		assert_eq!(client.provider_status(), Status::Ready);
	}

	#[tokio::test(start_paused = true)]
	async fn test_not_ready_provider_is_not_called() {
		let orchestrator = Orchestrator::new().unwrap();
		let provider = TestProvider::new("slow")
			.init_delay(Duration::from_secs(5))
			.answering(ProviderEvaluation::new(true))
			.shared();
		orchestrator.set_provider(provider.clone(), None).unwrap();

		let details = orchestrator
			.client(None)
			.get_boolean_details("checkout", false, None);
		assert!(!details.value);
		assert_eq!(details.error_code, Some(ErrorCode::ProviderNotReady));
		assert_eq!(TestProvider::count(&provider.evaluations), 0);
	}

	#[tokio::test]
	async fn test_fatal_provider_is_not_called() {
		let provider = TestProvider::new("revoked")
			.init_error(FlagError::ProviderFatal("key revoked".into()))
			.answering(ProviderEvaluation::new(true))
			.shared();
		let orchestrator = ready_with(provider.clone()).await;

		let details = orchestrator
			.client(None)
			.get_boolean_details("checkout", false, None);
		assert_eq!(details.error_code, Some(ErrorCode::ProviderFatal));
		assert_eq!(details.error_message.as_deref(), Some("key revoked"));
		assert_eq!(TestProvider::count(&provider.evaluations), 0);
	}

	#[tokio::test]
	async fn test_hook_order() {
		let log = Log::default();
		let provider = TestProvider::new("p")
			.answering(ProviderEvaluation::new(true))
			.with_hook(Recorder::new("provider", &log).shared())
			.shared();
		let orchestrator = ready_with(provider).await;
		orchestrator.add_hooks([Recorder::new("api", &log).shared()]);

		let client = orchestrator.client(None);
		client.add_hooks([Recorder::new("client", &log).shared()]);
		let options =
			FlagEvaluationOptions::default().with_hook(Recorder::new("invocation", &log).shared());

		assert!(client.get_boolean_value("checkout", false, Some(&options)));
		assert_eq!(
			entries(&log),
			vec![
				"api:before",
				"client:before",
				"invocation:before",
				"provider:before",
				"provider:after",
				"invocation:after",
				"client:after",
				"api:after",
				"provider:finally",
				"invocation:finally",
				"client:finally",
				"api:finally",
			]
		);

		log.lock().unwrap().clear();
		orchestrator.clear_hooks();
		client.get_boolean_value("checkout", false, None);
		assert!(!entries(&log).iter().any(|e| e.starts_with("api:")));
	}

	#[tokio::test]
	async fn test_before_hook_context_is_merged() {
		let log = Log::default();
		let provider = TestProvider::new("p")
			.answering(ProviderEvaluation::new(true))
			.shared();
		let orchestrator = Orchestrator::new().unwrap();
		orchestrator
			.set_provider_and_wait(
				provider.clone(),
				Some(EvaluationContext::new("user-1").with_attribute("plan", "free")),
			)
			.await
			.unwrap();

		let mut hook = Recorder::new("enrich", &log);
		hook.extra_context = Some(
			EvaluationContext::default()
				.with_attribute("plan", "pro")
				.with_attribute("beta", true),
		);
		orchestrator.add_hooks([hook.shared()]);

		orchestrator
			.client(None)
			.get_boolean_value("checkout", false, None);

		let seen = provider.last_context.lock().unwrap().clone().unwrap();
		assert_eq!(seen.targeting_key(), "user-1");
		assert_eq!(seen.attribute("plan"), Some(&Value::from("pro")));
		assert_eq!(seen.attribute("beta"), Some(&Value::Boolean(true)));
	}

	#[tokio::test]
	async fn test_failing_before_hook_turns_into_error_result() {
		let log = Log::default();
		let provider = TestProvider::new("p")
			.answering(ProviderEvaluation::new(true))
			.shared();
		let orchestrator = ready_with(provider.clone()).await;

		let mut hook = Recorder::new("guard", &log);
		hook.fail_before = true;
		let options = FlagEvaluationOptions::default().with_hook(hook.shared());

		let details = orchestrator
			.client(None)
			.get_boolean_details("checkout", false, Some(&options));
		assert!(!details.value);
		assert_eq!(details.error_code, Some(ErrorCode::General));
		assert_eq!(entries(&log), vec!["guard:before", "guard:error", "guard:finally"]);
		assert_eq!(TestProvider::count(&provider.evaluations), 0);
	}

	#[tokio::test]
	async fn test_error_coded_result_is_reported_as_error() {
		let log = Log::default();
		let provider = TestProvider::new("p")
			.answering(ProviderEvaluation::new(true).with_error(ErrorCode::ParseError, "bad rule"))
			.shared();
		let orchestrator = ready_with(provider).await;
		orchestrator.add_hooks([Recorder::new("api", &log).shared()]);

		let details = orchestrator
			.client(None)
			.get_boolean_details("checkout", false, None);
		assert!(!details.value);
		assert_eq!(details.reason, Some(Reason::Error));
		assert_eq!(details.error_code, Some(ErrorCode::ParseError));
		assert_eq!(details.error_message.as_deref(), Some("bad rule"));
		assert_eq!(entries(&log), vec!["api:before", "api:error", "api:finally"]);
	}

	#[tokio::test]
	async fn test_hooks_filtered_by_flag_kind() {
		let log = Log::default();
		let orchestrator = ready_with(TestProvider::new("p").shared()).await;
		let mut hook = Recorder::new("booleans", &log);
		hook.only = Some(FlagValueType::Boolean);
		orchestrator.add_hooks([hook.shared()]);

		let value = orchestrator
			.client(None)
			.get_string_value("banner", "blue", None);
		assert_eq!(value, "blue");
		assert!(entries(&log).is_empty());
	}

	#[tokio::test]
	async fn test_track_forwards_current_context() {
		let provider = TestProvider::new("p").shared();
		let orchestrator = Orchestrator::new().unwrap();
		let context = EvaluationContext::new("user-9");
		orchestrator
			.set_provider_and_wait(provider.clone(), Some(context.clone()))
			.await
			.unwrap();

		let details = TrackingEventDetails::default().with_value(42.0);
		orchestrator
			.client(None)
			.track("checkout-completed", Some(&details));

		let tracked = provider.tracked.lock().unwrap().clone();
		assert_eq!(
			tracked,
			vec![("checkout-completed".to_string(), Some(context))]
		);
	}
}
