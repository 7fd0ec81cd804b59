use async_trait::async_trait;
use openflag_types::{
	ErrorCode, EvaluationContext, EvaluationResult, FeatureProvider, FlagError, FlagResult,
	ProviderEvaluation, ProviderMetadata, Reason, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a scripted provider answers every boolean evaluation.
#[derive(Debug, Clone, Copy)]
pub enum Answer {
	/// Returns `Err(FlagNotFound)`.
	ThrowsNotFound,
	/// Returns a result coded `FLAG_NOT_FOUND`.
	NotFoundResult,
	/// Returns `Err(General)`.
	Throws,
	/// Returns a result coded `PARSE_ERROR`.
	ErrorResult,
	/// Returns the value.
	Value(bool),
}

pub struct ScriptedProvider {
	name: String,
	answer: Answer,
	calls: AtomicUsize,
}

impl ScriptedProvider {
	pub fn new(name: &str, answer: Answer) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_string(),
			answer,
			calls: AtomicUsize::new(0),
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl FeatureProvider for ScriptedProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(&self.name)
	}

	async fn initialize(&self, _context: Option<&EvaluationContext>) -> FlagResult<()> {
		Ok(())
	}

	fn shutdown(&self) {}

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
		self.calls.fetch_add(1, Ordering::SeqCst);
		match self.answer {
			Answer::ThrowsNotFound => Err(FlagError::FlagNotFound(flag_key.to_string())),
			Answer::NotFoundResult => Ok(ProviderEvaluation::new(default_value)
				.with_reason(Reason::Error)
				.with_error(ErrorCode::FlagNotFound, flag_key)),
			Answer::Throws => Err(FlagError::General(format!("{} exploded", self.name))),
			Answer::ErrorResult => Ok(ProviderEvaluation::new(default_value)
				.with_reason(Reason::Error)
				.with_error(ErrorCode::ParseError, "unreadable rule")),
			Answer::Value(value) => Ok(ProviderEvaluation::new(value)
				.with_variant(&self.name)
				.with_reason(Reason::Static)),
		}
	}

	fn get_string_evaluation(
		&self,
		_flag_key: &str,
		default_value: String,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<String> {
		Ok(ProviderEvaluation::new(default_value))
	}

	fn get_integer_evaluation(
		&self,
		_flag_key: &str,
		default_value: i64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64> {
		Ok(ProviderEvaluation::new(default_value))
	}

	fn get_double_evaluation(
		&self,
		_flag_key: &str,
		default_value: f64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64> {
		Ok(ProviderEvaluation::new(default_value))
	}

	fn get_object_evaluation(
		&self,
		_flag_key: &str,
		default_value: Value,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value> {
		Ok(ProviderEvaluation::new(default_value))
	}
}

pub fn as_providers(providers: &[&Arc<ScriptedProvider>]) -> Vec<Arc<dyn FeatureProvider>> {
	providers
		.iter()
		.map(|p| Arc::clone(*p) as Arc<dyn FeatureProvider>)
		.collect()
}

pub fn boolean_evaluation(
	provider: &dyn FeatureProvider,
	flag_key: &str,
	default_value: bool,
	context: Option<&EvaluationContext>,
) -> EvaluationResult<bool> {
	provider.get_boolean_evaluation(flag_key, default_value, context)
}
