// openflag-core/src/noop.rs

use async_trait::async_trait;
use openflag_types::{
	EvaluationContext, EvaluationResult, FeatureProvider, FlagResult, ProviderEvaluation,
	ProviderMetadata, Reason, Value,
};

pub const NOOP_PROVIDER_NAME: &str = "No-op Provider";

/// Provider installed when nothing else is: answers every flag with the
/// caller's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProvider;

impl NoOpProvider {
	fn default_of<T>(default_value: T) -> EvaluationResult<T> {
		Ok(ProviderEvaluation::new(default_value).with_reason(Reason::Default))
	}
}

#[async_trait]
impl FeatureProvider for NoOpProvider {
	fn metadata(&self) -> ProviderMetadata {
		ProviderMetadata::new(NOOP_PROVIDER_NAME)
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
		_flag_key: &str,
		default_value: bool,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<bool> {
		Self::default_of(default_value)
	}

	fn get_string_evaluation(
		&self,
		_flag_key: &str,
		default_value: String,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<String> {
		Self::default_of(default_value)
	}

	fn get_integer_evaluation(
		&self,
		_flag_key: &str,
		default_value: i64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<i64> {
		Self::default_of(default_value)
	}

	fn get_double_evaluation(
		&self,
		_flag_key: &str,
		default_value: f64,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<f64> {
		Self::default_of(default_value)
	}

	fn get_object_evaluation(
		&self,
		_flag_key: &str,
		default_value: Value,
		_context: Option<&EvaluationContext>,
	) -> EvaluationResult<Value> {
		Self::default_of(default_value)
	}
}
