//! First-successful strategy.

use crate::{EvaluationFn, Strategy};
use openflag_types::{EvaluationContext, EvaluationResult, FeatureProvider, FlagError};
use std::sync::Arc;
use tracing::debug;

/// Returns the first answer that carries no error.
///
/// Errors of any kind, raised or error-coded, are skipped. When every
/// provider fails the evaluation fails with a general error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSuccessfulStrategy;

impl Strategy for FirstSuccessfulStrategy {
	fn name(&self) -> &'static str {
		"first_successful"
	}

	fn evaluate<T: Clone>(
		&self,
		providers: &[Arc<dyn FeatureProvider>],
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		evaluate: EvaluationFn<T>,
	) -> EvaluationResult<T> {
		for provider in providers {
			match evaluate(provider.as_ref(), flag_key, default_value.clone(), context) {
				Ok(evaluation) if !evaluation.is_error() => return Ok(evaluation),
				Ok(evaluation) => {
					debug!(
						"Provider {} returned {:?} for flag {}, trying next",
						provider.metadata().name,
						evaluation.error_code,
						flag_key
					);
				}
				Err(e) => {
					debug!(
						"Provider {} failed for flag {}: {}, trying next",
						provider.metadata().name,
						flag_key,
						e
					);
				}
			}
		}

		Err(FlagError::General(format!(
			"No provider returned a successful evaluation for flag {}",
			flag_key
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{as_providers, boolean_evaluation, Answer, ScriptedProvider};
	use openflag_types::ErrorCode;

	#[test]
	fn test_skips_every_kind_of_error() {
		let throws = ScriptedProvider::new("throws", Answer::Throws);
		let error_result = ScriptedProvider::new("error-result", Answer::ErrorResult);
		let success = ScriptedProvider::new("success", Answer::Value(true));
		let never_called = ScriptedProvider::new("never-called", Answer::Value(false));
		let providers = as_providers(&[&throws, &error_result, &success, &never_called]);

		let result = FirstSuccessfulStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap();

		assert!(result.value);
		assert_eq!(result.variant.as_deref(), Some("success"));
		assert_eq!(throws.calls(), 1);
		assert_eq!(error_result.calls(), 1);
		assert_eq!(success.calls(), 1);
		assert_eq!(never_called.calls(), 0);
	}

	#[test]
	fn test_not_found_is_skipped_too() {
		let missing = ScriptedProvider::new("missing", Answer::ThrowsNotFound);
		let success = ScriptedProvider::new("success", Answer::Value(true));
		let providers = as_providers(&[&missing, &success]);

		let result = FirstSuccessfulStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap();
		assert!(result.value);
	}

	#[test]
	fn test_all_failing_is_a_general_error() {
		let a = ScriptedProvider::new("a", Answer::Throws);
		let b = ScriptedProvider::new("b", Answer::ErrorResult);
		let providers = as_providers(&[&a, &b]);

		let err = FirstSuccessfulStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap_err();

		assert_eq!(err.code(), ErrorCode::General);
		assert_eq!(a.calls(), 1);
		assert_eq!(b.calls(), 1);
	}

	#[test]
	fn test_no_providers() {
		let err = FirstSuccessfulStrategy
			.evaluate(&[], "flag", false, None, boolean_evaluation)
			.unwrap_err();
		assert!(err.message().contains("flag"));
	}
}
