//! First-match strategy.

use crate::{EvaluationFn, Strategy};
use openflag_types::{
	ErrorCode, EvaluationContext, EvaluationResult, FeatureProvider, FlagError, ProviderEvaluation,
	Reason,
};
use std::sync::Arc;
use tracing::debug;

/// Returns the answer of the first provider that knows the flag.
///
/// "Flag not found", whether returned as an error or as an error-coded
/// result, moves on to the next provider. Any other outcome stops the
/// search, including errors, which propagate to the caller untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchStrategy;

impl Strategy for FirstMatchStrategy {
	fn name(&self) -> &'static str {
		"first_match"
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
				Ok(evaluation) if evaluation.error_code == Some(ErrorCode::FlagNotFound) => {
					debug!(
						"Provider {} does not know flag {}",
						provider.metadata().name,
						flag_key
					);
				}
				Err(FlagError::FlagNotFound(_)) => {
					debug!(
						"Provider {} does not know flag {}",
						provider.metadata().name,
						flag_key
					);
				}
				outcome => return outcome,
			}
		}

		Ok(ProviderEvaluation::new(default_value)
			.with_reason(Reason::Error)
			.with_error(
				ErrorCode::FlagNotFound,
				format!("Flag {} not found in any provider", flag_key),
			))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{as_providers, boolean_evaluation, Answer, ScriptedProvider};

	#[test]
	fn test_short_circuits_on_first_match() {
		let not_found = ScriptedProvider::new("not-found", Answer::ThrowsNotFound);
		let matching = ScriptedProvider::new("match", Answer::Value(true));
		let never_called = ScriptedProvider::new("never-called", Answer::Value(false));
		let providers = as_providers(&[&not_found, &matching, &never_called]);

		let result = FirstMatchStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap();

		assert!(result.value);
		assert_eq!(result.variant.as_deref(), Some("match"));
		assert_eq!(not_found.calls(), 1);
		assert_eq!(matching.calls(), 1);
		assert_eq!(never_called.calls(), 0);
	}

	#[test]
	fn test_not_found_result_also_skips() {
		let coded = ScriptedProvider::new("coded", Answer::NotFoundResult);
		let matching = ScriptedProvider::new("match", Answer::Value(true));
		let providers = as_providers(&[&coded, &matching]);

		let result = FirstMatchStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap();

		assert!(result.value);
		assert_eq!(coded.calls(), 1);
	}

	#[test]
	fn test_error_result_stops_the_search() {
		let failing = ScriptedProvider::new("failing", Answer::ErrorResult);
		let never_called = ScriptedProvider::new("never-called", Answer::Value(true));
		let providers = as_providers(&[&failing, &never_called]);

		let result = FirstMatchStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap();

		assert_eq!(result.error_code, Some(ErrorCode::ParseError));
		assert_eq!(never_called.calls(), 0);
	}

	#[test]
	fn test_other_errors_propagate() {
		let throwing = ScriptedProvider::new("throwing", Answer::Throws);
		let never_called = ScriptedProvider::new("never-called", Answer::Value(true));
		let providers = as_providers(&[&throwing, &never_called]);

		let err = FirstMatchStrategy
			.evaluate(&providers, "flag", false, None, boolean_evaluation)
			.unwrap_err();

		assert_eq!(err.code(), ErrorCode::General);
		assert_eq!(never_called.calls(), 0);
	}

	#[test]
	fn test_nobody_knows_the_flag() {
		let a = ScriptedProvider::new("a", Answer::ThrowsNotFound);
		let b = ScriptedProvider::new("b", Answer::NotFoundResult);
		let providers = as_providers(&[&a, &b]);

		let result = FirstMatchStrategy
			.evaluate(&providers, "ghost", true, None, boolean_evaluation)
			.unwrap();

		assert!(result.value);
		assert_eq!(result.reason, Some(Reason::Error));
		assert_eq!(result.error_code, Some(ErrorCode::FlagNotFound));
		assert_eq!(a.calls(), 1);
		assert_eq!(b.calls(), 1);
	}
}
