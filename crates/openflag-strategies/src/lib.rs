//! Strategies for combining the results of several providers.
//!
//! A strategy receives the ordered list of providers behind a multi-provider
//! and a reference to the typed evaluation method being invoked. It decides
//! which provider's answer wins. Strategies are pure decision logic: they
//! never spawn work and never reorder providers.
//!
//! # Available strategies
//!
//! - **First match** ([`FirstMatchStrategy`]): the first provider that knows
//!   the flag answers, whether it succeeds or fails.
//! - **First successful** ([`FirstSuccessfulStrategy`]): the first provider
//!   that answers without an error wins; every failure is skipped.
//!
//! [`StrategyKind`] selects one of them at runtime, e.g. from configuration.

use openflag_types::{EvaluationContext, EvaluationResult, FeatureProvider};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub mod first_match;
pub mod first_successful;

#[cfg(test)]
pub(crate) mod test_support;

pub use first_match::FirstMatchStrategy;
pub use first_successful::FirstSuccessfulStrategy;

/// Bound reference to one of the typed evaluation methods of a provider.
pub type EvaluationFn<T> =
	fn(&dyn FeatureProvider, &str, T, Option<&EvaluationContext>) -> EvaluationResult<T>;

/// Decides which of several providers answers an evaluation.
pub trait Strategy: Send + Sync {
	fn name(&self) -> &'static str;

	/// Calls `evaluate` on providers strictly in order and stops as soon as
	/// the strategy is satisfied.
	fn evaluate<T: Clone>(
		&self,
		providers: &[Arc<dyn FeatureProvider>],
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		evaluate: EvaluationFn<T>,
	) -> EvaluationResult<T>;
}

/// Runtime selection between the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
	#[default]
	FirstMatch,
	FirstSuccessful,
}

impl Strategy for StrategyKind {
	fn name(&self) -> &'static str {
		match self {
			Self::FirstMatch => FirstMatchStrategy.name(),
			Self::FirstSuccessful => FirstSuccessfulStrategy.name(),
		}
	}

	fn evaluate<T: Clone>(
		&self,
		providers: &[Arc<dyn FeatureProvider>],
		flag_key: &str,
		default_value: T,
		context: Option<&EvaluationContext>,
		evaluate: EvaluationFn<T>,
	) -> EvaluationResult<T> {
		match self {
			Self::FirstMatch => {
				FirstMatchStrategy.evaluate(providers, flag_key, default_value, context, evaluate)
			}
			Self::FirstSuccessful => FirstSuccessfulStrategy.evaluate(
				providers,
				flag_key,
				default_value,
				context,
				evaluate,
			),
		}
	}
}

impl FromStr for StrategyKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"first_match" => Ok(Self::FirstMatch),
			"first_successful" => Ok(Self::FirstSuccessful),
			other => Err(format!("Unknown strategy: {}", other)),
		}
	}
}

impl std::fmt::Display for StrategyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}
