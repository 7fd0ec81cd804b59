//! Hook contract invoked around every flag evaluation.

use crate::{
	EvaluationContext, FlagError, FlagEvaluationDetails, FlagResult, FlagValue, FlagValueType,
	ProviderMetadata, Structure,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Free-form data handed to every hook stage.
pub type HookHints = Structure;

/// Identity of the client an evaluation came through.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientMetadata {
	pub domain: Option<String>,
}

/// Everything a hook can know about the evaluation in progress.
#[derive(Debug, Clone)]
pub struct HookContext {
	pub flag_key: String,
	pub flag_value_type: FlagValueType,
	pub default_value: FlagValue,
	pub context: EvaluationContext,
	pub client_metadata: ClientMetadata,
	pub provider_metadata: ProviderMetadata,
}

/// Lifecycle hook.
///
/// `before` may return a context that is merged over the evaluation context.
/// Failures from `before` and `after` turn the evaluation into an error
/// result; `error` and `finally_after` cannot fail.
pub trait Hook: Send + Sync {
	/// Whether this hook runs for flags of the given kind.
	fn supports(&self, _kind: FlagValueType) -> bool {
		true
	}

	fn before(
		&self,
		_ctx: &HookContext,
		_hints: &HookHints,
	) -> FlagResult<Option<EvaluationContext>> {
		Ok(None)
	}

	fn after(
		&self,
		_ctx: &HookContext,
		_details: &FlagEvaluationDetails<FlagValue>,
		_hints: &HookHints,
	) -> FlagResult<()> {
		Ok(())
	}

	fn error(&self, _ctx: &HookContext, _error: &FlagError, _hints: &HookHints) {}

	fn finally_after(
		&self,
		_ctx: &HookContext,
		_details: &FlagEvaluationDetails<FlagValue>,
		_hints: &HookHints,
	) {
	}
}

/// Per-call evaluation options.
#[derive(Clone, Default)]
pub struct FlagEvaluationOptions {
	pub hooks: Vec<Arc<dyn Hook>>,
	pub hook_hints: HookHints,
}

impl FlagEvaluationOptions {
	pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
		self.hooks.push(hook);
		self
	}

	pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<crate::Value>) -> Self {
		self.hook_hints.insert(key.into(), value.into());
		self
	}
}
