//! Ordered hook dispatch for one evaluation.

use openflag_types::{
	FlagError, FlagEvaluationDetails, FlagResult, FlagValue, FlagValueType, Hook, HookContext,
	HookHints,
};
use std::sync::Arc;
use tracing::trace;

/// Hooks applicable to one evaluation, in `before` order.
pub struct HookChain {
	hooks: Vec<Arc<dyn Hook>>,
}

impl HookChain {
	/// Concatenates the hook groups in order and keeps those supporting `kind`.
	pub fn collect<'a, I>(kind: FlagValueType, groups: I) -> Self
	where
		I: IntoIterator<Item = &'a [Arc<dyn Hook>]>,
	{
		let hooks = groups
			.into_iter()
			.flatten()
			.filter(|hook| hook.supports(kind))
			.cloned()
			.collect();
		Self { hooks }
	}

	pub fn len(&self) -> usize {
		self.hooks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.hooks.is_empty()
	}

	/// Runs `before` hooks in order, merging returned contexts into `ctx`.
	pub fn before(&self, ctx: &mut HookContext, hints: &HookHints) -> FlagResult<()> {
		for hook in &self.hooks {
			if let Some(extra) = hook.before(ctx, hints)? {
				ctx.context = ctx.context.merge(&extra);
			}
		}
		Ok(())
	}

	pub fn after(
		&self,
		ctx: &HookContext,
		details: &FlagEvaluationDetails<FlagValue>,
		hints: &HookHints,
	) -> FlagResult<()> {
		for hook in self.hooks.iter().rev() {
			hook.after(ctx, details, hints)?;
		}
		Ok(())
	}

	pub fn error(&self, ctx: &HookContext, error: &FlagError, hints: &HookHints) {
		trace!("Running {} error hooks for {}", self.hooks.len(), ctx.flag_key);
		for hook in self.hooks.iter().rev() {
			hook.error(ctx, error, hints);
		}
	}

	pub fn finally_after(
		&self,
		ctx: &HookContext,
		details: &FlagEvaluationDetails<FlagValue>,
		hints: &HookHints,
	) {
		for hook in self.hooks.iter().rev() {
			hook.finally_after(ctx, details, hints);
		}
	}
}
