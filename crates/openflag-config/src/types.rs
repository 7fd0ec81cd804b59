//! Configuration types.

use openflag_strategies::StrategyKind;
use openflag_types::{EvaluationContext, Structure, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenFlagConfig {
	/// Channel sizing for the orchestrator
	pub api: ApiConfig,
	/// Log output
	pub logging: LoggingConfig,
	/// How several providers are combined
	pub multi: MultiConfig,
	/// Evaluation context installed at startup
	pub context: ContextConfig,
	/// Providers in evaluation order
	pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
	/// Capacity of the status broadcast channel
	pub status_buffer: usize,
	/// Capacity of the provider event broadcast channel
	pub event_buffer: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			status_buffer: 64,
			event_buffer: 64,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// Default filter directive, e.g. `info` or `openflag_core=debug`
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiConfig {
	pub strategy: StrategyKind,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
	pub targeting_key: Option<String>,
	pub attributes: Structure,
}

impl ContextConfig {
	/// The configured context, or `None` when nothing is set.
	pub fn to_context(&self) -> Option<EvaluationContext> {
		if self.targeting_key.is_none() && self.attributes.is_empty() {
			return None;
		}
		let mut context = EvaluationContext::default().with_attributes(self.attributes.clone());
		if let Some(key) = &self.targeting_key {
			context = context.with_targeting_key(key.clone());
		}
		Some(context)
	}
}

/// A single provider entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
	pub name: String,
	#[serde(default)]
	pub kind: ProviderKind,
	/// Flag table for in-memory providers
	#[serde(default)]
	pub flags: BTreeMap<String, FlagConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	#[default]
	InMemory,
	NoOp,
}

/// A flag served by an in-memory provider
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlagConfig {
	pub variants: BTreeMap<String, Value>,
	pub default_variant: String,
	#[serde(default)]
	pub disabled: bool,
}

impl FlagConfig {
	pub fn new(default_variant: impl Into<String>) -> Self {
		Self {
			variants: BTreeMap::new(),
			default_variant: default_variant.into(),
			disabled: false,
		}
	}

	pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.variants.insert(name.into(), value.into());
		self
	}

	pub fn disabled(mut self) -> Self {
		self.disabled = true;
		self
	}

	/// Value of the default variant, if it exists.
	pub fn default_value(&self) -> Option<&Value> {
		self.variants.get(&self.default_variant)
	}
}
