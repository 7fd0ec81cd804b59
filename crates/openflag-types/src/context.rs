//! Evaluation context passed to providers.

use crate::{FlagError, Structure, Value};
use serde::{Deserialize, Serialize};

/// Immutable key/value context plus a distinguished targeting key.
///
/// Equality is structural, which is what the orchestrator uses to decide
/// whether a new context actually differs from the current one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
	#[serde(default)]
	targeting_key: String,
	#[serde(default)]
	attributes: Structure,
}

impl EvaluationContext {
	pub fn new(targeting_key: impl Into<String>) -> Self {
		Self {
			targeting_key: targeting_key.into(),
			attributes: Structure::new(),
		}
	}

	pub fn with_targeting_key(mut self, targeting_key: impl Into<String>) -> Self {
		self.targeting_key = targeting_key.into();
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn with_attributes(mut self, attributes: Structure) -> Self {
		self.attributes.extend(attributes);
		self
	}

	pub fn targeting_key(&self) -> &str {
		&self.targeting_key
	}

	pub fn attribute(&self, key: &str) -> Option<&Value> {
		self.attributes.get(key)
	}

	pub fn attributes(&self) -> &Structure {
		&self.attributes
	}

	pub fn is_empty(&self) -> bool {
		self.targeting_key.is_empty() && self.attributes.is_empty()
	}

	/// Returns a new context with `other` layered on top of `self`.
	///
	/// Attributes from `other` replace attributes with the same key. The
	/// targeting key of `other` wins unless it is empty.
	pub fn merge(&self, other: &EvaluationContext) -> EvaluationContext {
		let mut merged = self.clone();
		if !other.targeting_key.is_empty() {
			merged.targeting_key = other.targeting_key.clone();
		}
		for (key, value) in &other.attributes {
			merged.attributes.insert(key.clone(), value.clone());
		}
		merged
	}

	/// Rejects contexts that no provider could interpret.
	pub fn validate(&self) -> Result<(), FlagError> {
		if self.attributes.keys().any(|key| key.is_empty()) {
			return Err(FlagError::InvalidContext(
				"context attribute keys must not be empty".to_string(),
			));
		}
		Ok(())
	}
}
