//! Evaluation results and the five flag kinds.

use crate::{ErrorCode, EvaluationContext, FeatureProvider, FlagError, FlagResult, Structure, Value};
use serde::{Deserialize, Serialize};

/// Metadata a provider attaches to a single evaluation.
pub type FlagMetadata = Structure;

/// Why a particular value was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
	Static,
	Default,
	TargetingMatch,
	Split,
	Cached,
	Disabled,
	Unknown,
	Stale,
	Error,
}

/// The result of a single provider evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEvaluation<T> {
	pub value: T,
	pub variant: Option<String>,
	pub reason: Option<Reason>,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
	#[serde(default)]
	pub metadata: FlagMetadata,
}

pub type EvaluationResult<T> = FlagResult<ProviderEvaluation<T>>;

impl<T> ProviderEvaluation<T> {
	pub fn new(value: T) -> Self {
		Self {
			value,
			variant: None,
			reason: None,
			error_code: None,
			error_message: None,
			metadata: FlagMetadata::new(),
		}
	}

	pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
		self.variant = Some(variant.into());
		self
	}

	pub fn with_reason(mut self, reason: Reason) -> Self {
		self.reason = Some(reason);
		self
	}

	pub fn with_error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error_code = Some(code);
		self.error_message = Some(message.into());
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	pub fn is_error(&self) -> bool {
		self.error_code.is_some()
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderEvaluation<U> {
		ProviderEvaluation {
			value: f(self.value),
			variant: self.variant,
			reason: self.reason,
			error_code: self.error_code,
			error_message: self.error_message,
			metadata: self.metadata,
		}
	}
}

/// What the client hands back to application code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagEvaluationDetails<T> {
	pub flag_key: String,
	pub value: T,
	pub variant: Option<String>,
	pub reason: Option<Reason>,
	pub error_code: Option<ErrorCode>,
	pub error_message: Option<String>,
	pub metadata: FlagMetadata,
}

impl<T> FlagEvaluationDetails<T> {
	pub fn from_evaluation(flag_key: impl Into<String>, evaluation: ProviderEvaluation<T>) -> Self {
		Self {
			flag_key: flag_key.into(),
			value: evaluation.value,
			variant: evaluation.variant,
			reason: evaluation.reason,
			error_code: evaluation.error_code,
			error_message: evaluation.error_message,
			metadata: evaluation.metadata,
		}
	}

	/// Default-valued result annotated with the failure.
	pub fn error(flag_key: impl Into<String>, default_value: T, error: &FlagError) -> Self {
		Self {
			flag_key: flag_key.into(),
			value: default_value,
			variant: None,
			reason: Some(Reason::Error),
			error_code: Some(error.code()),
			error_message: Some(error.message().to_string()),
			metadata: FlagMetadata::new(),
		}
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FlagEvaluationDetails<U> {
		FlagEvaluationDetails {
			flag_key: self.flag_key,
			value: f(self.value),
			variant: self.variant,
			reason: self.reason,
			error_code: self.error_code,
			error_message: self.error_message,
			metadata: self.metadata,
		}
	}
}

/// The five kinds of flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagValueType {
	Boolean,
	String,
	Integer,
	Double,
	Object,
}

impl std::fmt::Display for FlagValueType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Boolean => "boolean",
			Self::String => "string",
			Self::Integer => "integer",
			Self::Double => "double",
			Self::Object => "object",
		};
		f.write_str(name)
	}
}

/// A flag value of any of the five kinds. Hooks see values through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
	Boolean(bool),
	Integer(i64),
	Double(f64),
	String(String),
	Object(Value),
}

impl FlagValue {
	pub fn kind(&self) -> FlagValueType {
		match self {
			Self::Boolean(_) => FlagValueType::Boolean,
			Self::String(_) => FlagValueType::String,
			Self::Integer(_) => FlagValueType::Integer,
			Self::Double(_) => FlagValueType::Double,
			Self::Object(_) => FlagValueType::Object,
		}
	}
}

/// A Rust type that can be resolved as a flag value.
///
/// Each implementation selects the matching typed provider method, so the
/// evaluation pipeline can be written once and instantiated per kind.
pub trait FlagType: Clone + Send + Sync + Into<FlagValue> + 'static {
	const KIND: FlagValueType;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self>;
}

impl From<bool> for FlagValue {
	fn from(v: bool) -> Self {
		FlagValue::Boolean(v)
	}
}

impl From<String> for FlagValue {
	fn from(v: String) -> Self {
		FlagValue::String(v)
	}
}

impl From<i64> for FlagValue {
	fn from(v: i64) -> Self {
		FlagValue::Integer(v)
	}
}

impl From<f64> for FlagValue {
	fn from(v: f64) -> Self {
		FlagValue::Double(v)
	}
}

impl From<Value> for FlagValue {
	fn from(v: Value) -> Self {
		FlagValue::Object(v)
	}
}

impl FlagType for bool {
	const KIND: FlagValueType = FlagValueType::Boolean;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self> {
		provider.get_boolean_evaluation(flag_key, default_value, context)
	}
}

impl FlagType for String {
	const KIND: FlagValueType = FlagValueType::String;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self> {
		provider.get_string_evaluation(flag_key, default_value, context)
	}
}

impl FlagType for i64 {
	const KIND: FlagValueType = FlagValueType::Integer;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self> {
		provider.get_integer_evaluation(flag_key, default_value, context)
	}
}

impl FlagType for f64 {
	const KIND: FlagValueType = FlagValueType::Double;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self> {
		provider.get_double_evaluation(flag_key, default_value, context)
	}
}

impl FlagType for Value {
	const KIND: FlagValueType = FlagValueType::Object;

	fn resolve(
		provider: &dyn FeatureProvider,
		flag_key: &str,
		default_value: Self,
		context: Option<&EvaluationContext>,
	) -> EvaluationResult<Self> {
		provider.get_object_evaluation(flag_key, default_value, context)
	}
}
