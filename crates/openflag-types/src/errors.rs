//! Error types for flag evaluation and provider lifecycle calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type FlagResult<T> = std::result::Result<T, FlagError>;

/// Error kinds understood by the library.
///
/// `ProviderFatal` is the only kind that moves the status to `Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	ProviderNotReady,
	FlagNotFound,
	ParseError,
	TypeMismatch,
	TargetingKeyMissing,
	InvalidContext,
	ProviderFatal,
	General,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ProviderNotReady => "PROVIDER_NOT_READY",
			Self::FlagNotFound => "FLAG_NOT_FOUND",
			Self::ParseError => "PARSE_ERROR",
			Self::TypeMismatch => "TYPE_MISMATCH",
			Self::TargetingKeyMissing => "TARGETING_KEY_MISSING",
			Self::InvalidContext => "INVALID_CONTEXT",
			Self::ProviderFatal => "PROVIDER_FATAL",
			Self::General => "GENERAL",
		}
	}

	/// Parses a wire name. Anything unrecognised is coerced to `General`.
	pub fn from_name(name: &str) -> Self {
		match name.trim().to_ascii_uppercase().as_str() {
			"PROVIDER_NOT_READY" => Self::ProviderNotReady,
			"FLAG_NOT_FOUND" => Self::FlagNotFound,
			"PARSE_ERROR" => Self::ParseError,
			"TYPE_MISMATCH" => Self::TypeMismatch,
			"TARGETING_KEY_MISSING" => Self::TargetingKeyMissing,
			"INVALID_CONTEXT" => Self::InvalidContext,
			"PROVIDER_FATAL" => Self::ProviderFatal,
			_ => Self::General,
		}
	}

	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::ProviderFatal)
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
	#[error("Provider not ready: {0}")]
	ProviderNotReady(String),

	#[error("Flag not found: {0}")]
	FlagNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Type mismatch: {0}")]
	TypeMismatch(String),

	#[error("Targeting key missing: {0}")]
	TargetingKeyMissing(String),

	#[error("Invalid context: {0}")]
	InvalidContext(String),

	#[error("Provider fatal error: {0}")]
	ProviderFatal(String),

	#[error("General error: {0}")]
	General(String),
}

impl FlagError {
	pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
		let message = message.into();
		match code {
			ErrorCode::ProviderNotReady => Self::ProviderNotReady(message),
			ErrorCode::FlagNotFound => Self::FlagNotFound(message),
			ErrorCode::ParseError => Self::ParseError(message),
			ErrorCode::TypeMismatch => Self::TypeMismatch(message),
			ErrorCode::TargetingKeyMissing => Self::TargetingKeyMissing(message),
			ErrorCode::InvalidContext => Self::InvalidContext(message),
			ErrorCode::ProviderFatal => Self::ProviderFatal(message),
			ErrorCode::General => Self::General(message),
		}
	}

	pub fn code(&self) -> ErrorCode {
		match self {
			Self::ProviderNotReady(_) => ErrorCode::ProviderNotReady,
			Self::FlagNotFound(_) => ErrorCode::FlagNotFound,
			Self::ParseError(_) => ErrorCode::ParseError,
			Self::TypeMismatch(_) => ErrorCode::TypeMismatch,
			Self::TargetingKeyMissing(_) => ErrorCode::TargetingKeyMissing,
			Self::InvalidContext(_) => ErrorCode::InvalidContext,
			Self::ProviderFatal(_) => ErrorCode::ProviderFatal,
			Self::General(_) => ErrorCode::General,
		}
	}

	pub fn message(&self) -> &str {
		match self {
			Self::ProviderNotReady(m)
			| Self::FlagNotFound(m)
			| Self::ParseError(m)
			| Self::TypeMismatch(m)
			| Self::TargetingKeyMissing(m)
			| Self::InvalidContext(m)
			| Self::ProviderFatal(m)
			| Self::General(m) => m,
		}
	}

	pub fn is_fatal(&self) -> bool {
		self.code().is_fatal()
	}

	pub fn info(&self) -> ErrorInfo {
		ErrorInfo::new(self.code(), self.message())
	}
}

/// Foreign errors keep their kind when they wrap a `FlagError` and are
/// otherwise coerced to `General`.
impl From<anyhow::Error> for FlagError {
	fn from(err: anyhow::Error) -> Self {
		match err.downcast::<FlagError>() {
			Ok(flag_error) => flag_error,
			Err(other) => FlagError::General(other.to_string()),
		}
	}
}

/// Error kind and message carried by `Status::Error` / `Status::Fatal` and
/// by provider error events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
	pub code: ErrorCode,
	pub message: String,
}

impl ErrorInfo {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	pub fn general(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::General, message)
	}

	pub fn is_fatal(&self) -> bool {
		self.code.is_fatal()
	}
}

impl fmt::Display for ErrorInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code, self.message)
	}
}

impl From<&FlagError> for ErrorInfo {
	fn from(err: &FlagError) -> Self {
		err.info()
	}
}

impl From<FlagError> for ErrorInfo {
	fn from(err: FlagError) -> Self {
		err.info()
	}
}

impl From<ErrorInfo> for FlagError {
	fn from(info: ErrorInfo) -> Self {
		FlagError::from_code(info.code, info.message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_code_is_general() {
		assert_eq!(ErrorCode::from_name("FLAG_NOT_FOUND"), ErrorCode::FlagNotFound);
		assert_eq!(ErrorCode::from_name("provider_fatal"), ErrorCode::ProviderFatal);
		assert_eq!(ErrorCode::from_name("SOMETHING_ELSE"), ErrorCode::General);
	}

	#[test]
	fn test_anyhow_coercion() {
		let wrapped: FlagError = anyhow::Error::new(FlagError::ProviderFatal("boom".into())).into();
		assert_eq!(wrapped, FlagError::ProviderFatal("boom".into()));

		let foreign: FlagError = anyhow::anyhow!("disk on fire").into();
		assert_eq!(foreign.code(), ErrorCode::General);
		assert_eq!(foreign.message(), "disk on fire");
	}

	#[test]
	fn test_only_provider_fatal_is_fatal() {
		assert!(FlagError::ProviderFatal("x".into()).is_fatal());
		assert!(!FlagError::General("x".into()).is_fatal());
		assert!(!FlagError::ProviderNotReady("x".into()).is_fatal());
	}
}
