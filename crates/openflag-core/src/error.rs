// openflag-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Invalid context: {0}")]
	InvalidContext(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Runtime error: {0}")]
	Runtime(String),
}

impl From<openflag_config::ConfigError> for CoreError {
	fn from(e: openflag_config::ConfigError) -> Self {
		CoreError::Configuration(e.to_string())
	}
}
