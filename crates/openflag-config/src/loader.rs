//! Configuration loading from files and environment.

use crate::types::*;
use crate::ConfigError;
use openflag_strategies::StrategyKind;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

pub const ENV_LOG_LEVEL: &str = "OPENFLAG_LOG_LEVEL";
pub const ENV_STRATEGY: &str = "OPENFLAG_STRATEGY";
pub const ENV_TARGETING_KEY: &str = "OPENFLAG_TARGETING_KEY";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load and validate configuration from a TOML or JSON file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<OpenFlagConfig, ConfigError> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}
		let contents = std::fs::read_to_string(path)?;

		let config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			_ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
		};

		Self::validate(&config)?;
		Ok(config)
	}

	/// Parse a TOML string
	pub fn from_toml(contents: &str) -> Result<OpenFlagConfig, ConfigError> {
		toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
	}

	/// Parse a JSON string
	pub fn from_json(contents: &str) -> Result<OpenFlagConfig, ConfigError> {
		serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
	}

	/// File (or defaults), then environment overrides, then validation.
	pub fn load(file_path: Option<&Path>) -> Result<OpenFlagConfig, ConfigError> {
		let mut config = match file_path {
			Some(path) => Self::from_file(path)?,
			None => OpenFlagConfig::default(),
		};

		Self::apply_env_overrides(&mut config)?;
		Self::validate(&config)?;
		Ok(config)
	}

	/// Apply `OPENFLAG_*` environment overrides
	pub fn apply_env_overrides(config: &mut OpenFlagConfig) -> Result<(), ConfigError> {
		Self::apply_overrides(config, |name| std::env::var(name).ok())
	}

	/// Apply overrides from an arbitrary variable source
	pub fn apply_overrides<F>(config: &mut OpenFlagConfig, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(level) = lookup(ENV_LOG_LEVEL) {
			debug!("Overriding log level from environment");
			config.logging.level = level;
		}

		if let Some(strategy) = lookup(ENV_STRATEGY) {
			debug!("Overriding multi-provider strategy from environment");
			config.multi.strategy = strategy
				.parse::<StrategyKind>()
				.map_err(ConfigError::Validation)?;
		}

		if let Some(key) = lookup(ENV_TARGETING_KEY) {
			debug!("Overriding targeting key from environment");
			config.context.targeting_key = Some(key);
		}

		Ok(())
	}

	/// Validate configuration
	pub fn validate(config: &OpenFlagConfig) -> Result<(), ConfigError> {
		if config.api.status_buffer == 0 {
			return Err(ConfigError::Validation(
				"api.status_buffer must be greater than zero".to_string(),
			));
		}
		if config.api.event_buffer == 0 {
			return Err(ConfigError::Validation(
				"api.event_buffer must be greater than zero".to_string(),
			));
		}

		let mut names = HashSet::new();
		for provider in &config.providers {
			if provider.name.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Provider name must not be empty".to_string(),
				));
			}
			if !names.insert(provider.name.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Provider '{}' is configured more than once",
					provider.name
				)));
			}

			for (key, flag) in &provider.flags {
				if flag.default_value().is_none() {
					return Err(ConfigError::Validation(format!(
						"Flag '{}' of provider '{}' has unknown default variant '{}'",
						key, provider.name, flag.default_variant
					)));
				}
			}
		}

		if config
			.context
			.attributes
			.keys()
			.any(|key| key.is_empty())
		{
			return Err(ConfigError::Validation(
				"Context attribute keys must not be empty".to_string(),
			));
		}

		Ok(())
	}
}
