//! Command implementations shared by the binary.

use anyhow::{bail, Context, Result};
use openflag_config::OpenFlagConfig;
use openflag_core::{provider_from_config, Client, Orchestrator};
use openflag_types::{FlagValue, FlagValueType, Value};
use serde_json::json;

/// Parses a command-line default into a flag value of `kind`.
///
/// Without a raw value the kind's zero value is used.
pub fn parse_default(kind: FlagValueType, raw: Option<&str>) -> Result<FlagValue> {
	let Some(raw) = raw else {
		return Ok(match kind {
			FlagValueType::Boolean => FlagValue::Boolean(false),
			FlagValueType::String => FlagValue::String(String::new()),
			FlagValueType::Integer => FlagValue::Integer(0),
			FlagValueType::Double => FlagValue::Double(0.0),
			FlagValueType::Object => FlagValue::Object(Value::Null),
		});
	};

	let value = match kind {
		FlagValueType::Boolean => FlagValue::Boolean(
			raw.parse()
				.with_context(|| format!("Invalid boolean default: {}", raw))?,
		),
		FlagValueType::String => FlagValue::String(raw.to_string()),
		FlagValueType::Integer => FlagValue::Integer(
			raw.parse()
				.with_context(|| format!("Invalid integer default: {}", raw))?,
		),
		FlagValueType::Double => FlagValue::Double(
			raw.parse()
				.with_context(|| format!("Invalid double default: {}", raw))?,
		),
		FlagValueType::Object => FlagValue::Object(
			serde_json::from_str(raw)
				.with_context(|| format!("Invalid JSON object default: {}", raw))?,
		),
	};
	Ok(value)
}

/// Evaluates `flag` through `client` and renders the details as JSON.
pub fn evaluate_flag(client: &Client, flag: &str, default: FlagValue) -> Result<serde_json::Value> {
	let rendered = match default {
		FlagValue::Boolean(d) => serde_json::to_value(client.get_boolean_details(flag, d, None))?,
		FlagValue::String(d) => serde_json::to_value(client.get_string_details(flag, d, None))?,
		FlagValue::Integer(d) => serde_json::to_value(client.get_integer_details(flag, d, None))?,
		FlagValue::Double(d) => serde_json::to_value(client.get_double_details(flag, d, None))?,
		FlagValue::Object(d) => serde_json::to_value(client.get_object_details(flag, d, None))?,
	};
	Ok(rendered)
}

/// Installs the configured provider and waits for it to settle.
pub async fn start(config: &OpenFlagConfig) -> Result<Orchestrator> {
	let orchestrator = Orchestrator::builder()
		.with_config(config)
		.build()
		.context("Failed to build orchestrator")?;

	orchestrator
		.set_provider_and_wait(provider_from_config(config), config.context.to_context())
		.await
		.context("Failed to set provider")?;

	Ok(orchestrator)
}

/// Status summary printed by the `status` command.
pub fn status_report(orchestrator: &Orchestrator) -> serde_json::Value {
	json!({
		"provider": orchestrator.provider_metadata(),
		"status": orchestrator.status(),
		"context": orchestrator.evaluation_context(),
	})
}

/// Fails when the configuration cannot serve a single flag.
pub fn describe(config: &OpenFlagConfig) -> Result<Vec<String>> {
	if config.providers.is_empty() {
		bail!("No providers configured; every flag would resolve to its default");
	}

	Ok(config
		.providers
		.iter()
		.map(|provider| {
			format!(
				"{} ({:?}, {} flags)",
				provider.name,
				provider.kind,
				provider.flags.len()
			)
		})
		.collect())
}
