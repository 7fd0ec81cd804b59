//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use openflag_types::FlagValueType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "openflag")]
#[command(about = "Evaluate and watch feature flags from configured providers", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file (TOML or JSON)
	#[arg(short, long, env = "OPENFLAG_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long, env = "OPENFLAG_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Evaluate one flag and print the evaluation details as JSON
	Evaluate {
		/// Flag key
		flag: String,

		/// Kind of value the flag holds
		#[arg(short, long, value_enum, default_value_t = FlagKind::Boolean)]
		kind: FlagKind,

		/// Default value, parsed according to --kind
		#[arg(short, long)]
		default: Option<String>,

		/// Targeting key overriding the configured context
		#[arg(short, long)]
		targeting_key: Option<String>,
	},

	/// Initialize the providers and print the resulting status
	Status,

	/// Print status transitions and provider events as they happen
	Watch {
		/// Stop after this many seconds instead of waiting for Ctrl+C
		#[arg(long)]
		duration_secs: Option<u64>,
	},

	/// Validate the configuration file
	Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
	Boolean,
	String,
	Integer,
	Double,
	Object,
}

impl From<FlagKind> for FlagValueType {
	fn from(kind: FlagKind) -> Self {
		match kind {
			FlagKind::Boolean => FlagValueType::Boolean,
			FlagKind::String => FlagValueType::String,
			FlagKind::Integer => FlagValueType::Integer,
			FlagKind::Double => FlagValueType::Double,
			FlagKind::Object => FlagValueType::Object,
		}
	}
}
