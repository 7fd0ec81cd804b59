use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use openflag_config::{ConfigLoader, LogFormat, OpenFlagConfig};
use openflag_core::provider_from_config;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config =
		ConfigLoader::load(args.config.as_deref()).context("Failed to load configuration")?;

	let log_level = args
		.log_level
		.clone()
		.unwrap_or_else(|| config.logging.level.clone());
	setup_tracing(&log_level, config.logging.format)?;

	match args.command {
		Command::Evaluate {
			flag,
			kind,
			default,
			targeting_key,
		} => evaluate(config, flag, kind, default, targeting_key).await,
		Command::Status => status(config).await,
		Command::Watch { duration_secs } => watch(config, duration_secs).await,
		Command::Validate => validate(config),
	}
}

async fn evaluate(
	mut config: OpenFlagConfig,
	flag: String,
	kind: cli::FlagKind,
	default: Option<String>,
	targeting_key: Option<String>,
) -> Result<()> {
	let default = commands::parse_default(kind.into(), default.as_deref())?;
	if targeting_key.is_some() {
		config.context.targeting_key = targeting_key;
	}

	let orchestrator = commands::start(&config).await?;
	let client = orchestrator.client(None);
	let details = commands::evaluate_flag(&client, &flag, default)?;
	println!("{}", serde_json::to_string_pretty(&details)?);

	orchestrator.shutdown().await;
	Ok(())
}

async fn status(config: OpenFlagConfig) -> Result<()> {
	let orchestrator = commands::start(&config).await?;
	let report = commands::status_report(&orchestrator);
	println!("{}", serde_json::to_string_pretty(&report)?);

	orchestrator.shutdown().await;
	Ok(())
}

async fn watch(config: OpenFlagConfig, duration_secs: Option<u64>) -> Result<()> {
	let orchestrator = openflag_core::Orchestrator::builder()
		.with_config(&config)
		.build()
		.context("Failed to build orchestrator")?;

	let mut statuses = orchestrator.status_stream();
	let mut events = orchestrator.observe_events();
	orchestrator
		.set_provider(provider_from_config(&config), config.context.to_context())
		.context("Failed to set provider")?;

	let deadline = async {
		match duration_secs {
			Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
			None => std::future::pending::<()>().await,
		}
	};
	tokio::pin!(deadline);
	let shutdown = setup_shutdown_signal();
	tokio::pin!(shutdown);

	info!("Watching provider {}", orchestrator.provider_metadata().name);
	loop {
		tokio::select! {
			Some(status) = statuses.next() => {
				println!("{}", serde_json::to_string(&status)?);
			}
			Some(event) = events.next() => {
				println!("{}", serde_json::to_string(&event)?);
			}
			_ = &mut deadline => break,
			_ = &mut shutdown => {
				info!("Shutdown signal received");
				break;
			}
		}
	}

	orchestrator.shutdown().await;
	Ok(())
}

fn validate(config: OpenFlagConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Strategy: {}", config.multi.strategy);
	for line in commands::describe(&config)? {
		info!("  Provider: {}", line);
	}
	Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
	let registry = tracing_subscriber::registry().with(env_filter);

	// Logs go to stderr; stdout carries command output.
	match format {
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.try_init()?,
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.try_init()?,
	}

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
