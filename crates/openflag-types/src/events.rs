//! Events emitted by providers.

use crate::{ErrorInfo, Structure};
use serde::{Deserialize, Serialize};

/// Extra information attached to a configuration change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDetails {
	#[serde(default)]
	pub flags_changed: Vec<String>,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub metadata: Structure,
}

impl EventDetails {
	pub fn flags_changed<I, S>(flags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			flags_changed: flags.into_iter().map(Into::into).collect(),
			..Self::default()
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "details")]
pub enum ProviderEvent {
	Ready,
	Stale,
	ConfigurationChanged(EventDetails),
	Error(ErrorInfo),
	/// Superseded by `Error`; still accepted from older providers.
	NotReady,
}

impl ProviderEvent {
	pub fn kind(&self) -> ProviderEventKind {
		match self {
			Self::Ready => ProviderEventKind::Ready,
			Self::Stale => ProviderEventKind::Stale,
			Self::ConfigurationChanged(_) => ProviderEventKind::ConfigurationChanged,
			Self::Error(_) => ProviderEventKind::Error,
			Self::NotReady => ProviderEventKind::NotReady,
		}
	}

	/// `ConfigurationChanged` is informational; every other event describes
	/// provider health.
	pub fn affects_status(&self) -> bool {
		!matches!(self, Self::ConfigurationChanged(_))
	}
}

/// Discriminant of [`ProviderEvent`], used to filter event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
	Ready,
	Stale,
	ConfigurationChanged,
	Error,
	NotReady,
}

impl ProviderEventKind {
	pub fn matches(&self, event: &ProviderEvent) -> bool {
		event.kind() == *self
	}
}
