// openflag-types/src/status.rs

use crate::ErrorInfo;
use serde::{Deserialize, Serialize};

/// Lifecycle status of the active provider as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "error")]
pub enum Status {
	#[default]
	NotReady,
	Ready,
	Stale,
	Reconciling,
	Error(ErrorInfo),
	Fatal(ErrorInfo),
}

impl Status {
	/// Maps a lifecycle failure to `Fatal` or `Error` depending on its kind.
	pub fn from_error(info: ErrorInfo) -> Self {
		if info.is_fatal() {
			Self::Fatal(info)
		} else {
			Self::Error(info)
		}
	}

	pub fn is_ready(&self) -> bool {
		matches!(self, Self::Ready)
	}

	pub fn error(&self) -> Option<&ErrorInfo> {
		match self {
			Self::Error(info) | Self::Fatal(info) => Some(info),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::NotReady => "NotReady",
			Self::Ready => "Ready",
			Self::Stale => "Stale",
			Self::Reconciling => "Reconciling",
			Self::Error(_) => "Error",
			Self::Fatal(_) => "Fatal",
		}
	}
}

impl std::fmt::Display for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.error() {
			Some(info) => write!(f, "{}({})", self.name(), info),
			None => write!(f, "{}", self.name()),
		}
	}
}
