//! Event aggregation across child providers.

use openflag_types::{ProviderEvent, ProviderEventKind};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Rank of a health event; higher means less healthy.
///
/// `ConfigurationChanged` has no rank because it never competes for the
/// aggregate slot.
pub fn precedence(kind: ProviderEventKind) -> u8 {
	match kind {
		ProviderEventKind::Error => 4,
		ProviderEventKind::NotReady => 3,
		ProviderEventKind::Stale => 2,
		ProviderEventKind::Ready => 1,
		ProviderEventKind::ConfigurationChanged => 0,
	}
}

#[derive(Default)]
struct TrackerState {
	last_by_provider: HashMap<String, ProviderEvent>,
	published: Option<ProviderEventKind>,
}

/// Merges per-child events into one stream.
///
/// Configuration changes are re-emitted every time. A health event is
/// considered only when it differs from the child's previous one, and is
/// published only when it outranks the aggregate event published so far.
pub struct EventAggregator {
	sender: broadcast::Sender<ProviderEvent>,
	state: Mutex<TrackerState>,
}

impl EventAggregator {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self {
			sender,
			state: Mutex::new(TrackerState::default()),
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
		self.sender.subscribe()
	}

	/// Records an event from `provider` and returns it if it was published.
	pub fn record(&self, provider: &str, event: ProviderEvent) -> Option<ProviderEvent> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

		if event.affects_status() {
			if state.last_by_provider.get(provider) == Some(&event) {
				trace!("Ignoring repeated {:?} from {}", event.kind(), provider);
				return None;
			}
			state
				.last_by_provider
				.insert(provider.to_string(), event.clone());

			let current = state.published.map(precedence).unwrap_or(0);
			if precedence(event.kind()) <= current {
				debug!(
					"Suppressing {:?} from {}: aggregate is {:?}",
					event.kind(),
					provider,
					state.published
				);
				return None;
			}
			state.published = Some(event.kind());
		}

		debug!("Publishing {:?} from {}", event.kind(), provider);
		// No subscribers is fine; the event is simply not observed.
		let _ = self.sender.send(event.clone());
		Some(event)
	}

	/// The aggregate health event published so far.
	pub fn published(&self) -> Option<ProviderEventKind> {
		self.state
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.published
	}

	/// The last health event recorded for `provider`.
	pub fn last_event(&self, provider: &str) -> Option<ProviderEvent> {
		self.state
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.last_by_provider
			.get(provider)
			.cloned()
	}

	/// Forgets all recorded events.
	pub fn reset(&self) {
		*self.state.lock().unwrap_or_else(PoisonError::into_inner) = TrackerState::default();
	}
}
