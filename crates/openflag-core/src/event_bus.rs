//! Event bus for provider events.
//!
//! The orchestrator forwards every event of the active provider into this
//! bus. Observers subscribe to the bus rather than to a provider, so their
//! streams stay valid across provider swaps.

use futures::StreamExt;
use openflag_types::{ProviderEvent, ProviderEventKind, ProviderEventStream};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;

/// Broadcast bus carrying events of whichever provider is active.
pub struct EventBus {
	sender: broadcast::Sender<ProviderEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Having no subscribers is not an error; the event is dropped.
	pub fn publish(&self, event: ProviderEvent) {
		let _ = self.sender.send(event);
	}

	/// Events published from now on, optionally restricted to one kind.
	pub fn observe(&self, kind: Option<ProviderEventKind>) -> ProviderEventStream {
		BroadcastStream::new(self.sender.subscribe())
			.filter_map(move |item| async move {
				match item {
					Ok(event) if kind.map_or(true, |k| k.matches(&event)) => Some(event),
					Ok(_) => None,
					Err(BroadcastStreamRecvError::Lagged(skipped)) => {
						warn!("Provider event observer lagged by {} events", skipped);
						None
					}
				}
			})
			.boxed()
	}
}
