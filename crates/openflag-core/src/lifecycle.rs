// openflag-core/src/lifecycle.rs

//! Current-status holder with replay-latest fan-out, plus the mapping from
//! provider events to statuses.

use futures::stream::BoxStream;
use openflag_types::{ProviderEvent, Status};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

/// Stream of statuses; the first item is the status current at subscription.
pub type StatusStream = BoxStream<'static, Status>;

/// Holds the one current status and fans transitions out to subscribers.
///
/// Publishing a status equal to the current one is a no-op, so observers
/// only ever see real transitions.
pub struct StatusFlow {
	current: Mutex<Status>,
	sender: broadcast::Sender<Status>,
}

impl StatusFlow {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self {
			current: Mutex::new(Status::NotReady),
			sender,
		}
	}

	pub fn current(&self) -> Status {
		self.current
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Makes `status` current. Returns false when nothing changed.
	pub fn publish(&self, status: Status) -> bool {
		let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
		if *current == status {
			return false;
		}

		info!("Provider status changed: {} -> {}", current, status);
		*current = status.clone();
		// Sent under the lock so subscribe() never sees a gap or a duplicate.
		let _ = self.sender.send(status);
		true
	}

	pub fn subscribe(&self) -> StatusStream {
		let (initial, mut receiver) = {
			let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
			(current.clone(), self.sender.subscribe())
		};

		Box::pin(async_stream::stream! {
			yield initial;
			loop {
				match receiver.recv().await {
					Ok(status) => {
						yield status;
					}
					Err(RecvError::Lagged(skipped)) => {
						warn!("Status subscriber lagged by {} transitions", skipped);
					}
					Err(RecvError::Closed) => break,
				}
			}
		})
	}
}

/// Status a provider event moves the orchestrator to, if any.
pub fn status_for_event(event: &ProviderEvent) -> Option<Status> {
	match event {
		ProviderEvent::Ready => Some(Status::Ready),
		ProviderEvent::Stale => Some(Status::Stale),
		ProviderEvent::NotReady => Some(Status::NotReady),
		ProviderEvent::Error(info) => Some(Status::from_error(info.clone())),
		ProviderEvent::ConfigurationChanged(_) => None,
	}
}
