//! Registry of the orchestrator's cancellable background operations.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Background operation kinds. At most one task of each kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
	ProviderSet,
	ContextSet,
	EventListener,
}

impl std::fmt::Display for OperationKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::ProviderSet => write!(f, "provider-set"),
			Self::ContextSet => write!(f, "context-set"),
			Self::EventListener => write!(f, "event-listener"),
		}
	}
}

/// Tasks keyed by operation kind; registering a task aborts its predecessor.
#[derive(Default)]
pub struct OperationRegistry {
	tasks: Mutex<HashMap<OperationKind, JoinHandle<()>>>,
}

impl OperationRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handle` for `kind`, aborting the task it replaces.
	pub fn replace(&self, kind: OperationKind, handle: JoinHandle<()>) {
		let previous = self
			.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(kind, handle);

		if let Some(previous) = previous {
			if !previous.is_finished() {
				debug!("Superseding in-flight {} operation", kind);
			}
			previous.abort();
		}
	}

	/// Aborts the task of `kind`, if any, without waiting for it.
	pub fn cancel(&self, kind: OperationKind) {
		if let Some(handle) = self
			.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&kind)
		{
			handle.abort();
		}
	}

	/// Whether a task of `kind` is registered and still running.
	pub fn is_running(&self, kind: OperationKind) -> bool {
		self.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&kind)
			.is_some_and(|handle| !handle.is_finished())
	}

	/// Aborts every task and waits until each has terminated.
	pub async fn shutdown(&self) {
		Self::terminate(self.take_all()).await;
	}

	/// Removes every registered task without touching it.
	pub fn take_all(&self) -> Vec<(OperationKind, JoinHandle<()>)> {
		self.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.drain()
			.collect()
	}

	/// Aborts `tasks` and waits until each has terminated.
	pub async fn terminate(tasks: Vec<(OperationKind, JoinHandle<()>)>) {
		for (kind, handle) in tasks {
			handle.abort();
			match handle.await {
				Ok(()) => {}
				Err(e) if e.is_cancelled() => debug!("Cancelled {} operation", kind),
				Err(e) => warn!("{} operation ended abnormally: {}", kind, e),
			}
		}
	}

	/// Aborts every task without waiting.
	pub fn abort_all(&self) {
		for (_, handle) in self
			.tasks
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.drain()
		{
			handle.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;
	use std::time::Duration;

	#[tokio::test(start_paused = true)]
	async fn test_replace_aborts_previous_task() {
		let registry = OperationRegistry::new();
		let finished = Arc::new(AtomicBool::new(false));

		let flag = finished.clone();
		registry.replace(
			OperationKind::ProviderSet,
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_secs(1)).await;
				flag.store(true, Ordering::SeqCst);
			}),
		);
		assert!(registry.is_running(OperationKind::ProviderSet));

		registry.replace(OperationKind::ProviderSet, tokio::spawn(async {}));
		tokio::time::sleep(Duration::from_secs(2)).await;

		assert!(!finished.load(Ordering::SeqCst));
		assert!(!registry.is_running(OperationKind::ProviderSet));
	}

	#[tokio::test(start_paused = true)]
	async fn test_shutdown_waits_for_every_task() {
		let registry = OperationRegistry::new();
		for kind in [OperationKind::ProviderSet, OperationKind::ContextSet] {
			registry.replace(
				kind,
				tokio::spawn(async {
					tokio::time::sleep(Duration::from_secs(60)).await;
				}),
			);
		}

		registry.shutdown().await;
		assert!(!registry.is_running(OperationKind::ProviderSet));
		assert!(!registry.is_running(OperationKind::ContextSet));

		// Nothing left to wait for.
		registry.shutdown().await;
	}

	#[tokio::test(start_paused = true)]
	async fn test_tasks_registered_after_take_all_survive() {
		let registry = OperationRegistry::new();
		registry.replace(
			OperationKind::ProviderSet,
			tokio::spawn(async {
				tokio::time::sleep(Duration::from_secs(60)).await;
			}),
		);

		let taken = registry.take_all();
		assert!(!registry.is_running(OperationKind::ProviderSet));

		registry.replace(
			OperationKind::ProviderSet,
			tokio::spawn(async {
				tokio::time::sleep(Duration::from_secs(1)).await;
			}),
		);
		OperationRegistry::terminate(taken).await;

		assert!(registry.is_running(OperationKind::ProviderSet));
	}
}
