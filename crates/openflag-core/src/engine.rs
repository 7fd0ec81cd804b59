// openflag-core/src/engine.rs

use crate::{
	client::Client,
	error::CoreError,
	event_bus::EventBus,
	lifecycle::{status_for_event, StatusFlow, StatusStream},
	noop::NoOpProvider,
	registry::{OperationKind, OperationRegistry},
};
use futures::StreamExt;
use openflag_config::OpenFlagConfig;
use openflag_types::{
	EvaluationContext, FeatureProvider, Hook, ProviderEvent, ProviderEventKind,
	ProviderEventStream, ProviderMetadata, Status,
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_STATUS_BUFFER: usize = 64;
const DEFAULT_EVENT_BUFFER: usize = 64;

/// Mutable state guarded by one lock. Every status publish that depends on
/// it happens while the lock is held.
struct State {
	provider: Arc<dyn FeatureProvider>,
	/// Bumped on every provider swap; tasks tagged with an older value are stale.
	provider_epoch: u64,
	context: Option<EvaluationContext>,
	/// Bumped on every stored context change.
	context_epoch: u64,
	/// Provider epoch whose initialization has settled.
	initialized_epoch: Option<u64>,
	/// Whether a provider-set operation is still initializing.
	initializing: bool,
	/// `*_and_wait` callers whose context change waits on initialization.
	context_waiters: Vec<oneshot::Sender<()>>,
}

/// Where an initialization stands once `initialize` has returned.
enum Settle {
	Published,
	Superseded,
	/// A context change arrived meanwhile and still has to be applied.
	Pending(EvaluationContext, u64),
}

struct Shared {
	state: Mutex<State>,
	status: StatusFlow,
	events: EventBus,
	hooks: RwLock<Vec<Arc<dyn Hook>>>,
	operations: OperationRegistry,
	runtime: Handle,
}

impl Shared {
	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Marks the provider initialized and publishes `status`, unless the
	/// provider was replaced or a context change made after `context_epoch`
	/// still has to be applied to a successfully initialized provider.
	fn settle_initialization(
		&self,
		provider_epoch: u64,
		context_epoch: u64,
		initialized: bool,
		status: Status,
	) -> Settle {
		let mut state = self.lock();
		if state.provider_epoch != provider_epoch {
			debug!("Dropping {} from a superseded provider-set", status);
			return Settle::Superseded;
		}
		if initialized && state.context_epoch != context_epoch {
			if let Some(latest) = state.context.clone() {
				return Settle::Pending(latest, state.context_epoch);
			}
		}

		state.initialized_epoch = Some(provider_epoch);
		state.initializing = false;
		self.status.publish(status);
		for waiter in state.context_waiters.drain(..) {
			let _ = waiter.send(());
		}
		Settle::Published
	}

	/// Publishes `status` unless the provider or the context has moved on.
	fn publish_for_context(&self, provider_epoch: u64, context_epoch: u64, status: Status) -> bool {
		let state = self.lock();
		if state.provider_epoch != provider_epoch || state.context_epoch != context_epoch {
			debug!("Dropping {} from a superseded context-set", status);
			return false;
		}
		self.status.publish(status);
		true
	}

	/// Applies one provider event. Returns false once the provider is stale.
	fn apply_provider_event(&self, epoch: u64, event: ProviderEvent) -> bool {
		let state = self.lock();
		if state.provider_epoch != epoch {
			return false;
		}
		debug!("Provider {} emitted {:?}", state.provider.metadata().name, event.kind());
		if let Some(status) = status_for_event(&event) {
			self.status.publish(status);
		}
		self.events.publish(event);
		true
	}
}

impl Drop for Shared {
	fn drop(&mut self) {
		self.operations.abort_all();
	}
}

/// Forwards a provider's events until the provider is replaced or the
/// orchestrator is dropped.
async fn forward_events(shared: Weak<Shared>, epoch: u64, mut events: ProviderEventStream) {
	while let Some(event) = events.next().await {
		let Some(strong) = shared.upgrade() else {
			break;
		};
		if !strong.apply_provider_event(epoch, event) {
			break;
		}
	}
	debug!("Stopped listening to provider events (epoch {})", epoch);
}

fn same_provider(a: &Arc<dyn FeatureProvider>, b: &Arc<dyn FeatureProvider>) -> bool {
	std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn validate_context(context: &EvaluationContext) -> Result<(), CoreError> {
	context
		.validate()
		.map_err(|e| CoreError::InvalidContext(e.message().to_string()))
}

/// Owns the active provider, the evaluation context and the status stream.
///
/// Provider swaps and context changes run as background tasks keyed by
/// operation kind; starting an operation aborts the in-flight one of the same
/// kind, and a superseded task never publishes. Cloning yields another handle
/// to the same orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
	shared: Arc<Shared>,
}

impl Orchestrator {
	/// Orchestrator with default settings on the current tokio runtime.
	pub fn new() -> Result<Self, CoreError> {
		OrchestratorBuilder::new().build()
	}

	pub fn builder() -> OrchestratorBuilder {
		OrchestratorBuilder::new()
	}

	fn spawn<F>(&self, task: F) -> JoinHandle<()>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.shared.runtime.spawn(task)
	}

	/// Installs `provider` and initializes it in the background.
	///
	/// Status becomes `NotReady` immediately, then `Ready`, `Error` or `Fatal`
	/// once initialization settles. Only an invalid `context` is reported
	/// here; provider failures surface through the status stream.
	pub fn set_provider(
		&self,
		provider: Arc<dyn FeatureProvider>,
		context: Option<EvaluationContext>,
	) -> Result<(), CoreError> {
		self.install_provider(provider, context, None)
	}

	/// Like [`set_provider`](Self::set_provider) but returns once
	/// initialization has settled, or once a newer call superseded it.
	pub async fn set_provider_and_wait(
		&self,
		provider: Arc<dyn FeatureProvider>,
		context: Option<EvaluationContext>,
	) -> Result<(), CoreError> {
		let (done_tx, done_rx) = oneshot::channel();
		self.install_provider(provider, context, Some(done_tx))?;

		if done_rx.await.is_err() {
			debug!("Provider initialization was superseded");
		}
		Ok(())
	}

	fn install_provider(
		&self,
		provider: Arc<dyn FeatureProvider>,
		context: Option<EvaluationContext>,
		done: Option<oneshot::Sender<()>>,
	) -> Result<(), CoreError> {
		if let Some(context) = &context {
			validate_context(context)?;
		}

		let shared = &self.shared;
		let name = provider.metadata().name;
		let installed = provider.clone();
		info!("Setting provider {}", name);

		// Tasks are spawned and registered under the state lock so concurrent
		// calls register in the same order as they swap providers.
		let previous = {
			let mut state = shared.lock();
			let previous = std::mem::replace(&mut state.provider, provider.clone());
			state.provider_epoch += 1;
			if let Some(context) = context {
				state.context = Some(context);
				state.context_epoch += 1;
			}
			state.initializing = true;
			let epoch = state.provider_epoch;
			let init_context = state.context.clone();
			let init_context_epoch = state.context_epoch;
			shared.operations.cancel(OperationKind::ContextSet);
			shared.status.publish(Status::NotReady);

			// Subscribe before initializing so no early event is missed.
			let events = provider.observe();
			let listener = self.spawn(forward_events(Arc::downgrade(shared), epoch, events));
			shared.operations.replace(OperationKind::EventListener, listener);

			let task_shared = shared.clone();
			let task = self.spawn(async move {
				let result = provider.initialize(init_context.as_ref()).await;
				let initialized = result.is_ok();
				let mut status = match result {
					Ok(()) => {
						info!("Provider {} initialized", name);
						Status::Ready
					}
					Err(e) => {
						warn!("Provider {} failed to initialize: {}", name, e);
						Status::from_error(e.info())
					}
				};

				let mut applied = init_context;
				let mut applied_epoch = init_context_epoch;
				while let Settle::Pending(latest, latest_epoch) =
					task_shared.settle_initialization(epoch, applied_epoch, initialized, status)
				{
					debug!("Applying context changed while {} was initializing", name);
					status = match provider.on_context_set(applied.as_ref(), &latest).await {
						Ok(()) => Status::Ready,
						Err(e) => {
							warn!("Provider {} failed to apply context: {}", name, e);
							Status::from_error(e.info())
						}
					};
					applied = Some(latest);
					applied_epoch = latest_epoch;
				}

				if let Some(done) = done {
					let _ = done.send(());
				}
			});
			shared.operations.replace(OperationKind::ProviderSet, task);
			previous
		};

		if !same_provider(&previous, &installed) {
			debug!("Shutting down provider {}", previous.metadata().name);
			previous.shutdown();
		}

		Ok(())
	}

	/// Stores `context` and lets the provider reconcile in the background.
	///
	/// A context structurally equal to the current one changes nothing. While
	/// the provider is still initializing the context is only stored; the
	/// initialization applies it before reporting `Ready`.
	pub fn set_evaluation_context(&self, context: EvaluationContext) -> Result<(), CoreError> {
		self.update_context(context, None)
	}

	/// Like [`set_evaluation_context`](Self::set_evaluation_context) but
	/// returns once reconciliation has settled or been superseded.
	pub async fn set_evaluation_context_and_wait(
		&self,
		context: EvaluationContext,
	) -> Result<(), CoreError> {
		let (done_tx, done_rx) = oneshot::channel();
		self.update_context(context, Some(done_tx))?;

		if done_rx.await.is_err() {
			debug!("Context reconciliation was superseded");
		}
		Ok(())
	}

	fn update_context(
		&self,
		context: EvaluationContext,
		done: Option<oneshot::Sender<()>>,
	) -> Result<(), CoreError> {
		validate_context(&context)?;

		let shared = &self.shared;
		let mut state = shared.lock();
		if state.context.as_ref() == Some(&context) {
			debug!("Evaluation context unchanged");
			if let Some(done) = done {
				let _ = done.send(());
			}
			return Ok(());
		}

		let old_context = state.context.replace(context.clone());
		state.context_epoch += 1;

		if state.initialized_epoch != Some(state.provider_epoch) {
			// Picked up by the running initialization, or by the next one.
			debug!("Provider not initialized; storing evaluation context");
			if let Some(done) = done {
				if state.initializing {
					state.context_waiters.push(done);
				} else {
					let _ = done.send(());
				}
			}
			return Ok(());
		}

		let provider = state.provider.clone();
		let provider_epoch = state.provider_epoch;
		let context_epoch = state.context_epoch;
		shared.status.publish(Status::Reconciling);

		let task_shared = shared.clone();
		let task = self.spawn(async move {
			let name = provider.metadata().name;
			let status = match provider
				.on_context_set(old_context.as_ref(), &context)
				.await
			{
				Ok(()) => Status::Ready,
				Err(e) => {
					warn!("Provider {} failed to apply context: {}", name, e);
					Status::from_error(e.info())
				}
			};
			task_shared.publish_for_context(provider_epoch, context_epoch, status);

			if let Some(done) = done {
				let _ = done.send(());
			}
		});
		shared.operations.replace(OperationKind::ContextSet, task);

		Ok(())
	}

	/// The active provider; the no-op provider when none was set.
	pub fn get_provider(&self) -> Arc<dyn FeatureProvider> {
		self.shared.lock().provider.clone()
	}

	pub fn provider_metadata(&self) -> ProviderMetadata {
		self.get_provider().metadata()
	}

	pub fn evaluation_context(&self) -> Option<EvaluationContext> {
		self.shared.lock().context.clone()
	}

	pub fn status(&self) -> Status {
		self.shared.status.current()
	}

	/// Current status followed by every later transition.
	pub fn status_stream(&self) -> StatusStream {
		self.shared.status.subscribe()
	}

	/// Events of one kind from whichever provider is active.
	pub fn observe(&self, kind: ProviderEventKind) -> ProviderEventStream {
		self.shared.events.observe(Some(kind))
	}

	/// Every event from whichever provider is active.
	pub fn observe_events(&self) -> ProviderEventStream {
		self.shared.events.observe(None)
	}

	/// Shuts the active provider down and reinstalls the no-op provider.
	pub async fn clear_provider(&self) {
		info!("Clearing provider");
		self.reset().await;
	}

	/// Cancels every background operation, waits for them to terminate and
	/// shuts the active provider down. Safe to call repeatedly.
	pub async fn shutdown(&self) {
		info!("Shutting down orchestrator");
		self.reset().await;
		info!("Orchestrator shutdown complete");
	}

	async fn reset(&self) {
		let shared = &self.shared;

		// Taken under the state lock so a concurrent set_provider either
		// lands before and is cancelled here, or after and is left alone.
		let (previous, tasks) = {
			let mut state = shared.lock();
			let previous = std::mem::replace(&mut state.provider, Arc::new(NoOpProvider));
			state.provider_epoch += 1;
			state.initializing = false;
			state.context_waiters.clear();
			shared.status.publish(Status::NotReady);
			(previous, shared.operations.take_all())
		};

		OperationRegistry::terminate(tasks).await;
		previous.shutdown();
	}

	/// Hooks that run for every evaluation of every client.
	pub fn add_hooks<I>(&self, hooks: I)
	where
		I: IntoIterator<Item = Arc<dyn Hook>>,
	{
		self.shared
			.hooks
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.extend(hooks);
	}

	pub fn clear_hooks(&self) {
		self.shared
			.hooks
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.clear();
	}

	pub fn hooks(&self) -> Vec<Arc<dyn Hook>> {
		self.shared
			.hooks
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// A client bound to this orchestrator.
	pub fn client(&self, domain: Option<&str>) -> Client {
		Client::new(self.clone(), domain.map(str::to_string))
	}

	/// Provider, context and status read under one lock.
	pub(crate) fn snapshot(&self) -> Snapshot {
		let state = self.shared.lock();
		Snapshot {
			provider: state.provider.clone(),
			context: state.context.clone(),
			status: self.shared.status.current(),
		}
	}
}

/// Consistent view of the orchestrator for one evaluation.
pub(crate) struct Snapshot {
	pub provider: Arc<dyn FeatureProvider>,
	pub context: Option<EvaluationContext>,
	pub status: Status,
}

/// Builder for creating an Orchestrator instance
pub struct OrchestratorBuilder {
	status_buffer: usize,
	event_buffer: usize,
	runtime: Option<Handle>,
}

impl OrchestratorBuilder {
	pub fn new() -> Self {
		Self {
			status_buffer: DEFAULT_STATUS_BUFFER,
			event_buffer: DEFAULT_EVENT_BUFFER,
			runtime: None,
		}
	}

	/// Takes channel sizes from the `[api]` section.
	pub fn with_config(mut self, config: &OpenFlagConfig) -> Self {
		self.status_buffer = config.api.status_buffer;
		self.event_buffer = config.api.event_buffer;
		self
	}

	pub fn with_status_buffer(mut self, capacity: usize) -> Self {
		self.status_buffer = capacity;
		self
	}

	pub fn with_event_buffer(mut self, capacity: usize) -> Self {
		self.event_buffer = capacity;
		self
	}

	/// Runtime background operations are spawned on. Defaults to the runtime
	/// `build` is called from.
	pub fn with_runtime(mut self, runtime: Handle) -> Self {
		self.runtime = Some(runtime);
		self
	}

	pub fn build(self) -> Result<Orchestrator, CoreError> {
		if self.status_buffer == 0 || self.event_buffer == 0 {
			return Err(CoreError::Configuration(
				"Channel capacities must be greater than zero".to_string(),
			));
		}

		let runtime = match self.runtime {
			Some(runtime) => runtime,
			None => Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?,
		};

		Ok(Orchestrator {
			shared: Arc::new(Shared {
				state: Mutex::new(State {
					provider: Arc::new(NoOpProvider),
					provider_epoch: 0,
					context: None,
					context_epoch: 0,
					initialized_epoch: None,
					initializing: false,
					context_waiters: Vec::new(),
				}),
				status: StatusFlow::new(self.status_buffer),
				events: EventBus::new(self.event_buffer),
				hooks: RwLock::new(Vec::new()),
				operations: OperationRegistry::new(),
				runtime,
			}),
		})
	}
}

impl Default for OrchestratorBuilder {
	fn default() -> Self {
		Self::new()
	}
}
