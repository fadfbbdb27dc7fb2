//! Request coordination: debouncing, version gating, and the two-stage
//! generation sequence.
//!
//! The pipeline is a single actor task. All mutation of the request version
//! and the result store happens in its command loop, so handlers execute one
//! at a time and no locking discipline beyond the store's `RwLock` (for
//! outside readers) is needed. Executors are reached only through message
//! passing; their results arrive as commands tagged with the version of the
//! request they answered, and a stale version means the result is discarded,
//! never applied. Cancellation is soft: in-flight background work is allowed
//! to finish and be thrown away. The one thing hard-cancelled is the
//! debounce timer, when an immediate request preempts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{PipelineError, Result};
use crate::executor::{
    ExecutorHandle, PrimaryExecutor, PrimaryJob, SecondaryExecutor, SecondaryJob, spawn_primary,
    spawn_secondary,
};
use crate::protocol::{PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};
use crate::snapshot::{ConfigSnapshot, GenerationOptions, Injection};
use crate::store::{EVENT_CHANNEL_CAPACITY, PipelineEvent, ResultStore};

/// Quiet period after the last debounced request before dispatch fires.
pub const DEBOUNCE_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Pipeline configuration, fixed for the pipeline's lifetime.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Debounce window for `request_debounced`.
    pub debounce: Duration,
    /// Whether successful generations with meshless scripted cases enter the
    /// secondary conversion stage.
    pub mesh_preview: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_QUIET_PERIOD,
            mesh_preview: true,
        }
    }
}

/// Arguments of one generation request.
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub snapshot: ConfigSnapshot,
    pub injections: Vec<Injection>,
    pub options: GenerationOptions,
}

/// Commands processed by the pipeline actor, one at a time.
pub(crate) enum Command {
    /// Edit-driven request; coalesced within the debounce window.
    Debounced(RequestArgs),
    /// Immediate request; cancels a pending debounce timer.
    Now(RequestArgs),
    /// Primary executor answered the request with this version.
    PrimaryDone {
        token: u64,
        response: PrimaryResponse,
    },
    /// Secondary executor answered the batch with this version.
    SecondaryDone {
        token: u64,
        response: SecondaryResponse,
    },
    Shutdown,
}

/// Handle to a running pipeline.
///
/// Cheap to use from any task. Dropping the handle shuts the pipeline down;
/// prefer [`PipelineHandle::shutdown`] to also wait for the actor to finish.
pub struct PipelineHandle {
    commands: mpsc::UnboundedSender<Command>,
    store: Arc<RwLock<ResultStore>>,
    events: broadcast::Sender<PipelineEvent>,
    task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Schedule a generation after the quiet period, coalescing with any
    /// other debounced requests in the window; the latest arguments win.
    pub fn request_debounced(
        &self,
        snapshot: ConfigSnapshot,
        injections: Vec<Injection>,
        options: GenerationOptions,
    ) -> Result<()> {
        self.send(Command::Debounced(RequestArgs {
            snapshot,
            injections,
            options,
        }))
    }

    /// Dispatch immediately, cancelling any pending debounce timer. Does not
    /// cancel an already-dispatched computation.
    pub fn request_now(
        &self,
        snapshot: ConfigSnapshot,
        injections: Vec<Injection>,
        options: GenerationOptions,
    ) -> Result<()> {
        self.send(Command::Now(RequestArgs {
            snapshot,
            injections,
            options,
        }))
    }

    /// Shared view of the result store. Mutation happens only in the
    /// pipeline's own handlers; readers take the read lock.
    pub fn store(&self) -> Arc<RwLock<ResultStore>> {
        self.store.clone()
    }

    /// Subscribe to coarse change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Stop the pipeline and wait for the actor task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PipelineError::ShutDown)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// The pipeline actor. Owns the request version, the pending debounce state,
/// and the only write path into the store.
pub struct Pipeline {
    commands: mpsc::UnboundedReceiver<Command>,
    store: Arc<RwLock<ResultStore>>,
    events: broadcast::Sender<PipelineEvent>,
    primary: ExecutorHandle<PrimaryJob>,
    secondary: ExecutorHandle<SecondaryJob>,
    config: PipelineConfig,
    /// Latest issued request version; the version gate.
    version: u64,
    /// Arguments waiting on the debounce timer.
    pending: Option<RequestArgs>,
    /// When the debounce timer fires, if one is scheduled.
    deadline: Option<Instant>,
}

impl Pipeline {
    /// Spawn the pipeline with its two executors.
    ///
    /// Executor loops and the actor are constructed here and torn down on
    /// shutdown; nothing is an ambient singleton.
    pub fn spawn(
        primary: Arc<dyn PrimaryExecutor>,
        secondary: Arc<dyn SecondaryExecutor>,
        config: PipelineConfig,
    ) -> PipelineHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Arc::new(RwLock::new(ResultStore::default()));

        let pipeline = Pipeline {
            commands: rx,
            store: store.clone(),
            events: events.clone(),
            primary: spawn_primary(primary, tx.clone()),
            secondary: spawn_secondary(secondary, tx.clone()),
            config,
            version: 0,
            pending: None,
            deadline: None,
        };

        let task = tokio::spawn(pipeline.run());

        PipelineHandle {
            commands: tx,
            store,
            events,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        loop {
            // sleep_until needs a value even when no timer is scheduled; the
            // branch is disabled then, so the placeholder never fires.
            let deadline = self.deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Debounced(args)) => {
                        self.pending = Some(args);
                        self.deadline = Some(Instant::now() + self.config.debounce);
                    }
                    Some(Command::Now(args)) => {
                        // Hard-cancel the pending timer so it cannot fire a
                        // second, duplicate dispatch.
                        self.pending = None;
                        self.deadline = None;
                        self.dispatch(args).await;
                    }
                    Some(Command::PrimaryDone { token, response }) => {
                        self.on_primary(token, response).await;
                    }
                    Some(Command::SecondaryDone { token, response }) => {
                        self.on_secondary(token, response).await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = tokio::time::sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    if let Some(args) = self.pending.take() {
                        self.dispatch(args).await;
                    }
                }
            }
        }
        tracing::debug!("pipeline actor stopped");
    }

    /// The single dispatch routine behind both request paths.
    async fn dispatch(&mut self, args: RequestArgs) {
        self.version += 1;
        let token = self.version;

        {
            let mut store = self.store.write().await;
            store.clear_error();
            store.clear_warning();
            store.set_busy(true);
            // Scan the unmodified snapshot; the warning is independent of
            // the computation's own outcome.
            if let Some(warning) = args.snapshot.deprecation_warning() {
                store.append_warning(&warning);
            }
        }

        let shaped = if args.options.points_only {
            args.snapshot.stripped_for_points()
        } else {
            args.snapshot
        };

        let request = PrimaryRequest::Generate {
            snapshot: shaped.source,
            injections: args.injections,
            options: args.options,
            correlation_token: token.to_string(),
        };

        tracing::debug!(version = token, "dispatching generation request");
        let _ = self
            .events
            .send(PipelineEvent::GenerationStarted { version: token });

        if let Err(error) = self.primary.dispatch(PrimaryJob { token, request }) {
            self.fail_cycle(error.to_string()).await;
        }
    }

    async fn on_primary(&mut self, token: u64, response: PrimaryResponse) {
        if token != self.version {
            tracing::debug!(
                token,
                current = self.version,
                "discarding stale generation response"
            );
            return;
        }

        match response {
            PrimaryResponse::Error { message } => {
                tracing::warn!(version = token, "generation failed: {message}");
                self.fail_cycle(message).await;
            }
            PrimaryResponse::Success {
                mut result_document,
                warnings,
            } => {
                let owed = if self.config.mesh_preview {
                    result_document.mark_pending_meshes()
                } else {
                    0
                };
                let convert = (owed > 0).then(|| SecondaryRequest::ConvertBatch {
                    result_document_snapshot: result_document.clone(),
                    correlation_token: token.to_string(),
                });

                let result_version;
                {
                    let mut store = self.store.write().await;
                    for warning in &warnings {
                        store.append_warning(warning);
                    }
                    store.accept_document(result_document);
                    result_version = store.result_version();
                    if convert.is_none() {
                        store.set_busy(false);
                    }
                }
                let _ = self.events.send(PipelineEvent::ResultUpdated { result_version });

                if let Some(request) = convert {
                    tracing::debug!(version = token, cases = owed, "requesting mesh conversion");
                    if let Err(error) = self.secondary.dispatch(SecondaryJob { token, request }) {
                        self.fail_cycle(error.to_string()).await;
                    }
                }
            }
        }
    }

    async fn on_secondary(&mut self, token: u64, response: SecondaryResponse) {
        if token != self.version {
            tracing::debug!(
                token,
                current = self.version,
                "discarding stale mesh batch"
            );
            return;
        }

        match response {
            SecondaryResponse::Error { message } => {
                // Non-fatal: geometry without meshes is still viewable, so
                // the primary document is kept and no error is surfaced.
                tracing::warn!(version = token, "mesh conversion failed: {message}");
                self.store.write().await.set_busy(false);
            }
            SecondaryResponse::Success { result_document } => {
                let merged_version;
                {
                    let mut store = self.store.write().await;
                    let merged = store
                        .document_mut()
                        .map(|document| document.merge_meshes(&result_document))
                        .unwrap_or(0);
                    tracing::debug!(version = token, merged, "merged mesh batch");
                    // A batch that merged nothing is not a document change;
                    // consumers are not notified of a no-op.
                    merged_version = (merged > 0).then(|| {
                        store.bump_result_version();
                        store.result_version()
                    });
                    store.set_busy(false);
                }
                if let Some(result_version) = merged_version {
                    let _ = self.events.send(PipelineEvent::MeshesUpdated { result_version });
                }
            }
        }
    }

    /// End the current cycle with a surfaced error.
    async fn fail_cycle(&self, message: String) {
        {
            let mut store = self.store.write().await;
            store.set_error(message.clone());
            store.set_busy(false);
        }
        let _ = self.events.send(PipelineEvent::GenerationFailed { message });
    }
}
