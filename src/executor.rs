//! Executor seams and lifecycle-scoped executor loops.
//!
//! The two background computations are isolated behind traits and reachable
//! only by message passing. Each executor runs as its own task consuming a
//! job channel, so the coordinator never shares memory with it and at most
//! one logical request is in flight per executor. Responses travel back on
//! the coordinator's command channel tagged with the request's version;
//! the coordinator's version gate, not request ordering, resolves races.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::coordinator::Command;
use crate::error::{PipelineError, Result};
use crate::protocol::{PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};

/// Primary generation computation: executes a configuration snapshot plus
/// injections and returns one response per request. Stateless from the
/// coordinator's perspective.
#[async_trait]
pub trait PrimaryExecutor: Send + Sync + 'static {
    async fn generate(&self, request: PrimaryRequest) -> PrimaryResponse;
}

/// Secondary mesh-conversion computation: converts the pending
/// solid-geometry scripts of a result document snapshot, one response per
/// batch request.
#[async_trait]
pub trait SecondaryExecutor: Send + Sync + 'static {
    async fn convert(&self, request: SecondaryRequest) -> SecondaryResponse;
}

/// One queued primary request with its correlation version.
pub(crate) struct PrimaryJob {
    pub token: u64,
    pub request: PrimaryRequest,
}

/// One queued secondary batch with its correlation version.
pub(crate) struct SecondaryJob {
    pub token: u64,
    pub request: SecondaryRequest,
}

/// Sender side of an executor's job channel.
///
/// `dispatch` fails synchronously when the executor loop is gone; the
/// coordinator surfaces that as the cycle's error without retrying.
pub(crate) struct ExecutorHandle<J> {
    tx: mpsc::UnboundedSender<J>,
}

impl<J> ExecutorHandle<J> {
    pub(crate) fn dispatch(&self, job: J) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| PipelineError::Dispatch("executor channel closed".to_string()))
    }
}

/// Spawn the primary executor loop. The loop ends when the job channel
/// closes (pipeline teardown) or the coordinator is gone.
pub(crate) fn spawn_primary(
    executor: Arc<dyn PrimaryExecutor>,
    replies: mpsc::UnboundedSender<Command>,
) -> ExecutorHandle<PrimaryJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PrimaryJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let response = executor.generate(job.request).await;
            if replies
                .send(Command::PrimaryDone {
                    token: job.token,
                    response,
                })
                .is_err()
            {
                break;
            }
        }
        tracing::debug!("primary executor loop ended");
    });
    ExecutorHandle { tx }
}

/// Spawn the secondary executor loop.
pub(crate) fn spawn_secondary(
    executor: Arc<dyn SecondaryExecutor>,
    replies: mpsc::UnboundedSender<Command>,
) -> ExecutorHandle<SecondaryJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SecondaryJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let response = executor.convert(job.request).await;
            if replies
                .send(Command::SecondaryDone {
                    token: job.token,
                    response,
                })
                .is_err()
            {
                break;
            }
        }
        tracing::debug!("secondary executor loop ended");
    });
    ExecutorHandle { tx }
}
