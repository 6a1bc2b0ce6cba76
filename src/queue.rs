//! Stage task queue.
//!
//! Each pipeline stage is a discrete, independently retryable unit of work
//! delivered as a `StageTask` message. Stages chain by enqueueing the next
//! task, never by nested calls, so a retried stage never re-runs its
//! predecessor. Delivery is at-least-once by assumption: duplicate or late
//! tasks are rejected by the stage's status pre-condition, so the worker
//! treats conflicts as noise, not failures.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::extract::DocumentSet;
use crate::pipeline::Orchestrator;

#[derive(Debug, Clone)]
pub enum StageTask {
    Extract {
        candidate_id: i64,
        documents: DocumentSet,
    },
    SearchCompanies {
        candidate_id: i64,
    },
    FindDecisionMakers {
        candidate_id: i64,
    },
    CreateCampaign {
        candidate_id: i64,
    },
}

impl StageTask {
    pub fn candidate_id(&self) -> i64 {
        match self {
            Self::Extract { candidate_id, .. }
            | Self::SearchCompanies { candidate_id }
            | Self::FindDecisionMakers { candidate_id }
            | Self::CreateCampaign { candidate_id } => *candidate_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract { .. } => "extract",
            Self::SearchCompanies { .. } => "search_companies",
            Self::FindDecisionMakers { .. } => "find_decision_makers",
            Self::CreateCampaign { .. } => "create_campaign",
        }
    }
}

pub type TaskReceiver = mpsc::UnboundedReceiver<StageTask>;

/// Sending half of the stage queue. Cheap to clone; the orchestrator holds
/// one to chain stages.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<StageTask>,
}

impl TaskQueue {
    pub fn new() -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: StageTask) {
        let candidate_id = task.candidate_id();
        let stage = task.name();
        if self.tx.send(task).is_err() {
            tracing::error!(candidate_id, stage, "stage queue closed; task dropped");
        } else {
            tracing::debug!(candidate_id, stage, "stage enqueued");
        }
    }
}

async fn dispatch(orchestrator: &Orchestrator, task: StageTask) {
    let candidate_id = task.candidate_id();
    let stage = task.name();
    match orchestrator.run_stage(task).await {
        Ok(()) => tracing::debug!(candidate_id, stage, "stage completed"),
        Err(e) if e.is_conflict() => {
            tracing::info!(candidate_id, stage, error = %e, "duplicate or late delivery ignored")
        }
        // run_stage already drove the candidate to failed and logged details.
        Err(e) => tracing::debug!(candidate_id, stage, error = %e, "stage failed"),
    }
}

/// Run queued stages until the queue is momentarily empty. Stages enqueue
/// their successors synchronously, so this drains a whole chain up to the
/// next approval gate. Used by the CLI entry points.
pub async fn run_until_idle(orchestrator: &Orchestrator, rx: &mut TaskReceiver) {
    while let Ok(task) = rx.try_recv() {
        dispatch(orchestrator, task).await;
    }
}

/// Long-running worker loop for daemon use.
pub fn spawn_worker(
    orchestrator: Arc<Orchestrator>,
    mut rx: TaskReceiver,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            dispatch(&orchestrator, task).await;
        }
    })
}
