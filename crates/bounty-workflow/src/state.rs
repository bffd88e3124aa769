//! Workflow states and the per-instance handle
//!
//! ```text
//! Idle → Preparing → Uploading → (Checking → Approving?)? → Writing → Confirming → Completed
//!                                        ↓
//!                                 NeedsAttention (approval receipt unknown)
//! any ──────────────────────────────────────────────────────────────→ Failed
//! ```
use std::time::Instant;

use bounty_core::{BountyError, ErrorKind, Result, TxHash};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    /// Pre-flight checks; nothing uploaded or sent yet
    Preparing,
    Uploading,
    /// Reading the current allowance
    Checking,
    Approving,
    Writing,
    /// Sent; waiting on the receipt
    Confirming {
        tx_hash: String,
    },
    Completed {
        cid: Option<String>,
        tx_hash: String,
    },
    /// The approval may or may not have landed; `resume` picks up from the
    /// allowance check with the already uploaded document.
    NeedsAttention {
        warning: String,
        cid: String,
    },
    Failed {
        kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Uploading => "uploading",
            Self::Checking => "checking",
            Self::Approving => "approving",
            Self::Writing => "writing",
            Self::Confirming { .. } => "confirming",
            Self::Completed { .. } => "completed",
            Self::NeedsAttention { .. } => "needs_attention",
            Self::Failed { .. } => "failed",
        }
    }

    /// A new attempt may not start while this is true.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Preparing
                | Self::Uploading
                | Self::Checking
                | Self::Approving
                | Self::Writing
                | Self::Confirming { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn failed(err: &BountyError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
            tx_hash: err.tx_hash().map(str::to_string),
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    Completed {
        tx_hash: TxHash,
        cid: Option<String>,
    },
    NeedsAttention {
        warning: String,
        cid: String,
    },
}

impl WriteOutcome {
    pub fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            Self::Completed { tx_hash, .. } => Some(tx_hash),
            Self::NeedsAttention { .. } => None,
        }
    }
}

/// Time spent in one state of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub latency_ms: u64,
}

/// Token for one run. Transitions made with a stale token are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub id: Uuid,
    generation: u64,
}

struct Inner {
    generation: u64,
    state: WorkflowState,
    entered: Instant,
    steps: Vec<StepRecord>,
}

impl Inner {
    fn enter(&mut self, next: WorkflowState) {
        let latency_ms = self.entered.elapsed().as_millis() as u64;
        self.steps.push(StepRecord {
            step: self.state.name().to_string(),
            latency_ms,
        });
        self.state = next;
        self.entered = Instant::now();
    }
}

pub struct WorkflowHandle {
    inner: Mutex<Inner>,
    watch: watch::Sender<WorkflowState>,
}

impl Default for WorkflowHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowHandle {
    pub fn new() -> Self {
        let (watch, _) = watch::channel(WorkflowState::Idle);
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                state: WorkflowState::Idle,
                entered: Instant::now(),
                steps: Vec::new(),
            }),
            watch,
        }
    }

    /// Start an attempt. Refused while another attempt is between
    /// `Preparing` and `Confirming`.
    pub async fn begin(&self) -> Result<Attempt> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_busy() {
            warn!(state = inner.state.name(), "write already in progress");
            return Err(BountyError::Busy);
        }

        inner.generation += 1;
        inner.steps.clear();
        inner.state = WorkflowState::Idle;
        inner.enter(WorkflowState::Preparing);
        self.watch.send_replace(inner.state.clone());

        let attempt = Attempt {
            id: Uuid::new_v4(),
            generation: inner.generation,
        };
        debug!(run = %attempt.id, "workflow attempt started");
        Ok(attempt)
    }

    pub async fn advance(&self, attempt: &Attempt, next: WorkflowState) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.generation != attempt.generation {
            debug!(run = %attempt.id, next = next.name(), "ignoring transition from abandoned attempt");
            return Err(BountyError::Abandoned);
        }

        info!(run = %attempt.id, from = inner.state.name(), to = next.name(), "workflow transition");
        inner.enter(next);
        self.watch.send_replace(inner.state.clone());
        Ok(())
    }

    /// Record a failure for `attempt`; a no-op once the attempt was reset.
    pub async fn fail(&self, attempt: &Attempt, err: &BountyError) {
        if matches!(err, BountyError::Abandoned) {
            return;
        }
        if self.advance(attempt, WorkflowState::failed(err)).await.is_ok() {
            warn!(run = %attempt.id, kind = ?err.kind(), error = %err, "workflow failed");
        }
    }

    /// Abandon whatever is running and return the state it was in, so a
    /// transaction sent but not yet confirmed is not lost. Late results from
    /// the abandoned attempt are discarded.
    pub async fn reset(&self) -> WorkflowState {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        let abandoned = std::mem::replace(&mut inner.state, WorkflowState::Idle);
        inner.entered = Instant::now();
        inner.steps.clear();
        self.watch.send_replace(WorkflowState::Idle);
        if let WorkflowState::Confirming { tx_hash } = &abandoned {
            warn!(tx = %tx_hash, "reset while a transaction was unconfirmed");
        }
        abandoned
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.watch.subscribe()
    }

    /// States left so far in the current attempt, with time spent in each.
    pub async fn steps(&self) -> Vec<StepRecord> {
        self.inner.lock().await.steps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_busy_handle_refuses_second_attempt() {
        let handle = WorkflowHandle::new();
        let attempt = handle.begin().await.unwrap();
        handle.advance(&attempt, WorkflowState::Uploading).await.unwrap();

        assert_eq!(handle.begin().await.unwrap_err(), BountyError::Busy);

        handle.fail(&attempt, &BountyError::UploadFailed("down".to_string())).await;
        assert!(handle.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_discards_late_transitions() {
        let handle = WorkflowHandle::new();
        let attempt = handle.begin().await.unwrap();
        let confirming = WorkflowState::Confirming {
            tx_hash: "0xbeef".to_string(),
        };
        handle.advance(&attempt, confirming.clone()).await.unwrap();

        assert_eq!(handle.reset().await, confirming);
        let late = handle
            .advance(
                &attempt,
                WorkflowState::Completed {
                    cid: None,
                    tx_hash: "0x1".to_string(),
                },
            )
            .await;

        assert_eq!(late, Err(BountyError::Abandoned));
        assert_eq!(handle.state().await, WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_steps_and_watch() {
        let handle = WorkflowHandle::new();
        let mut rx = handle.subscribe();
        let attempt = handle.begin().await.unwrap();
        handle.advance(&attempt, WorkflowState::Uploading).await.unwrap();
        handle.advance(&attempt, WorkflowState::Writing).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), WorkflowState::Writing);

        let steps: Vec<String> = handle.steps().await.into_iter().map(|s| s.step).collect();
        assert_eq!(steps, vec!["idle", "preparing", "uploading"]);
    }

    #[test]
    fn test_failed_state_keeps_category_and_hash() {
        let state = WorkflowState::failed(&BountyError::TransactionReverted {
            tx_hash: "0xdead".to_string(),
        });
        match state {
            WorkflowState::Failed { kind, tx_hash, .. } => {
                assert_eq!(kind, ErrorKind::TransactionReverted);
                assert_eq!(tx_hash.as_deref(), Some("0xdead"));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
