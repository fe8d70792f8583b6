//! Execution job lifecycle
//!
//! Each admitted request becomes a job with a generated identifier and a
//! monotonic state machine. States only move forward; the three terminal
//! states are absorbing.

use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::types::ExecutionRequest;

/// Lifecycle state of an execution job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, not yet waiting for a slot
    Pending,
    /// Waiting for admission
    Queued,
    /// Holding a slot, sandbox active
    Running,
    /// Program ran to completion (any exit code)
    Completed,
    /// Killed at the wall-clock timeout
    TimedOut,
    /// The service could not run the program (sandbox setup fault)
    Failed,
}

impl JobState {
    /// Check whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::TimedOut | JobState::Failed
        )
    }

    /// Check whether `next` is a legal forward transition from this state
    pub fn can_advance_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Queued)
                | (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::TimedOut)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Error raised on an illegal job state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal job transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// One admitted execution request with its lifecycle.
///
/// Owned exclusively by the orchestrator; never shared between tasks.
#[derive(Debug)]
pub struct ExecutionJob {
    id: Uuid,
    submitted_at: Instant,
    state: JobState,
    request: ExecutionRequest,
}

impl ExecutionJob {
    pub fn new(request: ExecutionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at: Instant::now(),
            state: JobState::Pending,
            request,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn request(&self) -> &ExecutionRequest {
        &self.request
    }

    /// Advance the job to `next`.
    ///
    /// Rejects backward transitions and transitions out of terminal states.
    pub fn advance(&mut self, next: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_advance_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(job = %self.id, from = ?self.state, to = ?next, "job transition");
        self.state = next;
        Ok(())
    }
}
