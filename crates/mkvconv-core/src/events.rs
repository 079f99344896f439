//! Job event channel.
//!
//! The runner is the single writer and the controller the single reader of a
//! `tokio::sync::mpsc` channel carrying [`Event`]s. Every event is stamped
//! with the job id and the time it was emitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ids::JobId;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// What happened during a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    // -- Task lifecycle ------------------------------------------------------
    TaskStarted {
        index: usize,
        total: usize,
    },
    CommandLogged {
        command_line: String,
    },
    LineLogged {
        index: usize,
        total: usize,
        line: String,
    },
    TaskFailed {
        file_name: String,
        exit_code: Option<i32>,
    },

    // -- Job termination -----------------------------------------------------
    JobFinished,
    JobErrored {
        message: String,
    },
    JobCancelled,
}

impl JobEvent {
    /// Whether this event ends the job. Exactly one terminal event is emitted
    /// per job and nothing follows it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::TaskFailed { .. }
                | JobEvent::JobFinished
                | JobEvent::JobErrored { .. }
                | JobEvent::JobCancelled
        )
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event tied to the job that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub job_id: JobId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: JobEvent,
}

impl Event {
    pub fn new(job_id: JobId, payload: JobEvent) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Receiving half of a job's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Sending half of a job's event channel, bound to one job id.
#[derive(Debug, Clone)]
pub struct EventSender {
    job_id: JobId,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Stamp and send an event. A dropped receiver is not an error: the job
    /// keeps running to completion with nobody watching.
    pub fn emit(&self, payload: JobEvent) {
        if self.tx.send(Event::new(self.job_id, payload)).is_err() {
            tracing::debug!(job_id = %self.job_id, "No receiver for job event");
        }
    }
}

/// Create the event channel for a job.
pub fn channel(job_id: JobId) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { job_id, tx }, rx)
}
