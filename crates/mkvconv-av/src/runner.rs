//! Sequential batch runner for conversion jobs.
//!
//! A job's tasks run strictly in order, one converter process at a time.
//! Each process is launched, its merged output streamed line by line as
//! [`JobEvent::LineLogged`], then awaited. The first non-zero exit ends the
//! job with [`JobEvent::TaskFailed`]; a spawn/stream/wait fault ends it with
//! [`JobEvent::JobErrored`]. Nothing is retried.
//!
//! Cancellation is cooperative: when the runner's [`CancellationToken`] fires
//! the running process is killed and reaped before [`JobEvent::JobCancelled`]
//! is emitted.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mkvconv_core::events::{self, EventReceiver, EventSender};
use mkvconv_core::{ConversionJob, FileTask, JobEvent, JobProgress};

use crate::command::RunningTool;
use crate::convert::conversion_command;

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Finished,
    Failed {
        file_name: String,
        exit_code: Option<i32>,
    },
    Errored {
        message: String,
    },
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Finished)
    }
}

/// How a single task ended when it did not fault.
#[derive(Debug, PartialEq, Eq)]
enum TaskOutcome {
    Succeeded,
    Failed { exit_code: Option<i32> },
    Cancelled,
}

/// Executes conversion jobs.
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that stops when `cancel` is triggered.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Token that cancels jobs run by this runner.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `job` to completion, first failure, fault, or cancellation,
    /// reporting through `events`. Exactly one terminal event is emitted.
    pub async fn run(&self, job: &ConversionJob, events: &EventSender) -> JobOutcome {
        let job_id = job.id();
        let mut progress = JobProgress::new(job.len());

        info!(
            job_id = %job_id,
            files = job.len(),
            output_dir = %job.output_dir().display(),
            "Starting conversion job"
        );

        for task in job.tasks() {
            if self.cancel.is_cancelled() {
                return self.cancelled(events, &progress);
            }

            progress.advance();
            events.emit(JobEvent::TaskStarted {
                index: progress.current,
                total: progress.total,
            });
            info!(
                job_id = %job_id,
                task = progress.current,
                total = progress.total,
                "Converting {}",
                task.file_name()
            );

            match self.run_task(job, task, &mut progress, events).await {
                Ok(TaskOutcome::Succeeded) => {
                    info!(job_id = %job_id, task = progress.current, "Task finished");
                }
                Ok(TaskOutcome::Failed { exit_code }) => {
                    let file_name = task.file_name();
                    warn!(
                        job_id = %job_id,
                        task = progress.current,
                        exit_code = ?exit_code,
                        last_line = progress.last_line.as_deref().unwrap_or(""),
                        "Conversion of {file_name} failed"
                    );
                    events.emit(JobEvent::TaskFailed {
                        file_name: file_name.clone(),
                        exit_code,
                    });
                    return JobOutcome::Failed {
                        file_name,
                        exit_code,
                    };
                }
                Ok(TaskOutcome::Cancelled) => return self.cancelled(events, &progress),
                Err(e) => {
                    let message = e.to_string();
                    error!(job_id = %job_id, task = progress.current, error = %message, "Conversion job errored");
                    events.emit(JobEvent::JobErrored {
                        message: message.clone(),
                    });
                    return JobOutcome::Errored { message };
                }
            }
        }

        info!(job_id = %job_id, "Conversion job finished");
        events.emit(JobEvent::JobFinished);
        JobOutcome::Finished
    }

    fn cancelled(&self, events: &EventSender, progress: &JobProgress) -> JobOutcome {
        info!(
            job_id = %events.job_id(),
            completed = progress.current.saturating_sub(1),
            total = progress.total,
            "Conversion job cancelled"
        );
        events.emit(JobEvent::JobCancelled);
        JobOutcome::Cancelled
    }

    /// Launch, stream, wait and evaluate one task. The process is reaped on
    /// every path out of this function.
    async fn run_task(
        &self,
        job: &ConversionJob,
        task: &FileTask,
        progress: &mut JobProgress,
        events: &EventSender,
    ) -> mkvconv_core::Result<TaskOutcome> {
        let cmd = conversion_command(job.converter(), task, job.settings());
        debug!(args = ?cmd.get_args(), "Converter invocation");
        events.emit(JobEvent::CommandLogged {
            command_line: cmd.command_line(),
        });

        let mut running = cmd.spawn_merged()?;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                line = running.next_line() => Some(line),
            };

            let Some(line) = next else {
                return Ok(stop_cancelled(&mut running).await);
            };

            match line {
                Ok(Some(line)) => {
                    progress.record_line(&line);
                    events.emit(JobEvent::LineLogged {
                        index: progress.current,
                        total: progress.total,
                        line,
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = running.kill().await;
                    return Err(e);
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            status = running.wait() => Some(status?),
        };

        let Some(status) = status else {
            return Ok(stop_cancelled(&mut running).await);
        };

        if status.success() {
            Ok(TaskOutcome::Succeeded)
        } else {
            Ok(TaskOutcome::Failed {
                exit_code: status.code(),
            })
        }
    }

    /// Run `job` on a background task. Events arrive on the returned handle's
    /// receiver; the controller never blocks on the converter.
    pub fn spawn(&self, job: ConversionJob) -> JobHandle {
        let (tx, rx) = events::channel(job.id());
        let runner = self.clone();
        let task = tokio::spawn(async move { runner.run(&job, &tx).await });

        JobHandle {
            events: rx,
            task,
            cancel: self.cancel.clone(),
        }
    }
}

/// Kill a task's process after cancellation. The job is cancelled either
/// way; a failed kill is only logged.
async fn stop_cancelled(running: &mut RunningTool) -> TaskOutcome {
    if let Err(e) = running.kill().await {
        warn!(pid = ?running.id(), error = %e, "Failed to kill converter after cancellation");
    }
    TaskOutcome::Cancelled
}

/// A job running on a background task.
pub struct JobHandle {
    /// Events emitted by the runner, in order.
    pub events: EventReceiver,
    task: JoinHandle<JobOutcome>,
    cancel: CancellationToken,
}

impl JobHandle {
    /// Request cancellation of the running job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job's terminal state.
    pub async fn join(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Errored {
                message: format!("conversion worker failed: {e}"),
            },
        }
    }
}
