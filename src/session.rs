//! Drives one job from the controller's side of the event channel.

use mkvconv_av::{JobOutcome, JobRunner};
use mkvconv_core::ConversionJob;

use crate::controller::UiController;
use crate::view::View;

/// Run `job` on a background worker, folding each event into `controller`
/// and rendering it, until the worker finishes.
///
/// Render failures (for example a closed stdout) are logged and do not stop
/// the job.
pub async fn run_job(
    controller: &mut UiController,
    runner: &JobRunner,
    job: ConversionJob,
    view: &mut dyn View,
) -> JobOutcome {
    let job_id = job.id();
    let mut handle = runner.spawn(job);

    while let Some(event) = handle.events.recv().await {
        controller.handle_event(&event);
        if let Err(e) = view.render(controller, &event) {
            tracing::warn!(job_id = %job_id, "Failed to render event: {e}");
        }
    }

    handle.join().await
}

/// Process exit code for a finished job.
pub fn exit_code(outcome: &JobOutcome) -> u8 {
    match outcome {
        JobOutcome::Finished => 0,
        JobOutcome::Failed { .. } | JobOutcome::Errored { .. } => 1,
        JobOutcome::Cancelled => 130,
    }
}
