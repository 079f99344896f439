//! Front-end state for a conversion session.
//!
//! [`UiController`] owns everything the user edits (file list, bitrates,
//! output directory) and everything the user sees (start action, progress
//! indicator, log view). It packages a [`ConversionJob`] when the start
//! action is triggered and folds the runner's events back into view state.
//! It never touches the converter process itself.

mod file_list;

pub use file_list::FileList;

use std::path::{Path, PathBuf};

use mkvconv_core::job::{clamp_to, AUDIO_BITRATE_RANGE, VIDEO_BITRATE_RANGE};
use mkvconv_core::{
    ConversionJob, EncodeSettings, Error, Event, JobEvent, Result, VideoRateControl,
};

pub const MSG_NO_FILES: &str = "Please add files to convert";
pub const MSG_NO_OUTPUT_DIR: &str = "Please choose an output directory";
pub const MSG_SUCCESS: &str = "All files converted successfully!";
pub const MSG_CANCELLED: &str = "Conversion cancelled";

/// State of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    #[default]
    Idle,
    /// A job is starting; the total is not known yet.
    Indeterminate,
    Bounded {
        max: usize,
        value: usize,
    },
}

/// Outcome shown to the user for the most recent job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Running,
    Succeeded,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct UiController {
    files: FileList,
    output_dir: Option<PathBuf>,
    settings: EncodeSettings,
    start_enabled: bool,
    progress: Progress,
    status: Status,
    log: Vec<String>,
}

impl Default for UiController {
    fn default() -> Self {
        Self::new(EncodeSettings::default())
    }
}

impl UiController {
    pub fn new(settings: EncodeSettings) -> Self {
        Self {
            files: FileList::new(),
            output_dir: None,
            settings: settings.clamped(),
            start_enabled: true,
            progress: Progress::Idle,
            status: Status::Ready,
            log: Vec::new(),
        }
    }

    // -- Input ---------------------------------------------------------------

    /// Add files, skipping ones already listed. Returns how many were added.
    pub fn add_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        self.files.add_all(paths)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<PathBuf> {
        self.files.remove_at(index)
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
    }

    pub fn set_output_dir(&mut self, dir: Option<PathBuf>) {
        self.output_dir = dir;
    }

    /// Set the video bitrate in Mbps, clamped to the valid range.
    pub fn set_video_bitrate(&mut self, mbps: u32) {
        self.settings.video_bitrate = clamp_to(mbps, &VIDEO_BITRATE_RANGE);
    }

    /// Set the audio bitrate in kbps, clamped to the valid range.
    pub fn set_audio_bitrate(&mut self, kbps: u32) {
        self.settings.audio_bitrate = clamp_to(kbps, &AUDIO_BITRATE_RANGE);
    }

    pub fn set_rate_control(&mut self, mode: VideoRateControl) {
        self.settings.rate_control = mode;
    }

    // -- Start action --------------------------------------------------------

    /// Package the current input into a job and disable the start action.
    ///
    /// Rejected input is reported in the log view and returned as an error;
    /// no job is created and the start action stays enabled.
    pub fn start(&mut self, converter: &Path) -> Result<ConversionJob> {
        if !self.start_enabled {
            return Err(Error::AlreadyRunning);
        }

        if self.files.is_empty() {
            return Err(self.reject(Error::Validation(MSG_NO_FILES.into())));
        }

        let Some(output_dir) = self.output_dir.clone() else {
            return Err(self.reject(Error::Validation(MSG_NO_OUTPUT_DIR.into())));
        };

        if !output_dir.is_dir() {
            return Err(self.reject(Error::Validation(format!(
                "Output directory does not exist: {}",
                output_dir.display()
            ))));
        }

        let job = ConversionJob::new(
            self.files.paths().iter().cloned(),
            output_dir,
            converter,
            self.settings,
        )
        .map_err(|e| self.reject(e))?;

        tracing::info!(job_id = %job.id(), files = job.len(), "Starting conversion");
        self.start_enabled = false;
        self.progress = Progress::Indeterminate;
        self.status = Status::Running;
        Ok(job)
    }

    fn reject(&mut self, err: Error) -> Error {
        let message = match &err {
            Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        };
        tracing::debug!("Rejected start: {message}");
        self.log.push(message);
        err
    }

    // -- Events --------------------------------------------------------------

    /// Apply one runner event to the view state.
    pub fn handle_event(&mut self, event: &Event) {
        match &event.payload {
            JobEvent::TaskStarted { index, total } => {
                self.progress = Progress::Bounded {
                    max: *total,
                    value: *index,
                };
            }
            JobEvent::CommandLogged { command_line } => {
                self.log.push(format!("Running: {command_line}"));
            }
            JobEvent::LineLogged { index, total, line } => {
                self.log.push(format!("[{index}/{total}] {}", line.trim()));
            }
            JobEvent::JobFinished => {
                if let Progress::Bounded { max, .. } = self.progress {
                    self.progress = Progress::Bounded { max, value: max };
                }
                self.finish(Status::Succeeded, MSG_SUCCESS.to_string());
            }
            JobEvent::TaskFailed { file_name, .. } => {
                let message = format!("Failed to convert file {file_name}");
                self.fail(message);
            }
            JobEvent::JobErrored { message } => {
                self.fail(message.clone());
            }
            JobEvent::JobCancelled => {
                self.finish(Status::Cancelled, MSG_CANCELLED.to_string());
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.progress = match self.progress {
            Progress::Bounded { max, .. } => Progress::Bounded { max, value: 0 },
            _ => Progress::Idle,
        };
        self.finish(Status::Failed(message.clone()), format!("Error: {message}"));
    }

    fn finish(&mut self, status: Status, log_line: String) {
        self.log.push(log_line);
        self.status = status;
        self.start_enabled = true;
    }

    // -- View ----------------------------------------------------------------

    pub fn files(&self) -> &FileList {
        &self.files
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    pub fn is_start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Full log view.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Log lines appended since the view held `seen` lines.
    pub fn log_since(&self, seen: usize) -> &[String] {
        self.log.get(seen..).unwrap_or(&[])
    }
}
