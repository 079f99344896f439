//! Conversion job data model.
//!
//! A [`ConversionJob`] is an ordered, immutable list of [`FileTask`]s plus the
//! encode settings and the resolved converter executable. It is validated once
//! at construction: at least one input, no duplicate inputs, and no two inputs
//! mapping onto the same output file.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::JobId;

/// Extension given to every converted file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Valid video bitrate range in Mbps.
pub const VIDEO_BITRATE_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

/// Valid audio bitrate range in kbps.
pub const AUDIO_BITRATE_RANGE: std::ops::RangeInclusive<u32> = 64..=320;

/// How the video stream's quality is controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoRateControl {
    /// Quality-driven encode with a fixed constant rate factor.
    #[default]
    Crf,
    /// Bitrate-driven encode using the job's video bitrate.
    Bitrate,
}

impl std::str::FromStr for VideoRateControl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crf" => Ok(Self::Crf),
            "bitrate" => Ok(Self::Bitrate),
            other => Err(format!("unknown video mode '{other}' (expected crf or bitrate)")),
        }
    }
}

/// User-chosen encode settings carried by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Video bitrate in Mbps.
    pub video_bitrate: u32,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    /// Video quality control mode.
    pub rate_control: VideoRateControl,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_bitrate: 8,
            audio_bitrate: 192,
            rate_control: VideoRateControl::Crf,
        }
    }
}

impl EncodeSettings {
    /// Return a copy with both bitrates clamped into their valid ranges.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            video_bitrate: clamp_to(self.video_bitrate, &VIDEO_BITRATE_RANGE),
            audio_bitrate: clamp_to(self.audio_bitrate, &AUDIO_BITRATE_RANGE),
            rate_control: self.rate_control,
        }
    }
}

/// Clamp `value` into an inclusive range.
pub fn clamp_to(value: u32, range: &std::ops::RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

/// Output file name for an input: its stem with the extension replaced by
/// `.mp4`. Returns `None` for paths without a file name.
pub fn output_file_name(input: &Path) -> Option<OsString> {
    let stem = input.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    Some(name)
}

/// Derive the output path for `input` inside `output_dir`.
pub fn derive_output_path(output_dir: &Path, input: &Path) -> Option<PathBuf> {
    output_file_name(input).map(|name| output_dir.join(name))
}

/// One input/output pair within a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    input: PathBuf,
    output: PathBuf,
}

impl FileTask {
    /// Source file path.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Destination file path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Base name of the input, used in user-facing messages.
    pub fn file_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input.to_string_lossy().to_string())
    }
}

/// A validated, immutable batch of conversions.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    id: JobId,
    tasks: Vec<FileTask>,
    output_dir: PathBuf,
    settings: EncodeSettings,
    converter: PathBuf,
}

impl ConversionJob {
    /// Build a job from ordered input paths.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `inputs` is empty, contains a duplicate,
    ///   contains a path without a file name, or contains a file whose output
    ///   path is the input itself.
    /// - [`Error::OutputCollision`] if two inputs share a file stem.
    pub fn new(
        inputs: impl IntoIterator<Item = PathBuf>,
        output_dir: impl Into<PathBuf>,
        converter: impl Into<PathBuf>,
        settings: EncodeSettings,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        let mut tasks = Vec::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for input in inputs {
            let output = derive_output_path(&output_dir, &input).ok_or_else(|| {
                Error::Validation(format!("not a file path: {}", input.display()))
            })?;

            if output == input {
                return Err(Error::Validation(format!(
                    "output would overwrite input: {}",
                    input.display()
                )));
            }

            if let Some(first) = claimed.get(&output) {
                if *first == input {
                    return Err(Error::Validation(format!(
                        "duplicate input: {}",
                        input.display()
                    )));
                }
                return Err(Error::OutputCollision {
                    output,
                    first: first.clone(),
                    second: input,
                });
            }

            claimed.insert(output.clone(), input.clone());
            tasks.push(FileTask { input, output });
        }

        if tasks.is_empty() {
            return Err(Error::Validation("no input files".into()));
        }

        Ok(Self {
            id: JobId::new(),
            tasks,
            output_dir,
            settings,
            converter: converter.into(),
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    pub fn converter(&self) -> &Path {
        &self.converter
    }

    /// Number of tasks in the job (always at least one).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always `false`; a job cannot be constructed without tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Runner-owned progress of a job in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobProgress {
    /// 1-based index of the task being executed (0 before the first task).
    pub current: usize,
    /// Total number of tasks.
    pub total: usize,
    /// Most recent line of converter output.
    pub last_line: Option<String>,
}

impl JobProgress {
    pub fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            last_line: None,
        }
    }

    /// Move on to the next task, forgetting the previous task's output.
    pub fn advance(&mut self) {
        self.current += 1;
        self.last_line = None;
    }

    pub fn record_line(&mut self, line: &str) {
        self.last_line = Some(line.to_string());
    }
}
