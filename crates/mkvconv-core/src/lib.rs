//! mkvconv-core: shared types, errors, configuration, and the job event channel.
//!
//! This crate is the foundational dependency for the other mkvconv crates,
//! providing the job data model, a unified error type, application
//! configuration, and the runner-to-controller event channel.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use events::{Event, EventReceiver, EventSender, JobEvent};
pub use ids::JobId;
pub use job::{
    derive_output_path, output_file_name, ConversionJob, EncodeSettings, FileTask, JobProgress,
    VideoRateControl,
};
