//! Unified error type for mkvconv.
//!
//! Library code funnels its failures into [`Error`]. The CLI maps each variant
//! to a process exit code via [`Error::exit_code`].

use std::path::PathBuf;

/// Unified error type covering all failure modes in mkvconv.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external executable could not be located.
    #[error("{tool} not found. {hint}")]
    MissingDependency {
        /// Name of the missing tool.
        tool: String,
        /// Platform-specific installation hint shown to the user.
        hint: String,
    },

    /// User input failed validation before a job was created.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two inputs in one job would write the same output file.
    #[error(
        "Output collision: {} and {} would both write {}",
        first.display(),
        second.display(),
        output.display()
    )]
    OutputCollision {
        /// The shared output path.
        output: PathBuf,
        /// The input that claimed the output first.
        first: PathBuf,
        /// The input that collides with it.
        second: PathBuf,
    },

    /// A job was started while another one is still running.
    #[error("A conversion is already running")]
    AlreadyRunning,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool could not be driven (spawn, stream or wait failed).
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to the exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingDependency { .. } => 127,
            Error::Validation(_) | Error::OutputCollision { .. } => 2,
            Error::Config(_) => 78,
            Error::AlreadyRunning | Error::Io { .. } | Error::Tool { .. } => 1,
        }
    }

    /// Convenience constructor for [`Error::MissingDependency`].
    pub fn missing_dependency(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::MissingDependency {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
