//! # mkvconv-av
//!
//! Converter discovery and job execution for mkvconv.
//!
//! This crate provides:
//!
//! - **Converter discovery** ([`ConverterLocator`]) -- find ffmpeg via an
//!   override path, platform install locations, then `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- argument-vector builder that
//!   spawns a process with stdout and stderr merged into one line stream.
//! - **Argument construction** ([`convert`]) -- the fixed MKV to MP4
//!   invocation.
//! - **Job execution** ([`JobRunner`]) -- sequential, cancellable batch
//!   runner reporting through the job event channel.

pub mod command;
pub mod convert;
pub mod runner;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{OutputLineCodec, RunningTool, ToolCommand};
pub use convert::{conversion_args, conversion_command};
pub use runner::{JobHandle, JobOutcome, JobRunner};
pub use tools::{Converter, ConverterLocator, DiscoverySource, ToolInfo};
