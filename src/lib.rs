//! mkvconv - batch MKV to MP4 conversion driving ffmpeg
//!
//! This library crate exposes the front end for the binary and for
//! integration testing.

pub mod controller;
pub mod session;
pub mod view;
