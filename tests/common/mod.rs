//! Shared fixtures for integration tests.
//!
//! [`FakeConverter`] writes a small shell script that stands in for ffmpeg.
//! It records every invocation, prints a few lines on stdout and stderr, and
//! then behaves according to the input's file name:
//!
//! - contains `fail`: exits with status 1
//! - contains `hang`: sleeps for 30 seconds
//! - otherwise: creates the output file and exits 0

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct FakeConverter {
    pub dir: TempDir,
    pub path: PathBuf,
    pub log: PathBuf,
}

impl FakeConverter {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("ffmpeg");
        let log = dir.path().join("invocations.log");

        let script = format!(
            r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo "ffmpeg version 9.9-fake"
    exit 0
fi
echo "$@" >> '{log}'
input="$3"
for last; do :; done
name=$(basename "$input")
echo "converting $name"
printf 'frame=1\rframe=2\r' 1>&2
case "$name" in
    *fail*) echo "simulated failure" 1>&2; exit 1 ;;
    *hang*) exec sleep 30 ;;
esac
: > "$last"
exit 0
"#,
            log = log.display()
        );

        fs::write(&path, script).expect("failed to write fake converter");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to make fake converter executable");

        Self { dir, path, log }
    }

    /// Argument lines recorded so far, one per invocation.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Input paths under `dir` for the given file names. The files are not
/// created; the fake converter never reads them.
pub fn inputs(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| dir.join(n)).collect()
}
