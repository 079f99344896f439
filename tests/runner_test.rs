//! Integration tests for the sequential job runner, using a fake converter.

#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use mkvconv_av::{JobOutcome, JobRunner};
use mkvconv_core::events;
use mkvconv_core::{ConversionJob, EncodeSettings, Event, EventReceiver, JobEvent};
use tempfile::TempDir;

use common::{inputs, FakeConverter};

fn job(fake: &FakeConverter, out: &TempDir, names: &[&str]) -> ConversionJob {
    ConversionJob::new(
        inputs(fake.dir.path(), names),
        out.path(),
        &fake.path,
        EncodeSettings::default(),
    )
    .unwrap()
}

fn drain(rx: &mut EventReceiver) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(Event { payload, .. }) = rx.try_recv() {
        events.push(payload);
    }
    events
}

fn started(events: &[JobEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::TaskStarted { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn all_tasks_succeed_in_order() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = job(&fake, &out, &["one.mkv", "two.mkv", "three.mkv"]);

    let (tx, mut rx) = events::channel(job.id());
    let outcome = JobRunner::new().run(&job, &tx).await;
    let events = drain(&mut rx);

    assert_eq!(outcome, JobOutcome::Finished);
    assert_eq!(started(&events), [1, 2, 3]);
    assert_eq!(
        events.iter().filter(|e| **e == JobEvent::JobFinished).count(),
        1
    );
    assert_eq!(events.last(), Some(&JobEvent::JobFinished));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    for name in ["one.mp4", "two.mp4", "three.mp4"] {
        assert!(out.path().join(name).exists(), "{name} was not written");
    }

    let calls = fake.invocations();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].contains("one.mkv"));
    assert!(calls[1].contains("two.mkv"));
    assert!(calls[2].contains("three.mkv"));
}

#[tokio::test]
async fn output_lines_are_streamed_per_task() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = job(&fake, &out, &["clip.mkv"]);

    let (tx, mut rx) = events::channel(job.id());
    JobRunner::new().run(&job, &tx).await;
    let events = drain(&mut rx);

    assert_matches!(&events[1], JobEvent::CommandLogged { command_line } => {
        assert!(command_line.contains("-movflags +faststart"));
    });

    let lines: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::LineLogged { index, total, line } => {
                assert_eq!((*index, *total), (1, 1));
                Some(line.as_str())
            }
            _ => None,
        })
        .collect();
    assert!(lines.contains(&"converting clip.mkv"));
    assert!(lines.contains(&"frame=1"));
    assert!(lines.contains(&"frame=2"));
}

#[tokio::test]
async fn failing_task_stops_the_batch() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = job(&fake, &out, &["a.mkv", "b_fail.mkv", "c.mkv"]);

    let (tx, mut rx) = events::channel(job.id());
    let outcome = JobRunner::new().run(&job, &tx).await;
    let events = drain(&mut rx);

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            file_name: "b_fail.mkv".into(),
            exit_code: Some(1),
        }
    );
    assert_eq!(started(&events), [1, 2]);
    assert_eq!(
        events.last(),
        Some(&JobEvent::TaskFailed {
            file_name: "b_fail.mkv".into(),
            exit_code: Some(1),
        })
    );
    assert!(!events.contains(&JobEvent::JobFinished));
    assert_eq!(fake.invocations().len(), 2);
    assert!(!out.path().join("c.mp4").exists());
}

#[tokio::test]
async fn spawn_failure_errors_the_job() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = ConversionJob::new(
        inputs(fake.dir.path(), &["a.mkv", "b.mkv"]),
        out.path(),
        fake.dir.path().join("no-such-ffmpeg"),
        EncodeSettings::default(),
    )
    .unwrap();

    let (tx, mut rx) = events::channel(job.id());
    let outcome = JobRunner::new().run(&job, &tx).await;
    let events = drain(&mut rx);

    assert_matches!(outcome, JobOutcome::Errored { ref message } => {
        assert!(message.contains("failed to spawn"), "unexpected message: {message}");
    });
    assert_eq!(started(&events), [1]);
    assert_matches!(events.last(), Some(JobEvent::JobErrored { .. }));
}

#[tokio::test]
async fn cancellation_kills_running_converter() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = job(&fake, &out, &["first.mkv", "hang.mkv", "never.mkv"]);

    let runner = JobRunner::new();
    let mut handle = runner.spawn(job);
    let begin = Instant::now();

    let mut seen = Vec::new();
    while let Some(event) = handle.events.recv().await {
        let is_hang_output = matches!(
            &event.payload,
            JobEvent::LineLogged { index: 2, line, .. } if line == "converting hang.mkv"
        );
        seen.push(event.payload);
        if is_hang_output {
            handle.cancel();
        }
    }

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle.join())
        .await
        .expect("runner did not stop after cancellation");

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(begin.elapsed() < Duration::from_secs(20));
    assert_eq!(started(&seen), [1, 2]);
    assert_eq!(seen.last(), Some(&JobEvent::JobCancelled));
    assert_eq!(fake.invocations().len(), 2);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let fake = FakeConverter::new();
    let out = TempDir::new().unwrap();
    let job = job(&fake, &out, &["a.mkv"]);

    let runner = JobRunner::new();
    runner.cancel_token().cancel();

    let (tx, mut rx) = events::channel(job.id());
    let outcome = runner.run(&job, &tx).await;

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert_eq!(drain(&mut rx), [JobEvent::JobCancelled]);
    assert!(fake.invocations().is_empty());
}
