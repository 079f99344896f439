//! Benchmarks for converter command construction
//!
//! Tests performance of job validation and ffmpeg argument building.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mkvconv_av::{conversion_args, conversion_command};
use mkvconv_core::{derive_output_path, ConversionJob, EncodeSettings, VideoRateControl};
use std::path::{Path, PathBuf};

const SHORT_INPUT: &str = "/media/clip.mkv";
const LONG_INPUT: &str =
    "/media/movies/My Movie (2024)/My.Movie.2024.2160p.UHD.BluRay.x265-GROUP.mkv";

fn batch(size: usize) -> Vec<PathBuf> {
    (0..size)
        .map(|i| PathBuf::from(format!("/media/season01/episode.{i:03}.mkv")))
        .collect()
}

fn bench_derive_output_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_output_path");
    let out = Path::new("/converted");

    for (name, input) in [("short", SHORT_INPUT), ("long", LONG_INPUT)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| derive_output_path(black_box(out), black_box(Path::new(input))))
        });
    }

    group.finish();
}

fn bench_conversion_args(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion_args");

    let crf = EncodeSettings::default();
    let bitrate = EncodeSettings {
        rate_control: VideoRateControl::Bitrate,
        ..EncodeSettings::default()
    };

    for (name, settings) in [("crf", crf), ("bitrate", bitrate)] {
        let job = ConversionJob::new([PathBuf::from(LONG_INPUT)], "/converted", "ffmpeg", settings)
            .expect("valid job");
        group.bench_with_input(BenchmarkId::from_parameter(name), &job, |b, job| {
            b.iter(|| conversion_args(black_box(&job.tasks()[0]), black_box(job.settings())))
        });
    }

    group.finish();
}

fn bench_job_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_commands");

    for size in [1usize, 10, 100] {
        let inputs = batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &inputs, |b, inputs| {
            b.iter(|| {
                let job = ConversionJob::new(
                    inputs.iter().cloned(),
                    "/converted",
                    "/usr/bin/ffmpeg",
                    EncodeSettings::default(),
                )
                .expect("valid job");
                job.tasks()
                    .iter()
                    .map(|task| conversion_command(job.converter(), task, job.settings()))
                    .count()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_derive_output_path,
    bench_conversion_args,
    bench_job_commands
);
criterion_main!(benches);
