//! MKV to MP4 argument construction for ffmpeg.
//!
//! The argument order is the contract with the converter and is kept fixed:
//! H.264 High@4.0 yuv420p video, 48 kHz stereo AAC audio, and `+faststart` so
//! the `moov` atom precedes the media data for progressive playback.

use std::ffi::OsString;
use std::path::Path;

use mkvconv_core::{EncodeSettings, FileTask, VideoRateControl};

use crate::command::ToolCommand;

pub const VIDEO_ENCODER: &str = "libx264";
pub const VIDEO_PRESET: &str = "medium";
pub const VIDEO_CRF: u32 = 23;
pub const VIDEO_PROFILE: &str = "high";
pub const VIDEO_LEVEL: &str = "4.0";
pub const PIXEL_FORMAT: &str = "yuv420p";
pub const AUDIO_ENCODER: &str = "aac";
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
pub const AUDIO_CHANNELS: u32 = 2;

/// Arguments (without the program) converting `task` with `settings`.
pub fn conversion_args(task: &FileTask, settings: &EncodeSettings) -> Vec<OsString> {
    let quality = match settings.rate_control {
        VideoRateControl::Crf => ["-crf".to_string(), VIDEO_CRF.to_string()],
        VideoRateControl::Bitrate => ["-b:v".to_string(), format!("{}M", settings.video_bitrate)],
    };

    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), task.input().into()];
    args.extend(["-c:v", VIDEO_ENCODER, "-preset", VIDEO_PRESET].map(OsString::from));
    args.extend(quality.map(OsString::from));
    args.extend(
        [
            "-profile:v",
            VIDEO_PROFILE,
            "-level",
            VIDEO_LEVEL,
            "-pix_fmt",
            PIXEL_FORMAT,
            "-c:a",
            AUDIO_ENCODER,
        ]
        .map(OsString::from),
    );
    args.extend(
        [
            "-b:a".to_string(),
            format!("{}k", settings.audio_bitrate),
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            AUDIO_CHANNELS.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
        .map(OsString::from),
    );
    args.push(task.output().into());
    args
}

/// Full converter invocation for one task.
pub fn conversion_command(
    converter: &Path,
    task: &FileTask,
    settings: &EncodeSettings,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(converter.to_path_buf());
    cmd.args(conversion_args(task, settings));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkvconv_core::ConversionJob;
    use std::path::PathBuf;

    fn single_task_job(input: &str, settings: EncodeSettings) -> ConversionJob {
        ConversionJob::new([PathBuf::from(input)], "/out", "ffmpeg", settings).unwrap()
    }

    fn lossy(argv: Vec<OsString>) -> Vec<String> {
        argv.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn crf_invocation_matches_contract() {
        let settings = EncodeSettings {
            audio_bitrate: 192,
            ..EncodeSettings::default()
        };
        let job = single_task_job("clip.mkv", settings);
        let cmd = conversion_command(job.converter(), &job.tasks()[0], job.settings());

        let output = Path::new("/out").join("clip.mp4");
        let output = output.to_string_lossy().into_owned();
        let expected = [
            "ffmpeg", "-y", "-i", "clip.mkv", "-c:v", "libx264", "-preset", "medium", "-crf",
            "23", "-profile:v", "high", "-level", "4.0", "-pix_fmt", "yuv420p", "-c:a", "aac",
            "-b:a", "192k", "-ar", "48000", "-ac", "2", "-movflags", "+faststart",
            output.as_str(),
        ];
        assert_eq!(lossy(cmd.argv()), expected);
    }

    #[test]
    fn bitrate_mode_replaces_crf() {
        let settings = EncodeSettings {
            video_bitrate: 12,
            audio_bitrate: 256,
            rate_control: VideoRateControl::Bitrate,
        };
        let job = single_task_job("/media/show.mkv", settings);
        let args = lossy(conversion_args(&job.tasks()[0], job.settings()));

        assert!(!args.iter().any(|a| a == "-crf"));
        let pos = args.iter().position(|a| a == "-b:v").unwrap();
        assert_eq!(args[pos + 1], "12M");
        assert_eq!(args[pos - 1], "medium");
        assert_eq!(args[pos + 2], "-profile:v");
        assert!(args.contains(&"256k".to_string()));
    }

    #[test]
    fn input_and_output_are_single_arguments() {
        let job = single_task_job("/media/My Movie (2024).mkv", EncodeSettings::default());
        let args = lossy(conversion_args(&job.tasks()[0], job.settings()));
        assert_eq!(args[2], "/media/My Movie (2024).mkv");
        assert!(args.last().unwrap().ends_with("My Movie (2024).mp4"));
    }
}
