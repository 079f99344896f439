use clap::{Args, Parser, Subcommand, ValueEnum};
use mkvconv_core::VideoRateControl;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkvconv")]
#[command(author, version, about = "Batch MKV to MP4 converter")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert MKV files to MP4, one after another
    Convert {
        /// Files to convert, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        encode: EncodeArgs,

        /// Print events as JSON lines instead of the log view
        #[arg(long)]
        json: bool,
    },

    /// Print the converter invocation for one file without running it
    ShowCommand {
        /// File to convert
        #[arg(required = true)]
        file: PathBuf,

        #[command(flatten)]
        encode: EncodeArgs,

        /// Print the argument vector as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg can be found
    CheckTools {
        /// Use this ffmpeg executable instead of searching for one
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Output and encode options shared by conversion commands.
#[derive(Args)]
pub struct EncodeArgs {
    /// Output directory (defaults to output.directory from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Video bitrate in Mbps (1-50)
    #[arg(long)]
    pub video_bitrate: Option<u32>,

    /// Audio bitrate in kbps (64-320)
    #[arg(long)]
    pub audio_bitrate: Option<u32>,

    /// Video quality control
    #[arg(long, value_enum)]
    pub video_mode: Option<VideoMode>,

    /// Use this ffmpeg executable instead of searching for one
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VideoMode {
    /// Constant rate factor 23
    Crf,
    /// Target the video bitrate
    Bitrate,
}

impl From<VideoMode> for VideoRateControl {
    fn from(mode: VideoMode) -> Self {
        match mode {
            VideoMode::Crf => VideoRateControl::Crf,
            VideoMode::Bitrate => VideoRateControl::Bitrate,
        }
    }
}
