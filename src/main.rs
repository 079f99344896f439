mod cli;

use mkvconv::controller::{UiController, MSG_NO_OUTPUT_DIR};
use mkvconv::session;
use mkvconv::view::{JsonView, TerminalView, View};
use mkvconv_av::tools::{install_hint, CONVERTER};
use mkvconv_av::{conversion_command, Converter, ConverterLocator, JobRunner};
use mkvconv_core::config::Config;
use mkvconv_core::{ConversionJob, EncodeSettings};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, EncodeArgs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mkvconv=trace,mkvconv_av=debug,mkvconv_core=debug".to_string()
        } else {
            "mkvconv=info,mkvconv_av=info,mkvconv_core=info".to_string()
        }
    });

    // Logs go to stderr so stdout carries only the log view or JSON events.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("mkvconv {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return Ok(report(&e)),
    };
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Commands::Convert {
            files,
            encode,
            json,
        } => convert(&config, files, &encode, json),
        Commands::ShowCommand { file, encode, json } => show_command(&config, file, &encode, json),
        Commands::CheckTools { ffmpeg } => check_tools(&config, ffmpeg.as_deref()),
        Commands::Version => Ok(ExitCode::SUCCESS),
    }
}

/// Print a library error and map it to its exit code.
fn report(err: &mkvconv_core::Error) -> ExitCode {
    eprintln!("Error: {err}");
    ExitCode::from(err.exit_code() as u8)
}

/// Config defaults overridden by command-line flags, clamped into range.
fn encode_settings(config: &Config, encode: &EncodeArgs) -> EncodeSettings {
    let mut settings = config.encode_settings();
    if let Some(mbps) = encode.video_bitrate {
        settings.video_bitrate = mbps;
    }
    if let Some(kbps) = encode.audio_bitrate {
        settings.audio_bitrate = kbps;
    }
    if let Some(mode) = encode.video_mode {
        settings.rate_control = mode.into();
    }

    let clamped = settings.clamped();
    if clamped != settings {
        tracing::warn!(
            video_bitrate = clamped.video_bitrate,
            audio_bitrate = clamped.audio_bitrate,
            "Bitrate out of range; clamped"
        );
    }
    clamped
}

fn locator(config: &Config, ffmpeg: Option<&Path>) -> ConverterLocator {
    let override_path = ffmpeg
        .map(Path::to_path_buf)
        .or_else(|| config.tools.ffmpeg_path.clone());
    let locator = ConverterLocator::new().with_override(override_path);
    match config.tools.ffmpeg_locations {
        Some(ref locations) => locator.with_candidates(locations.clone()),
        None => locator,
    }
}

fn convert(
    config: &Config,
    files: Vec<PathBuf>,
    encode: &EncodeArgs,
    json: bool,
) -> Result<ExitCode> {
    let converter: Converter = match locator(config, encode.ffmpeg.as_deref()).locate() {
        Ok(converter) => converter,
        Err(e) => return Ok(report(&e)),
    };
    tracing::info!(
        source = %converter.source,
        "Using {}",
        converter.path.display()
    );

    let mut controller = UiController::new(encode_settings(config, encode));
    let requested = files.len();
    let added = controller.add_files(files);
    if added < requested {
        tracing::warn!("Ignored {} duplicate file(s)", requested - added);
    }
    controller.set_output_dir(
        encode
            .output
            .clone()
            .or_else(|| config.output.directory.clone()),
    );

    let job = match controller.start(&converter.path) {
        Ok(job) => job,
        Err(e) => {
            for line in controller.log() {
                eprintln!("{line}");
            }
            return Ok(ExitCode::from(e.exit_code() as u8));
        }
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let outcome = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let runner = JobRunner::with_cancellation(cancel.clone());

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received; cancelling conversion");
                cancel.cancel();
            }
        });

        let mut view: Box<dyn View> = if json {
            Box::new(JsonView::new(std::io::stdout()))
        } else {
            Box::new(TerminalView::new(std::io::stdout()))
        };

        session::run_job(&mut controller, &runner, job, view.as_mut()).await
    });

    tracing::debug!(?outcome, "Conversion ended");
    Ok(ExitCode::from(session::exit_code(&outcome)))
}

fn show_command(
    config: &Config,
    file: PathBuf,
    encode: &EncodeArgs,
    json: bool,
) -> Result<ExitCode> {
    // An explicit path is printed as given, even if it does not exist here.
    let program = match encode.ffmpeg.clone().or_else(|| config.tools.ffmpeg_path.clone()) {
        Some(path) => path,
        None => locator(config, None)
            .locate()
            .map(|c| c.path)
            .unwrap_or_else(|_| PathBuf::from(CONVERTER)),
    };

    let Some(output_dir) = encode
        .output
        .clone()
        .or_else(|| config.output.directory.clone())
    else {
        eprintln!("{MSG_NO_OUTPUT_DIR}");
        return Ok(ExitCode::from(2));
    };

    let job = match ConversionJob::new([file], output_dir, program, encode_settings(config, encode))
    {
        Ok(job) => job,
        Err(e) => return Ok(report(&e)),
    };
    let cmd = conversion_command(job.converter(), &job.tasks()[0], job.settings());

    if json {
        let argv: Vec<String> = cmd
            .argv()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        println!(
            "{}",
            serde_json::to_string(&argv).context("failed to serialize arguments")?
        );
    } else {
        println!("{}", cmd.command_line());
    }

    Ok(ExitCode::SUCCESS)
}

fn check_tools(config: &Config, ffmpeg: Option<&Path>) -> Result<ExitCode> {
    println!("Checking external tools...\n");

    let info = locator(config, ffmpeg).check();
    let status = if info.available { "✓" } else { "✗" };

    print!("{} {}", status, info.name);
    if let Some(ref version) = info.version {
        print!(" ({})", version);
    }
    if let Some(ref path) = info.path {
        print!(" - {}", path.display());
    }
    if let Some(source) = info.source {
        print!(" [{}]", source);
    }
    println!();

    println!();
    if info.available {
        println!("All required tools are available!");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} not found. {}", info.name, install_hint());
        Ok(ExitCode::from(127))
    }
}
