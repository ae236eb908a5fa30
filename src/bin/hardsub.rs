use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use hardsub::{
    CaptionStyle, FfmpegLogLevel, ProgressCallback, ProgressInfo, RenderOptions, SourceVideo,
    VideoCodec,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  hardsub serve --port 8080\n  hardsub burn input.mp4 input.srt --out subtitled.mp4 --progress\n  hardsub cues input.srt --json\n  hardsub probe input.mp4\n  hardsub completions zsh > _hardsub";

#[derive(Debug, Parser)]
#[command(
    name = "hardsub",
    version,
    about = "Burn SRT subtitles into video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while rendering.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Parser, Clone)]
struct StyleOptions {
    /// Font file to draw captions with instead of the default family.
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Font size in pixels.
    #[arg(long, default_value_t = 36.0)]
    font_size: f32,

    /// Width in pixels past which captions wrap.
    #[arg(long, default_value_t = 600)]
    max_text_width: u32,
}

impl StyleOptions {
    fn to_style(&self) -> CaptionStyle {
        let mut style = CaptionStyle::new()
            .font_size(self.font_size)
            .max_text_width(self.max_text_width);
        if let Some(font_file) = &self.font_file {
            style = style.font_file(font_file);
        }
        style
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP service.
    #[command(
        about = "Serve POST /add_subtitles over HTTP",
        after_help = "Examples:\n  hardsub serve\n  HARDSUB_PORT=8080 hardsub serve --max-upload-mb 1024"
    )]
    Serve {
        /// Address to bind.
        #[arg(long, env = "HARDSUB_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on.
        #[arg(long, env = "HARDSUB_PORT", default_value_t = 3000)]
        port: u16,
        /// Largest accepted upload, in mebibytes.
        #[arg(long, default_value_t = 512)]
        max_upload_mb: usize,
        #[command(flatten)]
        style: StyleOptions,
    },

    /// Burn an SRT file into a video file.
    #[command(
        about = "Burn subtitles into a video file",
        after_help = "Examples:\n  hardsub burn input.mp4 input.srt --out subtitled.mp4\n  hardsub burn input.mkv input.srt --out out.mp4 --crf 18 --preset slow --no-audio"
    )]
    Burn {
        /// Input video path.
        video: PathBuf,
        /// SRT subtitle path.
        srt: PathBuf,
        /// Output MP4 path.
        #[arg(long)]
        out: PathBuf,
        /// Constant Rate Factor (0-51, lower is better).
        #[arg(long, default_value_t = 23)]
        crf: u32,
        /// Encoder preset (ultrafast ... veryslow).
        #[arg(long, default_value = "medium")]
        preset: String,
        /// Output codec: h264 | h265 | mpeg4.
        #[arg(long, default_value = "h264")]
        codec: String,
        /// Drop the source audio.
        #[arg(long)]
        no_audio: bool,
        #[command(flatten)]
        style: StyleOptions,
    },

    /// Print the cues parsed from an SRT file.
    #[command(
        about = "List parsed SRT cues",
        after_help = "Examples:\n  hardsub cues input.srt\n  hardsub cues input.srt --json"
    )]
    Cues {
        /// SRT subtitle path.
        srt: PathBuf,
        /// Output cues as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata for a video file.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_codec(value: &str) -> Option<VideoCodec> {
    match value.to_ascii_lowercase().as_str() {
        "h264" | "avc" | "x264" => Some(VideoCodec::H264),
        "h265" | "hevc" | "x265" => Some(VideoCodec::H265),
        "mpeg4" => Some(VideoCodec::Mpeg4),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter.as_str()))
        .init();

    let ffmpeg_level = match &global.log_level {
        Some(level) => level
            .parse::<FfmpegLogLevel>()
            .map_err(|_| format!("unsupported --log-level: {level}"))?,
        None if global.verbose => FfmpegLogLevel::Info,
        None => FfmpegLogLevel::from_log_filter(log::LevelFilter::Error),
    };
    hardsub::set_ffmpeg_log_level(ffmpeg_level);

    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_upload_mb,
            style,
        } => serve(&host, port, max_upload_mb, style.to_style())?,
        Commands::Burn {
            video,
            srt,
            out,
            crf,
            preset,
            codec,
            no_audio,
            style,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let codec = parse_codec(&codec).ok_or(format!("unsupported --codec: {codec}"))?;

            let mut options = RenderOptions::new()
                .with_codec(codec)
                .with_crf(crf)
                .with_preset(preset);
            if no_audio {
                options = options.without_audio();
            }
            let progress = cli.global.progress.then(|| Arc::new(TerminalProgress::new()));
            if let Some(progress) = &progress {
                options = options.with_progress(progress.clone());
            }

            hardsub::burn_file(&video, &srt, &out, &style.to_style(), &options)?;

            if let Some(progress) = &progress {
                progress.finish();
            }
            println!("{} {}", "wrote".green().bold(), out.display());
        }
        Commands::Cues { srt, json } => {
            let text = fs::read_to_string(&srt)?;
            let records = hardsub::srt::parse(&text)?;
            if json {
                let payload: Vec<_> = records
                    .iter()
                    .map(|record| {
                        json!({
                            "start_time": record.start_time,
                            "end_time": record.end_time,
                            "text": record.text,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for record in &records {
                    println!("{record}");
                }
                eprintln!("{} {} cues", "parsed".cyan().bold(), records.len());
            }
        }
        Commands::Probe { input, json } => {
            let source = SourceVideo::open(&input)?;
            let metadata = source.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "video": {
                        "width": metadata.video.width,
                        "height": metadata.video.height,
                        "fps": metadata.video.frames_per_second,
                        "frame_count": metadata.video.frame_count,
                        "codec": metadata.video.codec,
                    },
                    "audio": metadata.audio.as_ref().map(|audio| json!({
                        "sample_rate": audio.sample_rate,
                        "channels": audio.channels,
                        "codec": audio.codec,
                        "bit_rate": audio.bit_rate,
                    })),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.3} fps, {} ({} frames)",
                    metadata.video.width,
                    metadata.video.height,
                    metadata.video.frames_per_second,
                    metadata.video.codec,
                    metadata.video.frame_count
                );
                match &metadata.audio {
                    Some(audio) => println!(
                        "Audio: {} Hz, {} channel(s), {}",
                        audio.sample_rate, audio.channels, audio.codec
                    ),
                    None => println!("Audio: none"),
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "hardsub", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
fn serve(
    host: &str,
    port: u16,
    max_upload_mb: usize,
    style: CaptionStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    let address = format!("{host}:{port}")
        .parse()
        .map_err(|error| format!("invalid --host/--port: {error}"))?;
    let config = hardsub::ServerConfig::new()
        .with_address(address)
        .with_max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024))
        .with_style(style);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(hardsub::server::serve(config))?;
    Ok(())
}

#[cfg(not(feature = "server"))]
fn serve(
    _host: &str,
    _port: u16,
    _max_upload_mb: usize,
    _style: CaptionStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("the `serve` command requires building with the `server` feature".into())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, ensure_writable_path, parse_codec};
    use clap::Parser;
    use hardsub::VideoCodec;

    #[test]
    fn parse_codec_aliases() {
        assert_eq!(parse_codec("h264"), Some(VideoCodec::H264));
        assert_eq!(parse_codec("HEVC"), Some(VideoCodec::H265));
        assert_eq!(parse_codec("mpeg4"), Some(VideoCodec::Mpeg4));
        assert_eq!(parse_codec("vp9"), None);
    }

    #[test]
    fn existing_output_requires_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_writable_path(file.path(), false).is_err());
        assert!(ensure_writable_path(file.path(), true).is_ok());
        assert!(ensure_writable_path(&file.path().with_extension("missing"), false).is_ok());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["hardsub", "cues", "input.srt", "--verbose"]).unwrap();
        assert!(cli.global.verbose);
    }
}
