use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser, ValueEnum};
use mediastack::{
    Constraint, ImagePosition, RunMode, Settings, SingleOpts, VideoCombiner, ensure_parent_dir,
    resolve_mode,
};

/// Stack images and videos vertically into one video (requires `ffmpeg`/`ffprobe` on PATH).
#[derive(Parser, Debug)]
#[command(name = "mediastack", version)]
struct Cli {
    /// Folder of images/videos to stack in file-name order.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Video to combine with `--image`.
    #[arg(long)]
    video: Option<PathBuf>,

    /// Image to combine with `--video`.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Output video path [default: $DEFAULT_OUTPUT or output/output.mp4].
    #[arg(long)]
    output: Option<PathBuf>,

    /// How images are sized against the reference video [default: $DEFAULT_CONSTRAINT or width].
    #[arg(long, value_enum)]
    constraint: Option<ConstraintArg>,

    /// Rows to crop from the bottom of the video (video + image mode only).
    #[arg(long)]
    crop_bottom: Option<u32>,

    /// Image placement (video + image mode only).
    #[arg(long, value_enum)]
    image_position: Option<PositionArg>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConstraintArg {
    Width,
    Height,
}

impl From<ConstraintArg> for Constraint {
    fn from(c: ConstraintArg) -> Self {
        match c {
            ConstraintArg::Width => Constraint::Width,
            ConstraintArg::Height => Constraint::Height,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PositionArg {
    Top,
    Bottom,
}

impl From<PositionArg> for ImagePosition {
    fn from(p: PositionArg) -> Self {
        match p {
            PositionArg::Top => ImagePosition::Top,
            PositionArg::Bottom => ImagePosition::Bottom,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::from_env().context("read default settings from environment")?;
    let mode = resolve_mode(
        cli.input.as_deref(),
        cli.video.as_deref(),
        cli.image.as_deref(),
    )?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| settings.default_output.clone());
    ensure_parent_dir(&output)?;

    let constraint = cli
        .constraint
        .map(Constraint::from)
        .unwrap_or(settings.default_constraint);
    let combiner = VideoCombiner::new(constraint);
    let single = SingleOpts {
        crop_bottom: cli.crop_bottom.unwrap_or(settings.default_crop_bottom),
        image_position: cli
            .image_position
            .map(ImagePosition::from)
            .unwrap_or(settings.default_image_position),
    };

    let stats = match &mode {
        RunMode::Folder { input } => {
            eprintln!("combining assets from folder: {}", input.display());
            combiner.combine_from_folder(input, &output)?
        }
        RunMode::Legacy { video, image } => {
            eprintln!("combining video and image");
            combiner.combine_single(video, image, &output, single)?
        }
        RunMode::LegacyDefaults => {
            eprintln!("combining video and image (configured defaults)");
            combiner.combine_single(
                &settings.default_video,
                &settings.default_image,
                &output,
                single,
            )?
        }
    };

    eprintln!(
        "wrote {} ({} frames, {}x{} @ {} fps, {} mode)",
        output.display(),
        stats.frames_written,
        stats.width,
        stats.height,
        stats.fps,
        mode.label()
    );
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
