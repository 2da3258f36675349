use anyhow::{Context, Result};
use brandcrop::crop::{AspectMode, AspectRatio, CropSession};
use brandcrop::image_loader::load_image;
use brandcrop::logging::init_tracing;
use brandcrop::markup;
use brandcrop::settings::{CropSettings, OutputFormat};
use brandcrop::storage::{ArtifactStore, FileStore};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brandcrop", version, about = "Crop brand images and convert footer text")]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop an image with the centered default crop area
    Crop(CropArgs),
    /// Convert footer text between markdown and editor HTML
    Markup {
        #[arg(value_enum)]
        direction: Direction,
        /// Input file, stdin when omitted
        file: Option<PathBuf>,
    },
    /// Print the effective settings
    Settings {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct CropArgs {
    input: PathBuf,

    /// Output file. Without it the crop is stored in the artifact directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Width / height of the crop area
    #[arg(long, conflicts_with = "free")]
    aspect: Option<f64>,

    /// Keep the image's own ratio
    #[arg(long)]
    free: bool,

    /// Output width in pixels
    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    format: Option<OutputFormat>,

    /// JPEG quality, 1-100
    #[arg(long)]
    quality: Option<u8>,

    /// Clockwise rotation in degrees
    #[arg(long, allow_negative_numbers = true)]
    rotate: Option<f64>,

    #[arg(long)]
    zoom: Option<f64>,

    /// Move the crop area by DX DY display pixels
    #[arg(long, num_args = 2, value_names = ["DX", "DY"], allow_negative_numbers = true)]
    nudge: Option<Vec<f64>>,

    /// Print a data URL instead of writing a file
    #[arg(long, conflicts_with = "output")]
    data_url: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    ToHtml,
    ToMarkdown,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Crop(args) => run_crop(args),
        Command::Markup { direction, file } => run_markup(direction, file),
        Command::Settings { save } => {
            let settings = CropSettings::load();
            if save {
                settings.save();
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

fn run_crop(args: CropArgs) -> Result<()> {
    let mut settings = CropSettings::load();
    if args.free {
        settings.aspect = AspectMode::Free;
    } else if let Some(ratio) = args.aspect {
        settings.aspect = AspectMode::Fixed(AspectRatio::new(ratio)?);
    }
    if let Some(size) = args.size {
        settings.output_base_size = size;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }
    if let Some(quality) = args.quality {
        if !settings.output_format.is_lossy() {
            tracing::warn!("--quality only applies to JPEG output, ignoring it");
        }
        settings.quality = quality;
    }

    let image = load_image(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let mut session = CropSession::from_settings(image.natural_size(), &settings)?;

    if let Some(zoom) = args.zoom {
        session.set_zoom(zoom);
    }
    if let Some([dx, dy]) = args.nudge.as_deref() {
        session.move_by(*dx, *dy);
    }
    if let Some(degrees) = args.rotate {
        session.set_rotation(degrees);
    }

    let rect = session.crop_rect();
    let output = settings.output_spec(AspectRatio::from_size(rect.width, rect.height).ok())?;
    let encoded = session.commit(&image, &output)?;

    if args.data_url {
        println!("{}", encoded.to_data_url());
        return Ok(());
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, &encoded.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        None => {
            let root = FileStore::default_location()
                .context("No data directory available, pass --output")?;
            let stored = FileStore::new(root)?.put(&encoded)?;
            println!("{}", stored.location.display());
        }
    }
    Ok(())
}

fn run_markup(direction: Direction, file: Option<PathBuf>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let converted = match direction {
        Direction::ToHtml => markup::to_rich_text(input.trim_end()),
        Direction::ToMarkdown => markup::to_markdown(&input),
    };
    println!("{}", converted);
    Ok(())
}
