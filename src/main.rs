//! # geostamp — 命令行入口
//!
//! 本文件只负责参数解析与文件读写，水印逻辑见 `lib.rs` 架构文档。

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};

use geostamp::address::PostalAddress;
use geostamp::error::AppError;
use geostamp::geo::{GeoPoint, format_decimal, format_dms, to_mgrs, to_utm};
use geostamp::overlay::{CaptureContext, ItemKind, LocationFix, OverlayConfig, OverlaySnapshotBuilder};
use geostamp::render::{FontBook, TemplateId, render_photo};
use geostamp::video::{DEFAULT_SAFE_ZONE_RATIO, OutputOrientation, SafeZone};

#[derive(Parser)]
#[command(name = "geostamp")]
#[command(about = "Stamp GPS / time / address watermarks onto photos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a watermark onto a photo.
    Stamp(StampArgs),

    /// Print a coordinate in every supported format.
    Coords {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Print the video safe zone for a sensor buffer size.
    SafeZone {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Output is landscape (no rotation of landscape buffers).
        #[arg(long)]
        landscape: bool,
        #[arg(long, default_value_t = DEFAULT_SAFE_ZONE_RATIO)]
        ratio: f32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TemplateArg {
    Classic,
    Modern,
    Minimal,
}

impl From<TemplateArg> for TemplateId {
    fn from(value: TemplateArg) -> Self {
        match value {
            TemplateArg::Classic => TemplateId::Classic,
            TemplateArg::Modern => TemplateId::Modern,
            TemplateArg::Minimal => TemplateId::Minimal,
        }
    }
}

#[derive(Debug, Args)]
struct StampArgs {
    /// Source photo.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the stamped photo.
    #[arg(long)]
    output: PathBuf,

    /// Overlay configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured template.
    #[arg(long, value_enum)]
    template: Option<TemplateArg>,

    /// TrueType/OpenType font registered under the configured family.
    /// Without it the bundled DejaVu Sans is used.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Bold face of the same family.
    #[arg(long)]
    bold_font: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Altitude in metres.
    #[arg(long, allow_hyphen_values = true)]
    alt: Option<f64>,

    /// Speed in metres per second.
    #[arg(long)]
    speed: Option<f64>,

    /// Compass heading in degrees.
    #[arg(long)]
    heading: Option<f32>,

    /// Postal address (JSON).
    #[arg(long)]
    address: Option<PathBuf>,

    /// Capture time (RFC 3339). Defaults to now.
    #[arg(long)]
    timestamp: Option<String>,

    /// Logo image drawn in the top-right corner.
    #[arg(long)]
    logo: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("❌ {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Stamp(args) => stamp(args),
        Commands::Coords { lat, lon } => {
            print_coordinates(GeoPoint::new(lat, lon));
            Ok(())
        }
        Commands::SafeZone {
            width,
            height,
            landscape,
            ratio,
        } => {
            let orientation = if landscape {
                OutputOrientation::Landscape
            } else {
                OutputOrientation::Portrait
            };
            let zone = SafeZone::compute(width, height, orientation, ratio);
            println!("rotated:  {}", zone.rotated);
            println!("logical:  {}x{}", zone.logical_width, zone.logical_height);
            println!("inset:    {}, {}", zone.inset_x, zone.inset_y);
            println!("drawable: {}x{}", zone.width, zone.height);
            Ok(())
        }
    }
}

fn stamp(args: StampArgs) -> Result<(), AppError> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::from_json(&fs::read_to_string(path)?)?,
        None => OverlayConfig::default(),
    };
    if let Some(template) = args.template {
        config.template_id = template.into();
    }
    if let Some(path) = &args.logo {
        config.set_logo_bytes(&fs::read(path)?)?;
        if !config.has_item(ItemKind::LogoMarker) {
            config.items.push(ItemKind::LogoMarker);
        }
    }
    if args.heading.is_some() && !config.compass_enabled {
        log::info!("未启用表盘，--heading 只用于文字行");
    }

    let fonts = load_fonts(&config.font_family, &args)?;
    let ctx = capture_context(&args)?;
    let snapshot = OverlaySnapshotBuilder::new(&config).build(&ctx);

    let source = image::open(&args.input)?.to_rgba8();
    let stamped = render_photo(&source, &snapshot, &config, fonts);
    stamped.save(&args.output)?;

    log::info!("✅ 已写入 {}", args.output.display());
    println!("{}", snapshot.exif_description());
    Ok(())
}

fn load_fonts(family: &str, args: &StampArgs) -> Result<Arc<FontBook>, AppError> {
    let Some(path) = &args.font else {
        if args.bold_font.is_some() {
            log::warn!("⚠️ 未指定 --font，忽略 --bold-font");
        }
        return Ok(FontBook::shared());
    };
    let mut book = FontBook::new();
    book.add_family(family, fs::read(path)?)?;
    if let Some(bold) = &args.bold_font {
        book.set_bold(family, fs::read(bold)?)?;
    }
    Ok(Arc::new(book))
}

fn capture_context(args: &StampArgs) -> Result<CaptureContext, AppError> {
    let mut ctx = match &args.timestamp {
        Some(text) => CaptureContext::new(
            DateTime::parse_from_rfc3339(text)
                .map_err(|e| AppError::InvalidArgument(format!("时间格式错误 {text}: {e}")))?,
        ),
        None => CaptureContext::now(),
    };

    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let mut fix = LocationFix::new(GeoPoint::new(lat, lon));
            fix.altitude_m = args.alt;
            fix.speed_mps = args.speed;
            ctx = ctx.with_location(fix);
        }
        (None, None) => {}
        _ => {
            return Err(AppError::InvalidArgument(
                "--lat 与 --lon 需要同时提供".to_string(),
            ));
        }
    }

    if let Some(path) = &args.address {
        let address: PostalAddress = serde_json::from_str(&fs::read_to_string(path)?)?;
        ctx = ctx.with_address(address);
    }
    if let Some(heading) = args.heading {
        ctx = ctx.with_heading(heading);
    }
    Ok(ctx)
}

fn print_coordinates(point: GeoPoint) {
    if !point.is_valid() {
        log::warn!("⚠️ 坐标超出范围: {point}");
    }
    println!("decimal: {}", format_decimal(point, 6));
    println!("dms:     {}", format_dms(point));
    println!("utm:     {}", to_utm(point));
    println!("mgrs:    {}", to_mgrs(point));
}
