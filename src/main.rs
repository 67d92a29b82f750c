// snapcanvas CLI: headless composition via command-line arguments
//
// Usage examples:
//   snapcanvas --url https://images.example.com/photo.jpg --text "Hello" --out-dir exports/
//   snapcanvas --input photo.jpg --shape circle --shape rect --text "Sale"
//   snapcanvas --source-json photo.json --width 1280 --height 720 --filename banner.png
//
// All compositing runs on the CPU; the only network access is the single
// background fetch when --url or --source-json is given.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use snapcanvas::{
    CompositionSurface, EditorConfig, EncodedImage, FileDownloader, HostElement, ImageLoader,
    RasterEngine, ShapeKind, SourceImage,
};

/// Compose a photo with text and shape overlays, then export a PNG.
#[derive(Parser, Debug)]
#[command(
    name = "snapcanvas",
    about = "Headless photo/text/shape compositor",
    long_about = "Fit a photo into a viewport as a locked background, overlay text and\n\
                  shapes at their editor defaults, and flatten everything to a PNG,\n\
                  no window required.\n\n\
                  Example:\n  \
                  snapcanvas --url https://images.example.com/photo.jpg --text \"Hello\"\n  \
                  snapcanvas --input photo.jpg --shape circle --out-dir exports/"
)]
struct Args {
    /// Remote image URL to use as the locked background.
    #[arg(long, conflicts_with_all = ["input", "source_json"])]
    url: Option<String>,

    /// Local image file to use as the locked background.
    #[arg(short, long, value_name = "FILE", conflicts_with = "source_json")]
    input: Option<PathBuf>,

    /// Source-image JSON payload in the search provider's format;
    /// its `src.large` URL is fetched.
    #[arg(long, value_name = "FILE")]
    source_json: Option<PathBuf>,

    /// Text overlays, applied in the given order.
    #[arg(short, long, value_name = "TEXT")]
    text: Vec<String>,

    /// Shape overlays: rectangle, circle or triangle.
    #[arg(short, long, value_name = "KIND")]
    shape: Vec<String>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Directory the export is written into.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Override the export filename.
    #[arg(long, value_name = "NAME")]
    filename: Option<String>,

    /// Print composition details and timing.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let started = Instant::now();

    let mut config = EditorConfig::default();
    if let Some(name) = args.filename.clone() {
        config.export_filename = name;
    }

    let host = HostElement::new(args.width, args.height);
    let mut surface: CompositionSurface<RasterEngine> = CompositionSurface::new(config.clone());

    // Resolve the background source and bring the surface up
    if let Some(path) = &args.input {
        let ticket = surface.initialize(&host, SourceImage::default())?;
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        surface.place_background(&ticket, EncodedImage::from_bytes(bytes)?)?;
    } else {
        let source = match &args.source_json {
            Some(path) => {
                let payload = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
                serde_json::from_str::<SourceImage>(&payload)
                    .map_err(|e| anyhow::anyhow!("invalid source payload: {}", e))?
            }
            None => match &args.url {
                Some(url) => SourceImage::from_url(url),
                None => anyhow::bail!("one of --url, --input or --source-json is required"),
            },
        };
        let loader = ImageLoader::new(&config)?;
        surface.open(&host, source, &loader).await?;
    }

    if !surface.has_background() {
        eprintln!("warning: background could not be loaded; exporting an empty canvas");
    } else if args.verbose {
        if let Some(p) = surface.background_placement() {
            println!(
                "background fitted to {:.0}x{:.0} at ({:.1}, {:.1}), scale {:.3}",
                p.width, p.height, p.left, p.top, p.scale
            );
        }
    }

    for text in &args.text {
        if surface.add_text(text)?.is_none() {
            eprintln!("warning: skipped empty text overlay");
        }
    }
    for name in &args.shape {
        let kind = ShapeKind::parse(name)
            .ok_or_else(|| anyhow::anyhow!("unknown shape kind: {} (expected one of rectangle, circle, triangle)", name))?;
        surface.add_shape(kind)?;
    }

    let sink = FileDownloader::new(&args.out_dir);
    let artifact = surface
        .export(&sink)?
        .ok_or_else(|| anyhow::anyhow!("export produced no artifact"))?;

    if args.verbose {
        println!(
            "composed {} overlay(s) in {:.1?}; sha256 {}",
            surface.foreground_count(),
            started.elapsed(),
            artifact.digest()
        );
    }
    println!("wrote {}", sink.target_path(&artifact).display());
    Ok(())
}
