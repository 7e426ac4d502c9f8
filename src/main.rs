use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use pixelfy_rs::image_pipeline::encode::DEFAULT_PIXEL_SIZE;
use pixelfy_rs::image_pipeline::matte::DEFAULT_TOLERANCE;
use pixelfy_rs::image_pipeline::{
    BackgroundRemover, ChromaKeySpec, FileMaskProvider, OutputFormat, PipelineConfig,
    PixelationMethod, PixelationPipeline, PngReader, RasterReader, Rgb, TiffCompression,
};
use pixelfy_rs::logger;

use tracing::{error, info};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::DeflateFast => TiffCompression::DeflateFast,
            CompressionArg::DeflateBalanced => TiffCompression::DeflateBalanced,
            CompressionArg::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pixelfy")]
#[command(about = "Pixelate an image, optionally removing its background first")]
struct Cli {
    /// Input PNG file
    input: PathBuf,

    /// Output file (.png or .tif/.tiff); defaults to <input>_pixelfy_<method>.png
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// standard, nearest-neighbor, bilinear (alias bicubic, lanczos), dithered, posterized or mosaic
    #[arg(short, long, default_value = "standard")]
    method: PixelationMethod,

    /// Edge of one output "pixel" in source pixels
    #[arg(short, long, default_value_t = DEFAULT_PIXEL_SIZE)]
    pixel_size: u32,

    /// Output width; defaults to the input width
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height; defaults to the input height
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Make this color transparent before pixelating
    #[arg(long, value_name = "R,G,B", value_parser = parse_rgb, conflicts_with = "key_pick")]
    key_color: Option<Rgb>,

    /// Make the color found at this input pixel transparent
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    key_pick: Option<(u32, u32)>,

    /// Euclidean RGB distance for --key-color, --key-pick and the background fallback
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Opacity mask PNG(s) from a segmentation tool, tried in order. The alpha
    /// channel is the opacity; masks without transparency (grayscale) use
    /// their brightness, white meaning keep
    #[arg(long, value_name = "FILE")]
    mask: Vec<PathBuf>,

    /// Remove the background even without a usable mask (falls back to corner color keying)
    #[arg(long)]
    remove_background: bool,

    /// TIFF compression
    #[arg(long, value_enum, default_value = "deflate-balanced")]
    compression: CompressionArg,

    /// Skip the maximum dimension check
    #[arg(long)]
    no_validate: bool,
}

fn parse_rgb(s: &str) -> Result<Rgb, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err("Provide the color as R,G,B.".to_string());
    }
    let channel = |p: &str| p.parse::<u8>().map_err(|_| format!("Invalid channel value: {}", p));
    Ok(Rgb::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
}

fn parse_point(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| "Provide the point as X,Y.".to_string())?;
    let x = x.trim().parse::<u32>().map_err(|_| "Invalid x.".to_string())?;
    let y = y.trim().parse::<u32>().map_err(|_| "Invalid y.".to_string())?;
    Ok((x, y))
}

fn default_output(input: &Path, method: PixelationMethod) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push(format!("_pixelfy_{}.png", method));
    input.with_file_name(name)
}

fn chroma_key(cli: &Cli) -> anyhow::Result<Option<ChromaKeySpec>> {
    if let Some(color) = cli.key_color {
        return Ok(Some(ChromaKeySpec::new(color, cli.tolerance)?));
    }
    if let Some((x, y)) = cli.key_pick {
        let bytes = std::fs::read(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?;
        let image = PngReader.read_raster(&bytes)?;
        let spec = ChromaKeySpec::from_pixel(&image, x, y, cli.tolerance)
            .with_context(|| format!("picking color at {},{}", x, y))?;
        info!("Picked key color {:?}", spec.reference());
        return Ok(Some(spec));
    }
    Ok(None)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init("info");

    info!("Using input file: {}", cli.input.display());

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input, cli.method));
    let output_format = output
        .extension()
        .and_then(|e| e.to_str())
        .map(OutputFormat::from_extension)
        .unwrap_or_default();

    let output_size = match (cli.width, cli.height) {
        (Some(w), Some(h)) => Some((w, h)),
        (None, None) => None,
        _ => bail!("--width and --height must be given together"),
    };

    let config = PipelineConfig::builder()
        .method(cli.method)
        .pixel_size(cli.pixel_size)
        .output_size(output_size)
        .chroma_key(chroma_key(&cli)?)
        .output_format(output_format)
        .compression(cli.compression.into())
        .validate_dimensions(!cli.no_validate)
        .build();

    let mut pipeline = PixelationPipeline::new(config);
    if cli.remove_background || !cli.mask.is_empty() {
        let mut remover = BackgroundRemover::new().with_fallback_tolerance(cli.tolerance)?;
        for path in &cli.mask {
            let provider = FileMaskProvider::new(path);
            info!("Mask file: {}", provider.path().display());
            remover = remover.with_provider(provider);
        }
        info!("Background removal enabled, masks: {:?}", remover.provider_names());
        pipeline = pipeline.with_background_remover(remover);
    }

    info!(
        "Method: {}, pixel size: {}, output: {}",
        pipeline.config().method,
        pipeline.config().pixel_size,
        output.display()
    );

    match pipeline.convert_file(&cli.input, &output) {
        Ok(timings) => {
            timings.log_summary();
            info!("Saved {}", output.display());
            Ok(())
        }
        Err(e) => {
            error!("Pixelation failed: {}", e);
            Err(e.into())
        }
    }
}
