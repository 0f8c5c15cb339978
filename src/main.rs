use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use storefront_images::config::Config;
use storefront_images::error::AppError;
use storefront_images::image_optimizer::{
    media_type_for_path, parse_quality, CancelHandle, OutputFormat, PolicyOverrides, SourceImage,
};
use storefront_images::upload::{upload_with_fallback, DirectoryUploader, UploadOutcome};
use tracing::{info, warn};

/// Optimize product and category images and store them for upload
#[derive(Parser, Debug)]
#[command(name = "storefront-images")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image files to optimize, in upload order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output root directory (overrides upload.output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parent entity the images belong to, e.g. a product id
    #[arg(short, long, default_value = "default")]
    parent: String,

    /// Maximum output width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Encoder quality: a fraction in (0, 1] or a percentage in (1, 100]
    #[arg(short, long, value_parser = parse_quality)]
    quality: Option<f32>,

    /// Output format: jpeg or webp
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Compact policy options, e.g. "w:800,h:600,q:0.8,f:webp"
    #[arg(long)]
    options: Option<PolicyOverrides>,

    /// Per-image timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Fail instead of uploading the original files when optimization fails
    #[arg(long)]
    no_fallback: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// `--options` first, then the individual flags on top
    fn overrides(&self) -> PolicyOverrides {
        let flags = PolicyOverrides {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.quality,
            format: self.format,
            filter: None,
        };
        self.options.unwrap_or_default().or(flags)
    }
}

async fn read_source(path: &Path) -> Result<SourceImage, AppError> {
    let data = tokio::fs::read(path).await.map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SourceImage::new(data, media_type_for_path(path), file_name))
}

fn print_outcome(outcome: &UploadOutcome) {
    if outcome.optimized {
        println!("Optimized and stored {} image(s):", outcome.locations.len());
    } else {
        println!(
            "Stored {} original image(s) without optimization:",
            outcome.locations.len()
        );
    }
    for location in &outcome.locations {
        println!("  {}", location);
    }
    if let Some(summary) = &outcome.summary {
        println!(
            "{} bytes -> {} bytes ({:.1}% saved), {} resized",
            summary.original_bytes,
            summary.optimized_bytes,
            summary.percentage_saved(),
            summary.resized
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).map_err(AppError::Config)?,
        None => Config::default(),
    };
    if let Some(ms) = args.timeout_ms {
        config.batch.timeout_ms = Some(ms);
    }
    config.validate().map_err(AppError::Config)?;

    storefront_images::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let (cancel, signal) = CancelHandle::new();
    let optimizer = config
        .optimizer()?
        .with_overrides(Some(&args.overrides()))?
        .with_cancellation(signal);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding work");
            cancel.cancel();
        }
    });

    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        sources.push(read_source(path).await?);
    }

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.upload.output_dir.clone());
    let fallback = config.upload.fallback_to_original && !args.no_fallback;

    info!(
        images = sources.len(),
        parent_id = %args.parent,
        output_dir = %output_dir.display(),
        format = %optimizer.policy().format,
        max_width = optimizer.policy().max_width,
        max_height = optimizer.policy().max_height,
        quality = optimizer.policy().quality,
        "Optimizing images"
    );

    let uploader = DirectoryUploader::new(output_dir);
    let outcome = upload_with_fallback(&optimizer, &uploader, &args.parent, &sources, fallback)
        .await
        .context("Failed to store images")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}
