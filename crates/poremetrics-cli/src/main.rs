//! poremetrics CLI — measure pore diameters in SEM images.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use poremetrics::report::ImageInfo;
use poremetrics::{
    AnalysisConfig, AnalysisReport, JsonMetadataSource, MetadataSource, ThresholdMethod,
    ThresholdSpec, WriteMode,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "poremetrics")]
#[command(about = "Measure pore diameters in SEM images of porous films")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one SEM image and write per-pore diameters.
    Analyze(CliAnalyzeArgs),

    /// Recompute summary statistics from an existing diameters file.
    Summarize {
        /// Diameters file written by `analyze`.
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Diameters output file (one value per row, nm).
    #[arg(long, default_value = "results.csv")]
    out: PathBuf,

    /// Append to the output file instead of overwriting.
    ///
    /// Use overwrite for the first image of a dataset and append for every
    /// image after that; the wrong mode silently destroys prior results.
    #[arg(long)]
    append: bool,

    /// Write a `diameter_nm` header line before the values.
    #[arg(long)]
    header: bool,

    /// Path to write the full analysis report (JSON).
    #[arg(long)]
    json: Option<PathBuf>,

    /// Directory for diagnostic stage images (PNG).
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Keep image rows above this row, stripping the instrument info-bar.
    #[arg(long)]
    crop_row: Option<u32>,

    /// Median filter window side (odd; 1 disables denoising).
    #[arg(long, default_value = "3")]
    median_window: u32,

    /// Gamma contrast exponent (> 1 darkens pores against the matrix).
    #[arg(long, default_value = "2.0")]
    gamma: f32,

    /// Automatic threshold method: mean, triangle, li or yen.
    #[arg(long, default_value = "mean")]
    threshold: String,

    /// Fixed intensity cutoff in [0, 1]; overrides --threshold.
    #[arg(long)]
    cutoff: Option<f32>,

    /// Pixel connectivity for the segmentation chain: 4 or 8.
    #[arg(long, default_value = "8")]
    connectivity: String,

    /// Calibration factor: pixels per nanometer at the capture
    /// magnification (measure once per instrument setting, e.g. in ImageJ).
    #[arg(long)]
    px_per_nm: f64,

    /// Sample identifier; defaults to the image file stem.
    #[arg(long)]
    sample: Option<String>,

    /// JSON file mapping sample ids to experiment metadata records.
    #[arg(long)]
    metadata: Option<PathBuf>,
}

impl CliAnalyzeArgs {
    fn to_config(&self) -> CliResult<AnalysisConfig> {
        let threshold = match self.cutoff {
            Some(cutoff) => ThresholdSpec::Fixed(cutoff),
            None => ThresholdSpec::Auto(self.threshold.parse::<ThresholdMethod>()?),
        };
        Ok(AnalysisConfig {
            crop_row: self.crop_row,
            median_window: self.median_window,
            gamma: self.gamma,
            threshold,
            connectivity: self.connectivity.parse()?,
            px_per_nm: self.px_per_nm,
        })
    }

    fn sample_id(&self) -> Option<String> {
        self.sample.clone().or_else(|| {
            self.image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Summarize { file } => run_summarize(&file),
    }
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let config = args.to_config()?;

    tracing::info!("Loading image: {}", args.image.display());
    let image = poremetrics::load_grayscale(&args.image)?;
    tracing::info!("Image size: {}x{}", image.width(), image.height());

    let result = poremetrics::analyze(&image, &config)?;
    tracing::info!(
        "Segmented {} pores from {} seed markers (cutoff {:.4})",
        result.regions.len(),
        result.stages.marker_count,
        result.stages.threshold,
    );

    let mode = if args.append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };
    poremetrics::report::write_diameters(&args.out, mode, args.header, &result.diameters_nm)?;
    tracing::info!("Diameters written to {}", args.out.display());

    let sample = args.sample_id();
    let metadata = match (&args.metadata, &sample) {
        (Some(path), Some(id)) => {
            let source = JsonMetadataSource::from_json_file(path)?;
            let record = source.lookup(id);
            if record.is_none() {
                tracing::warn!("no metadata record for sample '{}'", id);
            }
            record
        }
        _ => None,
    };

    if let Some(json_path) = &args.json {
        let report = AnalysisReport::from_result(
            &result,
            &config,
            ImageInfo {
                path: Some(args.image.display().to_string()),
                width: image.width(),
                height: image.height(),
            },
            sample,
            metadata,
        );
        report.save_json(json_path)?;
        tracing::info!("Report written to {}", json_path.display());
    }

    if let Some(dir) = &args.debug_dir {
        poremetrics::diagnostics::save_stage_images(dir, &result)?;
        tracing::info!("Stage images written to {}", dir.display());
    }

    let summary = poremetrics::summarize(&result.diameters_nm)?;
    print_summary(&summary);
    Ok(())
}

// ── summarize ──────────────────────────────────────────────────────────

fn run_summarize(file: &Path) -> CliResult<()> {
    let diameters = poremetrics::report::read_diameters(file)?;
    tracing::info!("Read {} diameters from {}", diameters.len(), file.display());
    let summary = poremetrics::summarize(&diameters)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &poremetrics::Summary) {
    println!("pores:   {}", summary.count);
    println!("mean:    {:.1} nm", summary.mean_nm);
    println!("stddev:  {:.1} nm", summary.stddev_nm);
}
