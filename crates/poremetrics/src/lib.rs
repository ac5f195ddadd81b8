//! poremetrics — pore-size analysis for SEM images of porous films.
//!
//! One image in, one diameter list out. The pipeline stages are:
//!
//! 1. **Load** – decode to normalized grayscale intensities.
//! 2. **Preprocess** – crop the instrument info-bar, median-filter sensor
//!    noise, gamma-adjust contrast.
//! 3. **Binarize** – automatic (mean / triangle / li / yen) or fixed
//!    threshold; pores are the dark phase.
//! 4. **Segment** – exact Euclidean distance transform, local-maxima seed
//!    markers, marker-controlled watershed.
//! 5. **Measure** – per-label pixel areas, converted to equivalent-circle
//!    diameters in nanometers via the pixels-per-nm calibration factor.
//! 6. **Report** – diameters file, versioned JSON report, diagnostic PNGs.
//!
//! # Public API
//! - [`PoreAnalyzer`] and [`AnalysisConfig`] as primary entry points
//! - [`analyze`] for one-shot runs over an in-memory image
//! - [`report`] and [`diagnostics`] for output, kept strictly outside the
//!   measurement chain
//!
//! ```no_run
//! use poremetrics::PoreAnalyzer;
//!
//! let analyzer = PoreAnalyzer::new(0.0368);
//! let result = analyzer.analyze_file("185_10k.tif")?;
//! println!("found {} pores", result.regions.len());
//! # Ok::<(), poremetrics::AnalysisError>(())
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod measure;
pub mod metadata;
pub mod pipeline;
pub mod preprocess;
pub mod raster;
pub mod report;
pub mod segment;
pub mod threshold;

pub use config::{AnalysisConfig, Connectivity, ThresholdMethod, ThresholdSpec};
pub use error::AnalysisError;
pub use measure::{summarize, Region, Summary};
pub use metadata::{JsonMetadataSource, MetadataSource, SampleRecord};
pub use pipeline::{analyze, AnalysisResult, PoreAnalyzer, StageArtifacts};
pub use raster::{load_grayscale, DistanceMap, FloatImage, Grid, LabelMap, Mask};
pub use report::{AnalysisReport, WriteMode};
