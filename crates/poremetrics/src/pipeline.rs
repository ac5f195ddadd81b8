//! Pipeline orchestration.
//!
//! [`analyze`] runs preprocess → binarize → segment → measure and returns
//! everything downstream consumers need: per-pore regions and diameters
//! plus the intermediate stage artifacts. Rendering and file output live
//! in [`crate::diagnostics`] and [`crate::report`]; no transform here has
//! display side effects.

use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::measure::{self, Region};
use crate::preprocess;
use crate::raster::{self, DistanceMap, FloatImage, LabelMap, Mask};
use crate::segment;
use crate::threshold;

/// Intermediate products of one run, kept for diagnostics rendering.
#[derive(Debug, Clone)]
pub struct StageArtifacts {
    /// Input after the info-bar crop (or the input itself if uncropped).
    pub cropped: FloatImage,
    /// After median filtering.
    pub denoised: FloatImage,
    /// After gamma adjustment; the image that was thresholded.
    pub contrasted: FloatImage,
    /// Cutoff actually applied (computed or fixed).
    pub threshold: f32,
    /// Foreground mask.
    pub mask: Mask,
    /// Euclidean distance map over the mask.
    pub distance: DistanceMap,
    /// Labeled seed markers.
    pub markers: LabelMap,
    /// Number of seed markers.
    pub marker_count: u32,
    /// Final watershed labeling.
    pub labels: LabelMap,
}

/// Full result of analyzing one image.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Per-pore measurements, ordered by label id.
    pub regions: Vec<Region>,
    /// Equivalent-circle diameters in nanometers, one per region, same
    /// order as `regions`.
    pub diameters_nm: Vec<f64>,
    /// Intermediate stage products.
    pub stages: StageArtifacts,
}

/// Run the full analysis pipeline on a grayscale image.
pub fn analyze(image: &FloatImage, config: &AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;

    let cropped = match config.crop_row {
        Some(row) => preprocess::crop_above(image, row)?,
        None => image.clone(),
    };
    let denoised = preprocess::median_filter(&cropped, config.median_window);
    let contrasted = preprocess::adjust_gamma(&denoised, config.gamma);

    let (mask, cutoff) = threshold::binarize(&contrasted, config.threshold)?;

    let distance = segment::distance_transform(&mask);
    let (markers, marker_count) = segment::find_seeds(&distance, config.connectivity);
    let labels = segment::watershed(&distance, &markers, &mask, config.connectivity);

    let regions = measure::measure_regions(&labels);
    let diameters_nm = regions
        .iter()
        .map(|r| measure::equivalent_diameter_nm(r, config.px_per_nm))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult {
        regions,
        diameters_nm,
        stages: StageArtifacts {
            cropped,
            denoised,
            contrasted,
            threshold: cutoff,
            mask,
            distance,
            markers,
            marker_count,
            labels,
        },
    })
}

/// Reusable analysis facade: create once, analyze many images.
///
/// Wraps an [`AnalysisConfig`]; tune through [`PoreAnalyzer::config_mut`]
/// for anything beyond the calibration constant.
pub struct PoreAnalyzer {
    config: AnalysisConfig,
}

impl PoreAnalyzer {
    /// Analyzer with default tuning and the given calibration factor.
    pub fn new(px_per_nm: f64) -> Self {
        Self {
            config: AnalysisConfig {
                px_per_nm,
                ..Default::default()
            },
        }
    }

    /// Analyzer with full config control.
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Analyze an in-memory grayscale image.
    pub fn analyze(&self, image: &FloatImage) -> Result<AnalysisResult, AnalysisError> {
        analyze(image, &self.config)
    }

    /// Load an image file and analyze it.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisResult, AnalysisError> {
        let image = raster::load_grayscale(path)?;
        self.analyze(&image)
    }
}
