//! Pipeline configuration.
//!
//! Every tunable the operator previously hand-edited in the script lives
//! here as an explicit field. I/O destinations (CSV path, write mode,
//! diagnostics directory) stay on the CLI surface; this struct describes
//! the pipeline itself and is embedded verbatim in the JSON report.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Pixel adjacency used for maxima detection, marker labeling and flooding.
///
/// One value is applied across the whole segmentation chain; mixing
/// adjacencies between stages is a known correctness trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbors only.
    Four,
    /// Edge and corner neighbors.
    #[default]
    Eight,
}

impl Connectivity {
    /// Neighbor offsets as `(dx, dy)` pairs.
    pub fn offsets(self) -> &'static [(i32, i32)] {
        const FOUR: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
        const EIGHT: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

impl FromStr for Connectivity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4" | "four" => Ok(Self::Four),
            "8" | "eight" => Ok(Self::Eight),
            other => Err(AnalysisError::InvalidInput(format!(
                "connectivity must be 4 or 8, got '{}'",
                other
            ))),
        }
    }
}

/// Automatic threshold-selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Mean image intensity.
    Mean,
    /// Triangle geometric method on the intensity histogram.
    Triangle,
    /// Li's iterative minimum cross-entropy method.
    Li,
    /// Yen's maximum-correlation method.
    Yen,
}

impl ThresholdMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Triangle => "triangle",
            Self::Li => "li",
            Self::Yen => "yen",
        }
    }
}

impl std::fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "triangle" => Ok(Self::Triangle),
            "li" => Ok(Self::Li),
            "yen" => Ok(Self::Yen),
            other => Err(AnalysisError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Binarization rule: automatic selection or a hand-picked cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdSpec {
    /// Compute the cutoff with the given method.
    Auto(ThresholdMethod),
    /// Use the given intensity cutoff directly (normalized [0, 1] scale).
    Fixed(f32),
}

/// Full pipeline configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Keep rows `[0, crop_row)`, stripping the instrument info-bar.
    /// `None` disables cropping.
    pub crop_row: Option<u32>,
    /// Median-filter window side length. Odd, >= 1; 1 disables denoising.
    pub median_window: u32,
    /// Power-law contrast exponent. > 1 darkens mid-tones.
    pub gamma: f32,
    /// Binarization rule.
    pub threshold: ThresholdSpec,
    /// Pixel adjacency for the whole segmentation chain.
    pub connectivity: Connectivity,
    /// Calibration: pixels per nanometer at the capture magnification.
    /// Measured externally (e.g. with ImageJ on the instrument scale bar).
    pub px_per_nm: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crop_row: None,
            median_window: 3,
            gamma: 2.0,
            threshold: ThresholdSpec::Auto(ThresholdMethod::Mean),
            connectivity: Connectivity::Eight,
            px_per_nm: 0.0368,
        }
    }
}

impl AnalysisConfig {
    /// Reject parameter combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.median_window == 0 || self.median_window % 2 == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "median window must be odd and >= 1, got {}",
                self.median_window
            )));
        }
        if !(self.gamma > 0.0) || !self.gamma.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "gamma must be positive and finite, got {}",
                self.gamma
            )));
        }
        if !(self.px_per_nm > 0.0) || !self.px_per_nm.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "px_per_nm must be positive and finite, got {}",
                self.px_per_nm
            )));
        }
        if let ThresholdSpec::Fixed(cutoff) = self.threshold {
            if !cutoff.is_finite() {
                return Err(AnalysisError::InvalidInput(
                    "fixed threshold cutoff must be finite".to_string(),
                ));
            }
        }
        if let Some(0) = self.crop_row {
            return Err(AnalysisError::InvalidInput(
                "crop_row = 0 would discard the whole image".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn even_median_window_rejected() {
        let cfg = AnalysisConfig {
            median_window: 4,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_crop_row_rejected() {
        let cfg = AnalysisConfig {
            crop_row: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nonpositive_calibration_rejected() {
        for px_per_nm in [0.0, -1.0, f64::NAN] {
            let cfg = AnalysisConfig {
                px_per_nm,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "px_per_nm = {}", px_per_nm);
        }
    }

    #[test]
    fn method_parse_roundtrip() {
        for m in [
            ThresholdMethod::Mean,
            ThresholdMethod::Triangle,
            ThresholdMethod::Li,
            ThresholdMethod::Yen,
        ] {
            assert_eq!(m.name().parse::<ThresholdMethod>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let err = "otsu".parse::<ThresholdMethod>().unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMethod(_)));
    }

    #[test]
    fn connectivity_offsets_counts() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
    }
}
