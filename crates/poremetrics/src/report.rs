//! Result output: diameters file and the structured JSON report.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::measure::{self, Summary};
use crate::metadata::SampleRecord;
use crate::pipeline::AnalysisResult;

/// Schema tag embedded in every JSON report.
pub const REPORT_SCHEMA: &str = "poremetrics.report.v1";

/// How to open the diameters file.
///
/// Overwrite starts a fresh dataset; append accumulates across runs. The
/// wrong choice silently destroys or duplicates prior results, so this is
/// always an explicit operator decision, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    Append,
}

/// Write diameters to a delimited text file, one value per row.
///
/// `header` emits a single `diameter_nm` line first; only use it on the
/// first run of a dataset written in overwrite mode.
pub fn write_diameters<P: AsRef<Path>>(
    path: P,
    mode: WriteMode,
    header: bool,
    diameters: &[f64],
) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    let wrap = |source: std::io::Error| AnalysisError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = match mode {
        WriteMode::Overwrite => File::create(path).map_err(wrap)?,
        WriteMode::Append => OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(wrap)?,
    };
    let mut writer = BufWriter::new(file);
    if header {
        writeln!(writer, "diameter_nm").map_err(wrap)?;
    }
    for d in diameters {
        writeln!(writer, "{}", d).map_err(wrap)?;
    }
    writer.flush().map_err(wrap)
}

/// Read a diameters file written by [`write_diameters`].
///
/// A leading `diameter_nm` header line is skipped; any other non-numeric
/// line is an error.
pub fn read_diameters<P: AsRef<Path>>(path: P) -> Result<Vec<f64>, AnalysisError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        AnalysisError::InvalidInput(format!("failed to open {}: {}", path.display(), e))
    })?;

    let mut diameters = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            AnalysisError::InvalidInput(format!("failed to read {}: {}", path.display(), e))
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || (lineno == 0 && trimmed == "diameter_nm") {
            continue;
        }
        let value: f64 = trimmed.parse().map_err(|_| {
            AnalysisError::InvalidInput(format!(
                "{}:{}: not a number: '{}'",
                path.display(),
                lineno + 1,
                trimmed
            ))
        })?;
        diameters.push(value);
    }
    Ok(diameters)
}

/// Source image descriptor in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// One measured pore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoreRecord {
    pub label: u32,
    pub area_px: u64,
    pub area_nm2: f64,
    pub diameter_nm: f64,
}

/// Versioned, self-describing record of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: String,
    pub image: ImageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SampleRecord>,
    pub config: AnalysisConfig,
    /// Threshold cutoff actually applied.
    pub threshold: f32,
    pub marker_count: u32,
    pub pores: Vec<PoreRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

impl AnalysisReport {
    /// Assemble a report from a pipeline result.
    ///
    /// `summary` is `None` when fewer than two pores were found; the
    /// per-pore list still carries whatever was measured.
    pub fn from_result(
        result: &AnalysisResult,
        config: &AnalysisConfig,
        image: ImageInfo,
        sample: Option<String>,
        metadata: Option<SampleRecord>,
    ) -> Self {
        let pores = result
            .regions
            .iter()
            .zip(&result.diameters_nm)
            .map(|(region, &diameter_nm)| PoreRecord {
                label: region.label,
                area_px: region.area_px,
                area_nm2: measure::physical_area_nm2(region, config.px_per_nm),
                diameter_nm,
            })
            .collect();
        Self {
            schema_version: REPORT_SCHEMA.to_string(),
            image,
            sample,
            metadata,
            config: config.clone(),
            threshold: result.stages.threshold,
            marker_count: result.stages.marker_count,
            pores,
            summary: measure::summarize(&result.diameters_nm).ok(),
        }
    }

    /// Serialize to pretty JSON and write to `path`.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), AnalysisError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| AnalysisError::OutputWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        std::fs::write(path, json).map_err(|e| AnalysisError::OutputWrite {
            path: PathBuf::from(path),
            source: e,
        })
    }
}
