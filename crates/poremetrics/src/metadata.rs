//! Optional experiment-metadata lookup.
//!
//! Each SEM capture belongs to a sample with preparation parameters the
//! operator may want carried into the report. The pipeline itself never
//! depends on a source being present; a missing record is not an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Preparation parameters for one sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRecord {
    /// Block copolymer used for the film.
    pub block_copolymer: Option<String>,
    /// Silica nanoparticle size, nm.
    pub nanoparticle_size_nm: Option<f64>,
    /// Mixing method.
    pub mixing_method: Option<String>,
    /// Dip-coating speed, mm/min.
    pub coating_speed_mm_min: Option<f64>,
    /// Whether the breath-figure structure spans the whole film.
    pub film_spanning: Option<String>,
}

/// Lookup keyed by sample identifier.
pub trait MetadataSource {
    fn lookup(&self, sample_id: &str) -> Option<SampleRecord>;
}

/// Metadata source backed by a JSON file: an object mapping sample id to
/// [`SampleRecord`].
#[derive(Debug, Clone, Default)]
pub struct JsonMetadataSource {
    records: BTreeMap<String, SampleRecord>,
}

impl JsonMetadataSource {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidInput(format!(
                "failed to read metadata file {}: {}",
                path.display(),
                e
            ))
        })?;
        let records: BTreeMap<String, SampleRecord> =
            serde_json::from_str(&text).map_err(|e| {
                AnalysisError::InvalidInput(format!(
                    "failed to parse metadata file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetadataSource for JsonMetadataSource {
    fn lookup(&self, sample_id: &str) -> Option<SampleRecord> {
        self.records.get(sample_id).cloned()
    }
}
