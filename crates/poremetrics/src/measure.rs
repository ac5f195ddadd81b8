//! Region measurement and physical-unit conversion.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::raster::LabelMap;

/// Per-label summary of one segmented pore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Watershed label id.
    pub label: u32,
    /// Pixel count.
    pub area_px: u64,
    /// Centroid as `[x, y]` in pixel coordinates.
    pub centroid: [f64; 2],
    /// Bounding box `[min_x, min_y, max_x, max_y]`, inclusive.
    pub bbox: [u32; 4],
}

/// Aggregate statistics over a diameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean_nm: f64,
    /// Sample standard deviation (n-1 denominator).
    pub stddev_nm: f64,
}

/// One pass over the label grid, producing one [`Region`] per positive
/// label, ordered by ascending label id. Background (0) is excluded.
pub fn measure_regions(labels: &LabelMap) -> Vec<Region> {
    #[derive(Clone)]
    struct Acc {
        area: u64,
        sum_x: f64,
        sum_y: f64,
        bbox: [u32; 4],
    }

    let mut accs: std::collections::BTreeMap<u32, Acc> = std::collections::BTreeMap::new();
    for idx in 0..labels.len() {
        let label = labels.data()[idx];
        if label == 0 {
            continue;
        }
        let (x, y) = labels.coords(idx);
        let acc = accs.entry(label).or_insert(Acc {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            bbox: [x, y, x, y],
        });
        acc.area += 1;
        acc.sum_x += x as f64;
        acc.sum_y += y as f64;
        acc.bbox[0] = acc.bbox[0].min(x);
        acc.bbox[1] = acc.bbox[1].min(y);
        acc.bbox[2] = acc.bbox[2].max(x);
        acc.bbox[3] = acc.bbox[3].max(y);
    }

    accs.into_iter()
        .map(|(label, acc)| Region {
            label,
            area_px: acc.area,
            centroid: [acc.sum_x / acc.area as f64, acc.sum_y / acc.area as f64],
            bbox: acc.bbox,
        })
        .collect()
}

/// Physical area of a region in nm².
///
/// `px_per_nm` is the calibration factor (pixels per nanometer), so a
/// pixel covers `1 / px_per_nm²` square nanometers.
pub fn physical_area_nm2(region: &Region, px_per_nm: f64) -> f64 {
    region.area_px as f64 / (px_per_nm * px_per_nm)
}

/// Equivalent-circle diameter in nanometers: `2 * sqrt(area / pi)`.
///
/// Zero-area regions are rejected; they can only arise from degenerate
/// hand-supplied markers, never from [`measure_regions`] output.
pub fn equivalent_diameter_nm(region: &Region, px_per_nm: f64) -> Result<f64, AnalysisError> {
    if region.area_px == 0 {
        return Err(AnalysisError::DegenerateRegion {
            label: region.label,
        });
    }
    let area = physical_area_nm2(region, px_per_nm);
    Ok(2.0 * (area / std::f64::consts::PI).sqrt())
}

/// Mean and sample standard deviation of a diameter set.
///
/// Needs at least two samples; fewer is an operator-visible error, not a
/// NaN.
pub fn summarize(diameters: &[f64]) -> Result<Summary, AnalysisError> {
    if diameters.len() < 2 {
        return Err(AnalysisError::InsufficientSamples {
            got: diameters.len(),
            needed: 2,
        });
    }
    let n = diameters.len() as f64;
    let mean = diameters.iter().sum::<f64>() / n;
    let var = diameters.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / (n - 1.0);
    Ok(Summary {
        count: diameters.len(),
        mean_nm: mean,
        stddev_nm: var.sqrt(),
    })
}
