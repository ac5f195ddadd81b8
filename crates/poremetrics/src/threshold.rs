//! Binarization: automatic threshold selection and mask construction.
//!
//! Pores render darker than the surrounding matrix, so the foreground
//! predicate is `intensity <= cutoff` throughout. All histogram-based
//! methods bin the observed intensity range into [`HISTOGRAM_BINS`] buckets.

use crate::config::{ThresholdMethod, ThresholdSpec};
use crate::error::AnalysisError;
use crate::raster::{FloatImage, Mask};

/// Bucket count for histogram-based threshold methods.
pub const HISTOGRAM_BINS: usize = 256;

/// Intensity histogram over the observed value range.
struct Histogram {
    counts: [u64; HISTOGRAM_BINS],
    min: f32,
    max: f32,
}

impl Histogram {
    fn build(img: &FloatImage) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in img.data() {
            min = min.min(v);
            max = max.max(v);
        }
        let mut counts = [0u64; HISTOGRAM_BINS];
        let range = max - min;
        if range > 0.0 {
            let scale = (HISTOGRAM_BINS - 1) as f32 / range;
            for &v in img.data() {
                let bin = ((v - min) * scale).round() as usize;
                counts[bin.min(HISTOGRAM_BINS - 1)] += 1;
            }
        } else {
            counts[0] = img.len() as u64;
        }
        Self { counts, min, max }
    }

    /// Intensity at the center of `bin`.
    fn center(&self, bin: usize) -> f32 {
        if self.max <= self.min {
            return self.min;
        }
        let width = (self.max - self.min) / (HISTOGRAM_BINS - 1) as f32;
        self.min + bin as f32 * width
    }
}

/// Compute a scalar cutoff with the selected method.
///
/// On a constant image every method collapses to that constant; the
/// resulting all-foreground mask is caught by the degeneracy check.
pub fn compute_threshold(img: &FloatImage, method: ThresholdMethod) -> f32 {
    match method {
        ThresholdMethod::Mean => mean_threshold(img),
        ThresholdMethod::Triangle => triangle_threshold(img),
        ThresholdMethod::Li => li_threshold(img),
        ThresholdMethod::Yen => yen_threshold(img),
    }
}

fn mean_threshold(img: &FloatImage) -> f32 {
    if img.is_empty() {
        return 0.0;
    }
    let sum: f64 = img.data().iter().map(|&v| v as f64).sum();
    (sum / img.len() as f64) as f32
}

/// Triangle method: largest perpendicular distance between the histogram
/// and the line from its peak to the far end of the longer tail.
fn triangle_threshold(img: &FloatImage) -> f32 {
    let hist = Histogram::build(img);
    let counts = &hist.counts;

    let peak = counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, &c)| c)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let first = counts.iter().position(|&c| c > 0).unwrap_or(0);
    let last = counts.iter().rposition(|&c| c > 0).unwrap_or(0);
    if first == last {
        return hist.center(first);
    }

    // Walk the longer tail; the shorter side rarely holds the knee.
    let end = if last - peak >= peak - first { last } else { first };
    let (lo, hi) = (peak.min(end), peak.max(end));

    let hp = counts[peak] as f64;
    let he = counts[end] as f64;
    let (xp, xe) = (peak as f64, end as f64);

    let mut best = peak;
    let mut best_dist = f64::NEG_INFINITY;
    for i in lo + 1..hi {
        // Numerator of the point-to-line distance; the denominator is
        // constant along the line and can be dropped.
        let d = ((hp - he) * i as f64 - (xp - xe) * counts[i] as f64 + xp * he - xe * hp).abs();
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    hist.center(best)
}

/// Li's minimum cross-entropy threshold via fixed-point iteration.
fn li_threshold(img: &FloatImage) -> f32 {
    if img.is_empty() {
        return 0.0;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in img.data() {
        min = min.min(v as f64);
        max = max.max(v as f64);
    }
    let range = max - min;
    if range <= 0.0 {
        return min as f32;
    }

    // Shift samples strictly positive so the logs below stay defined.
    let eps = range * 1e-6;
    let shifted: Vec<f64> = img.data().iter().map(|&v| v as f64 - min + eps).collect();
    let tol = range * 1e-4;

    let mut t = shifted.iter().sum::<f64>() / shifted.len() as f64;
    for _ in 0..100 {
        let mut back_sum = 0.0;
        let mut back_n = 0u64;
        let mut fore_sum = 0.0;
        let mut fore_n = 0u64;
        for &v in &shifted {
            if v <= t {
                back_sum += v;
                back_n += 1;
            } else {
                fore_sum += v;
                fore_n += 1;
            }
        }
        if back_n == 0 || fore_n == 0 {
            break;
        }
        let mean_back = back_sum / back_n as f64;
        let mean_fore = fore_sum / fore_n as f64;
        let t_next = (mean_back - mean_fore) / (mean_back.ln() - mean_fore.ln());
        if !t_next.is_finite() {
            break;
        }
        let converged = (t_next - t).abs() < tol;
        t = t_next;
        if converged {
            break;
        }
    }
    (t + min - eps) as f32
}

/// Yen's maximum-correlation criterion over the intensity histogram.
fn yen_threshold(img: &FloatImage) -> f32 {
    let hist = Histogram::build(img);
    let total: f64 = hist.counts.iter().map(|&c| c as f64).sum();
    if total == 0.0 {
        return 0.0;
    }

    let pmf: Vec<f64> = hist.counts.iter().map(|&c| c as f64 / total).collect();
    let mut p1 = vec![0.0; HISTOGRAM_BINS];
    let mut p1_sq = vec![0.0; HISTOGRAM_BINS];
    let mut acc = 0.0;
    let mut acc_sq = 0.0;
    for i in 0..HISTOGRAM_BINS {
        acc += pmf[i];
        acc_sq += pmf[i] * pmf[i];
        p1[i] = acc;
        p1_sq[i] = acc_sq;
    }
    // p2_sq[i] = sum of squared mass from bin i upward.
    let mut p2_sq = vec![0.0; HISTOGRAM_BINS + 1];
    for i in (0..HISTOGRAM_BINS).rev() {
        p2_sq[i] = p2_sq[i + 1] + pmf[i] * pmf[i];
    }

    let mut best = 0;
    let mut best_crit = f64::NEG_INFINITY;
    for i in 0..HISTOGRAM_BINS - 1 {
        if p1_sq[i] <= 0.0 || p2_sq[i + 1] <= 0.0 {
            continue;
        }
        let sep = p1[i] * (1.0 - p1[i]);
        if sep <= 0.0 {
            continue;
        }
        let crit = (sep * sep / (p1_sq[i] * p2_sq[i + 1])).ln();
        if crit > best_crit {
            best_crit = crit;
            best = i;
        }
    }
    hist.center(best)
}

/// Foreground mask: `intensity <= cutoff`.
pub fn apply_threshold(img: &FloatImage, cutoff: f32) -> Mask {
    let data = img.data().iter().map(|&v| v <= cutoff).collect();
    Mask::from_vec(img.width(), img.height(), data)
}

/// Reject masks the watershed cannot meaningfully process.
pub fn ensure_not_degenerate(mask: &Mask) -> Result<(), AnalysisError> {
    let foreground = mask.count_foreground();
    let total = mask.len();
    if foreground == 0 || foreground == total {
        return Err(AnalysisError::DegenerateMask { foreground, total });
    }
    Ok(())
}

/// Binarize with an automatically selected cutoff.
pub fn threshold_auto(img: &FloatImage, method: ThresholdMethod) -> Result<Mask, AnalysisError> {
    let mask = apply_threshold(img, compute_threshold(img, method));
    ensure_not_degenerate(&mask)?;
    Ok(mask)
}

/// Binarize with a hand-picked cutoff.
///
/// A cutoff far off the data range shows up immediately as a degenerate
/// mask error instead of a silent all-white/all-black run.
pub fn threshold_fixed(img: &FloatImage, cutoff: f32) -> Result<Mask, AnalysisError> {
    let mask = apply_threshold(img, cutoff);
    ensure_not_degenerate(&mask)?;
    Ok(mask)
}

/// Resolve a [`ThresholdSpec`] to a mask plus the cutoff actually used.
pub fn binarize(img: &FloatImage, spec: ThresholdSpec) -> Result<(Mask, f32), AnalysisError> {
    let cutoff = match spec {
        ThresholdSpec::Auto(method) => compute_threshold(img, method),
        ThresholdSpec::Fixed(cutoff) => cutoff,
    };
    let mask = apply_threshold(img, cutoff);
    ensure_not_degenerate(&mask)?;
    Ok((mask, cutoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdMethod;

    /// 70% bright matrix at 0.9, 30% dark pores spread over [0.1, 0.3].
    fn porous_image() -> FloatImage {
        let mut data = vec![0.9f32; 70];
        for i in 0..30 {
            data.push(0.1 + 0.2 * (i as f32 / 29.0));
        }
        FloatImage::from_vec(10, 10, data)
    }

    fn bimodal_image() -> FloatImage {
        let mut data = vec![0.2f32; 50];
        data.extend(vec![0.8f32; 50]);
        FloatImage::from_vec(10, 10, data)
    }

    #[test]
    fn all_methods_separate_the_modes() {
        for method in [
            ThresholdMethod::Mean,
            ThresholdMethod::Triangle,
            ThresholdMethod::Li,
            ThresholdMethod::Yen,
        ] {
            let img = porous_image();
            let t = compute_threshold(&img, method);
            assert!(
                t > 0.1 && t < 0.9,
                "{} produced cutoff {} outside the data spread",
                method,
                t
            );
            let mask = threshold_auto(&img, method).unwrap();
            assert!(mask.count_foreground() > 0);
            assert!(mask.count_foreground() < mask.len());
        }
    }

    #[test]
    fn mean_threshold_is_the_mean() {
        let img = bimodal_image();
        let t = compute_threshold(&img, ThresholdMethod::Mean);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn foreground_is_the_dark_phase() {
        let mask = threshold_auto(&bimodal_image(), ThresholdMethod::Mean).unwrap();
        assert_eq!(mask.count_foreground(), 50);
        assert!(*mask.get(0, 0)); // dark half comes first
        assert!(!*mask.get(9, 9));
    }

    #[test]
    fn uniform_image_is_degenerate() {
        let img = FloatImage::filled(8, 8, 0.4);
        for method in [
            ThresholdMethod::Mean,
            ThresholdMethod::Triangle,
            ThresholdMethod::Li,
            ThresholdMethod::Yen,
        ] {
            let err = threshold_auto(&img, method).unwrap_err();
            assert!(
                matches!(err, AnalysisError::DegenerateMask { .. }),
                "{} accepted a constant image",
                method
            );
        }
    }

    #[test]
    fn fixed_cutoff_out_of_range_is_degenerate() {
        let img = bimodal_image();
        assert!(matches!(
            threshold_fixed(&img, 0.05).unwrap_err(),
            AnalysisError::DegenerateMask { foreground: 0, .. }
        ));
        assert!(matches!(
            threshold_fixed(&img, 0.95).unwrap_err(),
            AnalysisError::DegenerateMask { .. }
        ));
    }

    #[test]
    fn fixed_cutoff_in_range_splits() {
        let (mask, cutoff) = binarize(&bimodal_image(), ThresholdSpec::Fixed(0.5)).unwrap();
        assert_eq!(cutoff, 0.5);
        assert_eq!(mask.count_foreground(), 50);
    }
}
