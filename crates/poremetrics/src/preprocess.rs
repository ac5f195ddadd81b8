//! Preprocessing: info-bar crop, median denoising, gamma contrast.

use crate::error::AnalysisError;
use crate::raster::FloatImage;

/// Keep rows `[0, cutoff_row)`, dropping the instrument info-bar below.
///
/// `cutoff_row` must satisfy `0 < cutoff_row <= height`; anything else is
/// rejected rather than silently wrapped.
pub fn crop_above(img: &FloatImage, cutoff_row: u32) -> Result<FloatImage, AnalysisError> {
    if cutoff_row == 0 || cutoff_row > img.height() {
        return Err(AnalysisError::InvalidInput(format!(
            "crop row {} outside image height {}",
            cutoff_row,
            img.height()
        )));
    }
    let w = img.width() as usize;
    let data = img.data()[..w * cutoff_row as usize].to_vec();
    Ok(FloatImage::from_vec(img.width(), cutoff_row, data))
}

/// Median filter with a square `window x window` neighborhood.
///
/// `window` must be odd (validated at the config layer); 1 is a no-op.
/// Borders are handled by clamping coordinates, so edge pixels see a
/// neighborhood padded with their nearest in-image samples.
pub fn median_filter(img: &FloatImage, window: u32) -> FloatImage {
    debug_assert!(window % 2 == 1, "median window must be odd");
    if window <= 1 || img.is_empty() {
        return img.clone();
    }
    let (w, h) = (img.width(), img.height());
    let r = (window / 2) as i64;
    let mut out = FloatImage::filled(w, h, 0.0);
    let mut neighborhood = Vec::with_capacity((window * window) as usize);
    for y in 0..h {
        for x in 0..w {
            neighborhood.clear();
            for dy in -r..=r {
                for dx in -r..=r {
                    let nx = (x as i64 + dx).clamp(0, w as i64 - 1);
                    let ny = (y as i64 + dy).clamp(0, h as i64 - 1);
                    neighborhood.push(*img.get(nx as u32, ny as u32));
                }
            }
            neighborhood
                .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            out.set(x, y, neighborhood[neighborhood.len() / 2]);
        }
    }
    out
}

/// Power-law (gamma) intensity transform: `out = in^gamma`, clamped to [0, 1].
///
/// `gamma > 1` suppresses mid-tones (pores darken against the matrix),
/// `gamma < 1` lifts them.
pub fn adjust_gamma(img: &FloatImage, gamma: f32) -> FloatImage {
    let data = img
        .data()
        .iter()
        .map(|&v| v.clamp(0.0, 1.0).powf(gamma))
        .collect();
    FloatImage::from_vec(img.width(), img.height(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_image(w: u32, h: u32) -> FloatImage {
        let data = (0..w * h).map(|i| i as f32 / (w * h) as f32).collect();
        FloatImage::from_vec(w, h, data)
    }

    #[test]
    fn crop_keeps_rows_above_cutoff() {
        let img = ramp_image(4, 6);
        let cropped = crop_above(&img, 4).unwrap();
        assert_eq!(cropped.height(), 4);
        assert_eq!(cropped.width(), 4);
        assert_eq!(cropped.get(3, 3), img.get(3, 3));
    }

    #[test]
    fn crop_rejects_out_of_bounds() {
        let img = ramp_image(4, 6);
        assert!(crop_above(&img, 7).is_err());
        assert!(crop_above(&img, 0).is_err());
        // Full height is a valid no-op crop.
        assert_eq!(crop_above(&img, 6).unwrap(), img);
    }

    #[test]
    fn median_removes_impulse_noise() {
        let mut img = FloatImage::filled(5, 5, 0.5);
        img.set(2, 2, 1.0); // lone hot pixel
        let filtered = median_filter(&img, 3);
        assert_relative_eq!(*filtered.get(2, 2), 0.5);
    }

    #[test]
    fn median_window_one_is_identity() {
        let img = ramp_image(6, 4);
        assert_eq!(median_filter(&img, 1), img);
    }

    #[test]
    fn median_preserves_constant_regions() {
        let img = FloatImage::filled(4, 4, 0.25);
        assert_eq!(median_filter(&img, 3), img);
    }

    #[test]
    fn gamma_darkens_midtones_and_fixes_endpoints() {
        let img = FloatImage::from_vec(3, 1, vec![0.0, 0.5, 1.0]);
        let out = adjust_gamma(&img, 2.0);
        assert_relative_eq!(*out.get(0, 0), 0.0);
        assert_relative_eq!(*out.get(1, 0), 0.25);
        assert_relative_eq!(*out.get(2, 0), 1.0);
    }

    #[test]
    fn gamma_clamps_out_of_range_input() {
        let img = FloatImage::from_vec(2, 1, vec![-0.5, 1.5]);
        let out = adjust_gamma(&img, 1.0);
        assert_relative_eq!(*out.get(0, 0), 0.0);
        assert_relative_eq!(*out.get(1, 0), 1.0);
    }
}
