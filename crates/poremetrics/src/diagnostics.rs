//! Diagnostic renderings for the operator's manual QA loop.
//!
//! Everything here consumes finished pipeline outputs and writes PNGs;
//! nothing feeds back into the measurement chain. Stage images mirror the
//! plots the operator tunes against: crop, contrast, mask, seed centers,
//! contours, label map, diameter histogram.

use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_cross_mut;
use plotters::prelude::*;

use crate::error::AnalysisError;
use crate::measure;
use crate::pipeline::AnalysisResult;
use crate::raster::{DistanceMap, FloatImage, LabelMap, Mask};

const CROSS_COLOR: Rgb<u8> = Rgb([220, 40, 40]);

fn write_error(path: &Path, message: String) -> AnalysisError {
    AnalysisError::OutputWrite {
        path: path.to_path_buf(),
        source: std::io::Error::other(message),
    }
}

fn save_png(img: &image::DynamicImage, path: &Path) -> Result<(), AnalysisError> {
    img.save(path).map_err(|e| write_error(path, e.to_string()))
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    let mut rgb = RgbImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        rgb.put_pixel(x, y, Rgb([p.0[0], p.0[0], p.0[0]]));
    }
    rgb
}

/// Render a mask as black/white.
pub fn render_mask(mask: &Mask) -> GrayImage {
    let buf = mask
        .data()
        .iter()
        .map(|&fg| if fg { 255u8 } else { 0u8 })
        .collect();
    GrayImage::from_raw(mask.width(), mask.height(), buf)
        .expect("buffer length matches dimensions")
}

/// Render a distance map normalized to its maximum.
pub fn render_distance(distance: &DistanceMap) -> GrayImage {
    let max = distance.data().iter().cloned().fold(0.0f64, f64::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    let buf = distance
        .data()
        .iter()
        .map(|&d| (d * scale).round() as u8)
        .collect();
    GrayImage::from_raw(distance.width(), distance.height(), buf)
        .expect("buffer length matches dimensions")
}

/// Deterministic label color: golden-ratio hue scrambling so adjacent
/// label ids land on visually distant hues (the original tool shuffled
/// label order for the same reason).
pub fn label_color(label: u32) -> Rgb<u8> {
    let hue = (label.wrapping_mul(2_654_435_769) >> 8) as f64 / (1u32 << 24) as f64 * 360.0;
    hsv_to_rgb(hue, 0.65, 0.95)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let c = v * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    Rgb([
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ])
}

/// Color-coded label map over black background.
pub fn render_labels(labels: &LabelMap) -> RgbImage {
    let mut rgb = RgbImage::new(labels.width(), labels.height());
    for idx in 0..labels.len() {
        let label = labels.data()[idx];
        if label != 0 {
            let (x, y) = labels.coords(idx);
            rgb.put_pixel(x, y, label_color(label));
        }
    }
    rgb
}

/// Seed centers drawn as crosses over the grayscale image.
pub fn render_seeds(base: &FloatImage, markers: &LabelMap) -> RgbImage {
    let mut rgb = gray_to_rgb(&base.to_gray());
    for region in measure::measure_regions(markers) {
        draw_cross_mut(
            &mut rgb,
            CROSS_COLOR,
            region.centroid[0].round() as i32,
            region.centroid[1].round() as i32,
        );
    }
    rgb
}

/// Pore contours over the grayscale image.
///
/// A contour pixel is a labeled pixel with at least one 4-neighbor
/// carrying a different label (or background / the image border).
pub fn render_contours(base: &FloatImage, labels: &LabelMap) -> RgbImage {
    let mut rgb = gray_to_rgb(&base.to_gray());
    for idx in 0..labels.len() {
        let label = labels.data()[idx];
        if label == 0 {
            continue;
        }
        let (x, y) = labels.coords(idx);
        let on_boundary = [(0i64, -1i64), (-1, 0), (1, 0), (0, 1)]
            .iter()
            .any(|&(dx, dy)| {
                labels
                    .checked_index(x as i64 + dx, y as i64 + dy)
                    .map(|n| labels.data()[n] != label)
                    .unwrap_or(true)
            });
        if on_boundary {
            rgb.put_pixel(x, y, label_color(label));
        }
    }
    rgb
}

/// Diameter histogram rendered with the plotters bitmap backend.
///
/// Axis lines only, no text: the report JSON carries the numbers, this
/// is a shape check.
pub fn render_histogram<P: AsRef<Path>>(
    diameters: &[f64],
    bins: usize,
    path: P,
) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    let (width, height) = (800u32, 500u32);
    let margin = 30i32;

    let max_d = diameters.iter().cloned().fold(0.0f64, f64::max);
    let bins = bins.max(1);
    let mut counts = vec![0u64; bins];
    if max_d > 0.0 {
        for &d in diameters {
            let bin = ((d / max_d) * bins as f64) as usize;
            counts[bin.min(bins - 1)] += 1;
        }
    }
    let max_count = counts.iter().cloned().max().unwrap_or(0).max(1);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| write_error(path, e.to_string()))?;

    let plot_w = width as i32 - 2 * margin;
    let plot_h = height as i32 - 2 * margin;
    let bar_color = RGBColor(70, 110, 180);
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let x0 = margin + (i as i32 * plot_w) / bins as i32;
        let x1 = margin + ((i + 1) as i32 * plot_w) / bins as i32;
        let bar_h = ((count as f64 / max_count as f64) * plot_h as f64).round() as i32;
        let y1 = margin + plot_h;
        let y0 = y1 - bar_h;
        root.draw(&Rectangle::new([(x0, y0), (x1 - 1, y1)], bar_color.filled()))
            .map_err(|e| write_error(path, e.to_string()))?;
    }

    let axis_color = RGBColor(30, 30, 30);
    root.draw(&PathElement::new(
        [(margin, margin), (margin, margin + plot_h)],
        axis_color,
    ))
    .map_err(|e| write_error(path, e.to_string()))?;
    root.draw(&PathElement::new(
        [(margin, margin + plot_h), (margin + plot_w, margin + plot_h)],
        axis_color,
    ))
    .map_err(|e| write_error(path, e.to_string()))?;

    root.present().map_err(|e| write_error(path, e.to_string()))
}

/// Write the full stage-image set into `dir` (created if missing).
pub fn save_stage_images<P: AsRef<Path>>(
    dir: P,
    result: &AnalysisResult,
) -> Result<(), AnalysisError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| AnalysisError::OutputWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let stages = &result.stages;
    use image::DynamicImage;
    save_png(
        &DynamicImage::ImageLuma8(stages.cropped.to_gray()),
        &dir.join("cropped.png"),
    )?;
    save_png(
        &DynamicImage::ImageLuma8(stages.denoised.to_gray()),
        &dir.join("denoised.png"),
    )?;
    save_png(
        &DynamicImage::ImageLuma8(stages.contrasted.to_gray()),
        &dir.join("contrasted.png"),
    )?;
    save_png(
        &DynamicImage::ImageLuma8(render_mask(&stages.mask)),
        &dir.join("mask.png"),
    )?;
    save_png(
        &DynamicImage::ImageLuma8(render_distance(&stages.distance)),
        &dir.join("distance.png"),
    )?;
    save_png(
        &DynamicImage::ImageRgb8(render_seeds(&stages.cropped, &stages.markers)),
        &dir.join("seeds.png"),
    )?;
    save_png(
        &DynamicImage::ImageRgb8(render_labels(&stages.labels)),
        &dir.join("labels.png"),
    )?;
    save_png(
        &DynamicImage::ImageRgb8(render_contours(&stages.cropped, &stages.labels)),
        &dir.join("contours.png"),
    )?;
    render_histogram(&result.diameters_nm, 60, dir.join("histogram.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, ThresholdSpec};
    use crate::pipeline;

    fn sample_result() -> AnalysisResult {
        let mut img = FloatImage::filled(24, 24, 0.9);
        for &(x0, y0) in &[(3u32, 3u32), (14, 12)] {
            for y in y0..y0 + 5 {
                for x in x0..x0 + 5 {
                    img.set(x, y, 0.1);
                }
            }
        }
        let config = AnalysisConfig {
            median_window: 1,
            gamma: 1.0,
            threshold: ThresholdSpec::Fixed(0.5),
            px_per_nm: 0.1,
            ..Default::default()
        };
        pipeline::analyze(&img, &config).unwrap()
    }

    #[test]
    fn label_colors_are_deterministic_and_distinct() {
        assert_eq!(label_color(1), label_color(1));
        assert_ne!(label_color(1), label_color(2));
    }

    #[test]
    fn mask_rendering_is_binary() {
        let result = sample_result();
        let img = render_mask(&result.stages.mask);
        assert!(img.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn distance_rendering_peaks_at_white() {
        let result = sample_result();
        let img = render_distance(&result.stages.distance);
        assert_eq!(img.pixels().map(|p| p.0[0]).max(), Some(255));
    }

    #[test]
    fn contours_stay_on_labeled_pixels() {
        let result = sample_result();
        let overlay = render_contours(&result.stages.cropped, &result.stages.labels);
        for (x, y, p) in overlay.enumerate_pixels() {
            let gray = p.0[0] == p.0[1] && p.0[1] == p.0[2];
            if !gray {
                assert_ne!(*result.stages.labels.get(x, y), 0);
            }
        }
    }

    #[test]
    fn stage_images_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        save_stage_images(dir.path(), &result).unwrap();
        for name in [
            "cropped.png",
            "denoised.png",
            "contrasted.png",
            "mask.png",
            "distance.png",
            "seeds.png",
            "labels.png",
            "contours.png",
            "histogram.png",
        ] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }
    }
}
