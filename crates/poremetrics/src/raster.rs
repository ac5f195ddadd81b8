//! Rectangular pixel grids shared by every pipeline stage.
//!
//! All stages operate on the same [`Grid`] buffer with a different sample
//! type: intensities (`f32`), masks (`bool`), distances (`f64`), labels
//! (`u32`). Keeping one buffer type guarantees shape agreement across the
//! chain without per-stage conversions.

use std::path::Path;

use image::GrayImage;

use crate::error::AnalysisError;

/// Row-major rectangular buffer of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

/// Grayscale intensity image, samples normalized to [0, 1].
pub type FloatImage = Grid<f32>;

/// Foreground/background mask. `true` = foreground (pore).
pub type Mask = Grid<bool>;

/// Per-pixel Euclidean distance to the nearest background pixel.
pub type DistanceMap = Grid<f64>;

/// Integer label grid. 0 = background/unlabeled, positive = region id.
pub type LabelMap = Grid<u32>;

impl<T: Clone> Grid<T> {
    /// Grid of the given shape with every sample set to `value`.
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }
}

impl<T> Grid<T> {
    /// Wrap an existing row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "grid buffer length must match width*height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of samples (`width * height`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Inverse of [`Grid::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((index % w) as u32, (index / w) as u32)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> &T {
        &self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// `Some(flat index)` when `(x, y)` (signed) lies inside the grid.
    #[inline]
    pub fn checked_index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            None
        } else {
            Some(self.index(x as u32, y as u32))
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// True when `other` covers the same pixel lattice.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl Mask {
    /// Number of foreground pixels.
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl FloatImage {
    /// Convert an 8-bit grayscale image to normalized floats.
    pub fn from_gray(gray: &GrayImage) -> Self {
        let data = gray.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();
        Self::from_vec(gray.width(), gray.height(), data)
    }

    /// Quantize back to 8-bit grayscale (values clamped to [0, 1]).
    pub fn to_gray(&self) -> GrayImage {
        let buf = self
            .data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        GrayImage::from_raw(self.width, self.height, buf)
            .expect("buffer length matches dimensions")
    }
}

/// Read an image file and convert it to normalized grayscale intensities.
///
/// Any format the `image` crate decodes is accepted; multi-channel sources
/// are collapsed to luma. SEM captures should always go through this even
/// when they already look gray on screen.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<FloatImage, AnalysisError> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|e| {
        AnalysisError::InvalidInput(format!("failed to read image {}: {}", path.display(), e))
    })?;
    let luma = decoded.to_luma32f();
    let data = luma.pixels().map(|p| p.0[0].clamp(0.0, 1.0)).collect();
    Ok(FloatImage::from_vec(luma.width(), luma.height(), data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        let g: Grid<u32> = Grid::filled(7, 4, 0);
        for y in 0..4 {
            for x in 0..7 {
                assert_eq!(g.coords(g.index(x, y)), (x, y));
            }
        }
    }

    #[test]
    fn checked_index_rejects_outside() {
        let g: Grid<bool> = Grid::filled(3, 3, false);
        assert!(g.checked_index(-1, 0).is_none());
        assert!(g.checked_index(0, -1).is_none());
        assert!(g.checked_index(3, 0).is_none());
        assert!(g.checked_index(0, 3).is_none());
        assert_eq!(g.checked_index(2, 2), Some(8));
    }

    #[test]
    fn gray_conversion_roundtrip() {
        let mut gray = GrayImage::new(4, 2);
        for (i, p) in gray.pixels_mut().enumerate() {
            p.0[0] = (i * 30) as u8;
        }
        let float = FloatImage::from_gray(&gray);
        assert_eq!(float.to_gray(), gray);
    }

    #[test]
    fn count_foreground_counts_true_pixels() {
        let mut m = Mask::filled(4, 4, false);
        m.set(1, 1, true);
        m.set(2, 3, true);
        assert_eq!(m.count_foreground(), 2);
    }
}
