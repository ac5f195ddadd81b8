//! Seed detection: local maxima of the distance map, labeled as markers.
//!
//! A seed is a connected plateau of equal distance values with no strictly
//! greater neighbor. Plateau handling matters: the distance map of any
//! non-trivial pore contains flat ridges, and treating each plateau pixel
//! as its own maximum would oversegment badly.

use crate::config::Connectivity;
use crate::raster::{DistanceMap, LabelMap, Mask};

/// Mark local-maximum plateaus of the distance map.
///
/// Only strictly positive distances participate, so background can never
/// seed a basin and an all-background map yields an empty result. Plateaus
/// touching the image border are still eligible.
pub fn local_maxima(distance: &DistanceMap, connectivity: Connectivity) -> Mask {
    let (w, h) = (distance.width(), distance.height());
    let mut maxima = Mask::filled(w, h, false);
    let mut visited = vec![false; distance.len()];
    let mut plateau: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let offsets = connectivity.offsets();

    for start in 0..distance.len() {
        if visited[start] || distance.data()[start] <= 0.0 {
            continue;
        }
        let level = distance.data()[start];

        // Flood the equal-valued plateau, checking for higher neighbors.
        plateau.clear();
        stack.clear();
        stack.push(start);
        visited[start] = true;
        let mut is_max = true;
        while let Some(idx) = stack.pop() {
            plateau.push(idx);
            let (x, y) = distance.coords(idx);
            for &(dx, dy) in offsets {
                let Some(n) = distance.checked_index(x as i64 + dx as i64, y as i64 + dy as i64) else {
                    continue;
                };
                let nv = distance.data()[n];
                if nv > level {
                    is_max = false;
                } else if nv == level && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        if is_max {
            for &idx in &plateau {
                maxima.data_mut()[idx] = true;
            }
        }
    }
    maxima
}

/// Label connected components of a mask with 1..=n in scan order.
pub fn label_components(mask: &Mask, connectivity: Connectivity) -> (LabelMap, u32) {
    let (w, h) = (mask.width(), mask.height());
    let mut labels = LabelMap::filled(w, h, 0);
    let mut next = 0u32;
    let mut stack: Vec<usize> = Vec::new();
    let offsets = connectivity.offsets();

    for start in 0..mask.len() {
        if !mask.data()[start] || labels.data()[start] != 0 {
            continue;
        }
        next += 1;
        labels.data_mut()[start] = next;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let (x, y) = mask.coords(idx);
            for &(dx, dy) in offsets {
                let Some(n) = mask.checked_index(x as i64 + dx as i64, y as i64 + dy as i64) else {
                    continue;
                };
                if mask.data()[n] && labels.data()[n] == 0 {
                    labels.data_mut()[n] = next;
                    stack.push(n);
                }
            }
        }
    }
    (labels, next)
}

/// Detect seeds: local maxima grouped into labeled marker components.
///
/// Returns the marker grid and the number of markers. Marker ids are
/// assigned in scan order, so they are deterministic for a given input.
pub fn find_seeds(distance: &DistanceMap, connectivity: Connectivity) -> (LabelMap, u32) {
    label_components(&local_maxima(distance, connectivity), connectivity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::distance::distance_transform;

    fn mask_with_squares(w: u32, h: u32, squares: &[(u32, u32, u32)]) -> Mask {
        let mut m = Mask::filled(w, h, false);
        for &(x0, y0, side) in squares {
            for y in y0..y0 + side {
                for x in x0..x0 + side {
                    m.set(x, y, true);
                }
            }
        }
        m
    }

    #[test]
    fn empty_distance_map_has_no_seeds() {
        let d = distance_transform(&Mask::filled(10, 10, false));
        let (markers, n) = find_seeds(&d, Connectivity::Eight);
        assert_eq!(n, 0);
        assert!(markers.data().iter().all(|&l| l == 0));
    }

    #[test]
    fn single_square_yields_one_seed() {
        let m = mask_with_squares(9, 9, &[(2, 2, 5)]);
        let d = distance_transform(&m);
        let (markers, n) = find_seeds(&d, Connectivity::Eight);
        assert_eq!(n, 1);
        // The seed sits on the square's center plateau.
        assert_eq!(*markers.get(4, 4), 1);
    }

    #[test]
    fn two_separate_squares_yield_two_seeds() {
        let m = mask_with_squares(12, 6, &[(1, 1, 3), (8, 1, 3)]);
        let d = distance_transform(&m);
        let (_, n) = find_seeds(&d, Connectivity::Eight);
        assert_eq!(n, 2);
    }

    #[test]
    fn seeds_are_foreground_only() {
        let m = mask_with_squares(12, 6, &[(1, 1, 3), (8, 1, 3)]);
        let d = distance_transform(&m);
        let (markers, _) = find_seeds(&d, Connectivity::Eight);
        for (i, &label) in markers.data().iter().enumerate() {
            if label != 0 {
                assert!(m.data()[i], "marker on background at index {}", i);
            }
        }
    }

    #[test]
    fn plateau_becomes_a_single_marker() {
        // A 1-pixel-tall bar has a flat distance profile (all 1.0): one
        // plateau, one marker, despite many equal maxima pixels.
        let m = mask_with_squares(10, 3, &[(1, 1, 1)]);
        let mut bar = m;
        for x in 1..9 {
            bar.set(x, 1, true);
        }
        let d = distance_transform(&bar);
        let (_, n) = find_seeds(&d, Connectivity::Eight);
        assert_eq!(n, 1);
    }

    #[test]
    fn component_labels_are_dense_and_scan_ordered() {
        let m = mask_with_squares(12, 6, &[(1, 1, 2), (8, 2, 2)]);
        let (labels, n) = label_components(&m, Connectivity::Four);
        assert_eq!(n, 2);
        assert_eq!(*labels.get(1, 1), 1); // first in scan order
        assert_eq!(*labels.get(8, 2), 2);
    }
}
