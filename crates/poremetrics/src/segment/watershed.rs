//! Marker-controlled watershed flooding.
//!
//! The negated distance map is treated as a topographic surface: marker
//! pixels sit at basin bottoms (pore centers, where distance is largest)
//! and the flood climbs outward until basins meet. Flooding is restricted
//! to the foreground mask; background stays 0.
//!
//! Tie-break rule: candidates at equal elevation pop in FIFO order, with
//! marker pixels enqueued in row-major scan order. A pixel reached
//! simultaneously by two basins therefore goes to the basin whose
//! candidate entered the queue first, making the transform fully
//! deterministic for a given input.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::Connectivity;
use crate::raster::{DistanceMap, LabelMap, Mask};

/// One pixel awaiting assignment, ordered by (elevation, insertion order).
struct Candidate {
    /// Negated distance; lower elevation floods first.
    elevation: f64,
    /// Monotone insertion counter; breaks elevation ties FIFO.
    seq: u64,
    idx: usize,
    label: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we pop the lowest elevation.
        other
            .elevation
            .partial_cmp(&self.elevation)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flood the mask outward from the markers over the negated distance map.
///
/// Every foreground pixel connected to a marker receives that basin's
/// label; foreground unreachable from any marker and all background stay
/// 0. Output labels are always a subset of the input marker ids.
pub fn watershed(
    distance: &DistanceMap,
    markers: &LabelMap,
    mask: &Mask,
    connectivity: Connectivity,
) -> LabelMap {
    debug_assert!(distance.same_shape(markers) && distance.same_shape(mask));

    let mut labels = markers.clone();
    // Markers falling on background (possible with hand-supplied marker
    // grids) are discarded before flooding.
    for (i, &fg) in mask.data().iter().enumerate() {
        if !fg {
            labels.data_mut()[i] = 0;
        }
    }

    let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut seq = 0u64;
    for idx in 0..labels.len() {
        let label = labels.data()[idx];
        if label != 0 {
            heap.push(Candidate {
                elevation: -distance.data()[idx],
                seq,
                idx,
                label,
            });
            seq += 1;
        }
    }

    let offsets = connectivity.offsets();
    while let Some(c) = heap.pop() {
        let (x, y) = labels.coords(c.idx);
        for &(dx, dy) in offsets {
            let Some(n) = labels.checked_index(x as i64 + dx as i64, y as i64 + dy as i64) else {
                continue;
            };
            if mask.data()[n] && labels.data()[n] == 0 {
                labels.data_mut()[n] = c.label;
                heap.push(Candidate {
                    elevation: -distance.data()[n],
                    seq,
                    idx: n,
                    label: c.label,
                });
                seq += 1;
            }
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::distance::distance_transform;
    use crate::segment::maxima::find_seeds;
    use std::collections::HashSet;

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

    fn run(mask: &Mask) -> (LabelMap, LabelMap) {
        let d = distance_transform(mask);
        let (markers, _) = find_seeds(&d, Connectivity::Eight);
        let labels = watershed(&d, &markers, mask, Connectivity::Eight);
        (markers, labels)
    }

    #[test]
    fn empty_mask_yields_all_zero_labels() {
        let mask = Mask::filled(10, 10, false);
        let (_, labels) = run(&mask);
        assert!(labels.data().iter().all(|&l| l == 0));
    }

    #[test]
    fn labels_partition_the_mask() {
        let mask = mask_with_squares(14, 7, &[(1, 1, 4), (8, 2, 4)]);
        let (markers, labels) = run(&mask);
        let marker_ids: HashSet<u32> = markers.data().iter().copied().filter(|&l| l != 0).collect();
        for i in 0..mask.len() {
            let label = labels.data()[i];
            if mask.data()[i] {
                assert!(label > 0, "unlabeled foreground at {}", i);
                assert!(marker_ids.contains(&label), "label {} not a marker id", label);
            } else {
                assert_eq!(label, 0, "labeled background at {}", i);
            }
        }
    }

    #[test]
    fn disjoint_squares_keep_distinct_labels() {
        let mask = mask_with_squares(12, 6, &[(1, 1, 3), (8, 1, 3)]);
        let (_, labels) = run(&mask);
        let a = *labels.get(2, 2);
        let b = *labels.get(9, 2);
        assert_ne!(a, b);
        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(*labels.get(x, y), a);
            }
            for x in 8..11 {
                assert_eq!(*labels.get(x, y), b);
            }
        }
    }

    #[test]
    fn bridged_squares_split_into_two_basins() {
        // Two 3x3 squares joined by a 1-pixel-wide bridge: two maxima,
        // and the flood must divide the bridge between them.
        let mut mask = mask_with_squares(13, 5, &[(1, 1, 3), (9, 1, 3)]);
        for x in 4..9 {
            mask.set(x, 2, true);
        }
        let (markers, labels) = run(&mask);
        let ids: HashSet<u32> = markers.data().iter().copied().filter(|&l| l != 0).collect();
        assert_eq!(ids.len(), 2);
        let present: HashSet<u32> = labels.data().iter().copied().filter(|&l| l != 0).collect();
        assert_eq!(present, ids);
        // Every bridge pixel went to one of the two basins.
        for x in 4..9 {
            assert!(ids.contains(labels.get(x, 2)));
        }
    }

    #[test]
    fn flooding_is_deterministic() {
        let mut mask = mask_with_squares(13, 5, &[(1, 1, 3), (9, 1, 3)]);
        for x in 4..9 {
            mask.set(x, 2, true);
        }
        let (_, first) = run(&mask);
        let (_, second) = run(&mask);
        assert_eq!(first, second);
    }

    #[test]
    fn markers_on_background_are_ignored() {
        let mask = mask_with_squares(8, 8, &[(1, 1, 3)]);
        let d = distance_transform(&mask);
        let mut markers = LabelMap::filled(8, 8, 0);
        markers.set(2, 2, 1);
        markers.set(6, 6, 7); // background: must not flood
        let labels = watershed(&d, &markers, &mask, Connectivity::Eight);
        assert!(labels.data().iter().all(|&l| l == 0 || l == 1));
        assert_eq!(*labels.get(6, 6), 0);
    }
}
