use std::cmp::Ordering;
use std::ops::Range;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::model::Spectrum;

// ---------------------------------------------------------------------------
// OverlapInterval
// ---------------------------------------------------------------------------

/// Half-open wavelength range `[lo, hi)` covered by two adjacent segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapInterval {
    pub lo: f64,
    pub hi: f64,
}

impl OverlapInterval {
    /// Contiguous or disjoint segments produce an empty interval.
    pub fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }
}

/// Wavelength range shared by two spectra. Symmetric in its arguments.
pub fn overlap_interval(a: &Spectrum, b: &Spectrum) -> OverlapInterval {
    OverlapInterval {
        lo: a.min_wavelength().max(b.min_wavelength()),
        hi: a.max_wavelength().min(b.max_wavelength()),
    }
}

// ---------------------------------------------------------------------------
// Aligned overlap samples
// ---------------------------------------------------------------------------

/// Both segments' fluxes on one common grid inside the overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedOverlap {
    pub interval: OverlapInterval,
    /// The finer of the two native grids, restricted to `[lo, hi)`.
    pub wavelength: Vec<f64>,
    /// Flux of the first (lower) segment at `wavelength`.
    pub left: Vec<f64>,
    /// Flux of the second (upper) segment at `wavelength`.
    pub right: Vec<f64>,
}

/// Put the two segments' fluxes on a common grid inside their overlap.
///
/// The spectrum with more samples in `[lo, hi)` provides the grid; the other
/// one is linearly interpolated onto it. Returns `None` for an empty overlap.
pub fn align_overlap(left: &Spectrum, right: &Spectrum) -> Option<AlignedOverlap> {
    let interval = overlap_interval(left, right);
    if interval.is_empty() {
        return None;
    }

    let left_range = samples_within(left, &interval);
    let right_range = samples_within(right, &interval);
    let left_grid = &left.wavelength()[left_range.clone()];
    let right_grid = &right.wavelength()[right_range.clone()];

    let aligned = match finer_grid(left_grid, right_grid) {
        Ordering::Equal => AlignedOverlap {
            interval,
            wavelength: left_grid.to_vec(),
            left: left.flux()[left_range].to_vec(),
            right: right.flux()[right_range].to_vec(),
        },
        Ordering::Less => AlignedOverlap {
            interval,
            wavelength: left_grid.to_vec(),
            left: left.flux()[left_range].to_vec(),
            right: left_grid.iter().map(|&w| interpolate(right, w)).collect(),
        },
        Ordering::Greater => AlignedOverlap {
            interval,
            wavelength: right_grid.to_vec(),
            left: right_grid.iter().map(|&w| interpolate(left, w)).collect(),
            right: right.flux()[right_range].to_vec(),
        },
    };
    debug!(
        "overlap [{:.6}, {:.6}): {} aligned samples ({} / {} native)",
        interval.lo,
        interval.hi,
        aligned.wavelength.len(),
        left_grid.len(),
        right_grid.len()
    );
    Some(aligned)
}

/// Indices of samples with wavelength in `[lo, hi)`.
pub fn samples_within(spectrum: &Spectrum, interval: &OverlapInterval) -> Range<usize> {
    let wl = spectrum.wavelength();
    let start = wl.partition_point(|&w| w < interval.lo);
    let end = wl.partition_point(|&w| w < interval.hi);
    start..end.max(start)
}

/// `Less` when `a` is the finer grid, `Greater` when `b` is, `Equal` when they
/// are identical. Independent of argument order up to reversal.
fn finer_grid(a: &[f64], b: &[f64]) -> Ordering {
    match b.len().cmp(&a.len()) {
        Ordering::Equal => {}
        other => return other,
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Linear interpolation of `spectrum`'s flux at `x`. NaN outside the axis.
fn interpolate(spectrum: &Spectrum, x: f64) -> f64 {
    let wl = spectrum.wavelength();
    let flux = spectrum.flux();
    let idx = wl.partition_point(|&w| w < x);
    if idx < wl.len() && wl[idx] == x {
        return flux[idx];
    }
    if idx == 0 || idx == wl.len() {
        return f64::NAN;
    }
    let (x0, x1) = (wl[idx - 1], wl[idx]);
    let t = (x - x0) / (x1 - x0);
    flux[idx - 1] + t * (flux[idx] - flux[idx - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{FluxUnit, WavelengthUnit};

    fn spec(w: &[f64], f: &[f64]) -> Spectrum {
        Spectrum::without_uncertainty(
            w.to_vec(),
            f.to_vec(),
            WavelengthUnit::Micron,
            FluxUnit::Jansky,
        )
        .unwrap()
    }

    #[test]
    fn disjoint_and_touching_segments_have_empty_overlap() {
        let a = spec(&[1.0, 2.0], &[0.0, 0.0]);
        let b = spec(&[2.0, 3.0], &[0.0, 0.0]);
        let c = spec(&[4.0, 5.0], &[0.0, 0.0]);
        assert!(overlap_interval(&a, &b).is_empty());
        assert!(overlap_interval(&a, &c).is_empty());
        assert!(align_overlap(&a, &b).is_none());
    }

    #[test]
    fn interval_is_symmetric() {
        let a = spec(&[1.0, 2.0, 3.0], &[0.0; 3]);
        let b = spec(&[2.5, 3.5], &[0.0; 2]);
        assert_eq!(overlap_interval(&a, &b), overlap_interval(&b, &a));
        assert_eq!(overlap_interval(&a, &b), OverlapInterval { lo: 2.5, hi: 3.0 });
    }

    #[test]
    fn coarse_segment_is_interpolated_onto_fine_grid() {
        let coarse = spec(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);
        let fine = spec(&[1.5, 1.75, 2.0, 2.25, 2.5, 3.5], &[1.0; 6]);
        let aligned = align_overlap(&coarse, &fine).unwrap();
        assert_eq!(aligned.wavelength, vec![1.5, 1.75, 2.0, 2.25, 2.5]);
        assert_eq!(aligned.right, vec![1.0; 5]);
        let expected = [15.0, 17.5, 20.0, 22.5, 25.0];
        for (got, want) in aligned.left.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn interpolation_never_leaves_the_overlap() {
        let a = spec(&[1.0, 1.1, 1.2, 1.3], &[10.0; 4]);
        let b = spec(&[1.25, 1.35, 1.45], &[15.0; 3]);
        let aligned = align_overlap(&a, &b).unwrap();
        assert_eq!(aligned.wavelength, vec![1.25]);
        assert!((aligned.left[0] - 10.0).abs() < 1e-12);
        assert!(aligned.wavelength.iter().all(|&w| w >= 1.25 && w < 1.3));
    }

    #[test]
    fn swapped_roles_give_swapped_columns() {
        let a = spec(&[1.0, 1.2, 1.4, 1.6], &[3.0, 4.0, 5.0, 6.0]);
        let b = spec(&[1.1, 1.3, 1.5, 1.7], &[7.0, 8.0, 9.0, 10.0]);
        let ab = align_overlap(&a, &b).unwrap();
        let ba = align_overlap(&b, &a).unwrap();
        assert_eq!(ab.wavelength, ba.wavelength);
        assert_eq!(ab.left, ba.right);
        assert_eq!(ab.right, ba.left);
    }

    #[test]
    fn nan_neighbours_poison_interpolated_values() {
        let coarse = spec(&[1.0, 2.0, 3.0], &[f64::NAN, 20.0, 30.0]);
        let fine = spec(&[1.5, 1.6, 2.5, 2.6], &[1.0; 4]);
        let aligned = align_overlap(&coarse, &fine).unwrap();
        assert!(aligned.left[0].is_nan());
        assert!((aligned.left[2] - 25.0).abs() < 1e-12);
    }
}
