use std::borrow::Borrow;
use std::ops::Range;

use log::debug;

use super::overlap::overlap_interval;
use crate::data::model::Spectrum;
use crate::error::ConfigError;

/// Wavelength cut for every adjacent pair of sorted segments.
///
/// Overlapping pairs are cut at the overlap midpoint; disjoint or touching
/// pairs at the lower segment's last wavelength. Cuts never decrease, so
/// nested segments cannot fold the merged axis back on itself.
pub fn boundary_cuts<S: Borrow<Spectrum>>(sorted: &[S]) -> Vec<f64> {
    let mut cuts: Vec<f64> = Vec::with_capacity(sorted.len().saturating_sub(1));
    for pair in sorted.windows(2) {
        let (left, right) = (pair[0].borrow(), pair[1].borrow());
        let interval = overlap_interval(left, right);
        let cut = if interval.is_empty() {
            left.max_wavelength()
        } else {
            interval.midpoint()
        };
        let cut = cuts.last().map_or(cut, |&prev| cut.max(prev));
        cuts.push(cut);
    }
    cuts
}

/// Sample index range each segment contributes: `(cut_{k-1}, cut_k]`.
///
/// A sample sitting exactly on a cut belongs to the earlier segment.
pub fn retained_ranges<S: Borrow<Spectrum>>(sorted: &[S], cuts: &[f64]) -> Vec<Range<usize>> {
    sorted
        .iter()
        .enumerate()
        .map(|(k, seg)| {
            let wl = seg.borrow().wavelength();
            let start = match k {
                0 => 0,
                _ => wl.partition_point(|&w| w <= cuts[k - 1]),
            };
            let end = match cuts.get(k) {
                Some(&cut) => wl.partition_point(|&w| w <= cut),
                None => wl.len(),
            };
            start..end.max(start)
        })
        .collect()
}

/// Fuse sorted, unit-consistent segments into one spectrum.
///
/// No resampling happens here: every output sample is an input sample,
/// taken from the segment that owns its wavelength under the cut rule.
pub fn merge_segments<S: Borrow<Spectrum>>(sorted: &[S]) -> Result<Spectrum, ConfigError> {
    let first = sorted.first().ok_or(ConfigError::EmptySegmentSet)?.borrow();
    if sorted.len() == 1 {
        return Ok(first.clone());
    }

    let cuts = boundary_cuts(sorted);
    let ranges = retained_ranges(sorted, &cuts);
    let total: usize = ranges.iter().map(|r| r.len()).sum();

    let mut wavelength = Vec::with_capacity(total);
    let mut flux = Vec::with_capacity(total);
    let mut uncertainty = Vec::with_capacity(total);
    for (seg, range) in sorted.iter().zip(&ranges) {
        let seg = seg.borrow();
        wavelength.extend_from_slice(&seg.wavelength()[range.clone()]);
        flux.extend_from_slice(&seg.flux()[range.clone()]);
        uncertainty.extend_from_slice(&seg.uncertainty()[range.clone()]);
    }
    debug!(
        "merged {} segments into {total} samples (cuts {cuts:?})",
        sorted.len()
    );

    Ok(Spectrum::from_validated(
        wavelength,
        flux,
        uncertainty,
        first.wavelength_unit(),
        first.flux_unit(),
    ))
}
