use log::debug;
use serde::{Deserialize, Serialize};

use super::overlap::{align_overlap, overlap_interval, AlignedOverlap, OverlapInterval};
use crate::data::model::Spectrum;

/// Default number of finite overlap samples needed to trust a shift.
pub const DEFAULT_MIN_OVERLAP_SAMPLES: usize = 3;

/// Continuum mismatch between two adjacent sorted segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PairShift {
    /// `flux_right + value` is at the left segment's level.
    Measured { value: f64, samples: usize },
    /// Overlap is empty.
    NoOverlap,
    /// Overlap holds fewer valid samples than required.
    UnderSampled { samples: usize, required: usize },
}

impl PairShift {
    /// The shift value, or `None` when undefined.
    pub fn value(&self) -> Option<f64> {
        match self {
            PairShift::Measured { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Estimate the additive shift bringing `right` to `left`'s continuum level.
///
/// Uses the difference of medians over aligned overlap samples where both
/// fluxes are finite. Swapping the arguments negates the result exactly.
pub fn estimate_shift(left: &Spectrum, right: &Spectrum, min_samples: usize) -> PairShift {
    match align_overlap(left, right) {
        None => PairShift::NoOverlap,
        Some(aligned) => shift_from_aligned(&aligned, min_samples),
    }
}

/// Shift from already aligned overlap samples.
pub fn shift_from_aligned(aligned: &AlignedOverlap, min_samples: usize) -> PairShift {
    let (left, right): (Vec<f64>, Vec<f64>) = aligned
        .left
        .iter()
        .zip(&aligned.right)
        .filter(|(l, r)| l.is_finite() && r.is_finite())
        .map(|(l, r)| (*l, *r))
        .unzip();

    let samples = left.len();
    let required = min_samples.max(1);
    if samples < required {
        return PairShift::UnderSampled { samples, required };
    }

    let (Some(left_median), Some(right_median)) = (median(left), median(right)) else {
        return PairShift::UnderSampled { samples, required };
    };
    let value = left_median - right_median;
    debug!(
        "shift over [{:.6}, {:.6}) = {value:.6e} from {samples} samples",
        aligned.interval.lo, aligned.interval.hi
    );
    PairShift::Measured { value, samples }
}

/// Shift for every adjacent pair of sorted segments, with the pair intervals.
pub fn adjacent_shifts(
    sorted: &[&Spectrum],
    min_samples: usize,
) -> Vec<(OverlapInterval, PairShift)> {
    sorted
        .windows(2)
        .map(|pair| {
            let interval = overlap_interval(pair[0], pair[1]);
            (interval, estimate_shift(pair[0], pair[1], min_samples))
        })
        .collect()
}

/// Median of finite values; mean of the two middle values for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(0.5 * (values[mid - 1] + values[mid]))
    } else {
        Some(values[mid])
    }
}
