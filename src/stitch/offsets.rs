use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-segment additive flux corrections, in sorted segment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetVector {
    /// Sorted index of the segment whose offset is pinned to zero.
    pub reference: usize,
    pub offsets: Vec<f64>,
    /// Sorted indices that got a zero offset because the chain from the
    /// reference was broken by an undefined shift.
    pub fallback: Vec<usize>,
}

impl OffsetVector {
    /// All-zero corrections, used when offsets are not applied.
    pub fn zeros(count: usize, reference: usize) -> Self {
        OffsetVector {
            reference,
            offsets: vec![0.0; count],
            fallback: Vec::new(),
        }
    }
}

/// Middle segment; keeps the longest chain from the reference short.
pub fn default_reference(count: usize) -> usize {
    count / 2
}

/// Chain pairwise shifts into offsets anchored at `reference`.
///
/// `shifts[i]` is the shift for sorted pair `(i, i + 1)`, `None` when
/// undefined. Walking away from the reference, the first undefined shift
/// zeroes that segment and every segment beyond it.
pub fn propagate_offsets(
    shifts: &[Option<f64>],
    reference: usize,
) -> Result<OffsetVector, ConfigError> {
    let count = shifts.len() + 1;
    if reference >= count {
        return Err(ConfigError::ReferenceOutOfRange {
            index: reference,
            count,
        });
    }

    let mut offsets = vec![0.0; count];
    let mut fallback = Vec::new();

    let mut broken = false;
    for j in reference + 1..count {
        match shifts[j - 1] {
            Some(shift) if !broken => offsets[j] = offsets[j - 1] + shift,
            _ => {
                broken = true;
                fallback.push(j);
            }
        }
    }

    broken = false;
    for j in (0..reference).rev() {
        match shifts[j] {
            Some(shift) if !broken => offsets[j] = offsets[j + 1] - shift,
            _ => {
                broken = true;
                fallback.push(j);
            }
        }
    }

    fallback.sort_unstable();
    debug!("offsets relative to segment {reference}: {offsets:?}");
    Ok(OffsetVector {
        reference,
        offsets,
        fallback,
    })
}
