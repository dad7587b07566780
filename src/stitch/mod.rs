/// Stitching engine: align and fuse overlapping spectral segments.
///
/// Architecture:
/// ```text
///   &[Spectrum]  (input order, any units)
///        │
///        ▼
///   ┌──────────┐
///   │  sorter   │  order by min wavelength → permutation
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  overlap  │  [lo, hi) per adjacent pair, common grid
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   shift   │  median(left) − median(right)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  offsets  │  chain shifts from the reference segment
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   merge   │  add offsets, cut at overlap midpoints
///   └──────────┘
/// ```
///
/// Every stage is a pure function; nothing is cached between calls.
pub mod merge;
pub mod offsets;
pub mod overlap;
pub mod shift;
pub mod sorter;

use std::borrow::Cow;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::data::model::Spectrum;
use crate::error::{ConfigError, ConversionError, StitchError};
use merge::merge_segments;
use offsets::{default_reference, propagate_offsets, OffsetVector};
use shift::{adjacent_shifts, PairShift, DEFAULT_MIN_OVERLAP_SAMPLES};
use sorter::sort_segments;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tunable stitching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Estimate and apply additive offsets. When false, segments are only
    /// sorted and cut-merged.
    pub apply_offsets: bool,
    /// Reference index into the *sorted* segments; middle segment if unset.
    pub reference_segment: Option<usize>,
    /// Minimum finite overlap samples for a shift to be trusted.
    pub min_overlap_samples: usize,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            apply_offsets: false,
            reference_segment: None,
            min_overlap_samples: DEFAULT_MIN_OVERLAP_SAMPLES,
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal conditions that make parts of the output less reliable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StitchWarning {
    /// Sorted boundary `boundary` (between sorted segments `boundary` and
    /// `boundary + 1`) has no usable overlap. `lower` / `upper` are the
    /// input indices of the two segments.
    InsufficientOverlap {
        boundary: usize,
        lower: usize,
        upper: usize,
        shift: PairShift,
    },
    /// Input indices of segments left uncorrected because the chain to the
    /// reference is broken.
    FallbackOffset { segments: Vec<usize> },
}

impl fmt::Display for StitchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StitchWarning::InsufficientOverlap {
                boundary,
                lower,
                upper,
                shift,
            } => match shift {
                PairShift::UnderSampled { samples, required } => write!(
                    f,
                    "boundary {boundary} (segments {lower}/{upper}): only {samples} of {required} overlap samples"
                ),
                _ => write!(
                    f,
                    "boundary {boundary} (segments {lower}/{upper}): segments do not overlap"
                ),
            },
            StitchWarning::FallbackOffset { segments } => {
                write!(f, "segments {segments:?} left without offset correction")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Everything one stitching call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchOutcome {
    pub merged: Spectrum,
    /// `order[k]` is the input index of sorted segment `k`.
    pub order: Vec<usize>,
    /// Pairwise shifts in sorted order; empty when offsets are not applied.
    pub shifts: Vec<PairShift>,
    /// Offsets in sorted order.
    pub offsets: OffsetVector,
    /// Sorted segments in common units with their offsets applied.
    pub corrected: Vec<Spectrum>,
    pub warnings: Vec<StitchWarning>,
}

impl StitchOutcome {
    /// Offsets indexed by input position instead of sorted position.
    pub fn offsets_by_input(&self) -> Vec<f64> {
        let mut by_input = vec![0.0; self.order.len()];
        for (sorted, &input) in self.order.iter().enumerate() {
            by_input[input] = self.offsets.offsets[sorted];
        }
        by_input
    }
}

// ---------------------------------------------------------------------------
// Engine entry-point
// ---------------------------------------------------------------------------

/// Stitch wavelength segments into one spectrum.
///
/// Segments are converted to the units of the first input segment, sorted by
/// wavelength, optionally offset-corrected relative to the reference segment,
/// and fused with the midpoint-cut rule.
pub fn stitch(segments: &[Spectrum], options: &StitchOptions) -> Result<StitchOutcome, StitchError> {
    let first = segments.first().ok_or(ConfigError::EmptySegmentSet)?;
    let count = segments.len();
    let reference = options
        .reference_segment
        .unwrap_or_else(|| default_reference(count));
    if reference >= count {
        return Err(ConfigError::ReferenceOutOfRange {
            index: reference,
            count,
        }
        .into());
    }

    let harmonized = harmonize_units(segments, first)?;
    let sorted = sort_segments(&harmonized);
    debug!("segment order by wavelength: {:?}", sorted.order);

    if count == 1 {
        return Ok(StitchOutcome {
            merged: first.clone(),
            order: sorted.order,
            shifts: Vec::new(),
            offsets: OffsetVector::zeros(1, 0),
            corrected: vec![first.clone()],
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    let (shifts, offsets) = if options.apply_offsets {
        let pairs = adjacent_shifts(&sorted.segments, options.min_overlap_samples);
        let shifts: Vec<PairShift> = pairs.into_iter().map(|(_, s)| s).collect();
        for (boundary, shift) in shifts.iter().enumerate() {
            if shift.value().is_none() {
                warnings.push(StitchWarning::InsufficientOverlap {
                    boundary,
                    lower: sorted.order[boundary],
                    upper: sorted.order[boundary + 1],
                    shift: *shift,
                });
            }
        }
        let values: Vec<Option<f64>> = shifts.iter().map(PairShift::value).collect();
        let offsets = propagate_offsets(&values, reference)?;
        if !offsets.fallback.is_empty() {
            warnings.push(StitchWarning::FallbackOffset {
                segments: offsets.fallback.iter().map(|&k| sorted.order[k]).collect(),
            });
        }
        (shifts, offsets)
    } else {
        (Vec::new(), OffsetVector::zeros(count, reference))
    };

    let corrected: Vec<Spectrum> = sorted
        .segments
        .iter()
        .zip(&offsets.offsets)
        .map(|(seg, &offset)| {
            if offset == 0.0 {
                (*seg).clone()
            } else {
                seg.with_offset(offset)
            }
        })
        .collect();
    let merged = merge_segments(&corrected)?;

    for warning in &warnings {
        debug!("{warning}");
    }
    info!(
        "stitched {count} segments into {} samples (reference {reference}, offsets {})",
        merged.len(),
        if options.apply_offsets { "applied" } else { "off" }
    );

    Ok(StitchOutcome {
        merged,
        order: sorted.order,
        shifts,
        offsets,
        corrected,
        warnings,
    })
}

/// Express every segment in `target`'s units, borrowing when already there.
fn harmonize_units<'a>(
    segments: &'a [Spectrum],
    target: &Spectrum,
) -> Result<Vec<Cow<'a, Spectrum>>, StitchError> {
    let (wl_unit, flux_unit) = (target.wavelength_unit(), target.flux_unit());
    segments
        .iter()
        .enumerate()
        .map(|(segment, s)| {
            if s.wavelength_unit() == wl_unit && s.flux_unit() == flux_unit {
                return Ok(Cow::Borrowed(s));
            }
            s.to_units(wl_unit, flux_unit)
                .map(Cow::Owned)
                .map_err(|err| match err {
                    ConversionError::Unit(source) => {
                        StitchError::from(ConfigError::UnitMismatch { segment, source })
                    }
                    ConversionError::Axis(source) => StitchError::DataIntegrity { segment, source },
                })
        })
        .collect()
}
