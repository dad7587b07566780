use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, SpectrumError};
use crate::units::{FluxUnit, WavelengthUnit};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a non-spectral column
// ---------------------------------------------------------------------------

/// A dynamically-typed value from a segment file column that is not part of
/// the spectrum itself (aperture labels, unit strings, extraction notes).
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Borrow the value as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – wavelength / flux / uncertainty with units
// ---------------------------------------------------------------------------

/// A 1D spectrum: three parallel sample sequences plus their units.
///
/// Invariants, checked on construction and on deserialization:
/// * at least one sample, all three sequences the same length
/// * wavelengths finite and strictly increasing
///
/// Flux and uncertainty may hold NaN for flagged samples. Values are never
/// modified in place; corrections return a new `Spectrum`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectrum", into = "RawSpectrum")]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    uncertainty: Vec<f64>,
    wavelength_unit: WavelengthUnit,
    flux_unit: FluxUnit,
}

impl Spectrum {
    /// Build a spectrum, validating the axis invariants.
    pub fn new(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        uncertainty: Vec<f64>,
        wavelength_unit: WavelengthUnit,
        flux_unit: FluxUnit,
    ) -> Result<Self, SpectrumError> {
        if wavelength.len() != flux.len() || wavelength.len() != uncertainty.len() {
            return Err(SpectrumError::LengthMismatch {
                wavelength: wavelength.len(),
                flux: flux.len(),
                uncertainty: uncertainty.len(),
            });
        }
        if wavelength.is_empty() {
            return Err(SpectrumError::Empty);
        }
        for (index, w) in wavelength.iter().enumerate() {
            if !w.is_finite() {
                return Err(SpectrumError::NonFiniteWavelength { index });
            }
        }
        for (index, pair) in wavelength.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(SpectrumError::NotIncreasing {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        Ok(Spectrum {
            wavelength,
            flux,
            uncertainty,
            wavelength_unit,
            flux_unit,
        })
    }

    /// Build a spectrum with unknown (NaN) uncertainties.
    pub fn without_uncertainty(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        wavelength_unit: WavelengthUnit,
        flux_unit: FluxUnit,
    ) -> Result<Self, SpectrumError> {
        let uncertainty = vec![f64::NAN; flux.len()];
        Spectrum::new(wavelength, flux, uncertainty, wavelength_unit, flux_unit)
    }

    /// Assemble a spectrum from samples already known to satisfy the invariants.
    pub(crate) fn from_validated(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        uncertainty: Vec<f64>,
        wavelength_unit: WavelengthUnit,
        flux_unit: FluxUnit,
    ) -> Self {
        debug_assert!(!wavelength.is_empty());
        debug_assert!(wavelength.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(wavelength.len(), flux.len());
        debug_assert_eq!(wavelength.len(), uncertainty.len());
        Spectrum {
            wavelength,
            flux,
            uncertainty,
            wavelength_unit,
            flux_unit,
        }
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn uncertainty(&self) -> &[f64] {
        &self.uncertainty
    }

    pub fn wavelength_unit(&self) -> WavelengthUnit {
        self.wavelength_unit
    }

    pub fn flux_unit(&self) -> FluxUnit {
        self.flux_unit
    }

    /// Number of samples (always at least one).
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    pub fn min_wavelength(&self) -> f64 {
        self.wavelength[0]
    }

    pub fn max_wavelength(&self) -> f64 {
        self.wavelength[self.wavelength.len() - 1]
    }

    /// A copy with `offset` added to every flux value. Uncertainties are kept.
    pub fn with_offset(&self, offset: f64) -> Spectrum {
        Spectrum {
            flux: self.flux.iter().map(|f| f + offset).collect(),
            ..self.clone()
        }
    }

    /// Express the spectrum in other units.
    ///
    /// The rescaled axis is validated again: extreme factors can overflow to
    /// infinity or collapse neighbouring wavelengths onto one value.
    pub fn to_units(
        &self,
        wavelength_unit: WavelengthUnit,
        flux_unit: FluxUnit,
    ) -> Result<Spectrum, ConversionError> {
        let flux_factor = self.flux_unit.factor_to(flux_unit)?;
        let wl_factor = self.wavelength_unit.factor_to(wavelength_unit);
        if flux_factor == 1.0 && wl_factor == 1.0 {
            return Ok(Spectrum {
                wavelength_unit,
                flux_unit,
                ..self.clone()
            });
        }
        Ok(Spectrum::new(
            self.wavelength.iter().map(|w| w * wl_factor).collect(),
            self.flux.iter().map(|f| f * flux_factor).collect(),
            self.uncertainty.iter().map(|u| u * flux_factor).collect(),
            wavelength_unit,
            flux_unit,
        )?)
    }
}

/// Unvalidated wire form of [`Spectrum`].
#[derive(Serialize, Deserialize)]
struct RawSpectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    uncertainty: Vec<f64>,
    wavelength_unit: WavelengthUnit,
    flux_unit: FluxUnit,
}

impl TryFrom<RawSpectrum> for Spectrum {
    type Error = SpectrumError;

    fn try_from(raw: RawSpectrum) -> Result<Self, Self::Error> {
        Spectrum::new(
            raw.wavelength,
            raw.flux,
            raw.uncertainty,
            raw.wavelength_unit,
            raw.flux_unit,
        )
    }
}

impl From<Spectrum> for RawSpectrum {
    fn from(s: Spectrum) -> Self {
        RawSpectrum {
            wavelength: s.wavelength,
            flux: s.flux,
            uncertainty: s.uncertainty,
            wavelength_unit: s.wavelength_unit,
            flux_unit: s.flux_unit,
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentDataset – one loaded segment file
// ---------------------------------------------------------------------------

/// One aperture's spectrum from a segment file, with its extra columns.
#[derive(Debug, Clone)]
pub struct ApertureSpectrum {
    pub spectrum: Spectrum,
    /// Remaining columns: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// All apertures extracted from one wavelength segment, in file row order.
#[derive(Debug, Clone)]
pub struct SegmentDataset {
    pub apertures: Vec<ApertureSpectrum>,
    /// Ordered list of metadata column names (excludes the spectral columns).
    pub column_names: Vec<String>,
}

impl SegmentDataset {
    /// Collect the metadata column names from the loaded rows.
    pub fn from_apertures(apertures: Vec<ApertureSpectrum>) -> Self {
        let column_names: BTreeSet<String> = apertures
            .iter()
            .flat_map(|a| a.metadata.keys().cloned())
            .collect();
        SegmentDataset {
            apertures,
            column_names: column_names.into_iter().collect(),
        }
    }

    /// Number of apertures.
    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    /// Whether the file held no apertures.
    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }
}
