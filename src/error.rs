use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Unit parsing and conversion failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("unknown wavelength unit '{0}'")]
    UnknownWavelengthUnit(String),
    #[error("unknown flux unit '{0}'")]
    UnknownFluxUnit(String),
    #[error("cannot convert flux from {from} to {to}")]
    Incompatible { from: String, to: String },
}

/// A spectrum whose samples violate the axis invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    #[error("spectrum has no samples")]
    Empty,
    #[error("length mismatch: {wavelength} wavelengths, {flux} fluxes, {uncertainty} uncertainties")]
    LengthMismatch {
        wavelength: usize,
        flux: usize,
        uncertainty: usize,
    },
    #[error("non-finite wavelength at sample {index}")]
    NonFiniteWavelength { index: usize },
    #[error("wavelength axis not strictly increasing at sample {index} ({previous} >= {current})")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// Failure converting a spectrum to other units.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Rescaling overflowed or merged neighbouring wavelengths.
    #[error("converted axis is invalid: {0}")]
    Axis(#[from] SpectrumError),
}

/// Caller-side setup mistakes. Fatal, detected before any computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no segments to stitch")]
    EmptySegmentSet,
    #[error("reference segment {index} out of range for {count} segments")]
    ReferenceOutOfRange { index: usize, count: usize },
    #[error("segment {segment} has units incompatible with segment 0: {source}")]
    UnitMismatch { segment: usize, source: UnitError },
    #[error("{names} template names given for {apertures} apertures")]
    TemplateNameMismatch { names: usize, apertures: usize },
    #[error("segment file {segment} holds {found} apertures, expected {expected}")]
    ApertureCountMismatch {
        segment: usize,
        expected: usize,
        found: usize,
    },
    #[error("no templates to tabulate")]
    NoTemplates,
    #[error("template '{name}' has a wavelength axis different from '{first}'")]
    TemplateAxisMismatch { name: String, first: String },
}

/// Errors returned by the stitching engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StitchError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("data integrity error in segment {segment}: {source}")]
    DataIntegrity {
        segment: usize,
        source: SpectrumError,
    },
}
