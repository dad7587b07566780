//! Stitch overlapping spectral segments into one continuous 1D spectrum.
//!
//! IFU observations split across instrument channels yield one extracted
//! spectrum per wavelength segment. Each segment carries its own flux
//! calibration, so neighbouring segments rarely agree where they overlap.
//! [`stitch::stitch`] measures the continuum mismatch in every overlap,
//! chains the mismatches into additive offsets relative to a reference
//! segment, and fuses the segments on a single strictly increasing axis.
//!
//! ```
//! use specstitch::data::model::Spectrum;
//! use specstitch::stitch::{stitch, StitchOptions};
//! use specstitch::units::{FluxUnit, WavelengthUnit};
//!
//! let seg = |w: Vec<f64>, level: f64| {
//!     let n = w.len();
//!     Spectrum::new(w, vec![level; n], vec![0.1; n], WavelengthUnit::Micron, FluxUnit::Jansky)
//! };
//! let a = seg(vec![1.0, 1.1, 1.2, 1.3, 1.4], 10.0).unwrap();
//! let b = seg(vec![1.1, 1.2, 1.3, 1.5, 1.6], 12.0).unwrap();
//!
//! let options = StitchOptions { apply_offsets: true, reference_segment: Some(0), ..Default::default() };
//! let out = stitch(&[a, b], &options).unwrap();
//! assert_eq!(out.offsets.offsets, vec![0.0, -2.0]);
//! assert!(out.merged.flux().iter().all(|f| (f - 10.0).abs() < 1e-12));
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod stitch;
pub mod templates;
pub mod units;
