//! Per-aperture driver: segment files in, one merged template per aperture out.
//!
//! Each aperture becomes a self-contained [`StitchRequest`] holding owned
//! spectra. Requests are independent, so they can be handed to worker
//! threads (or serialized to another process) and answered in any order.

use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::model::{SegmentDataset, Spectrum};
use crate::data::table::TemplateTable;
use crate::error::{ConfigError, StitchError};
use crate::stitch::{stitch, StitchOptions, StitchOutcome};

// ---------------------------------------------------------------------------
// Request / response records
// ---------------------------------------------------------------------------

/// Work item for one aperture: its spectrum from every segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchRequest {
    pub name: String,
    /// Input order matches the segment files.
    pub segments: Vec<Spectrum>,
    pub options: StitchOptions,
}

/// Result for one aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchResponse {
    pub name: String,
    pub outcome: StitchOutcome,
}

impl StitchRequest {
    pub fn run(self) -> Result<StitchResponse, StitchError> {
        let outcome = stitch(&self.segments, &self.options)?;
        for warning in &outcome.warnings {
            warn!("template {}: {warning}", self.name);
        }
        Ok(StitchResponse {
            name: self.name,
            outcome,
        })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Names for `apertures` templates: the given names, or `T1..Tn`.
pub fn template_names(given: Option<&[String]>, apertures: usize) -> Result<Vec<String>, ConfigError> {
    match given {
        Some(names) if names.len() != apertures => Err(ConfigError::TemplateNameMismatch {
            names: names.len(),
            apertures,
        }),
        Some(names) => Ok(names.to_vec()),
        None => Ok((1..=apertures).map(|i| format!("T{i}")).collect()),
    }
}

/// One request per aperture. Every segment file must hold the same number
/// of apertures, and there must be one name per aperture.
pub fn build_requests(
    segments: &[SegmentDataset],
    names: Option<&[String]>,
    options: &StitchOptions,
) -> Result<Vec<StitchRequest>, ConfigError> {
    let first = segments.first().ok_or(ConfigError::EmptySegmentSet)?;
    let expected = first.len();
    for (segment, dataset) in segments.iter().enumerate() {
        if dataset.len() != expected {
            return Err(ConfigError::ApertureCountMismatch {
                segment,
                expected,
                found: dataset.len(),
            });
        }
    }

    let names = template_names(names, expected)?;
    Ok(names
        .into_iter()
        .enumerate()
        .map(|(aperture, name)| StitchRequest {
            name,
            segments: segments
                .iter()
                .map(|ds| ds.apertures[aperture].spectrum.clone())
                .collect(),
            options: *options,
        })
        .collect())
}

/// Answer every request, in request order.
pub fn run_requests(
    requests: Vec<StitchRequest>,
    parallel: bool,
) -> Result<Vec<StitchResponse>, StitchError> {
    if parallel {
        info!("stitching {} apertures in parallel", requests.len());
        requests.into_par_iter().map(StitchRequest::run).collect()
    } else {
        info!("stitching {} apertures sequentially", requests.len());
        requests.into_iter().map(StitchRequest::run).collect()
    }
}

/// Stitch every aperture across the loaded segments and tabulate the results.
pub fn extract_templates_table(
    segments: &[SegmentDataset],
    names: Option<&[String]>,
    options: &StitchOptions,
    parallel: bool,
) -> Result<TemplateTable> {
    let requests = build_requests(segments, names, options)?;
    let responses = run_requests(requests, parallel)?;
    let templates: Vec<(String, Spectrum)> = responses
        .into_iter()
        .map(|r| (r.name, r.outcome.merged))
        .collect();
    Ok(TemplateTable::from_templates(&templates)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ApertureSpectrum;
    use crate::units::{FluxUnit, WavelengthUnit};
    use std::collections::BTreeMap;

    fn dataset(rows: usize, start: f64, level: f64) -> SegmentDataset {
        let apertures = (0..rows)
            .map(|r| ApertureSpectrum {
                spectrum: Spectrum::new(
                    (0..6).map(|i| start + 0.125 * i as f64).collect(),
                    vec![level + r as f64; 6],
                    vec![0.1; 6],
                    WavelengthUnit::Micron,
                    FluxUnit::MegaJanskyPerSteradian,
                )
                .unwrap(),
                metadata: BTreeMap::new(),
            })
            .collect();
        SegmentDataset::from_apertures(apertures)
    }

    #[test]
    fn default_names_are_numbered_from_one() {
        assert_eq!(template_names(None, 3).unwrap(), vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn name_count_must_match_apertures() {
        let names = vec!["HII".to_string()];
        assert_eq!(
            template_names(Some(names.as_slice()), 2).unwrap_err(),
            ConfigError::TemplateNameMismatch { names: 1, apertures: 2 }
        );
    }

    #[test]
    fn segment_files_must_agree_on_aperture_count() {
        let segments = vec![dataset(2, 1.0, 10.0), dataset(3, 1.25, 12.0)];
        let err = build_requests(&segments, None, &StitchOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ApertureCountMismatch { segment: 1, expected: 2, found: 3 }
        );
    }

    #[test]
    fn requests_cross_a_serialization_boundary() {
        let segments = vec![dataset(1, 1.0, 10.0), dataset(1, 1.25, 12.0)];
        let requests = build_requests(&segments, None, &StitchOptions::default()).unwrap();
        let wire = serde_json::to_string(&requests[0]).unwrap();
        let request: StitchRequest = serde_json::from_str(&wire).unwrap();
        assert_eq!(request, requests[0]);

        let response = request.run().unwrap();
        let wire = serde_json::to_string(&response).unwrap();
        let back: StitchResponse = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.outcome.merged, response.outcome.merged);
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let segments = vec![dataset(4, 1.0, 10.0), dataset(4, 1.25, 12.0), dataset(4, 1.75, 9.0)];
        let options = StitchOptions {
            apply_offsets: true,
            ..StitchOptions::default()
        };
        let seq = run_requests(build_requests(&segments, None, &options).unwrap(), false).unwrap();
        let par = run_requests(build_requests(&segments, None, &options).unwrap(), true).unwrap();
        assert_eq!(seq, par);
        let names: Vec<&str> = par.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["T1", "T2", "T3", "T4"]);
    }

    #[test]
    fn table_has_one_flux_and_uncertainty_column_per_template() {
        let segments = vec![dataset(2, 1.0, 10.0), dataset(2, 1.25, 12.0)];
        let names = vec!["HII".to_string(), "Atomic".to_string()];
        let table =
            extract_templates_table(&segments, Some(names.as_slice()), &StitchOptions::default(), false)
                .unwrap();
        let cols: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cols, vec!["flux_HII", "unc_HII", "flux_Atomic", "unc_Atomic"]);
        assert!(table.wavelength.windows(2).all(|w| w[0] < w[1]));
    }
}
