use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{ApertureSpectrum, MetadataValue, SegmentDataset, Spectrum};
use crate::error::StitchError;
use crate::units::{FluxUnit, WavelengthUnit};

/// Spectral list columns; everything else is row metadata.
const WAVELENGTH: &str = "wavelength";
const FLUX: &str = "flux";
const UNCERTAINTY: &str = "uncertainty";
/// Unit columns, read from the row metadata.
const WAVELENGTH_UNIT: &str = "wavelength_unit";
const FLUX_UNIT: &str = "flux_unit";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one segment file (one row per aperture). Dispatch by extension.
///
/// `segment` is the file's position on the command line and is only used to
/// label integrity errors.
///
/// Supported formats:
/// * `.parquet` – `wavelength`, `flux`, `uncertainty` list columns (recommended)
/// * `.json`    – `[{ "wavelength": [...], "flux": [...], ...meta }, ...]`
/// * `.csv`     – list columns hold semicolon-separated floats
///
/// Every row needs `wavelength_unit` and `flux_unit` text columns. A missing
/// `uncertainty` column yields NaN uncertainties.
pub fn load_file(path: &Path, segment: usize) -> Result<SegmentDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, segment),
        "json" => load_json(path, segment),
        "csv" => load_csv(path, segment),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading segment file {}", path.display()))?;

    info!(
        "segment {segment}: {} apertures from {}",
        dataset.len(),
        path.display()
    );
    debug!("segment {segment} metadata columns: {:?}", dataset.column_names);
    Ok(dataset)
}

/// Turn one row's columns into a validated aperture spectrum.
fn build_row(
    segment: usize,
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    uncertainty: Option<Vec<f64>>,
    metadata: BTreeMap<String, MetadataValue>,
) -> Result<ApertureSpectrum> {
    let wavelength_unit: WavelengthUnit = unit_text(&metadata, WAVELENGTH_UNIT)?.parse()?;
    let flux_unit: FluxUnit = unit_text(&metadata, FLUX_UNIT)?.parse()?;
    let uncertainty = uncertainty.unwrap_or_else(|| vec![f64::NAN; flux.len()]);

    let spectrum = Spectrum::new(wavelength, flux, uncertainty, wavelength_unit, flux_unit)
        .map_err(|source| StitchError::DataIntegrity { segment, source })?;
    debug!("segment {segment}: {} samples, {}", spectrum.len(), describe_metadata(&metadata));
    Ok(ApertureSpectrum { spectrum, metadata })
}

/// `key=value` pairs for log lines.
fn describe_metadata(metadata: &BTreeMap<String, MetadataValue>) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn unit_text<'a>(metadata: &'a BTreeMap<String, MetadataValue>, column: &str) -> Result<&'a str> {
    metadata
        .get(column)
        .and_then(MetadataValue::as_str)
        .with_context(|| format!("missing or non-text '{column}' column"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, e.g. `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "wavelength": [4.90, 4.91, ...],
///     "flux":       [120.1, 121.4, ...],
///     "uncertainty": [0.8, 0.8, ...],
///     "wavelength_unit": "um",
///     "flux_unit": "MJy/sr",
///     "aperture": "HII"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path, segment: usize) -> Result<SegmentDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut apertures = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let wavelength = json_array_to_f64(obj.get(WAVELENGTH), i, WAVELENGTH)?;
        let flux = json_array_to_f64(obj.get(FLUX), i, FLUX)?;
        let uncertainty = match obj.get(UNCERTAINTY) {
            Some(v) => Some(json_array_to_f64(Some(v), i, UNCERTAINTY)?),
            None => None,
        };

        let mut metadata = BTreeMap::new();
        for (key, val) in obj {
            if key == WAVELENGTH || key == FLUX || key == UNCERTAINTY {
                continue;
            }
            metadata.insert(key.clone(), json_to_metadata(val));
        }

        let row = build_row(segment, wavelength, flux, uncertainty, metadata)
            .with_context(|| format!("Row {i}"))?;
        apertures.push(row);
    }

    Ok(SegmentDataset::from_apertures(apertures))
}

/// Numbers become floats; `null` marks a flagged sample and becomes NaN.
fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            JsonValue::Null => Ok(f64::NAN),
            _ => v
                .as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number")),
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names.
/// `wavelength`, `flux` and `uncertainty` contain semicolon-separated floats:
///   `"4.90;4.91;4.92"`, `"120.1;121.4;nan"`
/// All other columns are treated as metadata.
fn load_csv(path: &Path, segment: usize) -> Result<SegmentDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let wl_idx = position(WAVELENGTH).context("CSV missing 'wavelength' column")?;
    let flux_idx = position(FLUX).context("CSV missing 'flux' column")?;
    let unc_idx = position(UNCERTAINTY);

    let mut apertures = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let wavelength =
            parse_semicolon_floats(record.get(wl_idx).unwrap_or(""), row_no, WAVELENGTH)?;
        let flux = parse_semicolon_floats(record.get(flux_idx).unwrap_or(""), row_no, FLUX)?;
        let uncertainty = match unc_idx {
            Some(idx) => Some(parse_semicolon_floats(
                record.get(idx).unwrap_or(""),
                row_no,
                UNCERTAINTY,
            )?),
            None => None,
        };

        let mut metadata = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == wl_idx || col_idx == flux_idx || Some(col_idx) == unc_idx {
                continue;
            }
            let col_name = &headers[col_idx];
            metadata.insert(col_name.clone(), guess_metadata_type(value));
        }

        let row = build_row(segment, wavelength, flux, uncertainty, metadata)
            .with_context(|| format!("CSV row {row_no}"))?;
        apertures.push(row);
    }

    Ok(SegmentDataset::from_apertures(apertures))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    // Unit strings such as "nan" or "inf" must not turn into floats.
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => MetadataValue::Float(f),
        _ => MetadataValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one segment's aperture spectra.
///
/// Expected schema:
/// - `wavelength`, `flux`: List<Float64|Float32> or LargeList – required
/// - `uncertainty`: same list type – optional
/// - `wavelength_unit`, `flux_unit`: Utf8
/// - Any other columns are treated as metadata (strings, ints, floats, bools)
fn load_parquet(path: &Path, segment: usize) -> Result<SegmentDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut apertures = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let wl_idx = schema
            .index_of(WAVELENGTH)
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'wavelength' column"))?;
        let flux_idx = schema
            .index_of(FLUX)
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'flux' column"))?;
        let unc_idx = schema.index_of(UNCERTAINTY).ok();

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != wl_idx && *i != flux_idx && Some(*i) != unc_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let row_no = apertures.len();
            let wavelength = extract_f64_list(batch.column(wl_idx), row)
                .with_context(|| format!("Row {row_no}: failed to read 'wavelength'"))?;
            let flux = extract_f64_list(batch.column(flux_idx), row)
                .with_context(|| format!("Row {row_no}: failed to read 'flux'"))?;
            let uncertainty = match unc_idx {
                Some(idx) => Some(
                    extract_f64_list(batch.column(idx), row)
                        .with_context(|| format!("Row {row_no}: failed to read 'uncertainty'"))?,
                ),
                None => None,
            };

            let mut metadata = BTreeMap::new();
            for (col_idx, col_name) in &meta_cols {
                let value = extract_metadata_value(batch.column(*col_idx), row);
                metadata.insert(col_name.clone(), value);
            }

            let aperture = build_row(segment, wavelength, flux, uncertainty, metadata)
                .with_context(|| format!("Row {row_no}"))?;
            apertures.push(aperture);
        }
    }

    Ok(SegmentDataset::from_apertures(apertures))
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Null list items are flagged samples.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(MetadataValue::Null, |s| {
                MetadataValue::String(s.value(row).to_string())
            }),
        DataType::LargeUtf8 => MetadataValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(MetadataValue::Null, |a| MetadataValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(MetadataValue::Null, |a| MetadataValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(MetadataValue::Null, |a| MetadataValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(MetadataValue::Null, |a| MetadataValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(MetadataValue::Null, |a| MetadataValue::Bool(a.value(row))),
        _ => MetadataValue::String(format!("{:?}", col.data_type())),
    }
}
