mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;
use tempfile::TempDir;

use specstitch::config::RunConfig;
use specstitch::data::loader::load_file;
use specstitch::error::{ConfigError, SpectrumError, StitchError};
use specstitch::stitch::StitchOptions;
use specstitch::templates::extract_templates_table;

const STEP: f64 = 0.125;

fn grid(start: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + STEP * i as f64).collect()
}

/// Segment files covering 1.0-2.0, 1.5-3.0 and 2.5-4.0 micron, two
/// apertures each, in three different formats.
struct Fixture {
    _dir: TempDir,
    files: Vec<PathBuf>,
    root: PathBuf,
}

fn write_json(path: &Path, levels: [f64; 2], start: f64, n: usize) {
    let rows: Vec<_> = ["HII", "DF1"]
        .iter()
        .zip(levels)
        .map(|(aperture, level)| {
            json!({
                "wavelength": grid(start, n),
                "flux": vec![level; n],
                "uncertainty": vec![0.1; n],
                "wavelength_unit": "um",
                "flux_unit": "Jy",
                "aperture": aperture,
            })
        })
        .collect();
    fs::write(path, serde_json::to_string_pretty(&rows).unwrap()).unwrap();
}

fn write_csv(path: &Path, levels: [f64; 2], start: f64, n: usize) {
    let join = |v: &[f64]| v.iter().map(f64::to_string).collect::<Vec<_>>().join(";");
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer
        .write_record(["aperture", "wavelength", "flux", "uncertainty", "wavelength_unit", "flux_unit"])
        .unwrap();
    for (aperture, level) in ["HII", "DF1"].iter().zip(levels) {
        writer
            .write_record([
                aperture.to_string(),
                join(&grid(start, n)),
                join(&vec![level; n]),
                join(&vec![0.1; n]),
                "um".to_string(),
                "Jy".to_string(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
}

fn list_column(rows: &[Vec<f64>]) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        for &v in row {
            builder.values().append_value(v);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn write_parquet(path: &Path, levels: [f64; 2], start: f64, n: usize) {
    let item = || Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("wavelength", DataType::List(item()), false),
        Field::new("flux", DataType::List(item()), false),
        Field::new("uncertainty", DataType::List(item()), false),
        Field::new("wavelength_unit", DataType::Utf8, false),
        Field::new("flux_unit", DataType::Utf8, false),
        Field::new("aperture", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            list_column(&[grid(start, n), grid(start, n)]),
            list_column(&[vec![levels[0]; n], vec![levels[1]; n]]),
            list_column(&[vec![0.1; n], vec![0.1; n]]),
            Arc::new(StringArray::from(vec!["um"; 2])),
            Arc::new(StringArray::from(vec!["Jy"; 2])),
            Arc::new(StringArray::from(vec!["HII", "DF1"])),
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let files = vec![
        root.join("short.json"),
        root.join("medium.csv"),
        root.join("long.parquet"),
    ];
    // HII sits at 10 / 12 / 11 and DF1 at 20 / 25 / 22 across the segments.
    write_json(&files[0], [10.0, 20.0], 1.0, 9);
    write_csv(&files[1], [12.0, 25.0], 1.5, 13);
    write_parquet(&files[2], [11.0, 22.0], 2.5, 13);
    Fixture {
        _dir: dir,
        files,
        root,
    }
}

fn names() -> Vec<String> {
    vec!["HII".to_string(), "DF1".to_string()]
}

#[test]
fn every_format_loads_with_units_and_metadata() {
    let fx = fixture();
    for (i, path) in fx.files.iter().enumerate() {
        let ds = load_file(path, i).unwrap();
        assert_eq!(ds.len(), 2, "{}", path.display());
        let first = &ds.apertures[0];
        assert_eq!(first.spectrum.wavelength_unit().symbol(), "um");
        assert_eq!(first.metadata["aperture"].as_str(), Some("HII"));
        common::assert_strictly_increasing(first.spectrum.wavelength());
    }
}

#[test]
fn offsets_bring_every_template_to_the_reference_level() {
    let fx = fixture();
    let segments: Vec<_> = fx
        .files
        .iter()
        .enumerate()
        .map(|(i, p)| load_file(p, i).unwrap())
        .collect();
    let options = StitchOptions {
        apply_offsets: true,
        ..StitchOptions::default()
    };
    let names = names();
    let table = extract_templates_table(&segments, Some(names.as_slice()), &options, true).unwrap();

    // cuts at 1.75 and 2.75: 7 + 8 + 10 samples
    assert_eq!(table.len(), 25);
    common::assert_strictly_increasing(&table.wavelength);
    let flux = |name: &str| {
        table
            .columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.clone())
            .unwrap()
    };
    assert!(flux("flux_HII").iter().all(|f| (f - 12.0).abs() < 1e-12));
    assert!(flux("flux_DF1").iter().all(|f| (f - 25.0).abs() < 1e-12));
    assert!(flux("unc_HII").iter().all(|u| *u == 0.1));
}

#[test]
fn ecsv_output_is_written_and_replaced() {
    let fx = fixture();
    let segments: Vec<_> = fx
        .files
        .iter()
        .enumerate()
        .map(|(i, p)| load_file(p, i).unwrap())
        .collect();
    let out = fx.root.join("templates.ecsv");
    fs::write(&out, "stale").unwrap();

    let names = names();
    let table =
        extract_templates_table(&segments, Some(names.as_slice()), &StitchOptions::default(), false)
            .unwrap();
    table.write_ecsv(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(!text.contains("stale"));
    let (header, body): (Vec<&str>, Vec<&str>) = text.lines().partition(|l| l.starts_with('#'));
    assert_eq!(header[0], "# %ECSV 1.0");
    assert_eq!(header.len(), 9);
    assert!(header.contains(&"# - {name: flux_DF1, unit: Jy, datatype: float64}"));
    assert_eq!(body[0], "wavelength flux_HII unc_HII flux_DF1 unc_DF1");
    assert_eq!(body.len(), 26);
    assert_eq!(body[1], "1 10 0.1 20 0.1");
    assert_eq!(body[25], "4 11 0.1 22 0.1");
}

#[test]
fn config_file_drives_a_run() {
    let fx = fixture();
    let cfg_path = fx.root.join("run.json");
    let cfg = json!({
        "segment_files": fx.files,
        "template_names": ["HII", "DF1"],
        "output": fx.root.join("out.ecsv"),
        "stitch": { "apply_offsets": true, "reference_segment": 0 }
    });
    fs::write(&cfg_path, cfg.to_string()).unwrap();

    let cfg = RunConfig::load(&cfg_path).unwrap();
    assert_eq!(cfg.segment_files, fx.files);
    assert_eq!(cfg.stitch.reference_segment, Some(0));

    let segments: Vec<_> = cfg
        .segment_files
        .iter()
        .enumerate()
        .map(|(i, p)| load_file(p, i).unwrap())
        .collect();
    let table = extract_templates_table(
        &segments,
        cfg.template_names.as_deref(),
        &cfg.stitch,
        cfg.parallel,
    )
    .unwrap();
    table.write_ecsv(&cfg.output_path()).unwrap();

    // reference is the shortest segment, so everything lands at its level
    assert!(table.columns[0].values.iter().all(|f| (f - 10.0).abs() < 1e-12));
    assert!(fx.root.join("out.ecsv").exists());
}

#[test]
fn missing_uncertainty_becomes_nan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bare.json");
    let rows = json!([{
        "wavelength": [1.0, 1.5, 2.0],
        "flux": [1.0, null, 3.0],
        "wavelength_unit": "micron",
        "flux_unit": "MJy/sr",
    }]);
    fs::write(&path, rows.to_string()).unwrap();

    let ds = load_file(&path, 0).unwrap();
    let spectrum = &ds.apertures[0].spectrum;
    assert!(spectrum.uncertainty().iter().all(|u| u.is_nan()));
    assert!(spectrum.flux()[1].is_nan());
}

#[test]
fn decreasing_wavelengths_are_an_integrity_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    let rows = json!([{
        "wavelength": [1.0, 2.0, 1.5],
        "flux": [1.0, 2.0, 3.0],
        "wavelength_unit": "um",
        "flux_unit": "Jy",
    }]);
    fs::write(&path, rows.to_string()).unwrap();

    let err = load_file(&path, 4).unwrap_err();
    let integrity = err
        .chain()
        .find_map(|e| e.downcast_ref::<StitchError>())
        .cloned()
        .unwrap();
    assert_eq!(
        integrity,
        StitchError::DataIntegrity {
            segment: 4,
            source: SpectrumError::NotIncreasing {
                index: 2,
                previous: 2.0,
                current: 1.5,
            },
        }
    );
}

#[test]
fn segment_files_must_list_the_same_apertures() {
    let fx = fixture();
    let extra = fx.root.join("extra.json");
    let rows = json!([
        { "wavelength": [3.5, 4.5], "flux": [1.0, 1.0], "wavelength_unit": "um", "flux_unit": "Jy" }
    ]);
    fs::write(&extra, rows.to_string()).unwrap();

    let segments = vec![load_file(&fx.files[0], 0).unwrap(), load_file(&extra, 1).unwrap()];
    let err = extract_templates_table(&segments, None, &StitchOptions::default(), false).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::ApertureCountMismatch {
            segment: 1,
            expected: 2,
            found: 1,
        })
    );
}
