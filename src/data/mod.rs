/// Data layer: spectrum types, segment file loading, and table output.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv   (one file per wavelength segment)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SegmentDataset (one row per aperture)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SegmentDataset│  Vec<ApertureSpectrum>, validated Spectrum per row
///   └──────────────┘
///        │            … stitched per aperture …
///        ▼
///   ┌──────────┐
///   │  table    │  merged templates → ECSV with units
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod table;
