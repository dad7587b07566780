use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use specstitch::config::RunConfig;
use specstitch::data::loader::load_file;
use specstitch::templates::extract_templates_table;

/// Merge per-segment aperture spectra into stitched template spectra.
#[derive(Parser, Debug)]
#[command(name = "specstitch")]
#[command(version)]
struct Args {
    /// Segment files (one per wavelength segment, one row per aperture).
    segment_files: Vec<PathBuf>,

    /// JSON run configuration; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Apply additive offsets to make the stitching smoother. The resulting
    /// continuum may be unrealistic.
    #[arg(long)]
    apply_offsets: bool,

    /// Index (in wavelength order) of the segment used as stitching reference.
    #[arg(long)]
    reference_segment: Option<usize>,

    /// Minimum number of valid overlap samples for an offset to be measured.
    #[arg(long)]
    min_overlap_samples: Option<usize>,

    /// Names for the template spectra, one per aperture (e.g. HII Atomic DF3).
    #[arg(long, num_args = 1..)]
    template_names: Option<Vec<String>>,

    /// Output ECSV table.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Stitch apertures in parallel.
    #[arg(long)]
    parallel: bool,
}

impl Args {
    fn into_config(self) -> Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if !self.segment_files.is_empty() {
            cfg.segment_files = self.segment_files;
        }
        if self.apply_offsets {
            cfg.stitch.apply_offsets = true;
        }
        if self.reference_segment.is_some() {
            cfg.stitch.reference_segment = self.reference_segment;
        }
        if let Some(n) = self.min_overlap_samples {
            cfg.stitch.min_overlap_samples = n;
        }
        if self.template_names.is_some() {
            cfg.template_names = self.template_names;
        }
        if self.output.is_some() {
            cfg.output = self.output;
        }
        if self.parallel {
            cfg.parallel = true;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cfg = Args::parse().into_config()?;
    if cfg.segment_files.is_empty() {
        bail!("no segment files given");
    }

    let segments = cfg
        .segment_files
        .iter()
        .enumerate()
        .map(|(i, path)| load_file(path, i))
        .collect::<Result<Vec<_>>>()?;

    let table = extract_templates_table(
        &segments,
        cfg.template_names.as_deref(),
        &cfg.stitch,
        cfg.parallel,
    )
    .context("stitching templates")?;

    let output = cfg.output_path();
    info!("Writing extracted spectra to {}", output.display());
    table.write_ecsv(&output)?;
    Ok(())
}
