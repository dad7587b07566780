//! Run configuration for the `specstitch` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stitch::StitchOptions;

/// Output table written when nothing else is configured.
pub const DEFAULT_OUTPUT: &str = "templates.ecsv";

/// Everything one extraction run needs, passed by value to the driver.
///
/// Loaded from an optional JSON file; command-line flags override fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// One file per wavelength segment, any order.
    pub segment_files: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    /// One name per aperture; `T1..Tn` if absent.
    pub template_names: Option<Vec<String>>,
    /// Stitch apertures concurrently.
    pub parallel: bool,
    pub stitch: StitchOptions,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }
}
