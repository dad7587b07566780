use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::model::Spectrum;
use crate::error::ConfigError;
use crate::units::{FluxUnit, WavelengthUnit};

// ---------------------------------------------------------------------------
// TemplateTable – merged spectra sharing one wavelength column
// ---------------------------------------------------------------------------

/// One flux or uncertainty column of the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub unit: FluxUnit,
    pub values: Vec<f64>,
}

/// Output table: a wavelength column in micron plus `flux_<name>` and
/// `unc_<name>` columns per template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTable {
    pub wavelength: Vec<f64>,
    pub columns: Vec<TableColumn>,
}

impl TemplateTable {
    /// Unit of the wavelength column.
    pub const WAVELENGTH_UNIT: WavelengthUnit = WavelengthUnit::Micron;

    /// Build the table from named merged spectra.
    ///
    /// All templates must share the same wavelength axis, which holds when
    /// they were stitched from the same segment grids.
    pub fn from_templates(templates: &[(String, Spectrum)]) -> Result<Self, ConfigError> {
        let Some((first_name, first)) = templates.first() else {
            return Err(ConfigError::NoTemplates);
        };
        let to_micron = |s: &Spectrum| -> Vec<f64> {
            let factor = s.wavelength_unit().factor_to(Self::WAVELENGTH_UNIT);
            s.wavelength().iter().map(|w| w * factor).collect()
        };
        let wavelength = to_micron(first);

        let mut columns = Vec::with_capacity(2 * templates.len());
        for (name, spectrum) in templates {
            if to_micron(spectrum) != wavelength {
                return Err(ConfigError::TemplateAxisMismatch {
                    name: name.clone(),
                    first: first_name.clone(),
                });
            }
            columns.push(TableColumn {
                name: format!("flux_{name}"),
                unit: spectrum.flux_unit(),
                values: spectrum.flux().to_vec(),
            });
            columns.push(TableColumn {
                name: format!("unc_{name}"),
                unit: spectrum.flux_unit(),
                values: spectrum.uncertainty().to_vec(),
            });
        }

        Ok(TemplateTable {
            wavelength,
            columns,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Write the table as ECSV, replacing any existing file.
    pub fn write_ecsv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating output table {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.to_ecsv(&mut out)
            .with_context(|| format!("writing output table {}", path.display()))?;
        out.flush().context("flushing output table")?;
        info!(
            "wrote {} rows x {} columns to {}",
            self.len(),
            self.columns.len() + 1,
            path.display()
        );
        Ok(())
    }

    /// Serialize as ECSV 1.0: a commented YAML header describing column
    /// names, units and types, then space-delimited rows.
    pub fn to_ecsv<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "# %ECSV 1.0")?;
        writeln!(out, "# ---")?;
        writeln!(out, "# datatype:")?;
        writeln!(
            out,
            "# - {{name: wavelength, unit: {}, datatype: float64}}",
            Self::WAVELENGTH_UNIT
        )?;
        for col in &self.columns {
            writeln!(
                out,
                "# - {{name: {}, unit: {}, datatype: float64}}",
                col.name, col.unit
            )?;
        }
        writeln!(out, "# schema: astropy-2.0")?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .from_writer(out);
        let mut header = vec!["wavelength".to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header).context("writing table header")?;

        for (row, w) in self.wavelength.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(format_value(*w));
            record.extend(self.columns.iter().map(|c| format_value(c.values[row])));
            writer
                .write_record(&record)
                .with_context(|| format!("writing table row {row}"))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Shortest round-trip text; non-finite values in ECSV spelling.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        v.to_string()
    }
}
