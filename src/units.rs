use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnitError;

// ---------------------------------------------------------------------------
// WavelengthUnit
// ---------------------------------------------------------------------------

/// Physical length unit of a spectral axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WavelengthUnit {
    Meter,
    Centimeter,
    Micron,
    Nanometer,
    Angstrom,
}

impl WavelengthUnit {
    /// Size of one unit expressed in meters.
    pub fn in_meters(self) -> f64 {
        match self {
            WavelengthUnit::Meter => 1.0,
            WavelengthUnit::Centimeter => 1e-2,
            WavelengthUnit::Micron => 1e-6,
            WavelengthUnit::Nanometer => 1e-9,
            WavelengthUnit::Angstrom => 1e-10,
        }
    }

    /// Multiplicative factor converting values in `self` to values in `target`.
    pub fn factor_to(self, target: WavelengthUnit) -> f64 {
        if self == target {
            return 1.0;
        }
        self.in_meters() / target.in_meters()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            WavelengthUnit::Meter => "m",
            WavelengthUnit::Centimeter => "cm",
            WavelengthUnit::Micron => "um",
            WavelengthUnit::Nanometer => "nm",
            WavelengthUnit::Angstrom => "Angstrom",
        }
    }
}

impl FromStr for WavelengthUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "m" | "meter" => Ok(WavelengthUnit::Meter),
            "cm" => Ok(WavelengthUnit::Centimeter),
            "um" | "µm" | "micron" | "microns" => Ok(WavelengthUnit::Micron),
            "nm" => Ok(WavelengthUnit::Nanometer),
            "Angstrom" | "AA" | "angstrom" | "Å" => Ok(WavelengthUnit::Angstrom),
            other => Err(UnitError::UnknownWavelengthUnit(other.to_string())),
        }
    }
}

impl TryFrom<String> for WavelengthUnit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WavelengthUnit> for String {
    fn from(unit: WavelengthUnit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for WavelengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// FluxUnit
// ---------------------------------------------------------------------------

/// What a flux unit measures. Only units of the same kind convert into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxKind {
    /// Flux density per unit frequency.
    Density,
    /// Flux density per steradian, as produced by IFU cubes.
    SurfaceBrightness,
}

/// Flux unit of a spectrum (frequency flux density or surface brightness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FluxUnit {
    Jansky,
    MilliJansky,
    MicroJansky,
    MegaJansky,
    WattPerSquareMeterHertz,
    JanskyPerSteradian,
    MegaJanskyPerSteradian,
}

impl FluxUnit {
    pub fn kind(self) -> FluxKind {
        match self {
            FluxUnit::JanskyPerSteradian | FluxUnit::MegaJanskyPerSteradian => {
                FluxKind::SurfaceBrightness
            }
            _ => FluxKind::Density,
        }
    }

    /// Size of one unit in Jy (or Jy/sr for surface brightness units).
    fn in_jansky(self) -> f64 {
        match self {
            FluxUnit::Jansky | FluxUnit::JanskyPerSteradian => 1.0,
            FluxUnit::MilliJansky => 1e-3,
            FluxUnit::MicroJansky => 1e-6,
            FluxUnit::MegaJansky | FluxUnit::MegaJanskyPerSteradian => 1e6,
            FluxUnit::WattPerSquareMeterHertz => 1e26,
        }
    }

    /// Multiplicative factor converting values in `self` to values in `target`.
    pub fn factor_to(self, target: FluxUnit) -> Result<f64, UnitError> {
        if self == target {
            return Ok(1.0);
        }
        if self.kind() != target.kind() {
            return Err(UnitError::Incompatible {
                from: self.symbol().to_string(),
                to: target.symbol().to_string(),
            });
        }
        Ok(self.in_jansky() / target.in_jansky())
    }

    pub fn symbol(self) -> &'static str {
        match self {
            FluxUnit::Jansky => "Jy",
            FluxUnit::MilliJansky => "mJy",
            FluxUnit::MicroJansky => "uJy",
            FluxUnit::MegaJansky => "MJy",
            FluxUnit::WattPerSquareMeterHertz => "W / (Hz m2)",
            FluxUnit::JanskyPerSteradian => "Jy / sr",
            FluxUnit::MegaJanskyPerSteradian => "MJy / sr",
        }
    }
}

impl FromStr for FluxUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "Jy" => Ok(FluxUnit::Jansky),
            "mJy" => Ok(FluxUnit::MilliJansky),
            "uJy" | "µJy" => Ok(FluxUnit::MicroJansky),
            "MJy" => Ok(FluxUnit::MegaJansky),
            "W/(Hzm2)" | "W/(m2Hz)" | "Wm-2Hz-1" => Ok(FluxUnit::WattPerSquareMeterHertz),
            "Jy/sr" => Ok(FluxUnit::JanskyPerSteradian),
            "MJy/sr" => Ok(FluxUnit::MegaJanskyPerSteradian),
            _ => Err(UnitError::UnknownFluxUnit(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for FluxUnit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FluxUnit> for String {
    fn from(unit: FluxUnit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for FluxUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
