#![allow(dead_code)]

use specstitch::data::model::Spectrum;
use specstitch::units::{FluxUnit, WavelengthUnit};

/// `n` evenly spaced wavelengths from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Micron / Jy spectrum with constant uncertainty.
pub fn spectrum(wavelength: Vec<f64>, flux: Vec<f64>) -> Spectrum {
    let n = flux.len();
    Spectrum::new(
        wavelength,
        flux,
        vec![0.25; n],
        WavelengthUnit::Micron,
        FluxUnit::Jansky,
    )
    .unwrap()
}

/// Flat segment at `level`.
pub fn flat(wavelength: &[f64], level: f64) -> Spectrum {
    spectrum(wavelength.to_vec(), vec![level; wavelength.len()])
}

/// Small deterministic generator for reproducible "noisy" inputs.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493))
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Sloped continuum with noise plus a calibration offset.
pub fn noisy(rng: &mut Lcg, start: f64, stop: f64, n: usize, offset: f64) -> Spectrum {
    let wavelength = linspace(start, stop, n);
    let flux = wavelength
        .iter()
        .map(|w| 20.0 + 3.0 * w + offset + rng.uniform(-0.2, 0.2))
        .collect();
    spectrum(wavelength, flux)
}

pub fn assert_strictly_increasing(values: &[f64]) {
    for (i, pair) in values.windows(2).enumerate() {
        assert!(
            pair[0] < pair[1],
            "axis not strictly increasing at {}: {} >= {}",
            i + 1,
            pair[0],
            pair[1]
        );
    }
}
