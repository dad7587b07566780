use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Continuum slope plus emission lines, sampled on `wavelengths`.
fn generate_spectrum(
    wavelengths: &[f64],
    continuum: (f64, f64),
    lines: &[(f64, f64, f64)],
    calibration_offset: f64,
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let (level, slope) = continuum;
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = lines
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            level + slope * wl + signal + calibration_offset + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn list_column(rows: &[Vec<f64>]) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        let values = builder.values();
        for &v in row {
            values.append_value(v);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // (name, first wavelength, last wavelength, resolving step, calibration offset)
    // Neighbouring segments overlap and use different grids, like MIRI MRS sub-bands.
    let segments: [(&str, f64, f64, f64, f64); 3] = [
        ("ch1-short", 4.90, 5.74, 0.0008, 0.0),
        ("ch1-medium", 5.66, 6.63, 0.0009, 3.5),
        ("ch1-long", 6.53, 7.65, 0.0010, -2.0),
    ];

    // (aperture, continuum level, continuum slope, emission lines)
    let apertures: [(&str, f64, f64, Vec<(f64, f64, f64)>); 2] = [
        ("HII", 40.0, 6.0, vec![(5.511, 0.003, 25.0), (6.985, 0.004, 60.0)]),
        ("DF1", 120.0, -4.0, vec![(5.340, 0.003, 15.0), (6.220, 0.030, 300.0)]),
    ];

    let schema = Arc::new(Schema::new(vec![
        Field::new("wavelength", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("flux", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("uncertainty", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
        Field::new("wavelength_unit", DataType::Utf8, false),
        Field::new("flux_unit", DataType::Utf8, false),
        Field::new("aperture", DataType::Utf8, false),
    ]));

    for (name, first, last, step, offset) in segments {
        let n = ((last - first) / step).round() as usize + 1;
        let wavelengths: Vec<f64> = (0..n).map(|i| first + i as f64 * step).collect();

        let mut all_flux = Vec::new();
        let mut all_unc = Vec::new();
        for (_, level, slope, lines) in &apertures {
            let noise = 0.01 * level;
            all_flux.push(generate_spectrum(
                &wavelengths,
                (*level, *slope),
                lines,
                offset,
                noise,
                &mut rng,
            ));
            all_unc.push(vec![noise; n]);
        }
        let all_wl = vec![wavelengths.clone(); apertures.len()];

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                list_column(&all_wl),
                list_column(&all_flux),
                list_column(&all_unc),
                Arc::new(StringArray::from(vec!["um"; apertures.len()])),
                Arc::new(StringArray::from(vec!["MJy/sr"; apertures.len()])),
                Arc::new(StringArray::from(
                    apertures.iter().map(|a| a.0).collect::<Vec<_>>(),
                )),
            ],
        )
        .expect("Failed to create RecordBatch");

        let output_path = format!("segment_{name}.parquet");
        let file = std::fs::File::create(&output_path).expect("Failed to create output file");
        let mut writer =
            ArrowWriter::try_new(file, schema.clone(), None).expect("Failed to create writer");
        writer.write(&batch).expect("Failed to write batch");
        writer.close().expect("Failed to close writer");

        println!(
            "Wrote {} apertures ({n} samples, offset {offset:+}) to {output_path}",
            apertures.len()
        );
    }
}
