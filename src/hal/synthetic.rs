// src/hal/synthetic.rs
//! Synthetic ECG source for development and testing
//!
//! Generates an idealized PQRST cycle as a repeating template, with
//! optional gaussian-ish noise on top. Stands in for the hardware
//! converter when none is attached.

use crate::hal::SampleSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the synthetic ECG generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticEcgConfig {
    pub sample_rate_sps: u16,
    /// Cardiac cycle length in milliseconds (1000 ms = 60 BPM)
    pub cycle_ms: u32,
    /// Peak-to-baseline amplitude of the R spike in volts
    pub r_amplitude: f32,
    /// Uniform noise amplitude in volts (0 disables noise)
    pub noise_level: f32,
    /// Fixed RNG seed for reproducible traces
    pub seed: Option<u64>,
}

impl Default for SyntheticEcgConfig {
    fn default() -> Self {
        Self {
            sample_rate_sps: 475,
            cycle_ms: 1000,
            r_amplitude: 3.0,
            noise_level: 0.01,
            seed: None,
        }
    }
}

/// Sample source producing an endless idealized ECG trace
pub struct SyntheticEcg {
    template: Vec<f32>,
    position: usize,
    noise_level: f32,
    rng: StdRng,
}

impl SyntheticEcg {
    pub fn new(config: SyntheticEcgConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            template: cycle_template(config.sample_rate_sps, config.cycle_ms, config.r_amplitude),
            position: 0,
            noise_level: config.noise_level,
            rng,
        }
    }

    pub fn cycle_samples(&self) -> usize {
        self.template.len()
    }
}

impl SampleSource for SyntheticEcg {
    fn read_voltage(&mut self) -> Option<f32> {
        let mut voltage = self.template[self.position];
        self.position = (self.position + 1) % self.template.len();

        if self.noise_level > 0.0 {
            voltage += self.rng.gen_range(-1.0..1.0) * self.noise_level;
        }
        Some(voltage)
    }

    fn available(&self) -> bool {
        true
    }
}

/// Builds one idealized cardiac cycle at the given rate.
///
/// Segment layout: 200 ms baseline, 80 ms P bump (+0.3 V), 100 ms
/// baseline, single-sample Q dip (-0.5 V), single-sample R spike,
/// single-sample S dip (-0.5 V), 120 ms baseline, 120 ms T bump
/// (+0.5 V), baseline padding to the cycle length.
pub fn cycle_template(sample_rate_sps: u16, cycle_ms: u32, r_amplitude: f32) -> Vec<f32> {
    let rate = sample_rate_sps as f64;
    let window = |ms: f64| (rate * ms / 1000.0) as usize;

    let mut template = Vec::new();
    template.extend(std::iter::repeat(0.0).take(window(200.0)));

    // Rounded half-sine bumps for P and T; hard single-sample deflections
    // for the QRS complex
    let p_samples = window(80.0);
    for i in 0..p_samples {
        let phase = (i as f32 + 0.5) / p_samples as f32 * std::f32::consts::PI;
        template.push(0.3 * phase.sin());
    }

    template.extend(std::iter::repeat(0.0).take(window(100.0)));
    template.push(-0.5);
    template.push(r_amplitude);
    template.push(-0.5);
    template.extend(std::iter::repeat(0.0).take(window(120.0)));

    let t_samples = window(120.0);
    for i in 0..t_samples {
        let phase = (i as f32 + 0.5) / t_samples as f32 * std::f32::consts::PI;
        template.push(0.5 * phase.sin());
    }

    let cycle_samples = window(cycle_ms as f64).max(template.len());
    template.resize(cycle_samples, 0.0);
    template
}
