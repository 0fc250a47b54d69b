// src/processing/filters/notch.rs
//! Notch filter for powerline interference removal

use super::FilterError;

/// Notch filter built from cascaded biquad sections
pub struct NotchFilter {
    biquad_sections: Vec<BiquadSection>,
    center_freq: f32,
    bandwidth: f32,
}

/// Single biquad section in direct form I
struct BiquadSection {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl NotchFilter {
    /// Creates a notch at `center_freq` Hz with the given bandwidth.
    pub fn new(center_freq: f32, bandwidth: f32, sample_rate: f32) -> Result<Self, FilterError> {
        if center_freq <= 0.0 || center_freq >= sample_rate / 2.0 {
            return Err(FilterError::InvalidParameters(
                "center frequency outside (0, Nyquist)".to_string(),
            ));
        }
        if bandwidth <= 0.0 || bandwidth >= center_freq {
            return Err(FilterError::InvalidParameters(
                "bandwidth must be positive and below the center frequency".to_string(),
            ));
        }

        Ok(Self {
            biquad_sections: vec![BiquadSection::notch(center_freq, bandwidth, sample_rate)],
            center_freq,
            bandwidth,
        })
    }

    /// Creates cascaded notches at `base_freq` and its harmonics below
    /// Nyquist.
    pub fn powerline_harmonics(
        base_freq: f32,
        bandwidth: f32,
        sample_rate: f32,
        harmonics: usize,
    ) -> Result<Self, FilterError> {
        let mut sections = Vec::new();

        for harmonic in 1..=harmonics {
            let freq = base_freq * harmonic as f32;
            if freq < sample_rate / 2.0 {
                sections.push(BiquadSection::notch(freq, bandwidth, sample_rate));
            }
        }

        if sections.is_empty() {
            return Err(FilterError::InvalidParameters(
                "no harmonics below Nyquist".to_string(),
            ));
        }

        Ok(Self {
            biquad_sections: sections,
            center_freq: base_freq,
            bandwidth,
        })
    }

    /// Runs one sample through every section.
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let mut output = input;
        for section in &mut self.biquad_sections {
            output = section.process(output);
        }
        output
    }

    /// Clears all delay lines.
    pub fn reset(&mut self) {
        for section in &mut self.biquad_sections {
            section.reset();
        }
    }

    pub fn center_frequency(&self) -> f32 {
        self.center_freq
    }

    pub fn bandwidth(&self) -> f32 {
        self.bandwidth
    }

    pub fn section_count(&self) -> usize {
        self.biquad_sections.len()
    }
}

impl BiquadSection {
    fn notch(center_freq: f32, bandwidth: f32, sample_rate: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * center_freq / sample_rate;
        let alpha = (2.0 * std::f32::consts::PI * bandwidth / sample_rate).sin() / 2.0;

        let cos_omega = omega.cos();
        let norm = 1.0 + alpha;

        Self {
            b0: 1.0 / norm,
            b1: -2.0 * cos_omega / norm,
            b2: 1.0 / norm,
            a1: -2.0 * cos_omega / norm,
            a2: (1.0 - alpha) / norm,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
