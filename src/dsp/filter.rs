//! Biquad filter: matches WebAudio BiquadFilterNode coefficients.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Filter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// A biquad IIR filter (2nd order).
///
/// Direct Form II Transposed; coefficient formulas from the Audio EQ
/// Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 1000.0,
            q: std::f64::consts::FRAC_1_SQRT_2,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    /// Cutoff (or center) frequency, after clamping below Nyquist.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.dirty = false;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Set the cutoff; values are kept between 10 Hz and just below Nyquist.
    pub fn set_frequency(&mut self, freq: f64) {
        let nyquist = self.sample_rate / 2.0;
        let freq = freq.min(nyquist * 0.95).max(10.0);
        if freq != self.frequency {
            self.frequency = freq;
            self.dirty = true;
        }
    }

    pub fn set_q(&mut self, q: f64) {
        let q = q.max(1e-4);
        if q != self.q {
            self.q = q;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 44100.0);
        f.set_frequency(5000.0);

        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::new(FilterType::Highpass, 44100.0);
        f.set_frequency(1000.0);

        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn tiny_sample_rate_does_not_panic() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 16.0);
        f.set_frequency(1000.0);
        assert_eq!(f.frequency(), 10.0);
        f.set_frequency(f64::NAN);
        assert_eq!(f.frequency(), 10.0);
        assert!(f.process(1.0).is_finite());
    }

    #[test]
    fn bandpass_blocks_dc_and_settles_after_reset() {
        let mut f = BiquadFilter::new(FilterType::Bandpass, 44100.0);
        f.set_frequency(500.0);
        f.set_q(1.0);

        let mut output = 1.0;
        for _ in 0..5000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Bandpass should block DC, got {output}");

        f.reset();
        assert_eq!(f.process(0.0), 0.0);
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 44100.0);
        f.set_frequency(200.0);

        let freq = 10000.0;
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let out = f.process((2.0 * PI * freq * t).sin());
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out < 0.01, "Lowpass@200Hz should attenuate 10kHz, got {max_out}");
    }

    #[test]
    fn cutoff_clamped_below_nyquist() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 8000.0);
        f.set_frequency(4100.0);
        assert!(f.frequency() < 4000.0);

        for i in 0..2000 {
            let out = f.process(if i % 50 == 0 { 1.0 } else { 0.0 });
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
