//! Biquad filter effect
//!
//! Lowpass, highpass, bandpass and notch responses from the Audio EQ
//! Cookbook, one filter state per channel.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::effect::{param_f32, unknown_param, Effect, EffectParams};
use crate::audio::AudioBuffer;
use crate::error::{Result, SolfaError};
use crate::impl_effect_common;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Lowpass => "lowpass",
            FilterType::Highpass => "highpass",
            FilterType::Bandpass => "bandpass",
            FilterType::Notch => "notch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "lowpass" | "low_pass" => Some(FilterType::Lowpass),
            "highpass" | "high_pass" => Some(FilterType::Highpass),
            "bandpass" | "band_pass" => Some(FilterType::Bandpass),
            "notch" => Some(FilterType::Notch),
            _ => None,
        }
    }
}

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn calculate(filter_type: FilterType, sample_rate: f64, frequency: f64, q: f64) -> Self {
        let freq = frequency.clamp(20.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 20.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match filter_type {
            FilterType::Lowpass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterType::Highpass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            FilterType::Bandpass => (alpha, 0.0, -alpha),
            FilterType::Notch => (1.0, -2.0 * cos_w0, 1.0),
        };
        let (a0, a1, a2) = (1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha);

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Biquad filter effect
#[derive(Debug, Clone)]
pub struct Filter {
    params: EffectParams,
    filter_type: FilterType,
    /// Cutoff or centre frequency in Hz
    frequency: f32,
    q: f32,
    sample_rate: u32,
    coeffs: BiquadCoeffs,
    states: [BiquadState; 2],
}

impl Filter {
    pub fn new(filter_type: FilterType, frequency: f32, q: f32) -> Self {
        let mut filter = Self {
            params: EffectParams::default(),
            filter_type,
            frequency,
            q,
            sample_rate: 48000,
            coeffs: BiquadCoeffs::default(),
            states: [BiquadState::default(); 2],
        };
        filter.update_coefficients();
        filter
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.update_coefficients();
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(20.0);
        self.update_coefficients();
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q.clamp(0.1, 20.0);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        self.coeffs = BiquadCoeffs::calculate(
            self.filter_type,
            self.sample_rate as f64,
            self.frequency as f64,
            self.q as f64,
        );
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(FilterType::Lowpass, 1000.0, 1.0)
    }
}

impl Effect for Filter {
    impl_effect_common!(Filter, "filter", "Filter");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        let coeffs = self.coeffs;
        for (channel, state) in buffer.samples.iter_mut().zip(self.states.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = state.process(*sample as f64, &coeffs) as f32;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.states = [BiquadState::default(); 2];
    }

    fn get_params(&self) -> Value {
        json!({
            "id": self.params.id,
            "enabled": self.params.enabled,
            "filter_type": self.filter_type.as_str(),
            "frequency": self.frequency,
            "q": self.q,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "filter_type" => {
                let filter_type = value
                    .as_str()
                    .and_then(FilterType::from_name)
                    .ok_or_else(|| SolfaError::InvalidParameter {
                        name: name.to_string(),
                        reason: format!("unknown filter type {}", value),
                    })?;
                self.set_filter_type(filter_type);
            }
            "frequency" => self.set_frequency(param_f32(name, value)?),
            "q" => self.set_q(param_f32(name, value)?),
            "enabled" => self.params.enabled = value.as_bool().unwrap_or(true),
            _ => return Err(unknown_param(self.effect_type(), name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{calculate_rms, ChannelLayout};

    fn tone(frequency: f32, len: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(len, ChannelLayout::Stereo, 48000);
        for channel in &mut buffer.samples {
            for (i, s) in channel.iter_mut().enumerate() {
                *s = (2.0 * std::f32::consts::PI * frequency * i as f32 / 48000.0).sin() * 0.5;
            }
        }
        buffer
    }

    #[test]
    fn test_lowpass_attenuates_highs() {
        let mut filter = Filter::new(FilterType::Lowpass, 500.0, 0.707);
        filter.prepare(48000, 4800);
        let mut high = tone(8000.0, 4800);
        let before = calculate_rms(&high);
        filter.process(&mut high);
        assert!(calculate_rms(&high) < before - 20.0);
    }

    #[test]
    fn test_highpass_attenuates_lows() {
        let mut filter = Filter::new(FilterType::Highpass, 4000.0, 0.707);
        filter.prepare(48000, 4800);
        let mut low = tone(100.0, 4800);
        let before = calculate_rms(&low);
        filter.process(&mut low);
        assert!(calculate_rms(&low) < before - 20.0);
    }

    #[test]
    fn test_notch_removes_centre() {
        let mut filter = Filter::new(FilterType::Notch, 1000.0, 2.0);
        filter.prepare(48000, 9600);
        let mut buffer = tone(1000.0, 9600);
        filter.process(&mut buffer);
        // skip the transient
        let tail = &buffer.samples[0][4800..];
        let peak = tail.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn test_set_param_by_name() {
        let mut filter = Filter::default();
        filter.set_param("filter_type", &json!("bandpass")).unwrap();
        filter.set_param("frequency", &json!(2500.0)).unwrap();
        assert_eq!(filter.filter_type(), FilterType::Bandpass);
        assert_eq!(filter.get_params()["frequency"], 2500.0);
        assert!(filter.set_param("filter_type", &json!("comb")).is_err());
        assert!(filter.set_param("gain", &json!(1.0)).is_err());
    }
}
