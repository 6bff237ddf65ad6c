//! Waveshaping distortion

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::effect::{param_f32, unknown_param, Effect, EffectParams};
use crate::audio::{db_to_linear, AudioBuffer};
use crate::error::{Result, SolfaError};
use crate::impl_effect_common;

/// Transfer curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionCurve {
    /// tanh saturation
    #[default]
    Soft,
    /// x / (1 + |x|) after gain
    Fuzz,
    /// Clamp to [-1, 1] after gain
    Hard,
}

impl DistortionCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistortionCurve::Soft => "soft",
            DistortionCurve::Fuzz => "fuzz",
            DistortionCurve::Hard => "hard",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "soft" => Some(DistortionCurve::Soft),
            "fuzz" => Some(DistortionCurve::Fuzz),
            "hard" => Some(DistortionCurve::Hard),
            _ => None,
        }
    }

    #[inline]
    pub fn shape(self, x: f32, drive: f32) -> f32 {
        match self {
            DistortionCurve::Soft => (x * (1.0 + drive * 4.0)).tanh(),
            DistortionCurve::Fuzz => {
                let driven = x * (1.0 + drive * 3.0);
                driven / (1.0 + driven.abs())
            }
            DistortionCurve::Hard => (x * (1.0 + drive * 10.0)).clamp(-1.0, 1.0),
        }
    }
}

/// Distortion effect
#[derive(Debug, Clone)]
pub struct Distortion {
    params: EffectParams,
    curve: DistortionCurve,
    /// Drive amount (0-1)
    drive: f32,
    /// Wet proportion (0-1)
    mix: f32,
    /// Output gain in dB (-24 to +12)
    output_db: f32,
}

impl Distortion {
    pub fn new(curve: DistortionCurve, drive: f32) -> Self {
        Self {
            params: EffectParams::default(),
            curve,
            drive: drive.clamp(0.0, 1.0),
            mix: 1.0,
            output_db: 0.0,
        }
    }

    pub fn curve(&self) -> DistortionCurve {
        self.curve
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_output_db(&mut self, db: f32) {
        self.output_db = db.clamp(-24.0, 12.0);
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new(DistortionCurve::Soft, 0.5)
    }
}

impl Effect for Distortion {
    impl_effect_common!(Distortion, "distortion", "Distortion");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        let output_gain = db_to_linear(self.output_db);
        let (curve, drive, mix) = (self.curve, self.drive, self.mix);
        for channel in &mut buffer.samples {
            for sample in channel.iter_mut() {
                let wet = curve.shape(*sample, drive);
                *sample = (*sample * (1.0 - mix) + wet * mix) * output_gain;
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32, _max_block_size: usize) {}

    fn reset(&mut self) {}

    fn get_params(&self) -> Value {
        json!({
            "id": self.params.id,
            "enabled": self.params.enabled,
            "curve": self.curve.as_str(),
            "drive": self.drive,
            "mix": self.mix,
            "output_db": self.output_db,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "curve" => {
                self.curve = value
                    .as_str()
                    .and_then(DistortionCurve::from_name)
                    .ok_or_else(|| SolfaError::InvalidParameter {
                        name: name.to_string(),
                        reason: format!("unknown curve {}", value),
                    })?;
            }
            "drive" => self.set_drive(param_f32(name, value)?),
            "mix" => self.set_mix(param_f32(name, value)?),
            "output_db" => self.set_output_db(param_f32(name, value)?),
            "enabled" => self.params.enabled = value.as_bool().unwrap_or(true),
            _ => return Err(unknown_param(self.effect_type(), name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ChannelLayout;
    use test_case::test_case;

    #[test_case(DistortionCurve::Soft)]
    #[test_case(DistortionCurve::Fuzz)]
    #[test_case(DistortionCurve::Hard)]
    fn test_curves_are_bounded_and_odd(curve: DistortionCurve) {
        for i in -100..=100 {
            let x = i as f32 / 10.0;
            let y = curve.shape(x, 1.0);
            assert!(y.abs() <= 1.0);
            assert!((curve.shape(-x, 1.0) + y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_drive_compresses_peaks() {
        let mut distortion = Distortion::new(DistortionCurve::Hard, 1.0);
        let mut buffer =
            AudioBuffer::from_interleaved(&[0.5, -0.5, 0.05, -0.05], ChannelLayout::Stereo, 48000)
                .unwrap();
        distortion.process(&mut buffer);
        assert_eq!(buffer.samples[0][0], 1.0);
        assert_eq!(buffer.samples[1][0], -1.0);
        assert!((buffer.samples[0][1] - 0.55).abs() < 1e-6);
        assert!((buffer.samples[1][1] + 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_zero_mix_is_dry() {
        let mut distortion = Distortion::default();
        distortion.set_mix(0.0);
        let mut buffer =
            AudioBuffer::from_interleaved(&[0.3, 0.3], ChannelLayout::Stereo, 48000).unwrap();
        distortion.process(&mut buffer);
        assert!((buffer.samples[0][0] - 0.3).abs() < 1e-6);
    }
}
