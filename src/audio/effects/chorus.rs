//! Chorus
//!
//! A short delay line whose read position is swept by a sine LFO. The right
//! channel's LFO runs a quarter cycle ahead of the left.

use serde_json::{json, Value};

use super::effect::{param_f32, unknown_param, Effect, EffectParams};
use crate::audio::oscillator::Waveform;
use crate::audio::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

/// Longest base delay plus depth the line has room for
const MAX_SWEEP_MS: f32 = 50.0;

/// Modulated-delay chorus
#[derive(Debug, Clone)]
pub struct Chorus {
    params: EffectParams,
    /// LFO rate in Hz
    rate_hz: f32,
    /// Sweep depth in milliseconds
    depth_ms: f32,
    /// Centre delay in milliseconds
    delay_ms: f32,
    mix: f32,
    lines: [Vec<f32>; 2],
    write_pos: usize,
    lfo_phase: f32,
    sample_rate: f32,
}

impl Chorus {
    pub fn new() -> Self {
        let mut chorus = Self {
            params: EffectParams::default(),
            rate_hz: 1.5,
            depth_ms: 3.0,
            delay_ms: 20.0,
            mix: 0.5,
            lines: [Vec::new(), Vec::new()],
            write_pos: 0,
            lfo_phase: 0.0,
            sample_rate: 48000.0,
        };
        chorus.resize_lines();
        chorus
    }

    pub fn set_rate_hz(&mut self, rate: f32) {
        self.rate_hz = rate.clamp(0.05, 10.0);
    }

    pub fn set_depth_ms(&mut self, depth: f32) {
        self.depth_ms = depth.clamp(0.0, 10.0);
    }

    pub fn set_delay_ms(&mut self, delay: f32) {
        self.delay_ms = delay.clamp(1.0, MAX_SWEEP_MS - 10.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    fn resize_lines(&mut self) {
        let size = (MAX_SWEEP_MS / 1000.0 * self.sample_rate) as usize + 2;
        for line in &mut self.lines {
            line.clear();
            line.resize(size, 0.0);
        }
        self.write_pos = 0;
    }

    /// Linearly interpolated read `delay` samples behind the write head
    fn read(line: &[f32], write_pos: usize, delay: f32) -> f32 {
        let size = line.len();
        let delay = delay.clamp(1.0, (size - 2) as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        let a = line[(write_pos + size - whole) % size];
        let b = line[(write_pos + size - whole - 1) % size];
        a + (b - a) * frac
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Chorus {
    impl_effect_common!(Chorus, "chorus", "Chorus");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled || buffer.is_empty() {
            return;
        }
        let size = self.lines[0].len();
        let samples_per_ms = self.sample_rate / 1000.0;
        let phase_step = self.rate_hz / self.sample_rate;
        let (dry, wet) = (1.0 - self.mix * 0.5, self.mix * 0.5);

        for i in 0..buffer.len() {
            for ch in 0..buffer.num_channels().min(2) {
                let phase = (self.lfo_phase + 0.25 * ch as f32).fract();
                let sweep = Waveform::Sine.sample(phase) * self.depth_ms;
                let delay = (self.delay_ms + sweep) * samples_per_ms;

                let input = buffer.samples[ch][i];
                self.lines[ch][self.write_pos] = input;
                let delayed = Self::read(&self.lines[ch], self.write_pos, delay);
                buffer.samples[ch][i] = input * dry + delayed * wet;
            }
            self.write_pos = (self.write_pos + 1) % size;
            self.lfo_phase = (self.lfo_phase + phase_step).fract();
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        self.sample_rate = sample_rate as f32;
        self.resize_lines();
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
        self.lfo_phase = 0.0;
    }

    fn get_params(&self) -> Value {
        json!({
            "id": self.params.id,
            "enabled": self.params.enabled,
            "rate_hz": self.rate_hz,
            "depth_ms": self.depth_ms,
            "delay_ms": self.delay_ms,
            "mix": self.mix,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "rate_hz" => self.set_rate_hz(param_f32(name, value)?),
            "depth_ms" => self.set_depth_ms(param_f32(name, value)?),
            "delay_ms" => self.set_delay_ms(param_f32(name, value)?),
            "mix" => self.set_mix(param_f32(name, value)?),
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

    #[test]
    fn test_dry_signal_passes_first() {
        let mut chorus = Chorus::new();
        chorus.prepare(48000, 256);
        let mut buffer = AudioBuffer::new(256, ChannelLayout::Stereo, 48000);
        buffer.samples[0][0] = 1.0;
        chorus.process(&mut buffer);
        assert!((buffer.samples[0][0] - 0.75).abs() < 1e-6);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_wet_copy_appears_near_base_delay() {
        let mut chorus = Chorus::new();
        chorus.set_depth_ms(0.0);
        chorus.prepare(48000, 2048);
        let mut buffer = AudioBuffer::new(2048, ChannelLayout::Stereo, 48000);
        buffer.samples[0][0] = 1.0;
        chorus.process(&mut buffer);
        // 20 ms at 48 kHz
        assert!((buffer.samples[0][960] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_disabled_is_bypass() {
        let mut chorus = Chorus::new();
        chorus.set_enabled(false);
        let mut buffer = AudioBuffer::new(64, ChannelLayout::Stereo, 48000);
        buffer.samples[1][3] = 0.5;
        let before = buffer.clone();
        chorus.process(&mut buffer);
        assert_eq!(buffer, before);
    }
}
