//! Feedback delay
//!
//! Stereo delay line with a damped feedback path. `mix` crossfades between
//! the dry input and the delayed signal.

use std::f32::consts::PI;

use serde_json::{json, Value};

use super::effect::{param_f32, unknown_param, Effect, EffectParams};
use crate::audio::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

const MAX_DELAY_MS: f32 = 2000.0;

/// Stereo feedback delay
#[derive(Debug, Clone)]
pub struct Delay {
    params: EffectParams,
    /// Delay time in milliseconds (1-2000)
    time_ms: f32,
    /// Feedback amount (0-0.95)
    feedback: f32,
    /// Wet proportion (0-1)
    mix: f32,
    /// Low-pass frequency on the feedback path
    damping_hz: f32,
    lines: [Vec<f32>; 2],
    write_pos: usize,
    sample_rate: f32,
    filter_state: [f32; 2],
}

impl Delay {
    pub fn new(time_ms: f32) -> Self {
        let mut delay = Self {
            params: EffectParams::default(),
            time_ms: time_ms.clamp(1.0, MAX_DELAY_MS),
            feedback: 0.3,
            mix: 0.3,
            damping_hz: 6000.0,
            lines: [Vec::new(), Vec::new()],
            write_pos: 0,
            sample_rate: 48000.0,
            filter_state: [0.0; 2],
        };
        delay.resize_lines();
        delay
    }

    pub fn time_ms(&self) -> f32 {
        self.time_ms
    }

    pub fn set_time_ms(&mut self, ms: f32) {
        self.time_ms = ms.clamp(1.0, MAX_DELAY_MS);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Clamped below 1 so the loop always decays
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_damping_hz(&mut self, hz: f32) {
        self.damping_hz = hz.clamp(200.0, 20000.0);
    }

    fn resize_lines(&mut self) {
        let size = (MAX_DELAY_MS / 1000.0 * self.sample_rate) as usize + 1;
        for line in &mut self.lines {
            line.clear();
            line.resize(size, 0.0);
        }
        self.write_pos = 0;
    }

    fn delay_samples(&self) -> usize {
        ((self.time_ms / 1000.0 * self.sample_rate) as usize).clamp(1, self.lines[0].len() - 1)
    }

    fn filter_coeff(&self) -> f32 {
        let rc = 1.0 / (2.0 * PI * self.damping_hz);
        let dt = 1.0 / self.sample_rate;
        dt / (rc + dt)
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(250.0)
    }
}

impl Effect for Delay {
    impl_effect_common!(Delay, "delay", "Delay");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled || buffer.is_empty() {
            return;
        }
        let size = self.lines[0].len();
        let delay_samples = self.delay_samples();
        let coeff = self.filter_coeff();
        let (dry, wet) = (1.0 - self.mix, self.mix);

        for i in 0..buffer.len() {
            let read_pos = (self.write_pos + size - delay_samples) % size;
            for ch in 0..buffer.num_channels().min(2) {
                let input = buffer.samples[ch][i];
                let delayed = self.lines[ch][read_pos];

                let state = &mut self.filter_state[ch];
                *state += coeff * (delayed * self.feedback - *state);
                self.lines[ch][self.write_pos] = input + *state;

                buffer.samples[ch][i] = input * dry + delayed * wet;
            }
            self.write_pos = (self.write_pos + 1) % size;
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
        self.filter_state = [0.0; 2];
    }

    fn get_params(&self) -> Value {
        json!({
            "id": self.params.id,
            "enabled": self.params.enabled,
            "time_ms": self.time_ms,
            "feedback": self.feedback,
            "mix": self.mix,
            "damping_hz": self.damping_hz,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "time_ms" => self.set_time_ms(param_f32(name, value)?),
            "feedback" => self.set_feedback(param_f32(name, value)?),
            "mix" => self.set_mix(param_f32(name, value)?),
            "damping_hz" => self.set_damping_hz(param_f32(name, value)?),
            "enabled" => self.params.enabled = value.as_bool().unwrap_or(true),
            _ => return Err(unknown_param(self.effect_type(), name)),
        }
        Ok(())
    }
}
