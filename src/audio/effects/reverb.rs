//! Reverb
//!
//! Freeverb topology: eight parallel damped comb filters into four series
//! allpass filters per channel, with the right channel's delays offset for
//! stereo spread.

use serde_json::{json, Value};

use super::effect::{param_f32, unknown_param, Effect, EffectParams};
use crate::audio::AudioBuffer;
use crate::error::Result;
use crate::impl_effect_common;

/// Delay tables are tuned for this rate and scaled to the actual one
const REFERENCE_SAMPLE_RATE: f32 = 44100.0;
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;

const ALLPASS_GAIN: f32 = 0.5;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const DAMP_SCALE: f32 = 0.4;
/// Keeps the summed comb output near unity
const INPUT_GAIN: f32 = 0.015;

/// Comb filter with a one-pole low-pass in the feedback path
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            pos: 0,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.pos = 0;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let output = delayed - input;
        self.buffer[self.pos] = input + delayed * ALLPASS_GAIN;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

/// Filters for one channel
#[derive(Debug, Clone)]
struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Tank {
    fn new(sample_rate: f32, spread: usize) -> Self {
        let scale = |d: usize| ((d + spread) as f32 * sample_rate / REFERENCE_SAMPLE_RATE) as usize;
        Self {
            combs: COMB_DELAYS.iter().map(|&d| CombFilter::new(scale(d))).collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| AllpassFilter::new(scale(d)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let mut out: f32 = self
            .combs
            .iter_mut()
            .map(|comb| comb.process(input, feedback, damp))
            .sum();
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

/// Freeverb reverb
#[derive(Debug, Clone)]
pub struct Reverb {
    params: EffectParams,
    /// Room size: 0 (tiny) to 1 (huge hall)
    room_size: f32,
    /// Damping: 0 (bright) to 1 (dark)
    damping: f32,
    /// Wet proportion (0-1)
    mix: f32,
    /// Stereo width: 0 (mono) to 1 (full stereo)
    width: f32,
    tanks: [Tank; 2],
}

impl Reverb {
    pub fn new() -> Self {
        Self {
            params: EffectParams::default(),
            room_size: 0.5,
            damping: 0.5,
            mix: 0.3,
            width: 1.0,
            tanks: [
                Tank::new(48000.0, 0),
                Tank::new(48000.0, STEREO_SPREAD),
            ],
        }
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.room_size = room_size.clamp(0.0, 1.0);
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.0, 1.0);
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Reverb {
    impl_effect_common!(Reverb, "reverb", "Reverb");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled || buffer.is_empty() {
            return;
        }
        let feedback = self.room_size * ROOM_SCALE + ROOM_OFFSET;
        let damp = self.damping * DAMP_SCALE;
        let wet1 = self.mix * (self.width / 2.0 + 0.5);
        let wet2 = self.mix * ((1.0 - self.width) / 2.0);
        let dry = 1.0 - self.mix;

        let stereo = buffer.num_channels() >= 2;
        for i in 0..buffer.len() {
            let in_l = buffer.samples[0][i];
            let in_r = if stereo { buffer.samples[1][i] } else { in_l };
            let input = (in_l + in_r) * INPUT_GAIN;

            let out_l = self.tanks[0].process(input, feedback, damp);
            let out_r = self.tanks[1].process(input, feedback, damp);

            buffer.samples[0][i] = in_l * dry + out_l * wet1 + out_r * wet2;
            if stereo {
                buffer.samples[1][i] = in_r * dry + out_r * wet1 + out_l * wet2;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32, _max_block_size: usize) {
        let rate = sample_rate as f32;
        self.tanks = [Tank::new(rate, 0), Tank::new(rate, STEREO_SPREAD)];
    }

    fn reset(&mut self) {
        self.tanks.iter_mut().for_each(Tank::clear);
    }

    fn get_params(&self) -> Value {
        json!({
            "id": self.params.id,
            "enabled": self.params.enabled,
            "room_size": self.room_size,
            "damping": self.damping,
            "mix": self.mix,
            "width": self.width,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "room_size" => self.set_room_size(param_f32(name, value)?),
            "damping" => self.set_damping(param_f32(name, value)?),
            "mix" => self.set_mix(param_f32(name, value)?),
            "width" => self.set_width(param_f32(name, value)?),
            "enabled" => self.params.enabled = value.as_bool().unwrap_or(true),
            _ => return Err(unknown_param(self.effect_type(), name)),
        }
        Ok(())
    }
}
