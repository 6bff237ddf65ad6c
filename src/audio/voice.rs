//! Sounding notes
//!
//! An [`AudioVoice`] owns the oscillators and gain automation of one note.
//! The engine keys voices by id and drops them once their release and grace
//! period are over; dropping a voice frees its graph.

use log::debug;

use super::buffer::AudioBuffer;
use super::envelope::{Adsr, GainAutomation};
use super::oscillator::{oscillators_for, Oscillator, Timbre};

/// Lifecycle of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Attack, decay or sustain
    Sounding,
    /// Ramping to zero; oscillators stop at `ends_at`
    Releasing { ends_at: u64 },
}

/// One note's synthesis graph
#[derive(Debug)]
pub struct AudioVoice {
    id: String,
    generation: u64,
    frequency: f32,
    /// Sample index the note started at
    start_time: u64,
    oscillators: Vec<(Oscillator, f32)>,
    envelope: GainAutomation,
    adsr: Adsr,
    state: VoiceState,
}

impl AudioVoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        generation: u64,
        frequency: f32,
        timbre: Timbre,
        adsr: Adsr,
        peak: f32,
        start_time: u64,
        sample_rate: u32,
    ) -> Self {
        let mut envelope = GainAutomation::new();
        adsr.schedule_note_on(&mut envelope, start_time, peak, sample_rate);
        Self {
            id,
            generation,
            frequency,
            start_time,
            oscillators: oscillators_for(timbre, frequency, sample_rate),
            envelope,
            adsr,
            state: VoiceState::Sounding,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_sounding(&self) -> bool {
        self.state == VoiceState::Sounding
    }

    /// Envelope gain at sample index `t`
    pub fn gain_at(&self, t: u64) -> f32 {
        self.envelope.value_at(t)
    }

    /// Begin the release at `at`. Returns the sample index the oscillators
    /// stop at; a voice already releasing keeps its original end.
    pub fn release(&mut self, at: u64, sample_rate: u32) -> u64 {
        match self.state {
            VoiceState::Releasing { ends_at } => ends_at,
            VoiceState::Sounding => {
                let ends_at = self.adsr.schedule_release(&mut self.envelope, at, sample_rate);
                self.state = VoiceState::Releasing { ends_at };
                ends_at
            }
        }
    }

    /// Whether the oscillators have stopped by sample index `t`
    pub fn is_silent_at(&self, t: u64) -> bool {
        matches!(self.state, VoiceState::Releasing { ends_at } if t >= ends_at)
    }

    /// Mix `len` frames starting at sample index `t0` into `out` at `offset`
    pub fn render(&mut self, out: &mut AudioBuffer, offset: usize, len: usize, t0: u64) {
        for i in 0..len {
            let t = t0 + i as u64;
            if t < self.start_time {
                continue;
            }
            if self.is_silent_at(t) {
                break;
            }
            let gain = self.envelope.value_at(t);
            let sample: f32 = self
                .oscillators
                .iter_mut()
                .map(|(osc, partial_gain)| osc.next_sample() * *partial_gain)
                .sum::<f32>()
                * gain;
            for channel in &mut out.samples {
                channel[offset + i] += sample;
            }
        }
    }
}

impl Drop for AudioVoice {
    fn drop(&mut self) {
        debug!("Voice {} (generation {}) disposed", self.id, self.generation);
    }
}
