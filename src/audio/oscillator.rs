//! Oscillators and timbres
//!
//! A note is one or more phase-accumulator oscillators. Basic timbres use a
//! single oscillator of the chosen waveform; additive timbres stack sine
//! partials at integer multiples of the fundamental with fixed gains.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Value of the waveform at `phase` in [0, 1)
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => (phase * 2.0) - 1.0,
            Waveform::Triangle => {
                if phase < 0.5 {
                    (phase * 4.0) - 1.0
                } else {
                    3.0 - (phase * 4.0)
                }
            }
        }
    }
}

const ORGAN_HARMONICS: [(u32, f32); 6] = [(1, 1.0), (2, 0.8), (3, 0.6), (4, 0.4), (6, 0.3), (8, 0.2)];
const FLUTE_HARMONICS: [(u32, f32); 4] = [(1, 1.0), (2, 0.3), (3, 0.1), (4, 0.05)];
const STRINGS_HARMONICS: [(u32, f32); 7] = [
    (1, 1.0),
    (2, 0.5),
    (3, 0.33),
    (4, 0.25),
    (5, 0.2),
    (6, 0.16),
    (7, 0.14),
];
const PIANO_HARMONICS: [(u32, f32); 5] = [(1, 1.0), (2, 0.5), (3, 0.25), (4, 0.12), (5, 0.06)];

/// Sound of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timbre {
    /// One oscillator
    Basic(Waveform),
    Organ,
    Flute,
    Strings,
    Piano,
}

impl Default for Timbre {
    fn default() -> Self {
        Timbre::Basic(Waveform::Sine)
    }
}

/// One oscillator of a timbre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    /// Multiple of the fundamental
    pub harmonic: u32,
    pub gain: f32,
    pub waveform: Waveform,
}

impl Timbre {
    /// Harmonic/gain table of an additive timbre; `None` for basic timbres
    pub fn harmonics(&self) -> Option<&'static [(u32, f32)]> {
        match self {
            Timbre::Basic(_) => None,
            Timbre::Organ => Some(&ORGAN_HARMONICS),
            Timbre::Flute => Some(&FLUTE_HARMONICS),
            Timbre::Strings => Some(&STRINGS_HARMONICS),
            Timbre::Piano => Some(&PIANO_HARMONICS),
        }
    }

    /// Partials with gains normalized to sum to 1
    pub fn partials(&self) -> Vec<Partial> {
        match (self, self.harmonics()) {
            (Timbre::Basic(waveform), _) => vec![Partial {
                harmonic: 1,
                gain: 1.0,
                waveform: *waveform,
            }],
            (_, Some(table)) => {
                let total: f32 = table.iter().map(|(_, g)| g).sum();
                table
                    .iter()
                    .map(|&(harmonic, gain)| Partial {
                        harmonic,
                        gain: gain / total,
                        waveform: Waveform::Sine,
                    })
                    .collect()
            }
            (_, None) => Vec::new(),
        }
    }
}

/// Phase-accumulator oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: u32) -> Self {
        let mut osc = Self {
            waveform,
            frequency: 0.0,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate: sample_rate as f32,
        };
        osc.set_frequency(frequency);
        osc
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.phase_increment = frequency / self.sample_rate;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.waveform.sample(self.phase);
        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }
}

/// Oscillators for one note of `timbre` at `frequency`.
///
/// Partials at or above Nyquist are left out.
pub fn oscillators_for(timbre: Timbre, frequency: f32, sample_rate: u32) -> Vec<(Oscillator, f32)> {
    let nyquist = sample_rate as f32 / 2.0;
    timbre
        .partials()
        .into_iter()
        .filter(|p| frequency * (p.harmonic as f32) < nyquist)
        .map(|p| {
            (
                Oscillator::new(p.waveform, frequency * p.harmonic as f32, sample_rate),
                p.gain,
            )
        })
        .collect()
}
