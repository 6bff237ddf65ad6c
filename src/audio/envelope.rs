//! ADSR envelopes as gain automation
//!
//! A voice's gain is a timeline of set-value and linear-ramp events keyed by
//! sample index. Note-on writes the attack and decay ramps; note-off cancels
//! whatever is pending, holds the current level and ramps to zero.

use serde::{Deserialize, Serialize};

/// ADSR envelope parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adsr {
    /// Attack time in seconds
    pub attack: f32,
    /// Decay time in seconds
    pub decay: f32,
    /// Sustain level as a fraction of peak (0.0 to 1.0)
    pub sustain: f32,
    /// Release time in seconds
    pub release: f32,
}

impl Adsr {
    /// Create ADSR parameters, clamped to usable ranges
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.clamp(0.001, 5.0),
            decay: decay.clamp(0.001, 5.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.clamp(0.001, 5.0),
        }
    }

    /// Write attack and decay for a note starting at `start` reaching `peak`
    pub fn schedule_note_on(
        &self,
        gain: &mut GainAutomation,
        start: u64,
        peak: f32,
        sample_rate: u32,
    ) {
        let attack_end = start + seconds_to_samples(self.attack, sample_rate);
        let decay_end = attack_end + seconds_to_samples(self.decay, sample_rate);
        gain.set_value_at(start, 0.0);
        gain.linear_ramp_to(attack_end, peak);
        gain.linear_ramp_to(decay_end, peak * self.sustain);
    }

    /// Cancel pending automation at `at` and ramp to silence.
    ///
    /// Returns the sample index at which the gain reaches zero.
    pub fn schedule_release(&self, gain: &mut GainAutomation, at: u64, sample_rate: u32) -> u64 {
        let end = at + seconds_to_samples(self.release, sample_rate);
        gain.cancel_and_hold(at);
        gain.linear_ramp_to(end, 0.0);
        end
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
        }
    }
}

/// Number of samples in `seconds`, rounded, at least one
pub fn seconds_to_samples(seconds: f32, sample_rate: u32) -> u64 {
    ((seconds.max(0.0) as f64 * sample_rate as f64).round() as u64).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationEvent {
    /// Jump to `value` at `at`
    Set { at: u64, value: f32 },
    /// Arrive at `value` at `at`, linearly from the previous event
    Ramp { at: u64, value: f32 },
}

impl AutomationEvent {
    fn at(&self) -> u64 {
        match self {
            AutomationEvent::Set { at, .. } | AutomationEvent::Ramp { at, .. } => *at,
        }
    }

    fn value(&self) -> f32 {
        match self {
            AutomationEvent::Set { value, .. } | AutomationEvent::Ramp { value, .. } => *value,
        }
    }
}

/// Timeline of gain values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GainAutomation {
    events: Vec<AutomationEvent>,
}

impl GainAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, event: AutomationEvent) {
        let position = self.events.partition_point(|e| e.at() <= event.at());
        self.events.insert(position, event);
    }

    pub fn set_value_at(&mut self, at: u64, value: f32) {
        self.insert(AutomationEvent::Set { at, value });
    }

    pub fn linear_ramp_to(&mut self, at: u64, value: f32) {
        self.insert(AutomationEvent::Ramp { at, value });
    }

    /// Drop every event after `at` and pin the gain to its value there
    pub fn cancel_and_hold(&mut self, at: u64) {
        let held = self.value_at(at);
        self.events.retain(|e| e.at() < at);
        self.insert(AutomationEvent::Set { at, value: held });
    }

    /// Gain at sample index `t`; zero before the first event
    pub fn value_at(&self, t: u64) -> f32 {
        let mut previous: Option<&AutomationEvent> = None;
        for event in &self.events {
            if event.at() <= t {
                previous = Some(event);
                continue;
            }
            return match (event, previous) {
                (AutomationEvent::Ramp { at, value }, Some(prev)) => {
                    let span = (*at - prev.at()) as f32;
                    let progress = (t - prev.at()) as f32 / span;
                    prev.value() + (value - prev.value()) * progress
                }
                (_, Some(prev)) => prev.value(),
                (_, None) => 0.0,
            };
        }
        previous.map_or(0.0, |e| e.value())
    }

    /// Sample index of the last scheduled event
    pub fn end(&self) -> Option<u64> {
        self.events.last().map(|e| e.at())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SR: u32 = 1000;

    fn envelope() -> Adsr {
        Adsr::new(0.1, 0.1, 0.5, 0.2)
    }

    #[test]
    fn test_attack_decay_sustain() {
        let mut gain = GainAutomation::new();
        envelope().schedule_note_on(&mut gain, 0, 0.8, SR);

        assert_relative_eq!(gain.value_at(0), 0.0);
        assert_relative_eq!(gain.value_at(50), 0.4);
        assert_relative_eq!(gain.value_at(100), 0.8);
        assert_relative_eq!(gain.value_at(150), 0.6);
        assert_relative_eq!(gain.value_at(200), 0.4);
        assert_relative_eq!(gain.value_at(10_000), 0.4);
    }

    #[test]
    fn test_release_from_sustain() {
        let mut gain = GainAutomation::new();
        let adsr = envelope();
        adsr.schedule_note_on(&mut gain, 0, 0.8, SR);
        let end = adsr.schedule_release(&mut gain, 500, SR);

        assert_eq!(end, 700);
        assert_relative_eq!(gain.value_at(500), 0.4);
        assert_relative_eq!(gain.value_at(600), 0.2);
        assert_relative_eq!(gain.value_at(700), 0.0);
        assert_relative_eq!(gain.value_at(900), 0.0);
    }

    #[test]
    fn test_release_during_attack_starts_from_current_level() {
        let mut gain = GainAutomation::new();
        let adsr = envelope();
        adsr.schedule_note_on(&mut gain, 0, 0.8, SR);
        adsr.schedule_release(&mut gain, 50, SR);

        assert_relative_eq!(gain.value_at(50), 0.4);
        assert_relative_eq!(gain.value_at(150), 0.2);
        // the cancelled decay no longer applies
        assert_relative_eq!(gain.value_at(250), 0.0);
    }

    #[test]
    fn test_silent_before_start() {
        let mut gain = GainAutomation::new();
        envelope().schedule_note_on(&mut gain, 100, 1.0, SR);
        assert_eq!(gain.value_at(0), 0.0);
        assert_eq!(gain.end(), Some(300));
    }

    #[test]
    fn test_adsr_clamps() {
        let adsr = Adsr::new(0.0, 10.0, 1.5, -1.0);
        assert_relative_eq!(adsr.attack, 0.001);
        assert_relative_eq!(adsr.decay, 5.0);
        assert_relative_eq!(adsr.sustain, 1.0);
        assert_relative_eq!(adsr.release, 0.001);
    }
}
