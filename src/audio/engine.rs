//! Audio synthesis engine
//!
//! The engine owns every voice, the effects chain and the output backend.
//! It runs on a sample clock: [`AudioEngine::render`] advances the clock one
//! block at a time, runs scheduled work (auto-stops, voice disposal, pattern
//! and sequence note starts) at the exact sample it falls due, mixes the
//! voices into the note bus, runs the chain and master gain, and hands the
//! block to the backend.
//!
//! Note calls made before [`AudioEngine::initialize`], or with a pitch name
//! the lookup does not know, log a warning and do nothing.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::backend::AudioBackend;
use super::buffer::{AudioBuffer, ChannelLayout};
use super::effects::{create_effect, EffectChain};
use super::envelope::Adsr;
use super::oscillator::Timbre;
use super::pitch::{self, semitone_frequency};
use super::voice::AudioVoice;
use crate::composition::Composition;
use crate::config::AudioConfig;
use crate::error::{Result, SolfaError};
use crate::scheduler::{TaskQueue, VirtualClock};

/// Largest block `render` is prepared for
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Fraction of a sequence step that sounds
const SEQUENCE_GATE: f64 = 0.9;

/// How concurrent notes are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceMode {
    /// Voices are keyed by id and coexist
    #[default]
    Polyphonic,
    /// One voice at a time; repeating the sounding pitch is a no-op
    Mono,
}

/// Per-note overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteOptions {
    /// Voice id; a fresh uuid when absent
    pub id: Option<String>,
    /// Seconds until an automatic stop; 0 holds until `stop_note`
    pub duration: f64,
    pub timbre: Option<Timbre>,
    pub envelope: Option<Adsr>,
    /// Envelope peak (linear)
    pub peak: Option<f32>,
}

impl NoteOptions {
    pub fn held() -> Self {
        Self::default()
    }

    pub fn for_duration(seconds: f64) -> Self {
        Self {
            duration: seconds.max(0.0),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_timbre(mut self, timbre: Timbre) -> Self {
        self.timbre = Some(timbre);
        self
    }

    pub fn with_envelope(mut self, envelope: Adsr) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_peak(mut self, peak: f32) -> Self {
        self.peak = Some(peak.clamp(0.0, 1.0));
        self
    }
}

/// Chord qualities and their semitone offsets from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Major7,
    Minor7,
    Dominant7,
}

impl ChordType {
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Sus2 => &[0, 2, 7],
            ChordType::Sus4 => &[0, 5, 7],
            ChordType::Major7 => &[0, 4, 7, 11],
            ChordType::Minor7 => &[0, 3, 7, 10],
            ChordType::Dominant7 => &[0, 4, 7, 10],
        }
    }
}

/// Order in which an arpeggio walks its chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpeggioPattern {
    #[default]
    Up,
    Down,
    /// Up then back down without repeating the top note
    UpDown,
}

/// One step of `play_sequence`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceNote {
    pub pitch: String,
    pub octave: i32,
    /// Length in beats
    pub beats: f64,
}

impl SequenceNote {
    pub fn new(pitch: &str, octave: i32, beats: f64) -> Self {
        Self {
            pitch: pitch.to_string(),
            octave,
            beats,
        }
    }
}

/// Pitch identity used by mono mode
type PitchKey = (u8, i32);

/// A note ready to start
#[derive(Debug, Clone)]
struct NoteRequest {
    id: String,
    frequency: f32,
    pitch: Option<PitchKey>,
    options: NoteOptions,
}

#[derive(Debug)]
enum EngineTask {
    /// Deferred note start from a pattern or sequence of playback `epoch`
    Start { epoch: u64, request: NoteRequest },
    /// Auto-stop of voice `id` started as `generation`
    Stop { id: String, generation: u64 },
    /// Free the graph of voice `id` once its release is over
    Dispose { id: String, generation: u64 },
}

/// Synthesis engine
pub struct AudioEngine {
    config: AudioConfig,
    backend: Option<Box<dyn AudioBackend>>,
    voices: BTreeMap<String, AudioVoice>,
    /// Pitch of each live voice, for mono mode
    voice_pitches: BTreeMap<String, PitchKey>,
    mono_voice: Option<String>,
    chain: EffectChain,
    clock: VirtualClock,
    tasks: TaskQueue<EngineTask>,
    next_generation: u64,
    /// Bumped by `stop_all`; pending pattern starts from older epochs are dropped
    epoch: u64,
    master_volume: f32,
}

impl AudioEngine {
    /// Create an engine. No sound is produced until `initialize` succeeds.
    pub fn new(config: AudioConfig) -> Self {
        let master_volume = config.master_volume.clamp(0.0, 1.0);
        let chain = EffectChain::new(config.sample_rate, MAX_BLOCK_SIZE);
        Self {
            config,
            backend: None,
            voices: BTreeMap::new(),
            voice_pitches: BTreeMap::new(),
            mono_voice: None,
            chain,
            clock: VirtualClock::new(),
            tasks: TaskQueue::new(),
            next_generation: 0,
            epoch: 0,
            master_volume,
        }
    }

    /// Open `backend` and start accepting notes
    pub fn initialize(&mut self, mut backend: Box<dyn AudioBackend>) -> Result<()> {
        if self.backend.is_some() {
            self.shutdown();
        }
        backend
            .open(self.config.sample_rate, ChannelLayout::Stereo.num_channels() as u16)
            .map_err(|e| match e {
                SolfaError::AudioBackendUnavailable { .. } => e,
                other => SolfaError::AudioBackendUnavailable {
                    backend: backend.name().to_string(),
                    reason: other.to_string(),
                },
            })?;
        info!(
            "Audio engine initialized on '{}' at {} Hz",
            backend.name(),
            self.config.sample_rate
        );
        self.backend = Some(backend);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// Drop every voice and pending task and close the backend
    pub fn shutdown(&mut self) {
        self.voices.clear();
        self.voice_pitches.clear();
        self.mono_voice = None;
        self.tasks.clear();
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.close() {
                warn!("Closing audio backend '{}' failed: {}", backend.name(), e);
            }
            info!("Audio engine shut down");
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Current position of the sample clock
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn now_secs(&self) -> f64 {
        self.clock.now() as f64 / self.config.sample_rate as f64
    }

    pub fn voice_mode(&self) -> VoiceMode {
        self.config.voice_mode
    }

    pub fn set_voice_mode(&mut self, mode: VoiceMode) {
        self.config.voice_mode = mode;
        self.mono_voice = None;
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.config.timbre = timbre;
    }

    pub fn set_envelope(&mut self, envelope: Adsr) {
        self.config.envelope = envelope;
    }

    fn secs_to_samples(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.config.sample_rate as f64).round() as u64
    }

    fn ensure_initialized(&self, operation: &str) -> bool {
        if self.backend.is_none() {
            warn!("Audio engine not initialized; ignoring {}", operation);
            return false;
        }
        true
    }

    fn resolve(&self, pitch_name: &str, octave: i32) -> Option<(f32, PitchKey)> {
        match pitch::semitone_of(pitch_name) {
            Some(semitone) => Some((
                semitone_frequency(semitone, octave) as f32,
                (semitone, octave),
            )),
            None => {
                warn!("Unknown pitch '{}'; note ignored", pitch_name);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Start a note by pitch name. Returns the voice id, or `None` when the
    /// call was ignored.
    pub fn play_note(&mut self, pitch_name: &str, octave: i32, options: NoteOptions) -> Option<String> {
        if !self.ensure_initialized("play_note") {
            return None;
        }
        let (frequency, key) = self.resolve(pitch_name, octave)?;
        let request = self.request(frequency, Some(key), options);
        self.start(request)
    }

    /// Start a note at an explicit frequency
    pub fn play_frequency(&mut self, frequency: f32, options: NoteOptions) -> Option<String> {
        if !self.ensure_initialized("play_frequency") {
            return None;
        }
        if !(frequency.is_finite() && frequency > 0.0) {
            warn!("Invalid frequency {}; note ignored", frequency);
            return None;
        }
        let request = self.request(frequency, None, options);
        self.start(request)
    }

    fn request(&self, frequency: f32, pitch: Option<PitchKey>, options: NoteOptions) -> NoteRequest {
        NoteRequest {
            id: options
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            frequency,
            pitch,
            options,
        }
    }

    fn start(&mut self, request: NoteRequest) -> Option<String> {
        if self.config.voice_mode == VoiceMode::Mono {
            if let Some(current) = self.mono_voice.clone() {
                let sounding = self.voices.get(&current).is_some_and(|v| v.is_sounding());
                let same_pitch = request.pitch.is_some()
                    && self.voice_pitches.get(&current) == request.pitch.as_ref();
                if sounding && same_pitch {
                    return Some(current);
                }
                self.stop_note(&current);
            }
        }

        // one live graph per id
        if self.voices.remove(&request.id).is_some() {
            self.voice_pitches.remove(&request.id);
            debug!("Restarting voice {}", request.id);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let now = self.clock.now();
        let voice = AudioVoice::new(
            request.id.clone(),
            generation,
            request.frequency,
            request.options.timbre.unwrap_or(self.config.timbre),
            request.options.envelope.unwrap_or(self.config.envelope),
            request.options.peak.unwrap_or(self.config.note_peak),
            now,
            self.config.sample_rate,
        );
        self.voices.insert(request.id.clone(), voice);
        if let Some(key) = request.pitch {
            self.voice_pitches.insert(request.id.clone(), key);
        }
        if self.config.voice_mode == VoiceMode::Mono {
            self.mono_voice = Some(request.id.clone());
        }

        if request.options.duration > 0.0 {
            let due = now + self.secs_to_samples(request.options.duration);
            self.tasks.schedule(
                due,
                EngineTask::Stop {
                    id: request.id.clone(),
                    generation,
                },
            );
        }
        Some(request.id)
    }

    /// Release a voice. Returns false if no sounding voice has that id.
    pub fn stop_note(&mut self, id: &str) -> bool {
        let now = self.clock.now();
        let sample_rate = self.config.sample_rate;
        let grace = self.secs_to_samples(self.config.dispose_grace_ms as f64 / 1000.0);

        let Some(voice) = self.voices.get_mut(id) else {
            return false;
        };
        if !voice.is_sounding() {
            return false;
        }
        let ends_at = voice.release(now, sample_rate);
        let generation = voice.generation();
        self.tasks.schedule(
            ends_at + grace,
            EngineTask::Dispose {
                id: id.to_string(),
                generation,
            },
        );
        if self.mono_voice.as_deref() == Some(id) {
            self.mono_voice = None;
        }
        true
    }

    /// Release every voice and cancel pending pattern notes
    pub fn stop_all(&mut self) {
        self.epoch += 1;
        let ids: Vec<String> = self.voices.keys().cloned().collect();
        for id in ids {
            self.stop_note(&id);
        }
    }

    /// Whether a voice with `id` exists and has not started its release
    pub fn is_playing(&self, id: &str) -> bool {
        self.voices.get(id).is_some_and(|v| v.is_sounding())
    }

    /// Voices still holding a graph, releasing ones included
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, id: &str) -> Option<&AudioVoice> {
        self.voices.get(id)
    }

    pub fn voice_ids(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    /// Tasks not yet run, stale ones included
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    fn schedule_start(&mut self, delay_secs: f64, request: NoteRequest) -> String {
        let due = self.clock.now() + self.secs_to_samples(delay_secs);
        let id = request.id.clone();
        self.tasks.schedule(
            due,
            EngineTask::Start {
                epoch: self.epoch,
                request,
            },
        );
        id
    }

    /// Voice id for note `index` of a pattern started with `options`
    fn pattern_options(options: &NoteOptions, index: usize) -> NoteOptions {
        let mut note = options.clone();
        note.id = options.id.as_ref().map(|id| format!("{}-{}", id, index));
        note
    }

    /// Start every note of a chord at once
    pub fn play_chord(
        &mut self,
        root: &str,
        octave: i32,
        chord: ChordType,
        options: NoteOptions,
    ) -> Vec<String> {
        if !self.ensure_initialized("play_chord") {
            return Vec::new();
        }
        let Some(root_semitone) = pitch::semitone_of(root) else {
            warn!("Unknown pitch '{}'; chord ignored", root);
            return Vec::new();
        };
        chord
            .intervals()
            .iter()
            .enumerate()
            .filter_map(|(i, &interval)| {
                let (semitone, octave) = transpose(root_semitone, octave, interval);
                let frequency = semitone_frequency(semitone, octave) as f32;
                let request = self.request(
                    frequency,
                    Some((semitone, octave)),
                    Self::pattern_options(&options, i),
                );
                self.start(request)
            })
            .collect()
    }

    /// Schedule notes back to back at `tempo_bpm`. Returns the voice ids
    /// the notes will use.
    pub fn play_sequence(
        &mut self,
        notes: &[SequenceNote],
        tempo_bpm: u32,
        options: NoteOptions,
    ) -> Vec<String> {
        if !self.ensure_initialized("play_sequence") {
            return Vec::new();
        }
        let beat_secs = 60.0 / f64::from(tempo_bpm.max(1));
        let mut offset_beats = 0.0;
        let mut ids = Vec::new();
        for (i, note) in notes.iter().enumerate() {
            let delay = offset_beats * beat_secs;
            offset_beats += note.beats;
            let Some((frequency, key)) = self.resolve(&note.pitch, note.octave) else {
                continue;
            };
            let mut note_options = Self::pattern_options(&options, i);
            note_options.duration = note.beats * beat_secs * SEQUENCE_GATE;
            let request = self.request(frequency, Some(key), note_options);
            ids.push(self.schedule_start(delay, request));
        }
        ids
    }

    /// Play the notes of a chord one after another, `step_secs` apart
    pub fn play_arpeggio(
        &mut self,
        root: &str,
        octave: i32,
        chord: ChordType,
        pattern: ArpeggioPattern,
        step_secs: f64,
        options: NoteOptions,
    ) -> Vec<String> {
        if !self.ensure_initialized("play_arpeggio") {
            return Vec::new();
        }
        let Some(root_semitone) = pitch::semitone_of(root) else {
            warn!("Unknown pitch '{}'; arpeggio ignored", root);
            return Vec::new();
        };
        let up: Vec<u8> = chord.intervals().to_vec();
        let order: Vec<u8> = match pattern {
            ArpeggioPattern::Up => up,
            ArpeggioPattern::Down => up.into_iter().rev().collect(),
            ArpeggioPattern::UpDown => {
                let down = up.iter().rev().skip(1).copied().collect::<Vec<_>>();
                up.into_iter().chain(down).collect()
            }
        };

        let step_secs = step_secs.max(0.0);
        order
            .iter()
            .enumerate()
            .map(|(i, &interval)| {
                let (semitone, octave) = transpose(root_semitone, octave, interval);
                let mut note_options = Self::pattern_options(&options, i);
                if note_options.duration <= 0.0 {
                    note_options.duration = step_secs * SEQUENCE_GATE;
                }
                let request = self.request(
                    semitone_frequency(semitone, octave) as f32,
                    Some((semitone, octave)),
                    note_options,
                );
                self.schedule_start(step_secs * i as f64, request)
            })
            .collect()
    }

    /// Chromatic run from one pitch to another over `duration_secs`
    pub fn play_glissando(
        &mut self,
        from: (&str, i32),
        to: (&str, i32),
        duration_secs: f64,
        options: NoteOptions,
    ) -> Vec<String> {
        if !self.ensure_initialized("play_glissando") {
            return Vec::new();
        }
        if duration_secs <= 0.0 {
            warn!("Glissando needs a positive duration; ignored");
            return Vec::new();
        }
        let (Some(start), Some(end)) = (pitch::semitone_of(from.0), pitch::semitone_of(to.0)) else {
            warn!("Unknown pitch in glissando {:?} -> {:?}; ignored", from, to);
            return Vec::new();
        };
        let first = from.1 * 12 + i32::from(start);
        let last = to.1 * 12 + i32::from(end);
        let steps: Vec<i32> = if first <= last {
            (first..=last).collect()
        } else {
            (last..=first).rev().collect()
        };
        let step_secs = duration_secs / steps.len() as f64;

        steps
            .iter()
            .enumerate()
            .map(|(i, &absolute)| {
                let semitone = absolute.rem_euclid(12) as u8;
                let octave = absolute.div_euclid(12);
                let mut note_options = Self::pattern_options(&options, i);
                note_options.duration = step_secs;
                let request = self.request(
                    semitone_frequency(semitone, octave) as f32,
                    Some((semitone, octave)),
                    note_options,
                );
                self.schedule_start(step_secs * i as f64, request)
            })
            .collect()
    }

    /// Schedule a composition's playback sequence from the current sample
    pub fn play_composition(&mut self, composition: &Composition) -> Vec<String> {
        if !self.ensure_initialized("play_composition") {
            return Vec::new();
        }
        let mut ids = Vec::new();
        for event in composition.playback_sequence() {
            let Some((frequency, key)) = self.resolve(&event.pitch_name, event.octave) else {
                continue;
            };
            let options = NoteOptions::for_duration(event.duration_ms / 1000.0).with_id(&event.note_id);
            let request = self.request(frequency, Some(key), options);
            ids.push(self.schedule_start(event.start_ms / 1000.0, request));
        }
        info!("Playing composition: {} notes", ids.len());
        ids
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Append an effect of `effect_type` configured by `params`
    pub fn add_effect(&mut self, effect_type: &str, params: &Value) -> Result<String> {
        let mut effect = create_effect(effect_type)?;
        effect.set_params(params)?;
        let id = self.chain.add(effect);
        info!("Added {} effect {}", effect_type, id);
        Ok(id)
    }

    pub fn remove_effect(&mut self, effect_id: &str) -> Result<()> {
        self.chain.remove(effect_id).map(|_| ())
    }

    pub fn move_effect(&mut self, effect_id: &str, index: usize) -> Result<()> {
        self.chain.move_effect(effect_id, index)
    }

    pub fn set_effect_param(&mut self, effect_id: &str, name: &str, value: &Value) -> Result<()> {
        self.chain.set_param(effect_id, name, value)
    }

    pub fn clear_effects(&mut self) {
        self.chain.clear();
    }

    pub fn effects(&self) -> &EffectChain {
        &self.chain
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the next `frames` samples and push them to the backend
    pub fn render(&mut self, frames: usize) -> Result<AudioBuffer> {
        if self.backend.is_none() {
            return Err(SolfaError::AudioNotInitialized);
        }

        let mut out = AudioBuffer::new(frames, ChannelLayout::Stereo, self.config.sample_rate);
        let block_start = self.clock.now();
        let block_end = block_start + frames as u64;
        let mut cursor = block_start;

        loop {
            self.clock.advance_to(cursor);
            while let Some((_, task)) = self.tasks.pop_due(cursor) {
                self.run_task(task);
            }
            if cursor >= block_end {
                break;
            }
            let segment_end = self
                .tasks
                .next_due()
                .map_or(block_end, |due| due.min(block_end));
            let offset = (cursor - block_start) as usize;
            let len = (segment_end - cursor) as usize;
            for voice in self.voices.values_mut() {
                voice.render(&mut out, offset, len, cursor);
            }
            cursor = segment_end;
        }

        self.chain.process(&mut out);
        out.apply_gain(self.master_volume);

        if let Some(backend) = self.backend.as_mut() {
            backend.write(&out)?;
        }
        Ok(out)
    }

    /// Render until no voices or tasks remain, at most `max_secs`
    pub fn render_until_idle(&mut self, block_size: usize, max_secs: f64) -> Result<AudioBuffer> {
        let block_size = block_size.clamp(1, MAX_BLOCK_SIZE);
        let limit = self.clock.now() + self.secs_to_samples(max_secs);
        let mut all = AudioBuffer::new(0, ChannelLayout::Stereo, self.config.sample_rate);
        while (!self.voices.is_empty() || !self.tasks.is_empty()) && self.clock.now() < limit {
            let frames = block_size.min((limit - self.clock.now()) as usize);
            let block = self.render(frames)?;
            all.append(&block);
        }
        Ok(all)
    }

    fn run_task(&mut self, task: EngineTask) {
        match task {
            EngineTask::Start { epoch, request } => {
                if epoch != self.epoch {
                    debug!("Dropping stale start of {}", request.id);
                    return;
                }
                self.start(request);
            }
            EngineTask::Stop { id, generation } => {
                if self.voices.get(&id).map(|v| v.generation()) != Some(generation) {
                    debug!("Dropping stale stop of {}", id);
                    return;
                }
                self.stop_note(&id);
            }
            EngineTask::Dispose { id, generation } => {
                if self.voices.get(&id).map(|v| v.generation()) != Some(generation) {
                    debug!("Dropping stale dispose of {}", id);
                    return;
                }
                self.voices.remove(&id);
                self.voice_pitches.remove(&id);
            }
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("initialized", &self.is_initialized())
            .field("now", &self.clock.now())
            .field("voices", &self.voices.len())
            .field("chain", &self.chain)
            .finish()
    }
}

/// Semitone and octave `interval` semitones above `(semitone, octave)`
fn transpose(semitone: u8, octave: i32, interval: u8) -> (u8, i32) {
    let total = semitone + interval;
    (total % 12, octave + i32::from(total / 12))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{CaptureBackend, NullBackend};
    use crate::audio::oscillator::Waveform;
    use approx::assert_relative_eq;
    use serde_json::json;

    const SR: u32 = 1000;

    fn config() -> AudioConfig {
        AudioConfig {
            sample_rate: SR,
            envelope: Adsr::new(0.01, 0.01, 0.5, 0.1),
            timbre: Timbre::Basic(Waveform::Square),
            master_volume: 1.0,
            note_peak: 0.5,
            dispose_grace_ms: 50,
            ..AudioConfig::default()
        }
    }

    fn engine() -> AudioEngine {
        let mut engine = AudioEngine::new(config());
        engine.initialize(Box::new(NullBackend::new())).unwrap();
        engine
    }

    #[test]
    fn test_uninitialized_calls_are_ignored() {
        let mut engine = AudioEngine::new(config());
        assert_eq!(engine.play_note("do", 4, NoteOptions::held()), None);
        assert!(engine.play_chord("do", 4, ChordType::Major, NoteOptions::held()).is_empty());
        assert_eq!(engine.render(10).unwrap_err().error_code(), "AUDIO_NOT_INITIALIZED");
    }

    #[test]
    fn test_initialize_surfaces_unavailable_backend() {
        let mut engine = AudioEngine::new(config());
        let err = engine
            .initialize(Box::new(NullBackend::unavailable("device busy")))
            .unwrap_err();
        assert_eq!(err.error_code(), "AUDIO_BACKEND_UNAVAILABLE");
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_unknown_pitch_is_ignored() {
        let mut engine = engine();
        assert_eq!(engine.play_note("xyz", 4, NoteOptions::held()), None);
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_held_note_sounds_until_stopped() {
        let mut engine = engine();
        let id = engine.play_note("la", 4, NoteOptions::held().with_id("a")).unwrap();
        assert_eq!(id, "a");
        assert_relative_eq!(engine.voice("a").unwrap().frequency(), 440.0);

        let block = engine.render(500).unwrap();
        assert!(engine.is_playing("a"));
        assert!(block.peak() > 0.0);

        assert!(engine.stop_note("a"));
        assert!(!engine.stop_note("a"));
        assert!(!engine.is_playing("a"));
        // 100 ms release + 50 ms grace
        engine.render(149).unwrap();
        assert_eq!(engine.voice_count(), 1);
        engine.render(1).unwrap();
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_duration_schedules_auto_stop() {
        let mut engine = engine();
        engine.play_note("do", 4, NoteOptions::for_duration(0.2).with_id("n"));
        engine.render(199).unwrap();
        assert!(engine.is_playing("n"));
        engine.render(1).unwrap();
        assert!(!engine.is_playing("n"));
        engine.render(200).unwrap();
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_restarting_id_replaces_graph_and_stales_old_timer() {
        let mut engine = engine();
        engine.play_note("do", 4, NoteOptions::for_duration(0.1).with_id("x"));
        engine.render(50).unwrap();
        engine.play_note("mi", 4, NoteOptions::held().with_id("x"));
        assert_eq!(engine.voice_count(), 1);

        // the first note's auto-stop at 100 must not stop the new one
        engine.render(200).unwrap();
        assert!(engine.is_playing("x"));
        assert_relative_eq!(engine.voice("x").unwrap().frequency(), 329.63);
    }

    #[test]
    fn test_polyphony_is_id_keyed() {
        let mut engine = engine();
        engine.play_note("do", 4, NoteOptions::held().with_id("a"));
        engine.play_note("do", 4, NoteOptions::held().with_id("b"));
        assert_eq!(engine.voice_count(), 2);
    }

    #[test]
    fn test_mono_mode_repeats_are_noops() {
        let mut engine = engine();
        engine.set_voice_mode(VoiceMode::Mono);
        let first = engine.play_note("sol", 4, NoteOptions::held()).unwrap();
        let again = engine.play_note("sol", 4, NoteOptions::held()).unwrap();
        assert_eq!(first, again);
        assert_eq!(engine.voice_count(), 1);

        let next = engine.play_note("la", 4, NoteOptions::held()).unwrap();
        assert_ne!(next, first);
        assert!(!engine.is_playing(&first));
        assert!(engine.is_playing(&next));

        // same pitch in another octave is a new note
        let higher = engine.play_note("la", 5, NoteOptions::held()).unwrap();
        assert_ne!(higher, next);
    }

    #[test]
    fn test_chord_intervals() {
        let mut engine = engine();
        let ids = engine.play_chord("la", 4, ChordType::Major, NoteOptions::held().with_id("c"));
        assert_eq!(ids, vec!["c-0", "c-1", "c-2"]);
        // A4, C#5, E5
        assert_relative_eq!(engine.voice("c-0").unwrap().frequency(), 440.0);
        assert_relative_eq!(engine.voice("c-1").unwrap().frequency(), 554.36);
        assert_relative_eq!(engine.voice("c-2").unwrap().frequency(), 659.26);
    }

    #[test]
    fn test_sequence_starts_on_beat() {
        let mut engine = engine();
        let notes = [
            SequenceNote::new("do", 4, 1.0),
            SequenceNote::new("nope", 4, 1.0),
            SequenceNote::new("mi", 4, 2.0),
        ];
        // 120 bpm: a beat is 500 samples at 1 kHz
        let ids = engine.play_sequence(&notes, 120, NoteOptions::held().with_id("s"));
        assert_eq!(ids, vec!["s-0", "s-2"]);

        engine.render(1).unwrap();
        assert!(engine.is_playing("s-0"));
        engine.render(998).unwrap();
        assert!(engine.voice("s-2").is_none());
        // tasks due at the block end run before `render` returns
        engine.render(1).unwrap();
        assert!(engine.is_playing("s-2"));
        assert_eq!(engine.voice("s-2").unwrap().start_time(), 1000);
    }

    #[test]
    fn test_stop_all_cancels_pending_pattern() {
        let mut engine = engine();
        engine.play_arpeggio(
            "do",
            4,
            ChordType::Minor7,
            ArpeggioPattern::Up,
            0.1,
            NoteOptions::held().with_id("arp"),
        );
        engine.render(150).unwrap();
        assert!(engine.is_playing("arp-1"));
        engine.stop_all();
        engine.render(500).unwrap();
        assert!(engine.voice("arp-3").is_none());
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_arpeggio_patterns() {
        let mut engine = engine();
        let ids = engine.play_arpeggio(
            "do",
            4,
            ChordType::Major,
            ArpeggioPattern::UpDown,
            0.05,
            NoteOptions::held().with_id("u"),
        );
        assert_eq!(ids.len(), 5);
        engine.render(1).unwrap();
        assert_relative_eq!(engine.voice("u-0").unwrap().frequency(), 261.63);
    }

    #[test]
    fn test_glissando_walks_semitones() {
        let mut engine = engine();
        let ids = engine.play_glissando(("ti", 3), ("re", 4), 0.3, NoteOptions::held().with_id("g"));
        // B3, C4, C#4, D4
        assert_eq!(ids.len(), 4);
        engine.render(1).unwrap();
        assert_relative_eq!(engine.voice("g-0").unwrap().frequency(), 246.94);

        let down = engine.play_glissando(("re", 4), ("do", 4), 0.3, NoteOptions::held());
        assert_eq!(down.len(), 3);
    }

    #[test]
    fn test_effects_chain_management() {
        let mut engine = engine();
        let reverb = engine.add_effect("reverb", &json!({"mix": 0.5})).unwrap();
        let filter = engine
            .add_effect("filter", &json!({"filter_type": "highpass", "frequency": 200.0}))
            .unwrap();
        assert_eq!(engine.effects().ids(), vec![reverb.clone(), filter.clone()]);

        engine.move_effect(&filter, 0).unwrap();
        assert_eq!(engine.effects().routing()[1], filter);

        engine.remove_effect(&reverb).unwrap();
        assert_eq!(engine.effects().len(), 1);
        assert!(engine.add_effect("wah", &Value::Null).is_err());
        assert!(engine.add_effect("delay", &json!({"bogus": 1})).is_err());
    }

    #[test]
    fn test_render_reaches_backend_and_master_gain() {
        let backend = CaptureBackend::new();
        let handle = backend.handle();
        let mut engine = AudioEngine::new(config());
        engine.initialize(Box::new(backend)).unwrap();
        engine.set_master_volume(0.5);

        engine.play_note("do", 4, NoteOptions::held());
        engine.render(100).unwrap();
        engine.render(100).unwrap();

        let captured = handle.buffer();
        assert_eq!(captured.len(), 200);
        // square wave at sustain 0.25, halved by the master gain
        assert_relative_eq!(captured.samples[0][150].abs(), 0.125, epsilon = 1e-6);
        assert_relative_eq!(captured.samples[1][150].abs(), 0.125, epsilon = 1e-6);
    }

    #[test]
    fn test_shutdown_silences_engine() {
        let mut engine = engine();
        engine.play_note("do", 4, NoteOptions::held());
        engine.shutdown();
        assert!(!engine.is_initialized());
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.play_note("do", 4, NoteOptions::held()), None);
    }

    #[test]
    fn test_render_until_idle_drains_voices() {
        let mut engine = engine();
        engine.play_note("do", 4, NoteOptions::for_duration(0.1));
        let rendered = engine.render_until_idle(64, 5.0).unwrap();
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.pending_tasks(), 0);
        assert!(rendered.len() >= 250);
        assert!(rendered.len() < 5000);
    }
}
