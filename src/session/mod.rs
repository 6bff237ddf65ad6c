//! Composer session
//!
//! A [`Session`] is the one core engine behind every input modality. Per
//! frame it classifies the melody hand, debounces it, sounds committed signs,
//! feeds the control hand to the mode's [`ControlAdapter`], executes fired
//! commands and runs due session tasks (autosave). Everything that can be
//! missing at runtime (audio output, speech recognition, storage) degrades
//! to a flag on [`SessionStatus`].

pub mod adapter;

use std::sync::Arc;

use log::{debug, info, warn};

pub use adapter::{
    adapter_for, ControlAdapter, ControlUpdate, HandOnlyAdapter, MotionAdapter, VoiceAdapter,
    ZoneAdapter,
};

use crate::audio::{AudioBackend, AudioBuffer, AudioEngine, NoteOptions};
use crate::command::Command;
use crate::composition::{
    Accidental, AutosaveManager, Composition, ExportDocument, Note, RestoreStatus,
};
use crate::config::{InputMode, SessionConfig};
use crate::error::{Result, SolfaError};
use crate::gesture::{ChannelEvent, ChannelRole, ChannelState, DebounceChannel, Zone};
use crate::hand::{Classifier, Frame, HandClassification, Sign};
use crate::scheduler::{TaskQueue, VirtualClock};
use crate::storage::KeyValueStore;

/// Voice id used for the live melody note
pub const MELODY_VOICE: &str = "melody";

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Gesture,
    Voice,
    Api,
}

/// Something observable that happened during a session call
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    NoteOn { sign: Sign, voice: Option<String> },
    NoteOff { sign: Sign },
    NoteRecorded(Note),
    HoldProgress { zone: Zone, progress: f32 },
    CommandExecuted { command: Command, source: CommandSource },
    CommandRejected { command: Command, source: CommandSource, reason: String },
    Autosaved { at_ms: u64 },
    AutosaveFailed { reason: String },
}

/// Availability flags for the host UI
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub audio_available: bool,
    /// Why the audio backend could not be opened
    pub audio_error: Option<String>,
    /// Whether transcripts are acted on
    pub voice_available: bool,
    pub storage_available: bool,
    /// Outcome of the startup restore
    pub restore: RestoreStatus,
    pub last_autosave_ms: Option<u64>,
}

#[derive(Debug)]
enum SessionTask {
    Autosave { generation: u64 },
}

/// One composer session
pub struct Session {
    config: Arc<SessionConfig>,
    classifier: Classifier,
    melody: DebounceChannel,
    adapter: Box<dyn ControlAdapter>,
    composition: Composition,
    engine: AudioEngine,
    autosave: AutosaveManager,
    store: Box<dyn KeyValueStore>,
    clock: VirtualClock,
    tasks: TaskQueue<SessionTask>,
    autosave_generation: u64,
    /// Most recently committed sign, used by `AddNote` after release
    last_sign: Option<Sign>,
    last_melody: Option<HandClassification>,
    status: SessionStatus,
}

impl Session {
    /// Start a session, restoring the autosaved composition if there is one.
    /// Audio stays off until [`Session::initialize_audio`].
    ///
    /// Fails with `InvalidConfig` if `config` does not validate.
    pub fn new(config: Arc<SessionConfig>, store: Box<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;
        let autosave = AutosaveManager::new(config.autosave.clone());
        let (composition, restore) = autosave.restore(store.as_ref(), config.composition.clone());
        let storage_available = !matches!(restore, RestoreStatus::Unavailable(_));

        let mut session = Self {
            classifier: Classifier::new(config.classifier.clone()),
            melody: DebounceChannel::new(ChannelRole::Melody, config.debounce.clone()),
            adapter: adapter_for(&config),
            composition,
            engine: AudioEngine::new(config.audio.clone()),
            autosave,
            store,
            clock: VirtualClock::new(),
            tasks: TaskQueue::new(),
            autosave_generation: 0,
            last_sign: None,
            last_melody: None,
            status: SessionStatus {
                audio_available: false,
                audio_error: None,
                voice_available: config.input_mode == InputMode::HandVoice,
                storage_available,
                restore,
                last_autosave_ms: None,
            },
            config,
        };
        session.schedule_autosave();
        info!("Session started in {:?} mode", session.config.input_mode);
        Ok(session)
    }

    /// Open the audio backend. Failure leaves the session silent, not broken.
    pub fn initialize_audio(&mut self, backend: Box<dyn AudioBackend>) -> bool {
        match self.engine.initialize(backend) {
            Ok(()) => {
                self.status.audio_available = true;
                self.status.audio_error = None;
                true
            }
            Err(e) => {
                warn!("Audio disabled: {}", e);
                self.status.audio_available = false;
                self.status.audio_error = Some(e.to_string());
                false
            }
        }
    }

    /// Report whether the host's speech recogniser is usable
    pub fn set_voice_available(&mut self, available: bool) {
        self.status.voice_available = available && self.config.input_mode == InputMode::HandVoice;
        if !available {
            info!("Voice commands unavailable");
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn config(&self) -> &Arc<SessionConfig> {
        &self.config
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    pub fn melody_state(&self) -> ChannelState {
        self.melody.state()
    }

    /// Classification of the melody hand on the last frame
    pub fn last_melody_classification(&self) -> Option<&HandClassification> {
        self.last_melody.as_ref()
    }

    pub fn input_mode(&self) -> InputMode {
        self.adapter.mode()
    }

    /// Current session time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.clock.now()
    }

    /// Swap in a new configuration snapshot.
    ///
    /// Gesture state restarts; the composition and audio output are kept.
    /// An invalid snapshot is rejected and the current one stays in effect.
    pub fn apply_config(&mut self, config: Arc<SessionConfig>) -> Result<()> {
        config.validate()?;
        let mut events = Vec::new();
        self.release_melody(&mut events);

        self.classifier = Classifier::new(config.classifier.clone());
        self.melody = DebounceChannel::new(ChannelRole::Melody, config.debounce.clone());
        self.adapter = adapter_for(&config);
        self.autosave = AutosaveManager::new(config.autosave.clone());

        self.engine.set_master_volume(config.audio.master_volume);
        self.engine.set_timbre(config.audio.timbre);
        self.engine.set_envelope(config.audio.envelope);
        self.engine.set_voice_mode(config.audio.voice_mode);

        self.status.voice_available = config.input_mode == InputMode::HandVoice;
        self.config = config;
        self.schedule_autosave();
        info!("Session reconfigured to {:?} mode", self.config.input_mode);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Process one tracker frame
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<SessionEvent> {
        let now = self.clock.advance_to(frame.timestamp_ms);
        let mut events = Vec::new();

        let classification = self
            .classifier
            .classify(frame.hand(ChannelRole::Melody.hand()));
        match self.melody.update(&classification.sign) {
            Some(ChannelEvent::NoteOn(sign)) => self.on_commit(sign, &mut events),
            Some(ChannelEvent::NoteOff(sign)) => self.on_release(sign, &mut events),
            None => {}
        }
        self.last_melody = Some(classification);

        let update = self
            .adapter
            .on_frame(now, frame.hand(ChannelRole::Control.hand()), &self.classifier);
        if let Some((zone, progress)) = update.hold {
            events.push(SessionEvent::HoldProgress { zone, progress });
        }
        if let Some(action) = update.fired {
            self.dispatch(action.command, CommandSource::Gesture, &mut events);
        }

        self.run_due_tasks(&mut events);
        events
    }

    /// Process a final transcript from the host's speech recogniser
    pub fn handle_transcript(&mut self, transcript: &str) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.status.voice_available {
            debug!("Transcript ignored, voice input unavailable");
            return events;
        }
        if let Some(command) = self.adapter.on_transcript(transcript) {
            self.dispatch(command, CommandSource::Voice, &mut events);
        }
        events
    }

    /// Advance session time without a frame, e.g. while tracking is paused
    pub fn tick(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        self.clock.advance_to(now_ms);
        let mut events = Vec::new();
        self.run_due_tasks(&mut events);
        events
    }

    /// Render the next block of audio, or `None` while audio is unavailable
    pub fn render_audio(&mut self, frames: usize) -> Option<AudioBuffer> {
        if !self.status.audio_available {
            return None;
        }
        match self.engine.render(frames) {
            Ok(block) => Some(block),
            Err(e) => {
                warn!("Audio render failed, disabling audio: {}", e);
                self.status.audio_available = false;
                self.status.audio_error = Some(e.to_string());
                None
            }
        }
    }

    fn on_commit(&mut self, sign: Sign, events: &mut Vec<SessionEvent>) {
        self.last_sign = Some(sign);
        let voice = if self.status.audio_available {
            let preview = Note::new(
                sign,
                self.composition.current_octave(),
                self.composition.current_accidental(),
                self.composition.current_duration(),
            );
            self.engine.play_note(
                &preview.pitch_name(),
                preview.sounding_octave(),
                NoteOptions::held().with_id(MELODY_VOICE),
            )
        } else {
            None
        };
        events.push(SessionEvent::NoteOn { sign, voice });

        if self.config.record_commits {
            let note = self.composition.add_sign(sign);
            events.push(SessionEvent::NoteRecorded(note));
        }
    }

    fn on_release(&mut self, sign: Sign, events: &mut Vec<SessionEvent>) {
        self.engine.stop_note(MELODY_VOICE);
        events.push(SessionEvent::NoteOff { sign });
    }

    fn release_melody(&mut self, events: &mut Vec<SessionEvent>) {
        if let Some(ChannelEvent::NoteOff(sign)) = self.melody.reset() {
            self.on_release(sign, events);
        }
        self.adapter.reset();
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Execute a command from the host API
    pub fn execute_command(&mut self, command: Command) -> Result<Vec<SessionEvent>> {
        let mut events = Vec::new();
        self.apply(command, &mut events)?;
        events.push(SessionEvent::CommandExecuted {
            command,
            source: CommandSource::Api,
        });
        Ok(events)
    }

    fn dispatch(&mut self, command: Command, source: CommandSource, events: &mut Vec<SessionEvent>) {
        match self.apply(command, events) {
            Ok(()) => {
                info!("Executed {} ({:?})", command, source);
                events.push(SessionEvent::CommandExecuted { command, source });
            }
            Err(e) => {
                debug!("Command {} rejected: {}", command, e);
                events.push(SessionEvent::CommandRejected {
                    command,
                    source,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn apply(&mut self, command: Command, events: &mut Vec<SessionEvent>) -> Result<()> {
        let composition = &mut self.composition;
        match command {
            Command::AddNote => {
                let sign = self
                    .melody
                    .committed()
                    .or(self.last_sign)
                    .ok_or_else(|| SolfaError::InvalidInput {
                        reason: "no sign has been committed yet".to_string(),
                    })?;
                let note = composition.add_sign(sign);
                events.push(SessionEvent::NoteRecorded(note));
            }
            Command::AddRest => {
                let duration = composition.current_duration();
                composition.add_rest(duration);
            }
            Command::SetDuration(duration) => composition.set_note_duration(duration),
            Command::OctaveUp => {
                composition.octave_up();
            }
            Command::OctaveDown => {
                composition.octave_down();
            }
            Command::Play => {
                if !self.status.audio_available {
                    return Err(SolfaError::AudioNotInitialized);
                }
                self.engine.stop_all();
                self.engine.play_composition(composition);
            }
            Command::Stop => self.engine.stop_all(),
            Command::Undo => composition.undo()?,
            Command::Redo => composition.redo()?,
            Command::Clear => composition.clear(),
            Command::Sharp => composition.set_accidental(Some(Accidental::Sharp)),
            Command::Flat => composition.set_accidental(Some(Accidental::Flat)),
            Command::Natural => composition.set_accidental(None),
            Command::Faster => {
                composition.faster();
            }
            Command::Slower => {
                composition.slower();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Export the composition under `name`
    pub fn export(&self, name: &str) -> ExportDocument {
        self.composition.export_document(name)
    }

    /// Replace the composition with an exported document (undoable)
    pub fn import(&mut self, document: &ExportDocument) -> Result<()> {
        self.composition.import_document(document)
    }

    /// Write a snapshot now and restart the autosave interval
    pub fn save_now(&mut self) -> Result<()> {
        let now = self.clock.now();
        let result = self
            .autosave
            .save(self.store.as_mut(), &self.composition, now);
        self.record_save(&result, now);
        self.schedule_autosave();
        result
    }

    /// Remove the stored snapshot
    pub fn discard_autosave(&mut self) -> Result<()> {
        self.autosave.clear(self.store.as_mut())
    }

    fn record_save(&mut self, result: &Result<()>, now: u64) {
        match result {
            Ok(()) => {
                self.status.storage_available = true;
                self.status.last_autosave_ms = Some(now);
            }
            Err(_) => self.status.storage_available = false,
        }
    }

    fn schedule_autosave(&mut self) {
        self.autosave_generation += 1;
        if !self.config.autosave.enabled {
            return;
        }
        let due = self.clock.now() + self.autosave.interval_ms().max(1);
        self.tasks.schedule(
            due,
            SessionTask::Autosave {
                generation: self.autosave_generation,
            },
        );
    }

    fn run_due_tasks(&mut self, events: &mut Vec<SessionEvent>) {
        let now = self.clock.now();
        while let Some((_, task)) = self.tasks.pop_due(now) {
            match task {
                SessionTask::Autosave { generation } if generation == self.autosave_generation => {
                    let result = self
                        .autosave
                        .save(self.store.as_mut(), &self.composition, now);
                    self.record_save(&result, now);
                    events.push(match result {
                        Ok(()) => SessionEvent::Autosaved { at_ms: now },
                        Err(e) => SessionEvent::AutosaveFailed {
                            reason: e.to_string(),
                        },
                    });
                    self.schedule_autosave();
                }
                SessionTask::Autosave { .. } => debug!("Dropping stale autosave"),
            }
        }
    }

    /// Save, release every voice and close the audio backend
    pub fn shutdown(&mut self) {
        if self.config.autosave.enabled {
            if let Err(e) = self.save_now() {
                warn!("Final autosave failed: {}", e);
            }
        }
        self.engine.shutdown();
        self.status.audio_available = false;
        info!("Session ended");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.adapter.mode())
            .field("now_ms", &self.clock.now())
            .field("entries", &self.composition.len())
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CaptureBackend, NullBackend};
    use crate::composition::Entry;
    use crate::config::DebounceConfig;
    use crate::hand::fixtures::{flat_hand_at, sign_hand};
    use crate::hand::Handedness;
    use crate::storage::{FileStore, MemoryStore};

    fn config(mode: InputMode) -> SessionConfig {
        SessionConfig {
            input_mode: mode,
            debounce: DebounceConfig {
                confidence_threshold: 0.85,
                hold_frames: 3,
            },
            ..SessionConfig::default()
        }
    }

    fn session(mode: InputMode) -> Session {
        let mut session =
            Session::new(Arc::new(config(mode)), Box::new(MemoryStore::new())).unwrap();
        assert!(session.initialize_audio(Box::new(NullBackend::new())));
        session
    }

    fn hold_sign(session: &mut Session, sign: Sign, from_ms: u64, frames: u64) -> Vec<SessionEvent> {
        (0..frames)
            .flat_map(|i| session.process_frame(&Frame::new(from_ms + i * 33, vec![sign_hand(sign)])))
            .collect()
    }

    #[test]
    fn test_committed_sign_sounds_melody_voice() {
        let mut session = session(InputMode::HandOnly);
        let events = hold_sign(&mut session, Sign::La, 0, 3);
        assert_eq!(
            events,
            vec![SessionEvent::NoteOn {
                sign: Sign::La,
                voice: Some(MELODY_VOICE.to_string()),
            }]
        );
        assert!(session.engine().is_playing(MELODY_VOICE));
        assert!((session.engine().voice(MELODY_VOICE).unwrap().frequency() - 440.0).abs() < 1e-3);

        let events = session.process_frame(&Frame::new(200, vec![]));
        assert_eq!(events, vec![SessionEvent::NoteOff { sign: Sign::La }]);
        assert!(!session.engine().is_playing(MELODY_VOICE));
    }

    #[test]
    fn test_missing_melody_hand_produces_nothing() {
        let mut session = session(InputMode::HandOnly);
        for t in 0..10 {
            assert!(session.process_frame(&Frame::new(t * 33, vec![])).is_empty());
        }
        assert!(session.composition().is_empty());
    }

    #[test]
    fn test_control_hand_sign_is_not_melody() {
        let mut session = session(InputMode::HandOnly);
        let mut left = sign_hand(Sign::Do);
        left.handedness = Handedness::Left;
        for i in 0..6u64 {
            assert!(session.process_frame(&Frame::new(i * 33, vec![left.clone()])).is_empty());
        }
        assert_eq!(session.melody_state(), ChannelState::default());
    }

    #[test]
    fn test_record_commits() {
        let mut config = config(InputMode::HandOnly);
        config.record_commits = true;
        let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();
        hold_sign(&mut session, Sign::Do, 0, 3);
        session.process_frame(&Frame::new(100, vec![]));
        hold_sign(&mut session, Sign::Sol, 200, 3);

        let pitches: Vec<Sign> = session.composition().notes().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![Sign::Do, Sign::Sol]);
    }

    #[test]
    fn test_audio_unavailable_is_a_status_flag() {
        let mut session = Session::new(
            Arc::new(config(InputMode::HandOnly)),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        assert!(!session.initialize_audio(Box::new(NullBackend::unavailable("no device"))));
        assert!(!session.status().audio_available);
        assert!(session.status().audio_error.is_some());

        let events = hold_sign(&mut session, Sign::Mi, 0, 3);
        assert_eq!(events, vec![SessionEvent::NoteOn { sign: Sign::Mi, voice: None }]);
        assert!(session.render_audio(128).is_none());
        assert_eq!(
            session.execute_command(Command::Play).unwrap_err().error_code(),
            "AUDIO_NOT_INITIALIZED"
        );
    }

    #[test]
    fn test_add_note_uses_last_committed_sign() {
        let mut session = session(InputMode::HandOnly);
        assert!(session.execute_command(Command::AddNote).is_err());

        hold_sign(&mut session, Sign::Re, 0, 3);
        session.process_frame(&Frame::new(150, vec![]));
        session.execute_command(Command::OctaveUp).unwrap();
        session.execute_command(Command::Sharp).unwrap();
        session.execute_command(Command::AddNote).unwrap();

        let note = session.composition().notes().next().unwrap().clone();
        assert_eq!(note.pitch, Sign::Re);
        assert_eq!(note.octave, 5);
        assert_eq!(note.accidental, Some(Accidental::Sharp));
    }

    #[test]
    fn test_zone_hold_adds_note() {
        let mut config = config(InputMode::HandZones);
        config.zones.hold_ms = 300;
        let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();

        let mut fired = Vec::new();
        for i in 0..12u64 {
            let frame = Frame::new(
                i * 50,
                vec![sign_hand(Sign::Fa), flat_hand_at(Handedness::Left, 0.85, 0.5)],
            );
            fired.extend(session.process_frame(&frame).into_iter().filter(|e| {
                matches!(e, SessionEvent::CommandExecuted { .. })
            }));
        }
        assert_eq!(
            fired,
            vec![SessionEvent::CommandExecuted {
                command: Command::AddNote,
                source: CommandSource::Gesture,
            }]
        );
        assert_eq!(session.composition().len(), 1);
    }

    #[test]
    fn test_rejected_gesture_command_is_reported() {
        let mut config = config(InputMode::HandZones);
        config.zones.hold_ms = 100;
        let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();
        // left zone is undo, with nothing to undo
        let events: Vec<SessionEvent> = (0..4u64)
            .flat_map(|i| {
                session.process_frame(&Frame::new(
                    i * 50,
                    vec![flat_hand_at(Handedness::Left, 0.15, 0.5)],
                ))
            })
            .filter(|e| matches!(e, SessionEvent::CommandRejected { .. }))
            .collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_voice_commands_follow_mode_and_availability() {
        let mut voice = session(InputMode::HandVoice);
        voice.handle_transcript("quarter note");
        voice.handle_transcript("add rest");
        assert_eq!(voice.composition().len(), 1);

        voice.set_voice_available(false);
        voice.handle_transcript("add rest");
        assert_eq!(voice.composition().len(), 1);

        let mut zones = session(InputMode::HandZones);
        assert!(zones.handle_transcript("add rest").is_empty());
        assert!(!zones.status().voice_available);
    }

    #[test]
    fn test_play_and_stop_drive_engine() {
        let mut session = session(InputMode::HandOnly);
        hold_sign(&mut session, Sign::Do, 0, 3);
        session.execute_command(Command::AddNote).unwrap();
        session.execute_command(Command::AddNote).unwrap();

        session.execute_command(Command::Play).unwrap();
        session.render_audio(64).unwrap();
        assert_eq!(session.engine().voice_count(), 2);

        session.execute_command(Command::Stop).unwrap();
        assert!(session.engine().voice_ids().iter().all(|id| !session.engine().is_playing(id)));
    }

    #[test]
    fn test_autosave_runs_on_interval_and_restores() {
        let mut config = config(InputMode::HandOnly);
        config.autosave.interval_ms = 1000;
        let config = Arc::new(config);
        let mut session = Session::new(Arc::clone(&config), Box::new(MemoryStore::new())).unwrap();
        session.execute_command(Command::AddRest).unwrap();

        assert!(session.tick(999).is_empty());
        assert_eq!(session.tick(1000), vec![SessionEvent::Autosaved { at_ms: 1000 }]);
        assert_eq!(session.status().last_autosave_ms, Some(1000));
        assert!(session.tick(1500).is_empty());
    }

    #[test]
    fn test_save_now_restarts_interval() {
        let mut config = config(InputMode::HandOnly);
        config.autosave.interval_ms = 1000;
        let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();
        session.tick(600);
        session.save_now().unwrap();
        // the original 1000 ms task is stale now
        assert!(session.tick(1000).is_empty());
        assert_eq!(session.tick(1600), vec![SessionEvent::Autosaved { at_ms: 1600 }]);
    }

    #[test]
    fn test_zero_autosave_interval_is_rejected() {
        let mut bad = config(InputMode::HandOnly);
        bad.autosave.interval_ms = 0;
        let err =
            Session::new(Arc::new(bad.clone()), Box::new(MemoryStore::new())).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let mut session = session(InputMode::HandVoice);
        assert!(session.apply_config(Arc::new(bad)).is_err());
        assert_eq!(session.input_mode(), InputMode::HandVoice);
        assert_eq!(session.config().autosave.interval_ms, 10_000);
        assert!(session.tick(5).is_empty());
        assert_eq!(session.tick(10_000), vec![SessionEvent::Autosaved { at_ms: 10_000 }]);
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let mut session = Session::new(
            Arc::new(config(InputMode::HandOnly)),
            Box::new(MemoryStore::unavailable()),
        )
        .unwrap();
        assert!(!session.status().storage_available);
        assert!(matches!(session.status().restore, RestoreStatus::Unavailable(_)));

        let events = session.tick(10_000);
        assert!(matches!(events.as_slice(), [SessionEvent::AutosaveFailed { .. }]));
        assert!(!session.status().storage_available);
    }

    #[test]
    fn test_file_store_write_failure_clears_storage_flag() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let mut cfg = config(InputMode::HandOnly);
        cfg.autosave.interval_ms = 1000;
        let store = FileStore::open(&root).unwrap();
        let mut session = Session::new(Arc::new(cfg), Box::new(store)).unwrap();
        assert!(session.status().storage_available);

        std::fs::remove_dir_all(&root).unwrap();
        let events = session.tick(1000);
        assert!(matches!(events.as_slice(), [SessionEvent::AutosaveFailed { .. }]));
        assert!(!session.status().storage_available);

        std::fs::create_dir_all(&root).unwrap();
        assert_eq!(session.tick(2000), vec![SessionEvent::Autosaved { at_ms: 2000 }]);
        assert!(session.status().storage_available);
    }

    #[test]
    fn test_apply_config_switches_adapter_and_releases_melody() {
        let mut session = session(InputMode::HandOnly);
        hold_sign(&mut session, Sign::Ti, 0, 3);
        assert!(session.engine().is_playing(MELODY_VOICE));

        session
            .apply_config(Arc::new(config(InputMode::HandMotion)))
            .unwrap();
        assert_eq!(session.input_mode(), InputMode::HandMotion);
        assert!(!session.engine().is_playing(MELODY_VOICE));
        assert_eq!(session.melody_state(), ChannelState::default());
    }

    #[test]
    fn test_export_import_through_session() {
        let mut source = session(InputMode::HandOnly);
        source.execute_command(Command::AddRest).unwrap();
        let document = source.export("sketch");

        let mut target = session(InputMode::HandOnly);
        target.import(&document).unwrap();
        assert!(matches!(target.composition().entries(), [Entry::Rest(_)]));
    }

    #[test]
    fn test_render_reaches_backend() {
        let backend = CaptureBackend::new();
        let handle = backend.handle();
        let mut session = Session::new(
            Arc::new(config(InputMode::HandOnly)),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        session.initialize_audio(Box::new(backend));
        hold_sign(&mut session, Sign::Sol, 0, 3);
        session.render_audio(256).unwrap();
        assert_eq!(handle.frames(), 256);
        assert!(handle.buffer().peak() > 0.0);
    }
}
