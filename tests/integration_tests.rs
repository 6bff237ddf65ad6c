//! Integration Tests
//!
//! End-to-end tests for the Solfa pipeline: frames in, composition and
//! audio out.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

use solfa::audio::{
    bounce_composition, render_composition_to_wav, CaptureBackend, ChannelLayout, NullBackend,
};
use solfa::composition::{Composition, Entry, ExportDocument, NoteDuration, RestoreStatus};
use solfa::config::{CompositionConfig, ConfigHandle, DebounceConfig, InputMode, SessionConfig};
use solfa::hand::fixtures::{flat_hand_at, sign_hand};
use solfa::hand::{Frame, Handedness, Sign};
use solfa::storage::{FileStore, KeyValueStore, MemoryStore};
use solfa::{Command, Session, SessionEvent};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick_config(mode: InputMode) -> SessionConfig {
    SessionConfig {
        input_mode: mode,
        record_commits: true,
        debounce: DebounceConfig {
            confidence_threshold: 0.85,
            hold_frames: 4,
        },
        ..SessionConfig::default()
    }
}

/// Hold each sign for `frames` frames with a gap frame between them
fn perform(session: &mut Session, signs: &[Sign], frames: u64) -> u64 {
    let mut t = 0;
    for &sign in signs {
        for _ in 0..frames {
            session.process_frame(&Frame::new(t, vec![sign_hand(sign)]));
            t += 33;
        }
        session.process_frame(&Frame::new(t, vec![]));
        t += 33;
    }
    t
}

// === Full Pipeline Tests ===

#[test]
fn test_signs_to_composition_to_audio() {
    init_logging();
    let backend = CaptureBackend::new();
    let captured = backend.handle();

    let mut session = Session::new(
        Arc::new(quick_config(InputMode::HandOnly)),
        Box::new(MemoryStore::new()),
    )
    .unwrap();
    assert!(session.initialize_audio(Box::new(backend)));

    perform(&mut session, &[Sign::Do, Sign::Re, Sign::Mi], 4);
    let pitches: Vec<Sign> = session.composition().notes().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![Sign::Do, Sign::Re, Sign::Mi]);

    session.execute_command(Command::Play).unwrap();
    let block = session.render_audio(4800).unwrap();
    assert_eq!(block.num_channels(), ChannelLayout::Stereo.num_channels());
    assert!(block.peak() > 0.0);
    assert_eq!(captured.frames(), 4800);
}

#[test]
fn test_flickering_sign_never_commits() {
    let mut session = Session::new(
        Arc::new(quick_config(InputMode::HandOnly)),
        Box::new(MemoryStore::new()),
    )
    .unwrap();
    // alternate signs every three frames: never four agreeing frames
    for i in 0..30u64 {
        let sign = if (i / 3) % 2 == 0 { Sign::Sol } else { Sign::La };
        let events = session.process_frame(&Frame::new(i * 33, vec![sign_hand(sign)]));
        assert!(events.is_empty(), "frame {} produced {:?}", i, events);
    }
    assert!(session.composition().is_empty());
}

#[test]
fn test_zone_control_with_cooldown() {
    let mut config = quick_config(InputMode::HandZones);
    config.zones.hold_ms = 500;
    config.zones.cooldown_ms = 2000;
    let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();
    session.initialize_audio(Box::new(NullBackend::new()));

    // control hand resting in the top zone (octave up) for 3 s
    let mut fired = Vec::new();
    for i in 0..=60u64 {
        let t = i * 50;
        let events = session.process_frame(&Frame::new(
            t,
            vec![flat_hand_at(Handedness::Left, 0.5, 0.15)],
        ));
        for event in events {
            if let SessionEvent::CommandExecuted { command, .. } = event {
                fired.push((t, command));
            }
        }
    }
    // completions at 500, 1000, ... fire at 500 and again once cooled at 2500
    assert_eq!(
        fired,
        vec![(500, Command::OctaveUp), (2500, Command::OctaveUp)]
    );
    assert_eq!(session.composition().current_octave(), 6);
}

#[test]
fn test_motion_mode_vertical_swipe_adds_note() {
    let mut config = quick_config(InputMode::HandMotion);
    config.record_commits = false;
    let mut session = Session::new(Arc::new(config), Box::new(MemoryStore::new())).unwrap();

    let mut t = 0;
    for _ in 0..4 {
        session.process_frame(&Frame::new(t, vec![sign_hand(Sign::Ti)]));
        t += 50;
    }
    assert!(session.composition().is_empty());

    // wrist sweeps down while ti is held
    let start = t;
    let mut added = false;
    while t <= start + 1000 {
        let progress = (t - start) as f32 / 1000.0;
        let control = flat_hand_at(Handedness::Left, 0.5, 0.3 + 0.5 * progress);
        let events = session.process_frame(&Frame::new(t, vec![sign_hand(Sign::Ti), control]));
        added |= events
            .iter()
            .any(|e| matches!(e, SessionEvent::NoteRecorded(n) if n.pitch == Sign::Ti));
        t += 50;
    }
    assert!(added);
    assert_eq!(session.composition().len(), 1);
}

// === Composition Tests ===

#[test]
fn test_undo_redo_restores_order() {
    let mut composition = Composition::new(CompositionConfig::default());
    let signs = [Sign::Sol, Sign::Fa, Sign::Mi, Sign::Re, Sign::Do];
    for sign in signs {
        composition.add_sign(sign);
    }
    for _ in 0..signs.len() {
        composition.undo().unwrap();
    }
    assert!(composition.is_empty());
    assert_eq!(composition.undo().unwrap_err().error_code(), "NOTHING_TO_UNDO");

    for _ in 0..signs.len() {
        composition.redo().unwrap();
    }
    let pitches: Vec<Sign> = composition.notes().map(|n| n.pitch).collect();
    assert_eq!(pitches, signs.to_vec());
}

#[test]
fn test_export_import_round_trip() {
    let mut composition = Composition::new(CompositionConfig::default());
    composition.set_note_duration(NoteDuration::Eighth);
    composition.add_sign(Sign::La);
    composition.add_rest(NoteDuration::Half);
    composition.octave_down();
    composition.add_sign(Sign::Ti);
    composition.faster();

    let json = composition.export_document("round trip").to_json_pretty().unwrap();
    let document = ExportDocument::from_json(&json).unwrap();

    let mut restored = Composition::new(CompositionConfig::default());
    restored.import_document(&document).unwrap();
    assert_eq!(
        restored.export_document("round trip").notes,
        composition.export_document("round trip").notes
    );
    assert_eq!(restored.tempo(), composition.tempo());
    assert_eq!(restored.time_signature(), composition.time_signature());
}

// === Persistence Tests ===

#[test]
fn test_autosave_survives_restart_with_history() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut config = quick_config(InputMode::HandOnly);
    config.autosave.interval_ms = 1000;
    let config = Arc::new(config);

    {
        let store = FileStore::open(dir.path()).unwrap();
        let mut session = Session::new(Arc::clone(&config), Box::new(store)).unwrap();
        let t = perform(&mut session, &[Sign::Do, Sign::Sol], 4);
        session.execute_command(Command::Undo).unwrap();
        let events = session.tick(t + 1000);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Autosaved { .. })));
    }

    let store = FileStore::open(dir.path()).unwrap();
    let mut session = Session::new(config, Box::new(store)).unwrap();
    assert_eq!(session.status().restore, RestoreStatus::Restored);
    assert_eq!(session.composition().len(), 1);

    // the undone note comes back through the restored redo stack
    session.execute_command(Command::Redo).unwrap();
    let pitches: Vec<Sign> = session.composition().notes().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![Sign::Do, Sign::Sol]);
}

#[test]
fn test_corrupt_autosave_yields_fresh_composition() {
    let mut store = MemoryStore::new();
    store.set("solfa.autosave", "{ not json").unwrap();

    let session = Session::new(
        Arc::new(SessionConfig::default()),
        Box::new(store),
    )
    .unwrap();
    assert!(matches!(session.status().restore, RestoreStatus::Corrupted(_)));
    assert!(session.composition().is_empty());
}

// === Configuration Tests ===

#[test]
fn test_config_file_and_handle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("solfa.json");
    std::fs::write(
        &path,
        json!({
            "input_mode": "hand_voice",
            "debounce": { "hold_frames": 6 },
            "audio": { "timbre": "organ", "voice_mode": "mono" }
        })
        .to_string(),
    )
    .unwrap();

    let config = SessionConfig::load(&path).unwrap();
    assert_eq!(config.input_mode, InputMode::HandVoice);
    assert_eq!(config.debounce.hold_frames, 6);
    assert_eq!(config.debounce.confidence_threshold, 0.85);

    let mut handle = ConfigHandle::new(config).unwrap();
    let before = handle.snapshot();
    assert!(handle.update(|c| c.debounce.hold_frames = 0).is_err());
    assert_eq!(handle.snapshot(), before);

    let mut session = Session::new(handle.snapshot(), Box::new(MemoryStore::new())).unwrap();
    let updated = handle.update(|c| c.input_mode = InputMode::HandZones).unwrap();
    session.apply_config(updated).unwrap();
    assert_eq!(session.input_mode(), InputMode::HandZones);
    assert_eq!(before.input_mode, InputMode::HandVoice);
}

// === Offline Rendering Tests ===

#[test]
fn test_bounce_and_wav_export_agree() {
    let mut composition = Composition::new(CompositionConfig::default());
    for sign in [Sign::Do, Sign::Mi, Sign::Sol, Sign::Do] {
        composition.add_sign(sign);
    }
    let audio = solfa::config::AudioConfig {
        sample_rate: 16000,
        ..Default::default()
    };

    let bounced = bounce_composition(&composition, &audio).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("bounce").join("song.wav");
    let frames = render_composition_to_wav(&composition, &audio, &path).unwrap();
    assert_eq!(frames, bounced.len());

    let mut reader = hound::WavReader::open(&path).unwrap();
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, bounced.to_interleaved());
}

#[test]
fn test_effects_shape_session_output() {
    let mut session = Session::new(
        Arc::new(quick_config(InputMode::HandOnly)),
        Box::new(MemoryStore::new()),
    )
    .unwrap();
    session.initialize_audio(Box::new(NullBackend::new()));
    let engine = session.engine_mut();
    let distortion = engine
        .add_effect("distortion", &json!({"curve": "hard", "drive": 1.0}))
        .unwrap();
    engine.add_effect("reverb", &json!({"mix": 0.2})).unwrap();
    engine.move_effect(&distortion, 1).unwrap();
    assert_eq!(engine.effects().routing().len(), 4);
    assert_eq!(engine.effects().routing()[2], distortion);

    perform(&mut session, &[Sign::La], 4);
    let block = session.render_audio(1024).unwrap();
    assert!(block.is_finite());
    assert!(block.peak() <= 1.0);
    assert!(matches!(session.composition().entries(), [Entry::Note(_)]));
}
