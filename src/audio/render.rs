//! Offline bouncing of compositions

use std::path::Path;

use log::info;

use super::backend::{AudioBackend, CaptureBackend, WavFileBackend};
use super::buffer::AudioBuffer;
use super::engine::{AudioEngine, NoteOptions};
use crate::composition::Composition;
use crate::config::AudioConfig;
use crate::error::Result;

/// Block size used when bouncing
pub const BOUNCE_BLOCK_SIZE: usize = 512;

/// Seconds rendered past the last note for release tails
const TAIL_SECS: f64 = 1.0;

fn bounce_into(
    composition: &Composition,
    config: &AudioConfig,
    backend: Box<dyn AudioBackend>,
) -> Result<AudioBuffer> {
    let mut engine = AudioEngine::new(config.clone());
    engine.initialize(backend)?;
    engine.play_composition(composition);

    let max_secs = composition.total_duration_ms() / 1000.0
        + f64::from(config.envelope.release)
        + TAIL_SECS;
    let rendered = engine.render_until_idle(BOUNCE_BLOCK_SIZE, max_secs)?;
    engine.shutdown();
    Ok(rendered)
}

/// Render a composition's playback into memory
pub fn bounce_composition(composition: &Composition, config: &AudioConfig) -> Result<AudioBuffer> {
    bounce_into(composition, config, Box::new(CaptureBackend::new()))
}

/// Render a composition's playback to a 32-bit float stereo WAV file.
/// Returns the number of frames written.
pub fn render_composition_to_wav(
    composition: &Composition,
    config: &AudioConfig,
    path: &Path,
) -> Result<usize> {
    let rendered = bounce_into(composition, config, Box::new(WavFileBackend::new(path)))?;
    info!(
        "Rendered {} frames ({:.2}s) to {}",
        rendered.len(),
        rendered.duration_secs(),
        path.display()
    );
    Ok(rendered.len())
}

/// Preview a single note offline, mostly useful for auditioning timbres
pub fn bounce_note(pitch: &str, octave: i32, seconds: f64, config: &AudioConfig) -> Result<AudioBuffer> {
    let mut engine = AudioEngine::new(config.clone());
    engine.initialize(Box::new(CaptureBackend::new()))?;
    engine.play_note(pitch, octave, NoteOptions::for_duration(seconds));
    let rendered = engine.render_until_idle(
        BOUNCE_BLOCK_SIZE,
        seconds + f64::from(config.envelope.release) + TAIL_SECS,
    )?;
    engine.shutdown();
    Ok(rendered)
}
