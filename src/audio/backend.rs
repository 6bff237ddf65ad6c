//! Audio output backends
//!
//! The engine renders blocks and pushes them to a backend. Real-time device
//! output lives in the host; the backends here discard, capture or write the
//! blocks to a WAV file.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hound::{SampleFormat, WavSpec, WavWriter};

use super::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{Result, SolfaError};

/// Sink for rendered audio
pub trait AudioBackend: Send {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Acquire the output. Failing here makes the engine unavailable.
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()>;

    /// Accept one rendered block
    fn write(&mut self, block: &AudioBuffer) -> Result<()>;

    /// Release the output
    fn close(&mut self) -> Result<()>;
}

/// Backend that discards audio
#[derive(Debug, Clone, Default)]
pub struct NullBackend {
    failure: Option<String>,
    frames_written: u64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `open` always fails, as a missing device would
    pub fn unavailable(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn open(&mut self, _sample_rate: u32, _channels: u16) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(SolfaError::AudioBackendUnavailable {
                backend: self.name().to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        self.frames_written += block.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared view of what a [`CaptureBackend`] has received
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    captured: Arc<Mutex<AudioBuffer>>,
}

impl CaptureHandle {
    /// Copy of everything captured so far
    pub fn buffer(&self) -> AudioBuffer {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of frames captured so far
    pub fn frames(&self) -> usize {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Backend that keeps every block in memory
#[derive(Debug, Clone)]
pub struct CaptureBackend {
    captured: Arc<Mutex<AudioBuffer>>,
}

impl CaptureBackend {
    pub fn new() -> Self {
        Self {
            captured: Arc::new(Mutex::new(AudioBuffer::new(0, ChannelLayout::Stereo, 0))),
        }
    }

    /// Handle that stays readable after the backend moves into an engine
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            captured: Arc::clone(&self.captured),
        }
    }
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CaptureBackend {
    fn name(&self) -> &str {
        "capture"
    }

    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let layout = ChannelLayout::from_count(channels as usize).ok_or_else(|| {
            SolfaError::AudioBackendUnavailable {
                backend: self.name().to_string(),
                reason: format!("unsupported channel count {}", channels),
            }
        })?;
        let mut captured = self
            .captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *captured = AudioBuffer::new(0, layout, sample_rate);
        Ok(())
    }

    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .append(block);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Backend that writes a 32-bit float WAV file
pub struct WavFileBackend {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl WavFileBackend {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioBackend for WavFileBackend {
    fn name(&self) -> &str {
        "wav"
    }

    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| SolfaError::FileWriteError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(&self.path, spec).map_err(|e| {
            SolfaError::AudioBackendUnavailable {
                backend: self.name().to_string(),
                reason: format!("cannot create {}: {}", self.path.display(), e),
            }
        })?;
        self.writer = Some(writer);
        Ok(())
    }

    fn write(&mut self, block: &AudioBuffer) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(SolfaError::AudioNotInitialized)?;
        for sample in block.to_interleaved() {
            writer.write_sample(sample)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

impl Drop for WavFileBackend {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                log::warn!("Failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}
