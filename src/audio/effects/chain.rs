//! Effects chain
//!
//! Effects run in chain order between the note bus and the master gain.
//! The routing (`note_bus -> e1 -> e2 -> ... -> master`) is recomputed on
//! every structural change.

use log::debug;
use serde_json::Value;

use super::effect::Effect;
use crate::audio::AudioBuffer;
use crate::error::{Result, SolfaError};

/// Routing endpoint before the first effect
pub const NOTE_BUS: &str = "note_bus";
/// Routing endpoint after the last effect
pub const MASTER: &str = "master";

/// Ordered chain of effects
#[derive(Clone)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    routing: Vec<String>,
    sample_rate: u32,
    max_block_size: usize,
}

impl EffectChain {
    pub fn new(sample_rate: u32, max_block_size: usize) -> Self {
        let mut chain = Self {
            effects: Vec::new(),
            routing: Vec::new(),
            sample_rate,
            max_block_size,
        };
        chain.rewire();
        chain
    }

    /// Prepare all effects for a new sample rate or block size
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        for effect in &mut self.effects {
            effect.prepare(sample_rate, max_block_size);
        }
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    /// Append an effect; returns its id
    pub fn add(&mut self, effect: Box<dyn Effect>) -> String {
        let index = self.effects.len();
        self.add_at(effect, index)
    }

    /// Insert an effect at `index` (clamped to the chain length)
    pub fn add_at(&mut self, mut effect: Box<dyn Effect>, index: usize) -> String {
        effect.prepare(self.sample_rate, self.max_block_size);
        let id = effect.id().to_string();
        let index = index.min(self.effects.len());
        self.effects.insert(index, effect);
        self.rewire();
        id
    }

    /// Remove an effect by id
    pub fn remove(&mut self, effect_id: &str) -> Result<Box<dyn Effect>> {
        let index = self.position(effect_id)?;
        let effect = self.effects.remove(index);
        self.rewire();
        Ok(effect)
    }

    /// Move an effect to a new position
    pub fn move_effect(&mut self, effect_id: &str, new_index: usize) -> Result<()> {
        let current_index = self.position(effect_id)?;
        let effect = self.effects.remove(current_index);
        let new_index = new_index.min(self.effects.len());
        self.effects.insert(new_index, effect);
        self.rewire();
        Ok(())
    }

    /// Remove every effect
    pub fn clear(&mut self) {
        self.effects.clear();
        self.rewire();
    }

    pub fn get(&self, effect_id: &str) -> Option<&dyn Effect> {
        self.effects
            .iter()
            .find(|e| e.id() == effect_id)
            .map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, effect_id: &str) -> Option<&mut (dyn Effect + 'static)> {
        for effect in &mut self.effects {
            if effect.id() == effect_id {
                return Some(effect.as_mut());
            }
        }
        None
    }

    /// Set one parameter on one effect
    pub fn set_param(&mut self, effect_id: &str, name: &str, value: &Value) -> Result<()> {
        self.get_mut(effect_id)
            .ok_or_else(|| SolfaError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?
            .set_param(name, value)
    }

    /// Run the block through every effect in order
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        for effect in &mut self.effects {
            effect.process(buffer);
        }
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    /// Effect ids in chain order
    pub fn ids(&self) -> Vec<String> {
        self.effects.iter().map(|e| e.id().to_string()).collect()
    }

    /// Current signal path, endpoints included
    pub fn routing(&self) -> &[String] {
        &self.routing
    }

    /// Serialize chain state to JSON
    pub fn to_json(&self) -> Result<Value> {
        let effects: Result<Vec<Value>> = self.effects.iter().map(|e| e.to_json()).collect();
        Ok(serde_json::json!({
            "effects": effects?,
            "routing": self.routing,
        }))
    }

    fn position(&self, effect_id: &str) -> Result<usize> {
        self.effects
            .iter()
            .position(|e| e.id() == effect_id)
            .ok_or_else(|| SolfaError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })
    }

    fn rewire(&mut self) {
        self.routing = std::iter::once(NOTE_BUS.to_string())
            .chain(self.effects.iter().map(|e| e.id().to_string()))
            .chain(std::iter::once(MASTER.to_string()))
            .collect();
        debug!("Effects chain rewired: {}", self.routing.join(" -> "));
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new(48000, 512)
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("routing", &self.routing)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
