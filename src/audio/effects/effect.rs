//! Effect trait definition
//!
//! Every effect in the chain processes stereo blocks in place and exposes its
//! parameters as JSON so hosts can drive them by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::AudioBuffer;
use crate::error::{Result, SolfaError};

/// Parameters common to all effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectParams {
    /// Unique identifier for this effect instance
    pub id: String,
    /// Whether the effect is enabled
    pub enabled: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: true,
        }
    }
}

/// Base trait for all effects
pub trait Effect: Send + Sync {
    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Called when the sample rate or block size changes
    fn prepare(&mut self, sample_rate: u32, max_block_size: usize);

    /// Clear internal state (filter history, delay lines)
    fn reset(&mut self);

    /// Effect type identifier
    fn effect_type(&self) -> &'static str;

    fn display_name(&self) -> &str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Serialize effect parameters to JSON
    fn to_json(&self) -> Result<Value>;

    /// All parameters as JSON
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Clone the effect into a boxed trait object
    fn box_clone(&self) -> Box<dyn Effect>;

    /// Apply every key of a JSON object through `set_param`
    fn set_params(&mut self, params: &Value) -> Result<()> {
        match params {
            Value::Null => Ok(()),
            Value::Object(map) => {
                for (name, value) in map {
                    self.set_param(name, value)?;
                }
                Ok(())
            }
            other => Err(SolfaError::InvalidParameter {
                name: self.effect_type().to_string(),
                reason: format!("expected an object of parameters, got {}", other),
            }),
        }
    }
}

impl Clone for Box<dyn Effect> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Read a numeric parameter value
pub(crate) fn param_f32(name: &str, value: &Value) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .ok_or_else(|| SolfaError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a number, got {}", value),
        })
}

/// Error for a parameter name the effect does not have
pub(crate) fn unknown_param(effect_type: &str, name: &str) -> SolfaError {
    SolfaError::InvalidParameter {
        name: name.to_string(),
        reason: format!("{} has no such parameter", effect_type),
    }
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($type:ty, $effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn id(&self) -> &str {
            &self.params.id
        }

        fn set_id(&mut self, id: String) {
            self.params.id = id;
        }

        fn is_enabled(&self) -> bool {
            self.params.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.params.enabled = enabled;
        }

        fn to_json(&self) -> $crate::error::Result<serde_json::Value> {
            Ok(serde_json::json!({
                "effect_type": $effect_type,
                "params": self.get_params(),
            }))
        }

        fn box_clone(&self) -> Box<dyn Effect> {
            Box::new(self.clone())
        }
    };
}
