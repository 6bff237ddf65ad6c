//! Effects library
//!
//! All effects implement [`Effect`] and live in an [`EffectChain`] owned by
//! the audio engine.

mod chain;
mod chorus;
mod delay;
mod distortion;
mod effect;
mod filter;
mod reverb;

pub use chain::{EffectChain, MASTER, NOTE_BUS};
pub use chorus::Chorus;
pub use delay::Delay;
pub use distortion::{Distortion, DistortionCurve};
pub use effect::{Effect, EffectParams};
pub use filter::{Filter, FilterType};
pub use reverb::Reverb;

use crate::error::{Result, SolfaError};

/// Effect type names accepted by [`create_effect`]
pub const EFFECT_TYPES: [&str; 5] = ["reverb", "delay", "chorus", "distortion", "filter"];

/// Build an effect with default parameters from its type name
pub fn create_effect(effect_type: &str) -> Result<Box<dyn Effect>> {
    let effect: Box<dyn Effect> = match effect_type.to_lowercase().as_str() {
        "reverb" => Box::new(Reverb::new()),
        "delay" => Box::new(Delay::default()),
        "chorus" => Box::new(Chorus::new()),
        "distortion" => Box::new(Distortion::default()),
        "filter" => Box::new(Filter::default()),
        other => {
            return Err(SolfaError::InvalidParameter {
                name: "effect_type".to_string(),
                reason: format!("unknown effect type '{}'", other),
            })
        }
    };
    Ok(effect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_every_type() {
        for name in EFFECT_TYPES {
            let effect = create_effect(name).unwrap();
            assert_eq!(effect.effect_type(), name);
            assert!(effect.is_enabled());
            assert!(!effect.id().is_empty());
        }
    }

    #[test]
    fn test_unknown_type() {
        assert!(create_effect("flanger").is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = create_effect("delay").unwrap();
        let b = create_effect("delay").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
