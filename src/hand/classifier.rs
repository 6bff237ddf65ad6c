//! Solfege sign and flat-hand classification
//!
//! Every sign predicate is evaluated on every frame. When several match, the
//! one with the highest fixed confidence wins; the confidences are distinct so
//! there is never a tie.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::features::{self, FeatureSet};
use super::landmark::{Finger, Hand, InputError};
use crate::config::ClassifierConfig;
use crate::error::SolfaError;

/// Curwen hand signs for the seven diatonic degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Do,
    Re,
    Mi,
    Fa,
    Sol,
    La,
    Ti,
}

impl Sign {
    pub const ALL: [Sign; 7] = [
        Sign::Do,
        Sign::Re,
        Sign::Mi,
        Sign::Fa,
        Sign::Sol,
        Sign::La,
        Sign::Ti,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sign::Do => "do",
            Sign::Re => "re",
            Sign::Mi => "mi",
            Sign::Fa => "fa",
            Sign::Sol => "sol",
            Sign::La => "la",
            Sign::Ti => "ti",
        }
    }

    /// Semitones above do in a major scale
    pub fn semitone(&self) -> i32 {
        match self {
            Sign::Do => 0,
            Sign::Re => 2,
            Sign::Mi => 4,
            Sign::Fa => 5,
            Sign::Sol => 7,
            Sign::La => 9,
            Sign::Ti => 11,
        }
    }

    /// Confidence reported when this sign's predicate holds
    pub fn confidence(&self) -> f32 {
        match self {
            Sign::Do => 0.90,
            Sign::Re => 0.88,
            Sign::Mi => 0.89,
            Sign::Fa => 0.87,
            Sign::Sol => 0.91,
            Sign::La => 0.86,
            Sign::Ti => 0.92,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sign {
    type Err = SolfaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Sign::ALL
            .into_iter()
            .find(|sign| sign.as_str() == lower)
            .ok_or(SolfaError::UnknownPitchName {
                name: s.to_string(),
            })
    }
}

/// Result of sign classification for one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignClassification {
    pub sign: Option<Sign>,
    pub confidence: f32,
    pub features: Option<FeatureSet>,
    /// Score of every sign in [`Sign::ALL`] order (0 when its predicate fails)
    pub scores: [f32; 7],
    pub error: Option<InputError>,
}

impl SignClassification {
    fn rejected(error: InputError) -> Self {
        Self {
            sign: None,
            confidence: 0.0,
            features: None,
            scores: [0.0; 7],
            error: Some(error),
        }
    }

    /// Score for one sign
    pub fn score(&self, sign: Sign) -> f32 {
        self.scores[sign as usize]
    }
}

/// Result of flat-hand classification for one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatHandClassification {
    pub is_flat_hand: bool,
    pub confidence: f32,
    /// Short human-readable reason
    pub summary: String,
    pub error: Option<InputError>,
}

impl FlatHandClassification {
    fn rejected(error: InputError) -> Self {
        Self {
            is_flat_hand: false,
            confidence: 0.0,
            summary: error.to_string(),
            error: Some(error),
        }
    }
}

/// Both classifications of one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandClassification {
    pub sign: SignClassification,
    pub flat_hand: FlatHandClassification,
}

/// Stateless classifier parameterized by thresholds
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one hand, or its absence
    pub fn classify(&self, hand: Option<&Hand>) -> HandClassification {
        let features = match hand
            .ok_or(InputError::MissingHand)
            .and_then(features::extract)
        {
            Ok(features) => features,
            Err(error) => {
                return HandClassification {
                    sign: SignClassification::rejected(error.clone()),
                    flat_hand: FlatHandClassification::rejected(error),
                }
            }
        };

        let sign = self.classify_sign(features);
        let flat_hand = self.classify_flat(&sign);
        HandClassification { sign, flat_hand }
    }

    fn curled(&self, f: &FeatureSet, finger: Finger) -> bool {
        f.extension(finger) < self.config.curled_max
    }

    fn extended(&self, f: &FeatureSet, finger: Finger) -> bool {
        f.extension(finger) > self.config.extended_min
    }

    /// Whether the predicate for `sign` holds
    pub fn matches(&self, sign: Sign, f: &FeatureSet) -> bool {
        let all_curled = Finger::LONG.iter().all(|&g| self.curled(f, g));
        let all_extended = Finger::LONG.iter().all(|&g| self.extended(f, g));
        let thumb_extended = f.extension(Finger::Thumb) > self.config.thumb_extended_min;
        let dir = f.direction_angle_deg;

        match sign {
            Sign::Do => all_curled && !thumb_extended && dir.abs() <= 35.0,
            Sign::Re => all_extended && (20.0..=65.0).contains(&dir),
            Sign::Mi => all_extended && dir.abs() < 20.0 && f.tilt_deg >= 50.0,
            Sign::Fa => all_curled && thumb_extended && f.thumb_angle_deg <= -45.0,
            Sign::Sol => all_extended && dir.abs() < 20.0 && f.tilt_deg < 50.0,
            Sign::La => {
                Finger::LONG.iter().all(|&g| !self.curled(f, g)) && (-75.0..=-20.0).contains(&dir)
            }
            Sign::Ti => {
                self.extended(f, Finger::Index)
                    && [Finger::Middle, Finger::Ring, Finger::Pinky]
                        .iter()
                        .all(|&g| self.curled(f, g))
                    && dir >= 45.0
            }
        }
    }

    fn classify_sign(&self, features: FeatureSet) -> SignClassification {
        let mut scores = [0.0; 7];
        let mut best: Option<Sign> = None;
        for sign in Sign::ALL {
            if self.matches(sign, &features) {
                scores[sign as usize] = sign.confidence();
                if best.map_or(true, |b| sign.confidence() > b.confidence()) {
                    best = Some(sign);
                }
            }
        }

        SignClassification {
            sign: best,
            confidence: best.map_or(0.0, |s| s.confidence()),
            features: Some(features),
            scores,
            error: None,
        }
    }

    fn classify_flat(&self, sign: &SignClassification) -> FlatHandClassification {
        let Some(f) = sign.features.as_ref() else {
            return FlatHandClassification::rejected(InputError::MissingHand);
        };
        let c = &self.config;

        let fingers_ok = f.extension.iter().all(|&e| e >= c.flat_extension_min);
        let facing_ok = f.facing_score >= c.flat_facing_min && f.tilt_deg <= c.flat_tilt_max_deg;
        let spread_ok = f.spread >= c.flat_spread_min;
        let size_ok = f.bounds.area() >= c.flat_area_min;
        let unambiguous = sign.sign.is_none();

        let fingers = f.mean_extension().clamp(0.0, 1.0);
        let facing = f.facing_score.clamp(0.0, 1.0);
        let spread = (f.spread / (2.0 * c.flat_spread_min)).clamp(0.0, 1.0);
        let size = (f.bounds.area() / (4.0 * c.flat_area_min)).clamp(0.0, 1.0);
        let clarity = 1.0 - sign.confidence;
        let confidence =
            0.40 * fingers + 0.25 * facing + 0.20 * spread + 0.10 * size + 0.05 * clarity;

        let summary = if !fingers_ok {
            "fingers not fully extended"
        } else if !facing_ok {
            "palm not facing the camera"
        } else if !spread_ok {
            "fingers not spread"
        } else if !size_ok {
            "hand too small"
        } else if !unambiguous {
            "matches a solfege sign"
        } else {
            "flat hand"
        };

        FlatHandClassification {
            is_flat_hand: fingers_ok && facing_ok && spread_ok && size_ok && unambiguous,
            confidence,
            summary: summary.to_string(),
            error: None,
        }
    }
}

/// Classify one hand with default thresholds
pub fn classify(hand: &Hand) -> HandClassification {
    Classifier::default().classify(Some(hand))
}
