//! Pitch name lookup
//!
//! Frequencies come from a fixed equal-tempered table for octave 4 and are
//! shifted by powers of two for other octaves.

use crate::error::{Result, SolfaError};

/// Octave the base table is written for
pub const BASE_OCTAVE: i32 = 4;

/// C4 through B4 in Hz
pub const OCTAVE_4_FREQUENCIES: [f64; 12] = [
    261.63, 277.18, 293.66, 311.13, 329.63, 349.23, 369.99, 392.00, 415.30, 440.00, 466.16,
    493.88,
];

/// Chromatic solfege syllables (movable do fixed on C) and their semitone
const SOLFEGE_NAMES: [(&str, u8); 17] = [
    ("do", 0),
    ("di", 1),
    ("ra", 1),
    ("re", 2),
    ("ri", 3),
    ("me", 3),
    ("mi", 4),
    ("fa", 5),
    ("fi", 6),
    ("se", 6),
    ("sol", 7),
    ("si", 8),
    ("le", 8),
    ("la", 9),
    ("li", 10),
    ("te", 10),
    ("ti", 11),
];

/// Letter names with sharps and flats, lowercased
const CHROMATIC_NAMES: [(&str, u8); 17] = [
    ("c", 0),
    ("c#", 1),
    ("db", 1),
    ("d", 2),
    ("d#", 3),
    ("eb", 3),
    ("e", 4),
    ("f", 5),
    ("f#", 6),
    ("gb", 6),
    ("g", 7),
    ("g#", 8),
    ("ab", 8),
    ("a", 9),
    ("a#", 10),
    ("bb", 10),
    ("b", 11),
];

/// Semitone above C for a solfege or letter name, case-insensitive
pub fn semitone_of(name: &str) -> Option<u8> {
    let name = name.trim().to_lowercase();
    SOLFEGE_NAMES
        .iter()
        .chain(CHROMATIC_NAMES.iter())
        .find(|(n, _)| *n == name)
        .map(|&(_, semitone)| semitone)
}

/// Frequency of a semitone (0 = C) in the given octave
pub fn semitone_frequency(semitone: u8, octave: i32) -> f64 {
    let base = OCTAVE_4_FREQUENCIES[usize::from(semitone % 12)];
    base * 2.0_f64.powi(octave - BASE_OCTAVE)
}

/// Frequency of a named pitch in the given octave
pub fn frequency(name: &str, octave: i32) -> Result<f64> {
    semitone_of(name)
        .map(|semitone| semitone_frequency(semitone, octave))
        .ok_or_else(|| SolfaError::UnknownPitchName {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case("do", 261.63)]
    #[test_case("SOL", 392.00)]
    #[test_case("la", 440.00)]
    #[test_case("ti", 493.88)]
    #[test_case("C#", 277.18)]
    #[test_case("db", 277.18)]
    #[test_case("Bb", 466.16)]
    #[test_case("te", 466.16)]
    #[test_case("fi", 369.99)]
    fn test_octave_4_lookup(name: &str, expected: f64) {
        assert_relative_eq!(frequency(name, 4).unwrap(), expected);
    }

    #[test]
    fn test_octave_doubles_frequency() {
        for name in ["do", "re", "mi", "fa", "sol", "la", "ti", "C#", "Eb"] {
            for octave in 0..8 {
                let low = frequency(name, octave).unwrap();
                let high = frequency(name, octave + 1).unwrap();
                assert_eq!(high, 2.0 * low, "{} octave {}", name, octave);
            }
        }
    }

    #[test]
    fn test_lower_octaves() {
        assert_relative_eq!(frequency("la", 3).unwrap(), 220.0);
        assert_relative_eq!(frequency("la", 5).unwrap(), 880.0);
    }

    #[test]
    fn test_unknown_pitch() {
        let err = frequency("xyz", 4).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PITCH_NAME");
        assert!(semitone_of("h").is_none());
    }
}
