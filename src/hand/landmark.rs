//! Hand landmark types
//!
//! Landmarks follow the 21-point MediaPipe hand topology. Coordinates are
//! normalized to the camera frame: x grows to the right, y grows downward,
//! z is relative depth. Frames are delivered already mirrored by the caller.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of landmarks in one hand
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// Fingertip indices, thumb first
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Plain 3D vector used for landmark geometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len > f32::EPSILON {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    /// Angle between two vectors in degrees (0-180)
    pub fn angle_deg(self, other: Vec3) -> f32 {
        let denom = self.length() * other.length();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Elevation above the image horizontal in degrees.
    ///
    /// +90 points straight up the frame, -90 straight down. Image y grows
    /// downward, hence the sign flip.
    pub fn vertical_angle_deg(self) -> f32 {
        (-self.y).atan2(self.x.hypot(self.z)).to_degrees()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// One tracked point of a hand
pub type Landmark = Vec3;

/// Which hand the tracker reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

/// Finger identifiers, in landmark order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// The four non-thumb fingers
    pub const LONG: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// Landmark indices from base joint to tip
    pub fn joints(self) -> [usize; 4] {
        let base = 1 + 4 * self.index();
        [base, base + 1, base + 2, base + 3]
    }

    /// Position of this finger in [`Finger::ALL`]
    pub fn index(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Pinky => 4,
        }
    }
}

/// Why a hand could not be classified
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputError {
    #[error("no hand present")]
    MissingHand,

    #[error("expected {expected} landmarks, found {found}")]
    WrongLandmarkCount { expected: usize, found: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

/// One detected hand in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>, handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }

    /// Check the landmark shape before any geometry is derived from it
    pub fn validate(&self) -> std::result::Result<(), InputError> {
        if self.landmarks.len() != LANDMARK_COUNT {
            return Err(InputError::WrongLandmarkCount {
                expected: LANDMARK_COUNT,
                found: self.landmarks.len(),
            });
        }
        if let Some(index) = self
            .landmarks
            .iter()
            .position(|l| !(l.x.is_finite() && l.y.is_finite() && l.z.is_finite()))
        {
            return Err(InputError::NonFiniteCoordinate { index });
        }
        Ok(())
    }

    /// Landmark by index. Callers must have validated the hand.
    #[inline]
    pub fn point(&self, index: usize) -> Vec3 {
        self.landmarks[index]
    }

    /// Mean of the wrist and the four finger base joints
    pub fn palm_center(&self) -> Vec3 {
        let ids = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
        let sum = ids
            .iter()
            .fold(Vec3::ZERO, |acc, &i| acc + self.point(i));
        sum * (1.0 / ids.len() as f32)
    }
}

/// Everything the hand tracker delivered for one video frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time in milliseconds on the host's monotonic clock
    pub timestamp_ms: u64,
    pub hands: Vec<Hand>,
}

impl Frame {
    pub fn new(timestamp_ms: u64, hands: Vec<Hand>) -> Self {
        Self {
            timestamp_ms,
            hands,
        }
    }

    /// First hand with the given handedness
    pub fn hand(&self, handedness: Handedness) -> Option<&Hand> {
        self.hands.iter().find(|h| h.handedness == handedness)
    }
}
