//! Synthetic hand builders
//!
//! Test support: produces anatomically plausible 21-landmark hands in known
//! poses so the classifier, debounce and session layers can be exercised
//! without a tracker. Public so integration tests and hosts can use it.

use super::classifier::Sign;
use super::landmark::{Finger, Hand, Handedness, Landmark, Vec3, LANDMARK_COUNT};

/// Wrist to finger base distance
const PALM_LENGTH: f32 = 0.09;

/// Spacing between adjacent finger bases
const KNUCKLE_SPACING: f32 = 0.02;

/// Proximal, middle and distal segment lengths of a reference finger
const SEGMENTS: [f32; 3] = [0.045, 0.03, 0.025];

/// Thumb metacarpal, proximal and distal segment lengths
const THUMB_SEGMENTS: [f32; 3] = [0.035, 0.03, 0.025];

/// Offset of each long finger from the middle of the knuckle line
const KNUCKLE_OFFSETS: [f32; 4] = [-1.5, -0.5, 0.5, 1.5];

/// Length scale of each long finger
const FINGER_SCALE: [f32; 4] = [0.95, 1.0, 0.9, 0.8];

/// Which way the palm faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palm {
    /// Palm plane parallel to the image plane
    Camera,
    /// Palm plane perpendicular to the image, facing the floor
    Down,
}

/// Pose of one long finger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerPose {
    Extended,
    Curled,
}

/// Pose of the thumb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbPose {
    /// Straight, pointing away from the palm
    Extended,
    /// Folded across the palm
    Curled,
    /// Straight and pointing down the frame
    PointingDown,
}

/// Builder for a synthetic hand
#[derive(Debug, Clone)]
pub struct HandBuilder {
    wrist: Vec3,
    direction_deg: f32,
    palm: Palm,
    fingers: [FingerPose; 4],
    thumb: ThumbPose,
    spread: f32,
    scale: f32,
    handedness: Handedness,
}

impl Default for HandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandBuilder {
    /// Upright right hand, fist, palm to camera, wrist low in the frame
    pub fn new() -> Self {
        Self {
            wrist: Vec3::new(0.5, 0.8, 0.0),
            direction_deg: 90.0,
            palm: Palm::Camera,
            fingers: [FingerPose::Curled; 4],
            thumb: ThumbPose::Curled,
            spread: 0.0,
            scale: 1.0,
            handedness: Handedness::Right,
        }
    }

    pub fn wrist(mut self, x: f32, y: f32) -> Self {
        self.wrist = Vec3::new(x, y, 0.0);
        self
    }

    /// Elevation of the hand axis in degrees (+90 fingers up)
    pub fn direction(mut self, degrees: f32) -> Self {
        self.direction_deg = degrees;
        self
    }

    pub fn palm(mut self, palm: Palm) -> Self {
        self.palm = palm;
        self
    }

    /// Set all four long fingers to one pose
    pub fn fingers(mut self, pose: FingerPose) -> Self {
        self.fingers = [pose; 4];
        self
    }

    /// Set one long finger. The thumb is set with [`HandBuilder::thumb`].
    pub fn finger(mut self, finger: Finger, pose: FingerPose) -> Self {
        if finger != Finger::Thumb {
            self.fingers[finger.index() - 1] = pose;
        }
        self
    }

    pub fn thumb(mut self, pose: ThumbPose) -> Self {
        self.thumb = pose;
        self
    }

    /// Fan the extended fingers apart (0 = parallel)
    pub fn spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    /// Scale the whole hand around the wrist
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    pub fn build(&self) -> Hand {
        let theta = self.direction_deg.to_radians();
        // Image y grows downward.
        let u = Vec3::new(theta.cos(), -theta.sin(), 0.0);
        let v = match self.palm {
            Palm::Camera => Vec3::new(theta.sin(), theta.cos(), 0.0),
            Palm::Down => Vec3::new(0.0, 0.0, 1.0),
        };
        let n = u.cross(v).normalized().unwrap_or(Vec3::new(0.0, 0.0, 1.0));
        let s = self.scale;
        let w = self.wrist;

        let mut landmarks: Vec<Landmark> = vec![w; LANDMARK_COUNT];

        // Thumb
        let cmc = w + u * (0.2 * PALM_LENGTH * s) - v * (0.45 * PALM_LENGTH * s);
        let t = (u * 0.6 - v * 0.8).normalized().unwrap_or(u);
        let [t1, t2, t3] = THUMB_SEGMENTS.map(|l| l * s);
        let thumb = match self.thumb {
            ThumbPose::Extended => straight(cmc, t, [t1, t2, t3]),
            ThumbPose::PointingDown => straight(cmc, Vec3::new(0.0, 1.0, 0.0), [t1, t2, t3]),
            ThumbPose::Curled => {
                let mcp = cmc + t * t1;
                let ip = mcp + v * t2;
                [cmc, mcp, ip, ip - t * t3]
            }
        };
        landmarks[1..5].copy_from_slice(&thumb);

        // Long fingers
        for (i, pose) in self.fingers.iter().enumerate() {
            let k = KNUCKLE_OFFSETS[i];
            let mcp = w + u * (PALM_LENGTH * s) + v * (k * KNUCKLE_SPACING * s);
            let lengths = SEGMENTS.map(|l| l * FINGER_SCALE[i] * s);
            let joints = match pose {
                FingerPose::Extended => {
                    let dir = (u + v * (self.spread * k)).normalized().unwrap_or(u);
                    straight(mcp, dir, lengths)
                }
                FingerPose::Curled => {
                    let pip = mcp + u * lengths[0];
                    let dip = pip + n * lengths[1];
                    [mcp, pip, dip, dip - u * lengths[2]]
                }
            };
            let base = 5 + 4 * i;
            landmarks[base..base + 4].copy_from_slice(&joints);
        }

        Hand::new(landmarks, self.handedness)
    }
}

fn straight(base: Vec3, dir: Vec3, lengths: [f32; 3]) -> [Vec3; 4] {
    let a = base + dir * lengths[0];
    let b = a + dir * lengths[1];
    [base, a, b, b + dir * lengths[2]]
}

/// Upright fist: every finger and the thumb curled
pub fn closed_fist(handedness: Handedness) -> Hand {
    HandBuilder::new().handedness(handedness).build()
}

/// Open upright hand, fingers fanned, palm to camera
pub fn flat_hand(handedness: Handedness) -> Hand {
    HandBuilder::new()
        .handedness(handedness)
        .fingers(FingerPose::Extended)
        .thumb(ThumbPose::Extended)
        .spread(0.25)
        .build()
}

/// Flat hand with its palm centre at `(x, y)`
pub fn flat_hand_at(handedness: Handedness, x: f32, y: f32) -> Hand {
    let hand = flat_hand(handedness);
    let centre = hand.palm_center();
    let offset = Vec3::new(x - centre.x, y - centre.y, 0.0);
    Hand::new(
        hand.landmarks.iter().map(|&p| p + offset).collect(),
        handedness,
    )
}

/// Builder preset for a sign, before handedness or placement is applied
pub fn sign_builder(sign: Sign) -> HandBuilder {
    let builder = HandBuilder::new();
    match sign {
        Sign::Do => builder.direction(0.0),
        Sign::Re => builder
            .direction(45.0)
            .fingers(FingerPose::Extended)
            .thumb(ThumbPose::Extended),
        Sign::Mi => builder
            .direction(0.0)
            .palm(Palm::Down)
            .fingers(FingerPose::Extended),
        Sign::Fa => builder.thumb(ThumbPose::PointingDown),
        Sign::Sol => builder
            .direction(0.0)
            .fingers(FingerPose::Extended)
            .thumb(ThumbPose::Extended),
        Sign::La => builder
            .direction(-45.0)
            .fingers(FingerPose::Extended)
            .thumb(ThumbPose::Extended),
        Sign::Ti => builder.finger(Finger::Index, FingerPose::Extended),
    }
}

/// Right hand making the given solfege sign
pub fn sign_hand(sign: Sign) -> Hand {
    sign_builder(sign).build()
}
