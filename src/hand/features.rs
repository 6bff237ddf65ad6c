//! Geometric features of a single hand
//!
//! Pure functions only. Features are recomputed every frame and never stored.

use serde::{Deserialize, Serialize};

use super::landmark::{
    Finger, Hand, InputError, Vec3, FINGERTIPS, INDEX_MCP, MIDDLE_MCP, MIDDLE_TIP, PINKY_MCP,
    THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
};

/// Weight of the base-to-tip ratio in the thumb extension score
const THUMB_RATIO_WEIGHT: f32 = 0.6;

/// Weight of the IP-joint straightness in the thumb extension score
const THUMB_ANGLE_WEIGHT: f32 = 0.4;

/// Axis-aligned bounds of the landmarks in the image plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Everything the classifier looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Extension ratio per finger, thumb first (~1.0 straight, lower when curled)
    pub extension: [f32; 5],
    /// Unit vector from wrist to middle fingertip
    pub direction: Vec3,
    /// Elevation of `direction` in degrees (+90 fingers up, -90 fingers down)
    pub direction_angle_deg: f32,
    /// Unit normal of the palm plane
    pub palm_normal: Vec3,
    /// How squarely the palm plane faces the camera (0-1)
    pub facing_score: f32,
    /// Angle between the palm normal and the camera axis in degrees (0-90)
    pub tilt_deg: f32,
    /// Elevation of the thumb (MCP to tip) in degrees
    pub thumb_angle_deg: f32,
    /// Mean spacing of adjacent fingertips, in palm lengths
    pub spread: f32,
    pub bounds: BoundingBox,
}

impl FeatureSet {
    /// Extension ratio for one finger
    #[inline]
    pub fn extension(&self, finger: Finger) -> f32 {
        self.extension[finger.index()]
    }

    /// Mean extension of all five fingers
    pub fn mean_extension(&self) -> f32 {
        self.extension.iter().sum::<f32>() / self.extension.len() as f32
    }
}

/// Straight-line base-to-tip distance over the summed joint segments
pub fn extension_ratio(hand: &Hand, finger: Finger) -> f32 {
    let [a, b, c, d] = finger.joints().map(|i| hand.point(i));
    let path = (b - a).length() + (c - b).length() + (d - c).length();
    if path <= f32::EPSILON {
        return 0.0;
    }
    ((d - a).length() / path).clamp(0.0, 1.0)
}

/// Thumb extension: the base-to-tip ratio blended with how straight the IP
/// joint is, since the thumb folds across the palm rather than into it.
pub fn thumb_extension(hand: &Hand) -> f32 {
    let ratio = extension_ratio(hand, Finger::Thumb);
    let ip = hand.point(THUMB_IP);
    let joint_angle = (hand.point(THUMB_MCP) - ip).angle_deg(hand.point(THUMB_TIP) - ip);
    THUMB_RATIO_WEIGHT * ratio + THUMB_ANGLE_WEIGHT * (joint_angle / 180.0)
}

/// Unit normal of the plane spanned by wrist→index base and wrist→pinky base
pub fn palm_normal(hand: &Hand) -> Option<Vec3> {
    let wrist = hand.point(WRIST);
    let to_index = hand.point(INDEX_MCP) - wrist;
    let to_pinky = hand.point(PINKY_MCP) - wrist;
    to_index.cross(to_pinky).normalized()
}

fn bounding_box(hand: &Hand) -> BoundingBox {
    let mut bounds = BoundingBox {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };
    for p in &hand.landmarks {
        bounds.min_x = bounds.min_x.min(p.x);
        bounds.min_y = bounds.min_y.min(p.y);
        bounds.max_x = bounds.max_x.max(p.x);
        bounds.max_y = bounds.max_y.max(p.y);
    }
    bounds
}

fn finger_spread(hand: &Hand) -> f32 {
    let palm_length = (hand.point(MIDDLE_MCP) - hand.point(WRIST)).length();
    if palm_length <= f32::EPSILON {
        return 0.0;
    }
    let gaps: f32 = FINGERTIPS
        .windows(2)
        .map(|pair| (hand.point(pair[1]) - hand.point(pair[0])).length())
        .sum();
    gaps / (FINGERTIPS.len() - 1) as f32 / palm_length
}

/// Derive the full feature set for one hand
pub fn extract(hand: &Hand) -> std::result::Result<FeatureSet, InputError> {
    hand.validate()?;

    let mut extension = [0.0; 5];
    for finger in Finger::ALL {
        extension[finger.index()] = match finger {
            Finger::Thumb => thumb_extension(hand),
            _ => extension_ratio(hand, finger),
        };
    }

    let direction = (hand.point(MIDDLE_TIP) - hand.point(WRIST))
        .normalized()
        .unwrap_or(Vec3::new(0.0, -1.0, 0.0));

    // A degenerate palm (all base joints collinear) faces nowhere.
    let (palm_normal, facing_score) = match palm_normal(hand) {
        Some(n) => (n, n.z.abs()),
        None => (Vec3::ZERO, 0.0),
    };
    let tilt_deg = facing_score.clamp(0.0, 1.0).acos().to_degrees();

    let thumb_angle_deg = (hand.point(THUMB_TIP) - hand.point(THUMB_MCP)).vertical_angle_deg();

    Ok(FeatureSet {
        extension,
        direction_angle_deg: direction.vertical_angle_deg(),
        direction,
        palm_normal,
        facing_score,
        tilt_deg,
        thumb_angle_deg,
        spread: finger_spread(hand),
        bounds: bounding_box(hand),
    })
}
