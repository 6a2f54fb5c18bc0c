//! Canonical motion record types.
//!
//! Every schema variant is decoded into these types. Fields a device did not
//! report stay `None`; they are never filled with zeros.

use crate::ingest::motion::Column;
use serde::{Deserialize, Serialize};

/// A three-component vector (position, Euler rotation, or velocity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One timestamped 6-DoF telemetry sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Seconds on the recording's own clock
    pub timestamp: f64,
    /// Recording label, used as ground truth for the gesture path
    pub session_id: Option<String>,
    pub head_position: Option<Vec3>,
    pub head_rotation: Option<Vec3>,
    pub left_hand_position: Option<Vec3>,
    pub left_hand_rotation: Option<Vec3>,
    pub right_hand_position: Option<Vec3>,
    pub right_hand_rotation: Option<Vec3>,
    pub left_wrist_position: Option<Vec3>,
    pub right_wrist_position: Option<Vec3>,
    pub linear_velocity: Option<Vec3>,
    pub angular_velocity: Option<Vec3>,
    /// Present axes of vectors that were reported incomplete; the vector
    /// field itself stays `None`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial: Vec<(Column, f64)>,
}

impl MotionSample {
    /// Create an otherwise empty sample at the given time.
    pub fn at(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Position of a tracked point, if this sample reported it.
    pub fn position_of(&self, point: TrackedPoint) -> Option<Vec3> {
        match point {
            TrackedPoint::Head => self.head_position,
            TrackedPoint::LeftHand => self.left_hand_position,
            TrackedPoint::RightHand => self.right_hand_position,
            TrackedPoint::LeftWrist => self.left_wrist_position,
            TrackedPoint::RightWrist => self.right_wrist_position,
        }
    }
}

/// A body point whose position trace can be analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedPoint {
    Head,
    LeftHand,
    RightHand,
    LeftWrist,
    RightWrist,
}

impl std::str::FromStr for TrackedPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "head" => Ok(Self::Head),
            "left_hand" => Ok(Self::LeftHand),
            "right_hand" => Ok(Self::RightHand),
            "left_wrist" => Ok(Self::LeftWrist),
            "right_wrist" => Ok(Self::RightWrist),
            other => Err(format!("unknown tracked point: {other}")),
        }
    }
}
