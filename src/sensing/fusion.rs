use serde::{Deserialize, Serialize};
use std::fmt;

use crate::perception::{FaceLandmarkSet, ObjectDetection};

/// Object-detector class that marks a phone in frame.
pub const PHONE_LABEL: &str = "cell phone";

/// Below this nose/eye distance ratio the head is turned far to one side.
pub const GAZE_RATIO_MIN: f32 = 0.25;
/// Above this ratio the head is turned far to the other side.
pub const GAZE_RATIO_MAX: f32 = 4.0;
const GAZE_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttentionStatus {
    #[default]
    Focused,
    Distracted,
}

impl AttentionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionStatus::Focused => "FOCUSED",
            AttentionStatus::Distracted => "DISTRACTED",
        }
    }
}

impl fmt::Display for AttentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistractionReason {
    #[serde(rename = "Phone Detected")]
    PhoneDetected,
    #[serde(rename = "User Absent")]
    UserAbsent,
    #[serde(rename = "Looking Away")]
    LookingAway,
}

impl DistractionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistractionReason::PhoneDetected => "Phone Detected",
            DistractionReason::UserAbsent => "User Absent",
            DistractionReason::LookingAway => "Looking Away",
        }
    }
}

impl fmt::Display for DistractionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FusionResult {
    pub status: AttentionStatus,
    pub reasons: Vec<DistractionReason>,
}

impl FusionResult {
    pub fn focused() -> Self {
        Self::default()
    }

    fn distract(&mut self, reason: DistractionReason) {
        self.status = AttentionStatus::Distracted;
        self.reasons.push(reason);
    }
}

/// Fuse one cycle of detections into a status.
///
/// Rules run in a fixed order and each later rule only fires while the
/// status is still focused, so a cycle never carries more than one reason.
pub fn fuse(objects: &[ObjectDetection], faces: &[FaceLandmarkSet]) -> FusionResult {
    let mut result = FusionResult::focused();

    if objects.iter().any(|detection| detection.label == PHONE_LABEL) {
        result.distract(DistractionReason::PhoneDetected);
    }

    match faces.first() {
        None => {
            if result.status == AttentionStatus::Focused {
                result.distract(DistractionReason::UserAbsent);
            }
        }
        Some(face) => {
            let looking_away = gaze_ratio(face)
                .map(|ratio| ratio < GAZE_RATIO_MIN || ratio > GAZE_RATIO_MAX)
                .unwrap_or(false);

            if looking_away && result.status == AttentionStatus::Focused {
                result.distract(DistractionReason::LookingAway);
            }
        }
    }

    result
}

/// Horizontal nose-to-left-eye distance over nose-to-right-eye distance.
/// `None` when the mesh lacks one of the three anchors.
pub fn gaze_ratio(face: &FaceLandmarkSet) -> Option<f32> {
    let (nose, left_eye, right_eye) = face.gaze_anchors()?;
    let dist_left = (nose.x - left_eye.x).abs();
    let dist_right = (nose.x - right_eye.x).abs();
    Some(dist_left / (dist_right + GAZE_EPSILON))
}
