//! Contract between the core and the perception models / camera plumbing.
//!
//! The object detector and the face-landmark estimator are external; the core
//! only needs the two async calls on [`PerceptionAdapter`] and a frame source
//! implementing [`MediaSource`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Face-mesh index of the nose tip.
pub const NOSE_TIP: usize = 1;
/// Face-mesh index of the left eye's outer corner.
pub const LEFT_EYE_OUTER: usize = 33;
/// Face-mesh index of the right eye's outer corner.
pub const RIGHT_EYE_OUTER: usize = 263;

/// A video frame handed to the perception models.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    image: Arc<RgbImage>,
    captured_at: Instant,
}

impl DetectionFrame {
    pub fn new(image: Arc<RgbImage>, captured_at: Instant) -> Self {
        Self { image, captured_at }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// A camera that has not negotiated its stream yet reports 0x0 frames.
    pub fn is_ready(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl ObjectDetection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

/// Landmarks of one face, indexed by face-mesh position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarkSet {
    pub keypoints: Vec<Keypoint>,
}

impl FaceLandmarkSet {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn point(&self, index: usize) -> Option<Keypoint> {
        self.keypoints.get(index).copied()
    }

    /// Nose tip, left eye outer corner and right eye outer corner, if all present.
    pub fn gaze_anchors(&self) -> Option<(Keypoint, Keypoint, Keypoint)> {
        Some((
            self.point(NOSE_TIP)?,
            self.point(LEFT_EYE_OUTER)?,
            self.point(RIGHT_EYE_OUTER)?,
        ))
    }

    /// Builds a full-size mesh (face-mesh topology, 468 points) with only the
    /// gaze anchors placed; every other point sits at the nose tip.
    pub fn from_anchors(nose: Keypoint, left_eye: Keypoint, right_eye: Keypoint) -> Self {
        let mut keypoints = vec![nose; 468];
        keypoints[LEFT_EYE_OUTER] = left_eye;
        keypoints[RIGHT_EYE_OUTER] = right_eye;
        Self { keypoints }
    }
}

#[async_trait]
pub trait PerceptionAdapter: Send + Sync {
    /// False while the models are still loading; the scheduler waits for it.
    fn is_loaded(&self) -> bool {
        true
    }

    async fn detect_objects(&self, frame: &DetectionFrame) -> Result<Vec<ObjectDetection>>;

    /// Zero or one face.
    async fn estimate_faces(&self, frame: &DetectionFrame) -> Result<Vec<FaceLandmarkSet>>;
}

pub trait MediaSource: Send + Sync {
    /// Latest frame, if the capture device produced one.
    fn current_frame(&self) -> Option<DetectionFrame>;

    fn is_ready(&self) -> bool {
        self.current_frame()
            .map(|frame| frame.is_ready())
            .unwrap_or(false)
    }
}
