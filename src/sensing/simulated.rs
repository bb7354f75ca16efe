//! Stand-in perception for running the monitor without camera or models.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

use crate::perception::{
    BoundingBox, DetectionFrame, FaceLandmarkSet, Keypoint, MediaSource, ObjectDetection,
    PerceptionAdapter,
};

use super::fusion::PHONE_LABEL;

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 360;
/// Chance per cycle that the simulated user changes behaviour.
const SWITCH_PROBABILITY: f64 = 0.04;
/// Chance per cycle of an inference error.
const GLITCH_PROBABILITY: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedBehavior {
    Attentive,
    OnPhone,
    LookingAway,
    Absent,
}

struct SimState {
    rng: StdRng,
    behavior: SimulatedBehavior,
}

/// Random-walk user: mostly attentive, occasionally on the phone, turned
/// away or gone. Inference "loads" after a short delay.
pub struct SimulatedPerception {
    state: Mutex<SimState>,
    ready_at: Instant,
    inference_latency: Duration,
}

impl SimulatedPerception {
    pub fn new(load_delay: Duration, inference_latency: Duration) -> Self {
        Self::with_rng(StdRng::from_entropy(), load_delay, inference_latency)
    }

    pub fn with_rng(rng: StdRng, load_delay: Duration, inference_latency: Duration) -> Self {
        Self {
            state: Mutex::new(SimState {
                rng,
                behavior: SimulatedBehavior::Attentive,
            }),
            ready_at: Instant::now() + load_delay,
            inference_latency,
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("simulated perception state poisoned"))
    }
}

fn next_behavior(rng: &mut StdRng) -> SimulatedBehavior {
    match rng.gen_range(0..10) {
        0..=5 => SimulatedBehavior::Attentive,
        6 | 7 => SimulatedBehavior::OnPhone,
        8 => SimulatedBehavior::LookingAway,
        _ => SimulatedBehavior::Absent,
    }
}

/// A face centred at `centre_x` whose left eye sits `ratio` times as far from
/// the nose as the right one.
fn frontal_face(rng: &mut StdRng, centre_x: f32, ratio: f32) -> FaceLandmarkSet {
    let jitter: f32 = rng.gen_range(-2.0..2.0);
    let nose = Keypoint {
        x: centre_x + jitter,
        y: 200.0,
    };
    let right_eye = Keypoint {
        x: nose.x + 40.0,
        y: 160.0,
    };
    let left_eye = Keypoint {
        x: nose.x - 40.0 * ratio,
        y: 160.0,
    };
    FaceLandmarkSet::from_anchors(nose, left_eye, right_eye)
}

#[async_trait]
impl PerceptionAdapter for SimulatedPerception {
    fn is_loaded(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    async fn detect_objects(&self, _frame: &DetectionFrame) -> Result<Vec<ObjectDetection>> {
        tokio::time::sleep(self.inference_latency).await;

        let mut state = self.lock_state()?;
        if state.rng.gen_bool(GLITCH_PROBABILITY) {
            return Err(anyhow!("simulated inference glitch"));
        }
        if state.rng.gen_bool(SWITCH_PROBABILITY) {
            state.behavior = next_behavior(&mut state.rng);
        }

        if state.behavior == SimulatedBehavior::OnPhone {
            let confidence = state.rng.gen_range(0.55..0.95);
            Ok(vec![ObjectDetection::new(
                PHONE_LABEL,
                confidence,
                BoundingBox {
                    x: 420.0,
                    y: 220.0,
                    width: 80.0,
                    height: 130.0,
                },
            )])
        } else {
            Ok(Vec::new())
        }
    }

    async fn estimate_faces(&self, frame: &DetectionFrame) -> Result<Vec<FaceLandmarkSet>> {
        tokio::time::sleep(self.inference_latency).await;

        let centre_x = frame.image().width() as f32 / 2.0;
        let mut state = self.lock_state()?;
        let behavior = state.behavior;
        let face = match behavior {
            SimulatedBehavior::Absent => return Ok(Vec::new()),
            SimulatedBehavior::LookingAway => frontal_face(&mut state.rng, centre_x, 6.0),
            SimulatedBehavior::Attentive | SimulatedBehavior::OnPhone => {
                let ratio = state.rng.gen_range(0.7..1.4);
                frontal_face(&mut state.rng, centre_x, ratio)
            }
        };
        Ok(vec![face])
    }
}

/// Frame source that reports 0x0 frames until its warm-up has passed,
/// like a webcam still negotiating its stream.
pub struct SyntheticCamera {
    frame: Arc<RgbImage>,
    empty: Arc<RgbImage>,
    ready_at: Instant,
}

impl SyntheticCamera {
    pub fn new(warmup: Duration) -> Self {
        Self {
            frame: Arc::new(RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT)),
            empty: Arc::new(RgbImage::new(0, 0)),
            ready_at: Instant::now() + warmup,
        }
    }
}

impl MediaSource for SyntheticCamera {
    fn current_frame(&self) -> Option<DetectionFrame> {
        let now = Instant::now();
        let image = if now >= self.ready_at {
            Arc::clone(&self.frame)
        } else {
            Arc::clone(&self.empty)
        };
        Some(DetectionFrame::new(image, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::fusion::{fuse, AttentionStatus};

    #[tokio::test(start_paused = true)]
    async fn camera_warms_up() {
        let camera = SyntheticCamera::new(Duration::from_millis(300));
        assert!(!camera.is_ready());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(camera.is_ready());
        assert_eq!(camera.current_frame().map(|f| f.width()), Some(FRAME_WIDTH));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_faces_fuse_as_expected() {
        let mut rng = StdRng::seed_from_u64(7);
        let attentive = frontal_face(&mut rng, 320.0, 1.0);
        let away = frontal_face(&mut rng, 320.0, 6.0);
        assert_eq!(fuse(&[], &[attentive]).status, AttentionStatus::Focused);
        assert_eq!(fuse(&[], &[away]).status, AttentionStatus::Distracted);
    }

    #[tokio::test(start_paused = true)]
    async fn models_load_after_delay() {
        let perception = SimulatedPerception::with_rng(
            StdRng::seed_from_u64(1),
            Duration::from_secs(1),
            Duration::ZERO,
        );
        assert!(!perception.is_loaded());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(perception.is_loaded());
    }
}
