use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    perception::{DetectionFrame, MediaSource, PerceptionAdapter},
    session::SessionController,
};

use super::fusion::{fuse, FusionResult};
use super::scheduler::{CyclePermit, FrameScheduler};

// Set to false to silence this module; it runs ten times a second.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct DetectionSchedule {
    /// Wake-up cadence of the loop.
    pub trigger_interval: Duration,
    /// Minimum spacing between runs that reach the models.
    pub min_run_interval: Duration,
    /// Upper bound on one perception cycle.
    pub cycle_timeout: Duration,
}

pub async fn sensing_loop(
    session: SessionController,
    perception: Arc<dyn PerceptionAdapter>,
    media: Arc<dyn MediaSource>,
    schedule: DetectionSchedule,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(schedule.trigger_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut scheduler = FrameScheduler::new(schedule.min_run_interval);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(handle) = trigger(&mut scheduler, &session, &perception, media.as_ref(), schedule.cycle_timeout) {
                    in_flight = Some(handle);
                }
            }
            _ = cancel_token.cancelled() => {
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                    let _ = handle.await;
                }
                log_info!("sensing loop shutting down");
                break;
            }
        }
    }
}

/// One trigger: pass the guards, grab a ready frame, hand the cycle to its own
/// task so inference never stalls the trigger cadence.
fn trigger(
    scheduler: &mut FrameScheduler,
    session: &SessionController,
    perception: &Arc<dyn PerceptionAdapter>,
    media: &dyn MediaSource,
    cycle_timeout: Duration,
) -> Option<JoinHandle<()>> {
    if !perception.is_loaded() {
        log_debug!("perception models still loading");
        return None;
    }

    let now = Instant::now();
    let permit = match scheduler.try_acquire(now) {
        Ok(permit) => permit,
        Err(reason) => {
            log_debug!("detection trigger skipped: {reason:?}");
            return None;
        }
    };

    // An unready frame releases the permit without touching the throttle
    // window, so the very next trigger retries.
    let frame = match media.current_frame() {
        Some(frame) if frame.is_ready() => frame,
        _ => {
            log_debug!("camera frame not ready");
            return None;
        }
    };

    scheduler.mark_run(now);

    Some(tokio::spawn(run_cycle(
        session.clone(),
        Arc::clone(perception),
        frame,
        cycle_timeout,
        permit,
    )))
}

async fn run_cycle(
    session: SessionController,
    perception: Arc<dyn PerceptionAdapter>,
    frame: DetectionFrame,
    cycle_timeout: Duration,
    _permit: CyclePermit,
) {
    match tokio::time::timeout(cycle_timeout, detect(perception.as_ref(), &frame)).await {
        Ok(Ok(result)) => {
            log_debug!(
                "detection cycle done {:?} after capture: {:?}",
                frame.captured_at().elapsed(),
                result.status
            );
            session.apply_fusion(result).await
        }
        Ok(Err(err)) => log_warn!("detection cycle failed, keeping previous status: {err:?}"),
        Err(_) => log_warn!(
            "detection cycle timeout (> {}ms), keeping previous status",
            cycle_timeout.as_millis()
        ),
    }
}

/// Run both models on one frame and fuse the answers.
pub async fn detect(
    perception: &dyn PerceptionAdapter,
    frame: &DetectionFrame,
) -> Result<FusionResult> {
    let objects = perception
        .detect_objects(frame)
        .await
        .context("object detection failed")?;
    let faces = perception
        .estimate_faces(frame)
        .await
        .context("face landmark estimation failed")?;

    Ok(fuse(&objects, &faces))
}
