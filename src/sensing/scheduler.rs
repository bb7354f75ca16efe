use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Duration, Instant};

/// Held by the in-flight detection cycle; dropping it frees the slot.
pub type CyclePermit = OwnedMutexGuard<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A previous cycle is still waiting on the models.
    InFlight,
    /// The last run started less than the minimum interval ago.
    Throttled,
}

/// Rate limiter in front of the perception adapter.
///
/// Guards run in order: single-slot reentrancy lock, then the minimum
/// interval since the last run that actually reached the models. Acquiring a
/// permit does not consume the interval; [`FrameScheduler::mark_run`] does,
/// once the caller knows the frame is usable.
#[derive(Debug)]
pub struct FrameScheduler {
    min_interval: Duration,
    last_run: Option<Instant>,
    slot: Arc<Mutex<()>>,
}

impl FrameScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: None,
            slot: Arc::new(Mutex::new(())),
        }
    }

    pub fn try_acquire(&self, now: Instant) -> Result<CyclePermit, SkipReason> {
        let permit = self
            .slot
            .clone()
            .try_lock_owned()
            .map_err(|_| SkipReason::InFlight)?;

        if let Some(last_run) = self.last_run {
            if now.saturating_duration_since(last_run) < self.min_interval {
                return Err(SkipReason::Throttled);
            }
        }

        Ok(permit)
    }

    pub fn mark_run(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}
