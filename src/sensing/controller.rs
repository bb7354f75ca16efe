use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    perception::{MediaSource, PerceptionAdapter},
    session::SessionController,
};

use super::loop_worker::{sensing_loop, DetectionSchedule};

/// Owns the detection task of the running session.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start_sensing(
        &mut self,
        session: SessionController,
        perception: Arc<dyn PerceptionAdapter>,
        media: Arc<dyn MediaSource>,
        schedule: DetectionSchedule,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        info!(
            "starting detection loop (trigger {}ms, min interval {}ms)",
            schedule.trigger_interval.as_millis(),
            schedule.min_run_interval.as_millis()
        );
        let handle = tokio::spawn(sensing_loop(
            session,
            perception,
            media,
            schedule,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop (and its in-flight cycle) and wait for it to exit.
    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sensing loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
