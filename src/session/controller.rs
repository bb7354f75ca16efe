use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, bail, Result};
use chrono::{Local, Utc};
use log::{error, info};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    audio::{AlarmController, AlarmState},
    events::{status_summary, EventSink, ScoreBand, SessionEvent},
    metrics::ScoreSample,
    perception::{MediaSource, PerceptionAdapter},
    sensing::{DetectionSchedule, FusionResult, SensingController},
    settings::{MonitorConfig, MonitorVariant},
};

use super::{SessionSnapshot, SessionState, SessionSummary};

/// Handle to the running monitor. Cheap to clone; every periodic task holds
/// one and mutates the shared [`SessionState`] only through its methods.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    config: Arc<MonitorConfig>,
    perception: Arc<dyn PerceptionAdapter>,
    media: Arc<dyn MediaSource>,
    events: Arc<dyn EventSink>,
    alarm: Option<Arc<StdMutex<AlarmController>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    supervisor: Arc<Mutex<Option<JoinHandle<()>>>>,
    sensing: Arc<Mutex<SensingController>>,
}

impl SessionController {
    pub fn new(
        config: MonitorConfig,
        perception: Arc<dyn PerceptionAdapter>,
        media: Arc<dyn MediaSource>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            config: Arc::new(config),
            perception,
            media,
            events,
            alarm: None,
            ticker: Arc::new(Mutex::new(None)),
            supervisor: Arc::new(Mutex::new(None)),
            sensing: Arc::new(Mutex::new(SensingController::new())),
        }
    }

    /// Alarm variant: sound `alarm` while distracted.
    pub fn with_alarm(mut self, alarm: AlarmController) -> Self {
        self.alarm = Some(Arc::new(StdMutex::new(alarm)));
        self
    }

    pub fn variant(&self) -> MonitorVariant {
        if self.alarm.is_some() {
            MonitorVariant::Alarm
        } else {
            MonitorVariant::Passive
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn alarm_state(&self) -> Option<AlarmState> {
        self.run_alarm(|alarm| alarm.state()).await
    }

    /// Runs `op` against the alarm on the blocking pool; audio calls may wait
    /// on the device and must not hold up the ticks. `None` in the passive
    /// variant.
    async fn run_alarm<R, F>(&self, op: F) -> Option<R>
    where
        F: FnOnce(&mut AlarmController) -> R + Send + 'static,
        R: Send + 'static,
    {
        let alarm = Arc::clone(self.alarm.as_ref()?);
        let joined = tokio::task::spawn_blocking(move || {
            alarm
                .lock()
                .map(|mut alarm| op(&mut *alarm))
                .map_err(|_| anyhow!("alarm state poisoned"))
        })
        .await;

        match joined {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                error!("alarm call failed: {err}");
                None
            }
            Err(err) => {
                error!("alarm task failed to join: {err}");
                None
            }
        }
    }

    /// The start command. Resets all session state and launches the
    /// detection loop, the scoring tick and (alarm variant) the supervisor.
    pub async fn start_session(&self) -> Result<SessionSnapshot> {
        let session_id = Uuid::new_v4().to_string();

        {
            let mut state = self.state.lock().await;
            if state.started {
                bail!("session already active");
            }
            state.begin_session(session_id.clone(), Utc::now(), Instant::now());
        }

        self.run_alarm(|alarm| alarm.arm()).await;

        let schedule = DetectionSchedule {
            trigger_interval: self.config.detection_trigger(),
            min_run_interval: self.config.min_detection_interval(),
            cycle_timeout: self.config.detection_timeout(),
        };
        let sensing_result = self.sensing.lock().await.start_sensing(
            self.clone(),
            Arc::clone(&self.perception),
            Arc::clone(&self.media),
            schedule,
        );
        if let Err(err) = sensing_result {
            self.state.lock().await.stop();
            self.run_alarm(|alarm| alarm.release()).await;
            return Err(err);
        }

        self.spawn_ticker().await;
        if self.alarm.is_some() {
            self.spawn_supervisor().await;
        }

        info!("session {} started ({:?})", session_id, self.variant());
        self.events.emit(SessionEvent::SessionStarted {
            session_id: session_id.clone(),
        });

        Ok(self.snapshot().await)
    }

    /// Tear the session down: stop every periodic task, release audio.
    pub async fn end_session(&self) -> Result<SessionSummary> {
        let ended_at = Utc::now();

        let summary = {
            let mut state = self.state.lock().await;
            if !state.started {
                bail!("no active session to end");
            }
            state.stop();

            let session_id = state
                .session_id
                .clone()
                .ok_or_else(|| anyhow!("missing session id"))?;

            SessionSummary {
                session_id,
                started_at: state.started_at.unwrap_or(ended_at),
                ended_at,
                session_seconds: state.session_seconds(),
                final_score: state.score(),
                distraction_count: state.distraction_count(),
            }
        };

        if let Err(e) = self.sensing.lock().await.stop_sensing().await {
            error!("Failed to stop sensing on session end: {:?}", e);
        }
        cancel_task(&self.ticker).await;
        cancel_task(&self.supervisor).await;

        self.run_alarm(|alarm| alarm.release()).await;

        info!(
            "session {} ended after {}s, score {:.1}, {} distraction(s)",
            summary.session_id,
            summary.session_seconds,
            summary.final_score,
            summary.distraction_count
        );
        self.events.emit(SessionEvent::SessionEnded(summary.clone()));

        Ok(summary)
    }

    /// Feed one detection cycle's result through the debouncer and notify
    /// the alarm and the display of whatever changed.
    pub async fn apply_fusion(&self, result: FusionResult) {
        let applied = {
            let mut state = self.state.lock().await;
            state.apply_fusion(&result).map(|outcome| {
                let summary = status_summary(state.status(), state.reasons());
                (outcome, state.distraction_count(), summary)
            })
        };
        let Some((outcome, distraction_count, summary)) = applied else {
            return;
        };

        if let Some(status) = outcome.status_changed {
            info!("status -> {status} (distractions: {distraction_count})");
            self.run_alarm(move |alarm| alarm.on_status(status)).await;
            self.events.emit(SessionEvent::StatusChanged {
                status,
                distraction_count,
                summary: summary.clone(),
            });
        }

        if let Some(reasons) = outcome.reasons_changed {
            self.events
                .emit(SessionEvent::ReasonsChanged { reasons, summary });
        }
    }

    /// One scoring tick. `None` once the session is no longer running.
    pub async fn score_tick(&self) -> Option<ScoreSample> {
        let (sample, score, session_seconds) = {
            let mut state = self.state.lock().await;
            if !state.started {
                return None;
            }
            let sample = state.score_tick(Instant::now(), chart_label());
            (sample, state.score(), state.session_seconds())
        };

        self.events.emit(SessionEvent::ScoreTick {
            score,
            score_band: ScoreBand::for_score(score),
            session_seconds,
            sample: sample.clone(),
        });
        Some(sample)
    }

    /// Supervisory alarm check; no-op in the passive variant.
    pub async fn enforce_alarm(&self) {
        self.run_alarm(|alarm| alarm.enforce()).await;
    }

    async fn spawn_ticker(&self) {
        let controller = self.clone();
        let period = self.config.score_tick();
        let handle = tokio::spawn(async move {
            // First tick one full period after start, not immediately.
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if controller.score_tick().await.is_none() {
                    break;
                }
            }
        });
        replace_task(&self.ticker, handle).await;
    }

    async fn spawn_supervisor(&self) {
        let controller = self.clone();
        let period = self.config.alarm_enforce_interval();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                controller.enforce_alarm().await;
            }
        });
        replace_task(&self.supervisor, handle).await;
    }
}

async fn replace_task(slot: &Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
    let mut guard = slot.lock().await;
    if let Some(old) = guard.replace(handle) {
        old.abort();
    }
}

async fn cancel_task(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().await.take() {
        handle.abort();
        let _ = handle.await;
    }
}

/// Trend-chart label: local wall-clock minutes and seconds.
fn chart_label() -> String {
    Local::now().format("%M:%S").to_string()
}
