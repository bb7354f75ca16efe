use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    events::{status_summary, ScoreBand},
    metrics::{ChartBuffer, ScoreSample},
    sensing::fusion::{AttentionStatus, DistractionReason, FusionResult},
};

use super::{
    clock::SessionClock,
    debouncer::{DebounceOutcome, StatusDebouncer},
    scoring::ScoreIntegrator,
};

/// The single owned state of a monitoring session. The detection cycle and the
/// scoring tick both mutate it, always through [`super::SessionController`].
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub started: bool,
    debouncer: StatusDebouncer,
    integrator: ScoreIntegrator,
    clock: SessionClock,
    chart: ChartBuffer,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe everything from a previous session and start counting from `now`.
    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>, now: Instant) {
        *self = Self {
            session_id: Some(session_id),
            started_at: Some(started_at),
            started: true,
            ..Self::default()
        };
        self.integrator.anchor(now);
    }

    /// Stop accepting updates. Score, clock and chart stay readable until the
    /// next `begin_session`.
    pub fn stop(&mut self) {
        self.started = false;
    }

    /// `None` when the session is not running; fusion results are dropped then.
    pub fn apply_fusion(&mut self, result: &FusionResult) -> Option<DebounceOutcome> {
        if !self.started {
            return None;
        }
        Some(self.debouncer.apply(result))
    }

    /// One scoring tick: integrate, advance the clock, record a chart sample.
    pub fn score_tick(&mut self, now: Instant, label: String) -> ScoreSample {
        let status = self.debouncer.status();
        self.integrator.tick(status, now);
        let second = self.clock.tick();
        let sample = ScoreSample::new(label, self.integrator.rounded(), second);
        self.chart.push(sample.clone());
        sample
    }

    pub fn status(&self) -> AttentionStatus {
        self.debouncer.status()
    }

    pub fn reasons(&self) -> &[DistractionReason] {
        self.debouncer.reasons()
    }

    pub fn score(&self) -> f64 {
        self.integrator.score()
    }

    pub fn session_seconds(&self) -> u64 {
        self.clock.seconds()
    }

    pub fn distraction_count(&self) -> u32 {
        self.debouncer.distraction_count()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            started: self.started,
            status: self.status(),
            reasons: self.reasons().to_vec(),
            score: self.score(),
            score_band: ScoreBand::for_score(self.score()),
            summary: status_summary(self.status(), self.reasons()),
            session_seconds: self.session_seconds(),
            distraction_count: self.distraction_count(),
            chart_samples: self.chart.to_vec(),
        }
    }
}

/// Read-only view handed to the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub started: bool,
    pub status: AttentionStatus,
    pub reasons: Vec<DistractionReason>,
    pub score: f64,
    /// Colour band of `score`.
    pub score_band: ScoreBand,
    /// Banner text while distracted.
    pub summary: Option<String>,
    pub session_seconds: u64,
    pub distraction_count: u32,
    pub chart_samples: Vec<ScoreSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub session_seconds: u64,
    pub final_score: f64,
    pub distraction_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn started_state(now: Instant) -> SessionState {
        let mut state = SessionState::new();
        state.begin_session("s-1".into(), Utc::now(), now);
        state
    }

    #[test]
    fn fusion_before_start_is_ignored() {
        let mut state = SessionState::new();
        let absent = FusionResult {
            status: AttentionStatus::Distracted,
            reasons: vec![DistractionReason::UserAbsent],
        };
        assert!(state.apply_fusion(&absent).is_none());
        assert_eq!(state.status(), AttentionStatus::Focused);
        assert_eq!(state.distraction_count(), 0);
    }

    #[test]
    fn tick_records_sample_and_advances_clock() {
        let start = Instant::now();
        let mut state = started_state(start);
        state.apply_fusion(&FusionResult {
            status: AttentionStatus::Distracted,
            reasons: vec![DistractionReason::PhoneDetected],
        });

        let sample = state.score_tick(start + Duration::from_secs(1), "12:01".into());
        assert_eq!(sample.value, 98);
        assert_eq!(sample.session_second, 1);
        assert_eq!(state.session_seconds(), 1);
        assert_eq!(state.snapshot().chart_samples, vec![sample]);
    }

    #[test]
    fn begin_session_resets_previous_run() {
        let start = Instant::now();
        let mut state = started_state(start);
        state.apply_fusion(&FusionResult {
            status: AttentionStatus::Distracted,
            reasons: vec![DistractionReason::UserAbsent],
        });
        state.score_tick(start + Duration::from_secs(3), "00:03".into());
        state.stop();

        // chart survives a stop
        assert_eq!(state.snapshot().chart_samples.len(), 1);
        assert!(state.apply_fusion(&FusionResult::focused()).is_none());

        state.begin_session("s-2".into(), Utc::now(), start + Duration::from_secs(10));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.session_id.as_deref(), Some("s-2"));
        assert!(snapshot.started);
        assert_eq!(snapshot.score, 100.0);
        assert_eq!(snapshot.session_seconds, 0);
        assert_eq!(snapshot.distraction_count, 0);
        assert!(snapshot.chart_samples.is_empty());
        assert!(snapshot.reasons.is_empty());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let state = started_state(Instant::now());
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["status"], "FOCUSED");
        assert_eq!(json["sessionSeconds"], 0);
        assert_eq!(json["distractionCount"], 0);
        assert!(json["chartSamples"].as_array().unwrap().is_empty());
        assert_eq!(json["scoreBand"], "high");
        assert!(json["summary"].is_null());
    }

    #[test]
    fn snapshot_carries_display_hints() {
        let start = Instant::now();
        let mut state = started_state(start);
        state.apply_fusion(&FusionResult {
            status: AttentionStatus::Distracted,
            reasons: vec![DistractionReason::PhoneDetected],
        });
        // 100 - 2 * 25 = 50
        state.score_tick(start + Duration::from_secs(25), "00:25".into());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.score_band, ScoreBand::Low);
        assert_eq!(snapshot.summary.as_deref(), Some("Phone detected in frame."));
    }
}
