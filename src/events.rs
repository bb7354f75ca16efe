//! Outbound notifications for the display layer.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    metrics::ScoreSample,
    sensing::fusion::{AttentionStatus, DistractionReason},
    session::SessionSummary,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    SessionStarted { session_id: String },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        status: AttentionStatus,
        distraction_count: u32,
        summary: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ReasonsChanged {
        reasons: Vec<DistractionReason>,
        summary: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ScoreTick {
        score: f64,
        score_band: ScoreBand,
        session_seconds: u64,
        sample: ScoreSample,
    },
    SessionEnded(SessionSummary),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session-started",
            SessionEvent::StatusChanged { .. } => "status-changed",
            SessionEvent::ReasonsChanged { .. } => "reasons-changed",
            SessionEvent::ScoreTick { .. } => "score-tick",
            SessionEvent::SessionEnded(_) => "session-ended",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Writes every event as a JSON line through `log`. Score ticks go to debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SessionEvent) {
        let payload = serde_json::to_string(&event)
            .unwrap_or_else(|err| format!("<unserializable event: {err}>"));
        match event {
            SessionEvent::ScoreTick { .. } => log::debug!("{}: {}", event.name(), payload),
            _ => log::info!("{}: {}", event.name(), payload),
        }
    }
}

/// Forwards events into an unbounded channel; a dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

/// Colour band of the score badge and chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score > 80.0 {
            ScoreBand::High
        } else if score > 50.0 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}

/// One-line explanation shown next to the distraction badge.
pub fn distraction_summary(reasons: &[DistractionReason]) -> &'static str {
    if reasons.contains(&DistractionReason::PhoneDetected) {
        "Phone detected in frame."
    } else {
        "User gaze deviation detected."
    }
}

/// Banner text for the current status, `None` while focused.
pub fn status_summary(status: AttentionStatus, reasons: &[DistractionReason]) -> Option<String> {
    match status {
        AttentionStatus::Focused => None,
        AttentionStatus::Distracted => Some(distraction_summary(reasons).to_string()),
    }
}
