use crate::sensing::fusion::{AttentionStatus, DistractionReason, FusionResult};

/// What changed after applying one fusion result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceOutcome {
    pub status_changed: Option<AttentionStatus>,
    pub reasons_changed: Option<Vec<DistractionReason>>,
    /// Set on a focused -> distracted edge.
    pub new_distraction: bool,
}

impl DebounceOutcome {
    pub fn is_quiet(&self) -> bool {
        self.status_changed.is_none() && self.reasons_changed.is_none()
    }
}

/// Collapses repeated fusion results into edge notifications.
///
/// Status and reasons are tracked independently: a persisting distraction can
/// change cause without a status transition. Reasons compare as ordered lists.
#[derive(Debug, Clone, Default)]
pub struct StatusDebouncer {
    last_status: AttentionStatus,
    last_reasons: Vec<DistractionReason>,
    distraction_count: u32,
}

impl StatusDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, result: &FusionResult) -> DebounceOutcome {
        let mut outcome = DebounceOutcome::default();

        if result.status != self.last_status {
            if result.status == AttentionStatus::Distracted {
                self.distraction_count += 1;
                outcome.new_distraction = true;
            }
            self.last_status = result.status;
            outcome.status_changed = Some(result.status);
        }

        if result.reasons != self.last_reasons {
            self.last_reasons = result.reasons.clone();
            outcome.reasons_changed = Some(result.reasons.clone());
        }

        outcome
    }

    pub fn status(&self) -> AttentionStatus {
        self.last_status
    }

    pub fn reasons(&self) -> &[DistractionReason] {
        &self.last_reasons
    }

    pub fn distraction_count(&self) -> u32 {
        self.distraction_count
    }
}
