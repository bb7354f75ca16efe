use tokio::time::Instant;

use crate::sensing::fusion::AttentionStatus;

pub const MAX_SCORE: f64 = 100.0;
pub const MIN_SCORE: f64 = 0.0;
/// Points gained per second while focused.
pub const RECOVERY_PER_SEC: f64 = 0.5;
/// Points lost per second while distracted. Four times the recovery rate.
pub const DECAY_PER_SEC: f64 = 2.0;

/// Apply `delta_secs` of recovery or decay and clamp to the score range.
pub fn integrate(score: f64, status: AttentionStatus, delta_secs: f64) -> f64 {
    let delta_secs = delta_secs.max(0.0);
    let next = match status {
        AttentionStatus::Focused => score + RECOVERY_PER_SEC * delta_secs,
        AttentionStatus::Distracted => score - DECAY_PER_SEC * delta_secs,
    };
    next.clamp(MIN_SCORE, MAX_SCORE)
}

/// Focus score driven by measured elapsed time between ticks, so a late or
/// coalesced timer still charges the right amount.
#[derive(Debug, Clone)]
pub struct ScoreIntegrator {
    score: f64,
    last_update: Option<Instant>,
}

impl Default for ScoreIntegrator {
    fn default() -> Self {
        Self {
            score: MAX_SCORE,
            last_update: None,
        }
    }
}

impl ScoreIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the elapsed-time anchor; the next tick measures from here.
    pub fn anchor(&mut self, now: Instant) {
        self.last_update = Some(now);
    }

    pub fn tick(&mut self, status: AttentionStatus, now: Instant) -> f64 {
        let delta_secs = self
            .last_update
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);
        self.score = integrate(self.score, status, delta_secs);
        self.score
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Score as shown on the trend chart.
    pub fn rounded(&self) -> u8 {
        self.score.round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn run_ticks(status: AttentionStatus, ticks: u32) -> ScoreIntegrator {
        let mut integrator = ScoreIntegrator::new();
        let start = Instant::now();
        integrator.anchor(start);
        for i in 1..=ticks {
            integrator.tick(status, start + Duration::from_secs(i as u64));
        }
        integrator
    }

    #[test]
    fn focus_at_ceiling_stays_at_ceiling() {
        let integrator = run_ticks(AttentionStatus::Focused, 10);
        assert_eq!(integrator.score(), 100.0);
    }

    #[test]
    fn five_distracted_seconds_cost_ten_points() {
        let integrator = run_ticks(AttentionStatus::Distracted, 5);
        assert!((integrator.score() - 90.0).abs() < 1e-9);
        assert_eq!(integrator.rounded(), 90);
    }

    #[test]
    fn uses_measured_delta_not_tick_count() {
        let mut integrator = ScoreIntegrator::new();
        let start = Instant::now();
        integrator.anchor(start);
        // one late tick covering 2.5s
        integrator.tick(
            AttentionStatus::Distracted,
            start + Duration::from_millis(2500),
        );
        assert!((integrator.score() - 95.0).abs() < 1e-9);
    }

    #[test]
    fn recovery_is_slower_than_decay() {
        let mut integrator = ScoreIntegrator::new();
        let start = Instant::now();
        integrator.anchor(start);
        integrator.tick(AttentionStatus::Distracted, start + Duration::from_secs(10));
        assert!((integrator.score() - 80.0).abs() < 1e-9);
        integrator.tick(AttentionStatus::Focused, start + Duration::from_secs(20));
        assert!((integrator.score() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_for_any_delta_and_prior_score() {
        let deltas = [0.0, 0.001, 0.5, 1.0, 7.3, 60.0, 1e6];
        let priors = [0.0, 0.4, 13.0, 50.0, 99.9, 100.0];
        for &delta in &deltas {
            for &prior in &priors {
                for status in [AttentionStatus::Focused, AttentionStatus::Distracted] {
                    let next = integrate(prior, status, delta);
                    assert!((MIN_SCORE..=MAX_SCORE).contains(&next), "{prior} {delta} {status}");
                }
            }
        }
    }

    #[test]
    fn first_tick_without_anchor_is_zero_delta() {
        let mut integrator = ScoreIntegrator::new();
        assert_eq!(integrator.tick(AttentionStatus::Distracted, Instant::now()), 100.0);
    }
}
