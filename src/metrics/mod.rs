mod types;

pub use types::ScoreSample;

use std::collections::VecDeque;

pub const CHART_CAPACITY: usize = 20;

/// Rolling window of the last [`CHART_CAPACITY`] score samples, oldest first.
#[derive(Debug, Clone)]
pub struct ChartBuffer {
    samples: VecDeque<ScoreSample>,
}

impl Default for ChartBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBuffer {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(CHART_CAPACITY + 1),
        }
    }

    /// Append, then evict from the front until back under capacity.
    pub fn push(&mut self, sample: ScoreSample) {
        self.samples.push_back(sample);
        while self.samples.len() > CHART_CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn to_vec(&self) -> Vec<ScoreSample> {
        self.samples.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(second: u64) -> ScoreSample {
        ScoreSample::new(format!("00:{:02}", second % 60), 100, second)
    }

    #[test]
    fn keeps_the_twenty_most_recent_in_order() {
        let mut buffer = ChartBuffer::new();
        for second in 1..=27 {
            buffer.push(sample(second));
            assert!(buffer.to_vec().len() <= CHART_CAPACITY);
        }

        let seconds: Vec<u64> = buffer.to_vec().iter().map(|s| s.session_second).collect();
        assert_eq!(seconds, (8..=27).collect::<Vec<_>>());
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let mut buffer = ChartBuffer::new();
        for second in 1..=5 {
            buffer.push(sample(second));
        }
        assert_eq!(buffer.to_vec().len(), 5);
        assert_eq!(buffer.to_vec()[0].session_second, 1);
    }

    #[test]
    fn sample_value_is_capped() {
        assert_eq!(ScoreSample::new("00:01", 250, 1).value, 100);
    }
}
