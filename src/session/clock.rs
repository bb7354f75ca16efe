use serde::Serialize;

/// Whole seconds since session start, advanced once per scoring tick.
///
/// This counts ticks, not wall time; a late tick still adds exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionClock {
    seconds: u64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> u64 {
        self.seconds = self.seconds.saturating_add(1);
        self.seconds
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ticks() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.seconds(), 0);
        for expected in 1..=3 {
            assert_eq!(clock.tick(), expected);
        }
        assert_eq!(clock.seconds(), 3);
    }
}
