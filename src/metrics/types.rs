use serde::{Deserialize, Serialize};

/// One point on the concentration trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSample {
    /// Wall-clock `mm:ss` at the time of the tick.
    pub time: String,
    /// Score rounded to an integer in 0..=100.
    pub value: u8,
    /// Session clock reading when the sample was taken.
    pub session_second: u64,
}

impl ScoreSample {
    pub fn new(time: impl Into<String>, value: u8, session_second: u64) -> Self {
        Self {
            time: time.into(),
            value: value.min(100),
            session_second,
        }
    }
}
