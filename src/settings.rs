use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const CONFIG_ENV: &str = "FOCUSFLOW_CONFIG";
pub const VARIANT_ENV: &str = "FOCUSFLOW_VARIANT";
pub const DEBUG_ENV: &str = "FOCUSFLOW_DEBUG";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MonitorVariant {
    /// Starts at launch, no audio.
    #[default]
    Passive,
    /// Waits for an explicit start command and sounds an alarm while distracted.
    Alarm,
}

impl MonitorVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "passive" => Some(MonitorVariant::Passive),
            "alarm" => Some(MonitorVariant::Alarm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmSettings {
    /// Sound file to loop; the built-in siren when unset.
    pub sound_path: Option<PathBuf>,
    pub enforce_interval_ms: u64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound_path: None,
            enforce_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    pub variant: MonitorVariant,
    /// How often the detection loop wakes up.
    pub detection_trigger_ms: u64,
    /// Minimum spacing between detection runs that reach the models.
    pub min_detection_interval_ms: u64,
    /// A detection cycle running longer than this is abandoned.
    pub detection_timeout_ms: u64,
    pub score_tick_ms: u64,
    pub alarm: AlarmSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            variant: MonitorVariant::Passive,
            detection_trigger_ms: 100,
            min_detection_interval_ms: 200,
            detection_timeout_ms: 5000,
            score_tick_ms: 1000,
            alarm: AlarmSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Read a JSON config. Missing fields take their defaults; a malformed
    /// file is logged and ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!(
                    "Ignoring malformed config {}: {err}; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Defaults, overlaid with the file named by `FOCUSFLOW_CONFIG` and the
    /// `FOCUSFLOW_VARIANT` override.
    pub fn from_env() -> Self {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)).unwrap_or_else(|err| {
                warn!("{err:#}; using defaults");
                Self::default()
            }),
            None => Self::default(),
        };

        if let Ok(value) = std::env::var(VARIANT_ENV) {
            match MonitorVariant::parse(&value) {
                Some(variant) => config.variant = variant,
                None => warn!("Unknown {VARIANT_ENV} value '{value}', keeping {:?}", config.variant),
            }
        }

        config
    }

    pub fn detection_trigger(&self) -> Duration {
        Duration::from_millis(self.detection_trigger_ms.max(1))
    }

    pub fn min_detection_interval(&self) -> Duration {
        Duration::from_millis(self.min_detection_interval_ms)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms.max(1))
    }

    pub fn score_tick(&self) -> Duration {
        Duration::from_millis(self.score_tick_ms.max(1))
    }

    pub fn alarm_enforce_interval(&self) -> Duration {
        Duration::from_millis(self.alarm.enforce_interval_ms.max(1))
    }
}

pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let config = MonitorConfig::default();
        assert_eq!(config.detection_trigger(), Duration::from_millis(100));
        assert_eq!(config.min_detection_interval(), Duration::from_millis(200));
        assert_eq!(config.score_tick(), Duration::from_secs(1));
        assert_eq!(config.alarm_enforce_interval(), Duration::from_secs(1));
        assert_eq!(config.variant, MonitorVariant::Passive);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"variant":"alarm","alarm":{"soundPath":"/tmp/a.mp3"}}"#)
                .unwrap();
        assert_eq!(config.variant, MonitorVariant::Alarm);
        assert_eq!(config.alarm.sound_path, Some(PathBuf::from("/tmp/a.mp3")));
        assert_eq!(config.alarm.enforce_interval_ms, 1000);
        assert_eq!(config.detection_trigger_ms, 100);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("focusflow-test-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(MonitorConfig::load(Path::new("/definitely/not/here.json")).is_err());
    }

    #[test]
    fn variant_parsing() {
        assert_eq!(MonitorVariant::parse(" Alarm "), Some(MonitorVariant::Alarm));
        assert_eq!(MonitorVariant::parse("passive"), Some(MonitorVariant::Passive));
        assert_eq!(MonitorVariant::parse("loud"), None);
    }
}
