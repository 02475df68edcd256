//! Session configuration
//!
//! Loaded from JSON. Every field has a default, so a partial document only
//! overrides what it names.

use std::path::Path;
use std::time::Duration;

use kinesis_core::{ensure_positive, ensure_range, KinesisError, KinesisResult, PerformerId};
use kinesis_signal::{PointerConfig, PoseConfig};
use kinesis_stage::{EffectKind, DEFAULT_REACTIVITY};
use kinesis_time::{ClockConfig, PerfConfig};
use serde::{Deserialize, Serialize};

use crate::{LoggingConfig, SessionResult};

/// Upper bound for reactivity multipliers
pub const DEFAULT_MAX_REACTIVITY: f32 = 2.0;

/// Stage session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub pointer: PointerConfig,
    pub pose: PoseConfig,
    pub perf: PerfConfig,
    pub clock: ClockConfig,
    /// Initial music sensitivity
    pub music_reactivity: f32,
    /// Initial motion sensitivity
    pub motion_reactivity: f32,
    pub max_reactivity: f32,
    /// Pointer samples held between ticks
    pub max_queued_pointer: usize,
    /// Pose frames held between ticks, all performers combined
    pub max_queued_pose: usize,
    /// Evict a performer after this long without pose frames
    pub performer_timeout_ms: u64,
    /// Performer that drives the bundle; lowest id when unset
    pub primary_performer: Option<PerformerId>,
    pub effect: EffectKind,
    pub logging: LoggingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pointer: PointerConfig::default(),
            pose: PoseConfig::default(),
            perf: PerfConfig::default(),
            clock: ClockConfig::default(),
            music_reactivity: DEFAULT_REACTIVITY,
            motion_reactivity: DEFAULT_REACTIVITY,
            max_reactivity: DEFAULT_MAX_REACTIVITY,
            max_queued_pointer: 256,
            max_queued_pose: 64,
            performer_timeout_ms: 2000,
            primary_performer: None,
            effect: EffectKind::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Configuration for weak hardware: tolerant drop detection, snappier pose
    pub fn low_power() -> Self {
        Self {
            perf: PerfConfig::lenient(),
            pose: PoseConfig::responsive(),
            max_queued_pointer: 64,
            max_queued_pose: 16,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SessionResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> KinesisResult<()> {
        self.pointer.validate()?;
        self.pose.validate()?;
        self.perf.validate()?;
        self.clock.validate()?;

        ensure_positive("max_reactivity", self.max_reactivity)?;
        ensure_range("music_reactivity", self.music_reactivity, 0.0, self.max_reactivity)?;
        ensure_range("motion_reactivity", self.motion_reactivity, 0.0, self.max_reactivity)?;

        if self.max_queued_pointer == 0 {
            return Err(KinesisError::invalid_config("max_queued_pointer", "must be at least 1"));
        }
        if self.max_queued_pose == 0 {
            return Err(KinesisError::invalid_config("max_queued_pose", "must be at least 1"));
        }
        if self.performer_timeout_ms == 0 {
            return Err(KinesisError::invalid_config("performer_timeout_ms", "must be positive"));
        }
        Ok(())
    }

    pub fn performer_timeout(&self) -> Duration {
        Duration::from_millis(self.performer_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogFormat, SessionError};

    #[test]
    fn test_default_config_valid() {
        assert!(SessionConfig::default().validate().is_ok());
        assert!(SessionConfig::low_power().validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = SessionConfig::from_json_str(
            r#"{
                "effect": "kaleidoscope",
                "perf": { "drop_threshold_ms": 40.0 },
                "primary_performer": 2,
                "logging": { "format": "json" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.effect, EffectKind::Kaleidoscope);
        assert_eq!(config.perf.drop_threshold_ms, 40.0);
        assert_eq!(config.perf.degrade_at, PerfConfig::default().degrade_at);
        assert_eq!(config.primary_performer, Some(PerformerId::new(2)));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.music_reactivity, 0.9);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SessionConfig::from_json_str(r#"{"music_reactivity": 3.0}"#).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(KinesisError::InvalidConfig { field: "music_reactivity", .. })
        ));

        let err = SessionConfig::from_json_str(r#"{"max_queued_pose": 0}"#).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SessionConfig::from_json_str(r#"{"effect": "plasma"}"#),
            Err(SessionError::Parse(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("not json"),
            Err(SessionError::Parse(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("kinesis-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"performer_timeout_ms": 500}"#).unwrap();

        let config = SessionConfig::from_path(&path).unwrap();
        assert_eq!(config.performer_timeout(), Duration::from_millis(500));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            SessionConfig::from_path(&path),
            Err(SessionError::Io(_))
        ));
    }
}
