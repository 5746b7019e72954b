use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::CaptureError;

/// Application configuration, optionally loaded from `splitstage.json` next
/// to the executable. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Window-capture sampling interval in milliseconds (10 Hz by default).
    pub window_tick_ms: u64,
    /// Camera device index to open (first enumerated device by default).
    pub camera_index: u32,
    /// Capacity of the frame channel feeding the sink. Producers drop frames
    /// when the sink falls this far behind; only the latest frame matters.
    pub frame_queue: usize,
    /// Consecutive failed window-capture ticks tolerated before the session
    /// gives the target up for lost.
    pub max_capture_failures: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_tick_ms:       100,
            camera_index:         0,
            frame_queue:          8,
            max_capture_failures: 50,
        }
    }
}

impl AppConfig {
    /// Load from a JSON file, falling back to defaults when the file does not
    /// exist. A present-but-invalid file is an error so typos do not silently
    /// revert the user to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No {} — using default configuration", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CaptureError::ConfigInvalid { reason: format!("{}: {e}", path.display()) }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.window_tick_ms == 0 {
            return Err(CaptureError::ConfigInvalid {
                reason: "window_tick_ms must be > 0".into(),
            });
        }
        if self.frame_queue == 0 {
            return Err(CaptureError::ConfigInvalid {
                reason: "frame_queue must be > 0".into(),
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.window_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn partial_file_fills_in_defaults() {
        let json = r#"{ "window_tick_ms": 50 }"#;

        let cfg: AppConfig = serde_json::from_str(json).expect("valid partial config");
        assert_eq!(cfg.window_tick_ms, 50);
        assert_eq!(cfg.camera_index, AppConfig::default().camera_index);
        assert_eq!(cfg.frame_queue, AppConfig::default().frame_queue);
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let cfg = AppConfig { window_tick_ms: 0, ..AppConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_configuration_is_valid() {
        AppConfig::default().validate().expect("defaults must validate");
    }
}
