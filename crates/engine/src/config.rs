use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::geometry::Geometry;

/// Tunables for geometry limits, temporal windows and the playback clock.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
///
/// # Example
/// ```
/// use engine::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "image_duration": 30.0 }"#).expect("valid");
/// assert_eq!(config.image_duration, 30.0);
/// assert_eq!(config.min_size, 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smallest width or height a resize gesture can produce.
    pub min_size: f64,
    /// Shortest playable temporal window.
    pub min_window: f64,
    /// Clock advance per tick, in time units.
    pub tick_interval: f64,
    /// Wall-clock delay between ticks of the threaded scheduler.
    pub tick_period_ms: u64,
    /// Window length assigned to images, which have no intrinsic duration.
    pub image_duration: f64,
    /// Initial `end_time` for new images (clamped to `image_duration`).
    pub default_window_end: f64,
    /// Geometry given to every newly added item.
    pub default_geometry: Geometry,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_size: 50.0,
            min_window: 0.1,
            tick_interval: 0.1,
            tick_period_ms: 100,
            image_duration: 60.0,
            default_window_end: 5.0,
            default_geometry: Geometry {
                x: 100.0,
                y: 100.0,
                width: 300.0,
                height: 200.0,
            },
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every limit is finite and positive and that the default
    /// geometry already satisfies `min_size`.
    pub fn validate(&self) -> Result<()> {
        positive("min_size", self.min_size)?;
        positive("min_window", self.min_window)?;
        positive("tick_interval", self.tick_interval)?;
        positive("image_duration", self.image_duration)?;
        if self.tick_period_ms == 0 {
            return Err(invalid("tick_period_ms must be positive"));
        }
        if !self.default_window_end.is_finite() || self.default_window_end < self.min_window {
            return Err(invalid("default_window_end must be at least min_window"));
        }
        if self.image_duration < self.min_window {
            return Err(invalid("image_duration must be at least min_window"));
        }
        let geometry = self.default_geometry;
        if !geometry.is_finite() {
            return Err(invalid("default_geometry must be finite"));
        }
        if geometry.width < self.min_size || geometry.height < self.min_size {
            return Err(invalid("default_geometry is smaller than min_size"));
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be positive and finite")))
    }
}

fn invalid(reason: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use crate::error::EngineError;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default()
            .validate()
            .expect("defaults should validate");
    }

    #[test]
    fn from_json_str_keeps_defaults_for_missing_keys() {
        let config = EngineConfig::from_json_str(r#"{ "tick_period_ms": 20 }"#)
            .expect("config should parse");
        assert_eq!(config.tick_period_ms, 20);
        assert_eq!(config.tick_interval, 0.1);
        assert_eq!(config.default_geometry.width, 300.0);
    }

    #[test]
    fn from_json_str_rejects_zero_min_size() {
        let result = EngineConfig::from_json_str(r#"{ "min_size": 0.0 }"#);
        let Err(EngineError::InvalidConfig { reason }) = result else {
            panic!("expected InvalidConfig");
        };
        assert!(reason.contains("min_size"));
    }

    #[test]
    fn from_json_str_rejects_default_geometry_below_min_size() {
        let result = EngineConfig::from_json_str(
            r#"{ "default_geometry": { "x": 0.0, "y": 0.0, "width": 20.0, "height": 200.0 } }"#,
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn from_json_str_reports_malformed_json() {
        let result = EngineConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(EngineError::ConfigParse(_))));
    }
}
