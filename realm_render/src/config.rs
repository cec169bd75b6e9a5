//! Renderer configuration.
//!
//! Loaded from an optional JSON file; every field falls back to its default.

use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Terrain height that renders without parallax shift.
    pub standard_height: f32,
    /// Divisor turning a height difference into a game-space y shift.
    pub height_adjust: f32,
    /// Zoom level (pixels per game unit) at which sprites are drawn 1:1.
    pub default_scale: f32,
    pub initial_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Length of one animation tick in milliseconds.
    pub animation_period_ms: u64,
    pub show_house_titles: bool,
    pub show_available_construction: bool,
    /// Direction light travels from, used for terrain shading.
    pub light_direction: [f32; 3],
    pub margins: CullingMargins,
}

/// Extra game units kept around the viewport so sprites don't pop at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingMargins {
    pub houses: f32,
    pub trees: f32,
    pub stones: f32,
    pub default: f32,
}

impl Default for CullingMargins {
    fn default() -> Self {
        Self {
            houses: 2.0,
            trees: 2.0,
            stones: 1.0,
            default: 1.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            standard_height: 10.0,
            height_adjust: 10.0,
            default_scale: 35.0,
            initial_scale: 35.0,
            min_scale: 10.0,
            max_scale: 140.0,
            animation_period_ms: 100,
            show_house_titles: false,
            show_available_construction: false,
            light_direction: [-1.0, 1.0, -1.0],
            margins: CullingMargins::default(),
        }
    }
}

impl RenderConfig {
    /// Reads a config file and validates it.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let json = std::fs::read_to_string(path)?;
        let config: RenderConfig = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded render config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.height_adjust == 0.0 || !self.height_adjust.is_finite() {
            return Err(RenderError::InvalidConfig(
                "height_adjust must be a non-zero finite number".to_string(),
            ));
        }
        if self.default_scale <= 0.0 {
            return Err(RenderError::InvalidConfig(
                "default_scale must be positive".to_string(),
            ));
        }
        if self.min_scale <= 0.0 || self.min_scale > self.max_scale {
            return Err(RenderError::InvalidConfig(format!(
                "scale range {}..{} is empty or non-positive",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.min_scale..=self.max_scale).contains(&self.initial_scale) {
            return Err(RenderError::InvalidConfig(format!(
                "initial_scale {} outside {}..{}",
                self.initial_scale, self.min_scale, self.max_scale
            )));
        }
        if self.animation_period_ms == 0 {
            return Err(RenderError::InvalidConfig(
                "animation_period_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn animation_period(&self) -> Duration {
        Duration::from_millis(self.animation_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        RenderConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("render.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "show_house_titles": true, "margins": {{ "stones": 3 }} }}"#).unwrap();

        let config = RenderConfig::load(&path).unwrap();
        assert!(config.show_house_titles);
        assert_eq!(config.margins.stones, 3.0);
        assert_eq!(config.margins.houses, 2.0);
        assert_eq!(config.standard_height, 10.0);
    }

    #[test]
    fn test_zero_height_adjust_rejected() {
        let config = RenderConfig {
            height_adjust: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RenderError::InvalidConfig(_))
        ));
    }
}
