//! # Engine Configuration
//!
//! Tunables for the in-memory engine. Every field has a default so an empty
//! `[engine]` table (or none at all) is a valid configuration.

use crate::WeftError;
use crate::layout::FORCE_DIRECTED;
use serde::{Deserialize, Serialize};

/// Default number of snapshots retained per graph.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 50;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl EngineConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), WeftError> {
        if self.history.max_snapshots == 0 {
            return Err(WeftError::Config(
                "history.max_snapshots must be at least 1".to_string(),
            ));
        }
        if self.layout.width <= 0.0 || self.layout.height <= 0.0 {
            return Err(WeftError::Config(format!(
                "layout canvas must be positive, got {}x{}",
                self.layout.width, self.layout.height
            )));
        }
        if self.layout.default.trim().is_empty() {
            return Err(WeftError::Config(
                "layout.default must name a layout".to_string(),
            ));
        }
        Ok(())
    }
}

/// Snapshot retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_snapshots: default_max_snapshots(),
        }
    }
}

/// Canvas and spacing used by the built-in layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Layout assigned to graphs initialized without an explicit one.
    #[serde(default = "default_layout")]
    pub default: String,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Vertical distance between hierarchy levels.
    #[serde(default = "default_level_spacing")]
    pub level_spacing: f64,
    #[serde(default = "default_grid_spacing")]
    pub grid_spacing: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default: default_layout(),
            width: default_width(),
            height: default_height(),
            level_spacing: default_level_spacing(),
            grid_spacing: default_grid_spacing(),
            margin: default_margin(),
        }
    }
}

fn default_max_snapshots() -> usize {
    DEFAULT_MAX_SNAPSHOTS
}

fn default_layout() -> String {
    FORCE_DIRECTED.to_string()
}

fn default_width() -> f64 {
    1000.0
}

fn default_height() -> f64 {
    800.0
}

fn default_level_spacing() -> f64 {
    120.0
}

fn default_grid_spacing() -> f64 {
    150.0
}

fn default_margin() -> f64 {
    50.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.history.max_snapshots, 50);
        assert_eq!(config.layout.default, "force-directed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"history": {"max_snapshots": 5}}"#).expect("parse");
        assert_eq!(config.history.max_snapshots, 5);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn zero_retention_is_rejected() {
        let mut config = EngineConfig::default();
        config.history.max_snapshots = 0;
        assert!(matches!(config.validate(), Err(WeftError::Config(_))));
    }
}
