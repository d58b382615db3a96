use serde::{Deserialize, Serialize};

use crate::canvas::history::DEFAULT_UNDO_CAPACITY;
use crate::canvas::tile_grid::DEFAULT_TILE_SIZE;
use crate::error::{EngineError, Result};
use crate::utils::color::Pixel;

/// Engine defaults, read once when a document is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    pub tile_size: usize,
    pub undo_capacity: usize,
    pub default_width: usize,
    pub default_height: usize,
    pub background: Pixel,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            default_width: 1920,
            default_height: 1080,
            background: Pixel::WHITE,
        }
    }
}

/// The parts of the application settings document the engine reads.
/// Everything else in the file is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    canvas: CanvasSection,
    performance: PerformanceSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CanvasSection {
    default_width: usize,
    default_height: usize,
    background_color: Pixel,
}

impl Default for CanvasSection {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            default_width: d.default_width,
            default_height: d.default_height,
            background_color: d.background,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PerformanceSection {
    tile_size: usize,
    max_undo_steps: usize,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            tile_size: d.tile_size,
            max_undo_steps: d.undo_capacity,
        }
    }
}

impl EngineSettings {
    /// Read engine defaults from an application settings document.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: SettingsFile = serde_json::from_str(text)?;
        let settings = Self {
            tile_size: file.performance.tile_size,
            undo_capacity: file.performance.max_undo_steps,
            default_width: file.canvas.default_width,
            default_height: file.canvas.default_height,
            background: file.canvas.background_color,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Like `from_json`, but falls back to defaults on any error.
    pub fn from_json_or_default(text: &str) -> Self {
        Self::from_json(text).unwrap_or_else(|e| {
            log::warn!("ignoring engine settings: {e}");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("tile_size", self.tile_size),
            ("undo_capacity", self.undo_capacity),
            ("default_width", self.default_width),
            ("default_height", self.default_height),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(EngineError::invalid(format!("setting '{name}' must be > 0")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_application_settings() {
        let json = r#"{
            "ui": { "theme": "dark" },
            "canvas": { "default_width": 640, "background_color": [0, 0, 0, 0] },
            "performance": { "tile_size": 64, "max_undo_steps": 10, "memory_limit_mb": 1024 }
        }"#;
        let s = EngineSettings::from_json(json).unwrap();
        assert_eq!(s.tile_size, 64);
        assert_eq!(s.undo_capacity, 10);
        assert_eq!(s.default_width, 640);
        assert_eq!(s.default_height, 1080);
        assert_eq!(s.background, Pixel::TRANSPARENT);
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(EngineSettings::from_json("{}").unwrap(), EngineSettings::default());
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = EngineSettings::from_json(r#"{"performance": {"tile_size": 0}}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert!(matches!(
            EngineSettings::from_json("not json"),
            Err(EngineError::Settings(_))
        ));
        assert_eq!(EngineSettings::from_json_or_default("[1, 2"), EngineSettings::default());
    }
}
