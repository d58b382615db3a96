use crate::canvas::tile_grid::TileGrid;
use crate::error::{EngineError, Result};

/// How a layer combines with what is below it.
///
/// Every mode currently composites with the Normal "over" formula; the
/// others are carried as metadata so documents keep the user's choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    SoftLight,
    HardLight,
}

impl BlendMode {
    pub const ALL: [BlendMode; 6] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::SoftLight,
        BlendMode::HardLight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::SoftLight => "soft_light",
            BlendMode::HardLight => "hard_light",
        }
    }

    /// Parse a mode name. Known but unimplemented modes are `UnsupportedOperation`.
    pub fn from_name(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        if let Some(mode) = Self::ALL.iter().find(|m| m.name() == key) {
            return Ok(*mode);
        }
        match key.as_str() {
            "color_dodge" | "color_burn" | "darken" | "lighten" | "difference" | "exclusion" => Err(
                EngineError::UnsupportedOperation(format!("blend mode '{name}'")),
            ),
            _ => Err(EngineError::invalid(format!("unknown blend mode '{name}'"))),
        }
    }
}

/// Single painting layer: tile storage plus display metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    name: String,
    visible: bool,
    opacity: f32,
    blend_mode: BlendMode,
    pixels: TileGrid,
}

impl Layer {
    /// Fully transparent, visible, opaque, Normal layer.
    pub fn new(name: impl Into<String>, width: usize, height: usize, tile_size: usize) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            pixels: TileGrid::with_tile_size(width, height, tile_size),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to [0, 1].
    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        if !opacity.is_finite() {
            return Err(EngineError::invalid(format!("layer opacity {opacity}")));
        }
        self.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Whether compositing would draw anything from this layer.
    pub fn contributes(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    pub fn pixels(&self) -> &TileGrid {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut TileGrid {
        &mut self.pixels
    }
}
