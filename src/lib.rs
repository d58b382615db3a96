pub mod brush_engine;
pub mod canvas;
pub mod document;
pub mod error;
pub mod filters;
pub mod settings;
pub mod utils;

pub use brush_engine::StrokeRasterizer;
pub use canvas::{BlendMode, Layer, LayerStack, Snapshot, TileGrid, UndoManager};
pub use document::Document;
pub use error::{EngineError, Result};
pub use filters::{Filter, FilterEngine, FilterParams, InpaintMethod, ParamValue};
pub use settings::EngineSettings;
pub use utils::color::{Pixel, PixelBuffer};
pub use utils::vector::Vec2;
