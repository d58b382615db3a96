use crate::brush_engine::StrokeRasterizer;
use crate::canvas::history::{Snapshot, UndoManager};
use crate::canvas::layer::BlendMode;
use crate::canvas::layer_stack::LayerStack;
use crate::error::{EngineError, Result};
use crate::filters::{FilterEngine, FilterParams};
use crate::settings::EngineSettings;
use crate::utils::codec::{self, ExportFormat};
use crate::utils::color::{Pixel, PixelBuffer};
use crate::utils::vector::Vec2;

/// An open image: the layer stack, its undo history and the settings it
/// was created with. Every mutating call here is undoable.
#[derive(Debug)]
pub struct Document {
    stack: LayerStack,
    history: UndoManager,
    settings: EngineSettings,
}

impl Document {
    /// Blank document of the default size with an opaque "Background" layer.
    pub fn new(settings: EngineSettings) -> Result<Self> {
        Self::with_size(settings.default_width, settings.default_height, settings)
    }

    pub fn with_size(width: usize, height: usize, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        if width == 0 || height == 0 {
            return Err(EngineError::invalid(format!("canvas size {width}x{height}")));
        }
        let mut stack = LayerStack::with_tile_size(width, height, settings.tile_size);
        let bg = stack.add_layer("Background");
        stack.layer_mut(bg)?.pixels_mut().fill(settings.background)?;
        log::debug!("new document {width}x{height}");
        Ok(Self::from_stack(stack, settings))
    }

    /// Decode an encoded image into a single-layer document.
    pub fn open(bytes: &[u8], settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        let buffer = codec::decode(bytes)?;
        Self::from_buffer(&buffer, settings)
    }

    /// Seed the bottom layer with `buffer`.
    pub fn from_buffer(buffer: &PixelBuffer, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        let mut stack = LayerStack::with_tile_size(buffer.width(), buffer.height(), settings.tile_size);
        let bg = stack.add_layer("Background");
        stack.layer_mut(bg)?.pixels_mut().write_buffer(buffer)?;
        log::debug!("opened {}x{} image", buffer.width(), buffer.height());
        Ok(Self::from_stack(stack, settings))
    }

    fn from_stack(stack: LayerStack, settings: EngineSettings) -> Self {
        Self {
            stack,
            history: UndoManager::with_capacity(settings.undo_capacity),
            settings,
        }
    }

    /// Encode the flattened image.
    pub fn save(&self, format: ExportFormat) -> Result<Vec<u8>> {
        codec::encode(&self.stack.composite(), format)
    }

    pub fn composite(&self) -> PixelBuffer {
        self.stack.composite()
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn width(&self) -> usize {
        self.stack.width()
    }

    pub fn height(&self) -> usize {
        self.stack.height()
    }

    /// Run `op` against the stack and record a checkpoint only if it succeeds.
    /// On failure the stack is put back exactly as it was.
    fn edit<T>(&mut self, label: &str, op: impl FnOnce(&mut LayerStack) -> Result<T>) -> Result<T> {
        let snapshot = Snapshot::capture(&self.stack, label);
        match op(&mut self.stack) {
            Ok(out) => {
                self.history.commit(snapshot);
                Ok(out)
            }
            Err(e) => {
                self.stack = snapshot.into_stack();
                Err(e)
            }
        }
    }

    fn active_index(&self) -> Result<usize> {
        self.stack
            .active()
            .ok_or_else(|| EngineError::OutOfRange("document has no layers".into()))
    }

    pub fn paint_stroke(&mut self, points: &[Vec2], size: f32, opacity: f32, color: Pixel) -> Result<()> {
        let layer = self.active_index()?;
        self.edit("Brush Stroke", |stack| {
            StrokeRasterizer::paint_stroke(stack, layer, points, size, opacity, color)
        })
    }

    pub fn erase_stroke(&mut self, points: &[Vec2], size: f32, opacity: f32) -> Result<()> {
        let layer = self.active_index()?;
        self.edit("Eraser", |stack| {
            StrokeRasterizer::erase_stroke(stack, layer, points, size, opacity)
        })
    }

    /// Apply a named filter to the active layer.
    pub fn apply_filter(&mut self, name: &str, params: &FilterParams) -> Result<()> {
        let layer = self.active_index()?;
        let label = format!("Filter: {name}");
        self.edit(&label, |stack| FilterEngine::apply(stack, layer, name, params))
    }

    pub fn add_layer(&mut self, name: &str) -> Result<usize> {
        self.edit("Add Layer", |stack| Ok(stack.add_layer(name)))
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<()> {
        self.edit("Delete Layer", |stack| stack.remove_layer(index))
    }

    /// Selecting a layer is not an edit and is not recorded.
    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.stack.set_active(index)
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.edit("Move Layer", |stack| stack.move_layer(from, to))
    }

    pub fn duplicate_layer(&mut self, index: usize) -> Result<usize> {
        self.edit("Duplicate Layer", |stack| stack.duplicate_layer(index))
    }

    pub fn merge_down(&mut self, index: usize) -> Result<()> {
        self.edit("Merge Down", |stack| stack.merge_down(index))
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        self.edit("Rename Layer", |stack| {
            stack.layer_mut(index)?.set_name(name);
            Ok(())
        })
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.edit("Layer Visibility", |stack| {
            stack.layer_mut(index)?.set_visible(visible);
            Ok(())
        })
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.edit("Layer Opacity", |stack| stack.layer_mut(index)?.set_opacity(opacity))
    }

    pub fn set_layer_blend_mode(&mut self, index: usize, mode: BlendMode) -> Result<()> {
        self.edit("Blend Mode", |stack| {
            stack.layer_mut(index)?.set_blend_mode(mode);
            Ok(())
        })
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.stack)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.stack)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
