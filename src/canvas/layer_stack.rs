use rayon::prelude::*;

use crate::canvas::blend::alpha_over_row;
use crate::canvas::layer::Layer;
use crate::canvas::tile_grid::DEFAULT_TILE_SIZE;
use crate::error::{EngineError, Result};
use crate::utils::color::{Pixel, PixelBuffer};
use crate::utils::profiler::ScopeTimer;

/// Ordered layers (index 0 = bottom) of a fixed-size document.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStack {
    width: usize,
    height: usize,
    tile_size: usize,
    layers: Vec<Layer>,
    active: Option<usize>,
}

impl LayerStack {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_tile_size(width, height, DEFAULT_TILE_SIZE)
    }

    pub fn with_tile_size(width: usize, height: usize, tile_size: usize) -> Self {
        Self {
            width,
            height,
            tile_size: tile_size.max(1),
            layers: Vec::new(),
            active: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Index of the active layer, or -1 when the stack is empty.
    pub fn active_layer_index(&self) -> i32 {
        self.active.map_or(-1, |i| i as i32)
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.layers.get(i))
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        let len = self.layers.len();
        self.layers
            .get(index)
            .ok_or_else(|| EngineError::out_of_range("layer", index, len))
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or_else(|| EngineError::out_of_range("layer", index, len))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(EngineError::out_of_range("layer", index, self.layers.len()));
        }
        Ok(())
    }

    /// Append a transparent layer on top and make it active.
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        let layer = Layer::new(name, self.width, self.height, self.tile_size);
        log::debug!("add layer '{}' at {}", layer.name(), self.layers.len());
        self.layers.push(layer);
        let index = self.layers.len() - 1;
        self.active = Some(index);
        index
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let removed = self.layers.remove(index);
        log::debug!("remove layer '{}' at {}", removed.name(), index);
        self.active = match self.active {
            _ if self.layers.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) => Some(active.min(self.layers.len() - 1)),
            None => None,
        };
        Ok(())
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active = Some(index);
        Ok(())
    }

    /// Move a layer to a new position; the active index follows the layer it named.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        if let Some(active) = self.active {
            self.active = Some(if active == from {
                to
            } else if from < active && active <= to {
                active - 1
            } else if to <= active && active < from {
                active + 1
            } else {
                active
            });
        }
        Ok(())
    }

    /// Swap a layer with the one above it. Returns false if it is already on top.
    pub fn move_layer_up(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if index + 1 >= self.layers.len() {
            return Ok(false);
        }
        self.move_layer(index, index + 1)?;
        Ok(true)
    }

    /// Swap a layer with the one below it. Returns false if it is already at the bottom.
    pub fn move_layer_down(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(false);
        }
        self.move_layer(index, index - 1)?;
        Ok(true)
    }

    /// Insert a copy above `index` and make it active.
    pub fn duplicate_layer(&mut self, index: usize) -> Result<usize> {
        let mut copy = self.layer(index)?.clone();
        copy.set_name(format!("{} copy", copy.name()));
        self.layers.insert(index + 1, copy);
        self.active = Some(index + 1);
        Ok(index + 1)
    }

    /// Composite layer `index` onto the layer below it and remove it.
    ///
    /// The upper layer's opacity and visibility are honoured; the lower
    /// layer keeps its own metadata.
    pub fn merge_down(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if index == 0 {
            return Err(EngineError::invalid("bottom layer has nothing to merge into"));
        }
        let upper = self.layers.remove(index);
        if upper.contributes() {
            let opacity = upper.opacity();
            let lower = self.layers[index - 1].pixels_mut();
            for (tx, ty) in upper.pixels().allocated_tiles() {
                let Some(src) = upper.pixels().tile(tx, ty) else {
                    continue;
                };
                let dst = lower.tile_mut(tx, ty)?;
                alpha_over_row(src.pixels(), dst.pixels_mut(), opacity);
            }
        }
        log::debug!("merged layer '{}' down into {}", upper.name(), index - 1);
        if let Some(active) = self.active {
            if active >= index {
                self.active = Some(active - 1);
            }
        }
        Ok(())
    }

    /// Flatten every visible layer, bottom to top, into one buffer.
    ///
    /// Output pixels with zero alpha are always `Pixel::TRANSPARENT`, whatever
    /// colour the layers hold under them.
    pub fn composite(&self) -> PixelBuffer {
        let _timer = ScopeTimer::new("composite");
        let mut out = PixelBuffer::new(self.width, self.height);
        let width = self.width;
        if width == 0 || self.height == 0 {
            return out;
        }
        let layers: Vec<&Layer> = self.layers.iter().filter(|l| l.contributes()).collect();
        if layers.is_empty() {
            return out;
        }

        out.pixels_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each_init(
                || vec![Pixel::TRANSPARENT; width],
                |scratch, (y, row)| {
                    let mut empty = true;
                    for layer in &layers {
                        if !layer.pixels().read_row(y, scratch) {
                            continue;
                        }
                        if empty && layer.opacity() >= 1.0 {
                            row.copy_from_slice(scratch);
                        } else {
                            alpha_over_row(scratch, row, layer.opacity());
                        }
                        empty = false;
                    }
                    for px in row.iter_mut().filter(|p| p.a == 0) {
                        *px = Pixel::TRANSPARENT;
                    }
                },
            );
        out
    }

    /// `composite()` as interleaved RGBA8 bytes, row-major, no padding.
    pub fn composite_into_bytes(&self) -> Vec<u8> {
        self.composite().to_rgba_bytes()
    }
}
