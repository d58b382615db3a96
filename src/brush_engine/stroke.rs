use crate::brush_engine::footprint::{Edge, Footprint};
use crate::canvas::blend::{alpha_over, blend_erase};
use crate::canvas::layer_stack::LayerStack;
use crate::error::{EngineError, Result};
use crate::utils::color::Pixel;
use crate::utils::profiler::ScopeTimer;
use crate::utils::vector::Vec2;

/// What a stroke does to the pixels under its footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
enum StrokeMode {
    Paint(Pixel),
    Erase,
}

/// Turns pointer samples into pixel writes on one layer.
pub struct StrokeRasterizer;

impl StrokeRasterizer {
    /// Draw an anti-aliased polyline of diameter `size` in `color` at `opacity`.
    ///
    /// A single point is accepted and draws nothing.
    pub fn paint_stroke(
        stack: &mut LayerStack,
        layer: usize,
        points: &[Vec2],
        size: f32,
        opacity: f32,
        color: Pixel,
    ) -> Result<()> {
        Self::rasterize(stack, layer, points, size, opacity, StrokeMode::Paint(color))
    }

    /// Scale destination alpha by `1 - opacity` under a hard-edged polyline.
    pub fn erase_stroke(
        stack: &mut LayerStack,
        layer: usize,
        points: &[Vec2],
        size: f32,
        opacity: f32,
    ) -> Result<()> {
        Self::rasterize(stack, layer, points, size, opacity, StrokeMode::Erase)
    }

    fn rasterize(
        stack: &mut LayerStack,
        layer: usize,
        points: &[Vec2],
        size: f32,
        opacity: f32,
        mode: StrokeMode,
    ) -> Result<()> {
        validate(points, size, opacity)?;
        let (width, height) = (stack.width(), stack.height());
        let grid = stack.layer_mut(layer)?.pixels_mut();
        if opacity == 0.0 {
            return Ok(());
        }

        let _timer = ScopeTimer::new("stroke");
        let edge = match mode {
            StrokeMode::Paint(_) => Edge::AntiAliased,
            StrokeMode::Erase => Edge::Hard,
        };
        let Some(footprint) = Footprint::polyline(points, size / 2.0, edge, width, height) else {
            return Ok(());
        };

        let ts = grid.tile_size();
        for region in footprint.tile_regions(ts) {
            let tile_x0 = region.tx * ts;
            let tile_y0 = region.ty * ts;
            // Erasing never needs to materialise a tile that isn't there.
            if mode == StrokeMode::Erase && !grid.is_tile_allocated(region.tx, region.ty) {
                continue;
            }
            let tile = grid.tile_mut(region.tx, region.ty)?;
            let data = tile.pixels_mut();
            for ly in region.y0..region.y0 + region.height {
                for lx in region.x0..region.x0 + region.width {
                    let cov = footprint.get(tile_x0 + lx, tile_y0 + ly);
                    if cov <= 0.0 {
                        continue;
                    }
                    let px = &mut data[ly * ts + lx];
                    *px = match mode {
                        StrokeMode::Paint(color) => alpha_over(color, *px, opacity * cov),
                        StrokeMode::Erase => blend_erase(*px, opacity * cov),
                    };
                }
            }
        }
        Ok(())
    }
}

fn validate(points: &[Vec2], size: f32, opacity: f32) -> Result<()> {
    if points.is_empty() {
        return Err(EngineError::invalid("stroke needs at least one point"));
    }
    if let Some(p) = points.iter().find(|p| !p.is_finite()) {
        return Err(EngineError::invalid(format!("non-finite stroke point {p:?}")));
    }
    if !size.is_finite() || size <= 0.0 {
        return Err(EngineError::invalid(format!("stroke size must be > 0, got {size}")));
    }
    if !(0.0..=1.0).contains(&opacity) {
        return Err(EngineError::invalid(format!("stroke opacity must be in [0, 1], got {opacity}")));
    }
    Ok(())
}
