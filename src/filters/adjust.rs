use crate::canvas::tile_grid::TileGrid;
use crate::error::Result;

/// Per-channel lookup for `v * (1 + contrast / 100) + brightness`.
pub fn brightness_contrast_lut(brightness: i32, contrast: i32) -> [u8; 256] {
    let scale = 1.0 + contrast as f32 / 100.0;
    let offset = brightness as f32;
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = (v as f32 * scale + offset).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Map the colour channels of every non-transparent pixel through `lut`.
///
/// Only allocated tiles are visited, so empty regions stay empty.
pub fn apply_rgb_lut(grid: &mut TileGrid, lut: &[u8; 256]) -> Result<()> {
    let ts = grid.tile_size();
    for (tx, ty) in grid.allocated_tiles() {
        let (_, _, w, h) = grid.tile_rect(tx, ty);
        let tile = grid.tile_mut(tx, ty)?;
        for row in tile.pixels_mut().chunks_exact_mut(ts).take(h) {
            for px in row[..w].iter_mut().filter(|p| p.a > 0) {
                px.r = lut[px.r as usize];
                px.g = lut[px.g as usize];
                px.b = lut[px.b as usize];
            }
        }
    }
    Ok(())
}

pub fn brightness_contrast(grid: &mut TileGrid, brightness: i32, contrast: i32) -> Result<()> {
    if brightness == 0 && contrast == 0 {
        return Ok(());
    }
    apply_rgb_lut(grid, &brightness_contrast_lut(brightness, contrast))
}
