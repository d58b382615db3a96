use rayon::prelude::*;
use wide::f32x4;

use crate::canvas::tile_grid::TileGrid;
use crate::error::Result;
use crate::utils::color::{Pixel, PixelBuffer};

/// Normalised 1-D Gaussian with `2 * radius + 1` taps.
///
/// Sigma is derived from the tap count the same way common imaging
/// libraries do when only a kernel size is given.
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let radius = radius as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = 0.3 * (radius as f32 - 1.0) + 0.8;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..radius * 2 + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let inv = 1.0 / kernel.iter().sum::<f32>();
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Separable Gaussian over all four channels, edges clamped. Rows run in parallel.
pub fn blur_buffer(src: &PixelBuffer, radius: u32) -> PixelBuffer {
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 || radius == 0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(radius);
    let r = kernel.len() / 2;
    let input: Vec<f32x4> = src.pixels().iter().map(|p| p.to_f32x4()).collect();

    let mut horizontal = vec![f32x4::ZERO; w * h];
    horizontal
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row_in = &input[y * w..(y + 1) * w];
            for (x, out) in row_out.iter_mut().enumerate() {
                let mut acc = f32x4::ZERO;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x + ki).saturating_sub(r).min(w - 1);
                    acc += row_in[sx] * f32x4::splat(kv);
                }
                *out = acc;
            }
        });

    let mut out = PixelBuffer::new(w, h);
    out.pixels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row_out)| {
            for (x, out) in row_out.iter_mut().enumerate() {
                let mut acc = f32x4::ZERO;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sy = (y + ki).saturating_sub(r).min(h - 1);
                    acc += horizontal[sy * w + x] * f32x4::splat(kv);
                }
                *out = Pixel::from_f32x4(acc);
            }
        });
    out
}

pub fn gaussian_blur(grid: &mut TileGrid, radius: u32) -> Result<()> {
    if grid.tile_count() == 0 {
        return Ok(());
    }
    let blurred = blur_buffer(&grid.to_buffer(), radius);
    grid.write_buffer(&blurred)
}

/// Add `(original - blurred) * amount` to each colour channel whose
/// difference exceeds `threshold`. Alpha is left as is.
pub fn unsharp_mask(grid: &mut TileGrid, radius: u32, amount: f32, threshold: u8) -> Result<()> {
    if grid.tile_count() == 0 {
        return Ok(());
    }
    let mut original = grid.to_buffer();
    let blurred = blur_buffer(&original, radius);
    let threshold = threshold as f32;
    original
        .pixels_mut()
        .par_iter_mut()
        .zip(blurred.pixels().par_iter())
        .for_each(|(px, soft)| {
            let sharpen = |orig: u8, soft: u8| -> u8 {
                let diff = orig as f32 - soft as f32;
                if diff.abs() <= threshold {
                    return orig;
                }
                (orig as f32 + diff * amount).round().clamp(0.0, 255.0) as u8
            };
            px.r = sharpen(px.r, soft.r);
            px.g = sharpen(px.g, soft.g);
            px.b = sharpen(px.b, soft.b);
        });
    grid.write_buffer(&original)
}
