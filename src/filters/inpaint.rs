use image::{GrayImage, Luma};
use wide::f32x4;

use crate::canvas::tile_grid::TileGrid;
use crate::error::{EngineError, Result};
use crate::utils::color::{Pixel, PixelBuffer};
use crate::utils::vector::Vec2;

/// Smoothing passes run over the filled region by the Navier-Stokes method.
const DIFFUSION_PASSES: usize = 4;

/// Neighbourhood weighting used while filling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InpaintMethod {
    /// Closer known pixels dominate (inverse squared distance).
    Telea,
    /// Uniform averaging followed by diffusion passes.
    NavierStokes,
}

impl InpaintMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "telea" => Ok(InpaintMethod::Telea),
            "navier_stokes" | "navier-stokes" | "ns" => Ok(InpaintMethod::NavierStokes),
            other => Err(EngineError::invalid(format!("unknown inpaint method '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InpaintMethod::Telea => "telea",
            InpaintMethod::NavierStokes => "navier_stokes",
        }
    }
}

/// Pixels to fill: 255 in the mask.
///
/// With `points`, the union of discs of `radius` around each point.
/// Without, every fully transparent pixel inside the bounding box of the
/// layer's visible content.
pub fn hole_mask(grid: &TileGrid, radius: u32, points: Option<&[Vec2]>) -> GrayImage {
    let (w, h) = (grid.width() as u32, grid.height() as u32);
    let mut mask = GrayImage::new(w, h);
    match points {
        Some(points) => {
            let r = radius as f32;
            for p in points {
                let min_x = (p.x - r).floor().max(0.0) as u32;
                let min_y = (p.y - r).floor().max(0.0) as u32;
                let max_x = (p.x + r).ceil().min(w as f32 - 1.0);
                let max_y = (p.y + r).ceil().min(h as f32 - 1.0);
                if max_x < 0.0 || max_y < 0.0 {
                    continue;
                }
                for y in min_y..=max_y as u32 {
                    for x in min_x..=max_x as u32 {
                        let (dx, dy) = (x as f32 - p.x, y as f32 - p.y);
                        if dx * dx + dy * dy <= r * r {
                            mask.put_pixel(x, y, Luma([255]));
                        }
                    }
                }
            }
        }
        None => {
            if let Some((x0, y0, x1, y1)) = grid.content_bounds() {
                for y in y0..y1 {
                    for x in x0..x1 {
                        if grid.get_pixel(x as i32, y as i32).a == 0 {
                            mask.put_pixel(x as u32, y as u32, Luma([255]));
                        }
                    }
                }
            }
        }
    }
    mask
}

/// Fill the hole mask from its surroundings, outside in.
pub fn inpaint(
    grid: &mut TileGrid,
    method: InpaintMethod,
    radius: u32,
    points: Option<&[Vec2]>,
) -> Result<()> {
    let mask = hole_mask(grid, radius, points);
    let mut buffer = grid.to_buffer();
    let filled = fill_holes(&mut buffer, &mask, method, radius.max(1));
    for idx in filled {
        let (x, y) = (idx % buffer.width(), idx / buffer.width());
        let p = buffer.pixels()[idx];
        if grid.get_pixel(x as i32, y as i32) != p {
            grid.set_pixel(x as i32, y as i32, p)?;
        }
    }
    Ok(())
}

/// Onion-peel fill of `buffer` where `mask` is set. Returns the indices of
/// every pixel that was filled.
fn fill_holes(
    buffer: &mut PixelBuffer,
    mask: &GrayImage,
    method: InpaintMethod,
    radius: u32,
) -> Vec<usize> {
    let (w, h) = (buffer.width(), buffer.height());
    let mut known: Vec<bool> = mask.pixels().map(|m| m.0[0] == 0).collect();
    let mut remaining: Vec<usize> = (0..w * h).filter(|&i| !known[i]).collect();
    let mut filled = Vec::with_capacity(remaining.len());
    let r = radius as i64;

    while !remaining.is_empty() {
        let mut updates = Vec::new();
        for &idx in &remaining {
            let (x, y) = ((idx % w) as i64, (idx / w) as i64);
            let mut colour = f32x4::ZERO;
            let mut alpha = 0.0f32;
            let mut total = 0.0f32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let d2 = (dx * dx + dy * dy) as f32;
                    if d2 == 0.0 || d2 > (r * r) as f32 {
                        continue;
                    }
                    let (sx, sy) = (x + dx, y + dy);
                    if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                        continue;
                    }
                    let sidx = sy as usize * w + sx as usize;
                    if !known[sidx] {
                        continue;
                    }
                    let weight = match method {
                        InpaintMethod::Telea => 1.0 / d2,
                        InpaintMethod::NavierStokes => 1.0,
                    };
                    let p = buffer.pixels()[sidx];
                    let wa = weight * p.a as f32;
                    colour += p.to_f32x4() * f32x4::splat(wa);
                    alpha += wa;
                    total += weight;
                }
            }
            if total > 0.0 {
                updates.push((idx, resolve(colour, alpha, total)));
            }
        }
        if updates.is_empty() {
            break;
        }
        for &(idx, p) in &updates {
            buffer.pixels_mut()[idx] = p;
            known[idx] = true;
            filled.push(idx);
        }
        remaining.retain(|&i| !known[i]);
    }

    if method == InpaintMethod::NavierStokes {
        diffuse(buffer, &filled);
    }
    filled
}

/// Turn alpha-weighted sums back into a straight-alpha pixel.
fn resolve(colour: f32x4, alpha: f32, total: f32) -> Pixel {
    if alpha <= 0.0 {
        return Pixel::TRANSPARENT;
    }
    let mut lanes = (colour / f32x4::splat(alpha)).to_array();
    lanes[3] = alpha / total;
    Pixel::from_f32x4(f32x4::from(lanes))
}

/// Jacobi smoothing of the filled pixels from their 4-neighbours.
fn diffuse(buffer: &mut PixelBuffer, filled: &[usize]) {
    let (w, h) = (buffer.width(), buffer.height());
    for _ in 0..DIFFUSION_PASSES {
        let prev = buffer.pixels().to_vec();
        for &idx in filled {
            let (x, y) = (idx % w, idx / w);
            let mut colour = f32x4::ZERO;
            let mut alpha = 0.0f32;
            let mut count = 0.0f32;
            let neighbours = [
                (x > 0).then(|| idx - 1),
                (x + 1 < w).then(|| idx + 1),
                (y > 0).then(|| idx - w),
                (y + 1 < h).then(|| idx + w),
            ];
            for n in neighbours.into_iter().flatten() {
                let p = prev[n];
                let a = p.a as f32;
                colour += p.to_f32x4() * f32x4::splat(a);
                alpha += a;
                count += 1.0;
            }
            if count > 0.0 {
                buffer.pixels_mut()[idx] = resolve(colour, alpha, count);
            }
        }
    }
}
