use crate::canvas::blend::mix;
use crate::canvas::tile_grid::TileGrid;
use crate::error::Result;
use crate::utils::color::Pixel;
use crate::utils::vector::Vec2;

/// Round dab: integer offsets within `size / 2` and their falloff.
fn dab_offsets(size: f32) -> Vec<(i32, i32, f32)> {
    let r = (size / 2.0).max(0.5);
    let reach = r.ceil() as i32;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let d = (dx as f32).hypot(dy as f32);
            if d > r {
                continue;
            }
            offsets.push((dx, dy, (1.0 - d / (r + 1.0)).clamp(0.0, 1.0)));
        }
    }
    offsets
}

/// Clip `a..b` to the rectangle `min..=max` (Liang-Barsky).
fn clip_segment(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> Option<(Vec2, Vec2)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    let edges = [
        (-d.x, a.x - min.x),
        (d.x, max.x - a.x),
        (-d.y, a.y - min.y),
        (d.y, max.y - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
    }
    (t0 <= t1).then(|| (a + d * t0, a + d * t1))
}

/// Dab centres one pixel apart along the path, excluding the first point.
///
/// Segments are clipped to `min..=max` first; a dab centred outside it
/// cannot reach the canvas.
fn path_positions(points: &[Vec2], min: Vec2, max: Vec2) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    for pair in points.windows(2) {
        let Some((a, b)) = clip_segment(pair[0], pair[1], min, max) else {
            continue;
        };
        let steps = (b - a).length().ceil() as usize;
        for i in 1..=steps {
            let p = a + (b - a) * (i as f32 / steps as f32);
            let pos = (p.x.round() as i32, p.y.round() as i32);
            if out.last() != Some(&pos) {
                out.push(pos);
            }
        }
    }
    out
}

/// Drag colour picked up at the first point along the path.
///
/// Every dab mixes the carried colour into the layer with
/// `strength * falloff`, then picks up the result as the new carried colour.
pub fn smudge(grid: &mut TileGrid, size: f32, strength: f32, points: &[Vec2]) -> Result<()> {
    if strength <= 0.0 || points.len() < 2 {
        return Ok(());
    }
    let reach = (size / 2.0).max(0.5).ceil() + 1.0;
    let min = Vec2::new(-reach, -reach);
    let max = Vec2::new(grid.width() as f32 - 1.0 + reach, grid.height() as f32 - 1.0 + reach);

    let offsets = dab_offsets(size);
    // a dab centred outside `min..=max` only picks up transparency
    let start = (
        points[0].x.clamp(min.x, max.x).round() as i32,
        points[0].y.clamp(min.y, max.y).round() as i32,
    );
    let mut carried: Vec<Pixel> = offsets
        .iter()
        .map(|&(dx, dy, _)| grid.get_pixel(start.0 + dx, start.1 + dy))
        .collect();

    for (cx, cy) in path_positions(points, min, max) {
        for (pickup, &(dx, dy, falloff)) in carried.iter_mut().zip(&offsets) {
            let (x, y) = (cx + dx, cy + dy);
            if !grid.contains(x, y) {
                continue;
            }
            let under = grid.get_pixel(x, y);
            let smeared = mix(under, *pickup, strength * falloff);
            if smeared != under {
                grid.set_pixel(x, y, smeared)?;
            }
            *pickup = smeared;
        }
    }
    Ok(())
}
