use crate::utils::vector::Vec2;

/// Edge profile of a round stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// One pixel of linear falloff around the radius.
    AntiAliased,
    /// Full coverage up to and including the radius, nothing beyond.
    Hard,
}

impl Edge {
    #[inline]
    fn coverage(self, radius: f32, distance: f32) -> f32 {
        match self {
            Edge::AntiAliased => (radius + 0.5 - distance).clamp(0.0, 1.0),
            Edge::Hard => {
                if distance <= radius {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Part of a tile touched by a footprint, in tile-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRegion {
    pub tx: usize,
    pub ty: usize,
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

/// Coverage (0..1) of a thick polyline over its clipped bounding box.
///
/// Each pixel holds the maximum coverage over every segment, so a stroke
/// touches a pixel at most once regardless of how often it doubles back.
#[derive(Clone, Debug)]
pub struct Footprint {
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
    coverage: Vec<f32>,
    /// Covered canvas columns `(first, last)` per row, if any.
    spans: Vec<Option<(usize, usize)>>,
}

impl Footprint {
    /// Rasterise the segments between consecutive `points`. Returns `None`
    /// when there is no segment or nothing on the canvas is covered.
    ///
    /// Every segment is only visited over the rows and columns its capsule
    /// reaches, so the cost follows the painted area rather than the size
    /// of the stroke's bounding box.
    pub fn polyline(
        points: &[Vec2],
        radius: f32,
        edge: Edge,
        canvas_width: usize,
        canvas_height: usize,
    ) -> Option<Self> {
        if points.len() < 2 || canvas_width == 0 || canvas_height == 0 {
            return None;
        }
        let reach = radius + 1.0;
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x - reach);
            min_y = min_y.min(p.y - reach);
            max_x = max_x.max(p.x + reach);
            max_y = max_y.max(p.y + reach);
        }
        let last_x = (canvas_width - 1) as f32;
        let last_y = (canvas_height - 1) as f32;
        if max_x < 0.0 || max_y < 0.0 || min_x > last_x || min_y > last_y {
            return None;
        }
        let x0 = min_x.floor().clamp(0.0, last_x) as usize;
        let y0 = min_y.floor().clamp(0.0, last_y) as usize;
        let x1 = max_x.ceil().clamp(0.0, last_x) as usize;
        let y1 = max_y.ceil().clamp(0.0, last_y) as usize;
        let width = x1 - x0 + 1;
        let height = y1 - y0 + 1;

        let mut footprint = Self {
            x0,
            y0,
            width,
            height,
            coverage: vec![0.0; width * height],
            spans: vec![None; height],
        };
        for pair in points.windows(2) {
            footprint.add_segment(pair[0], pair[1], radius, reach, edge);
        }
        footprint.spans.iter().any(Option::is_some).then_some(footprint)
    }

    fn add_segment(&mut self, a: Vec2, b: Vec2, radius: f32, reach: f32, edge: Edge) {
        let (bx0, by0) = (self.x0 as f32, self.y0 as f32);
        let bx1 = (self.x0 + self.width - 1) as f32;
        let by1 = (self.y0 + self.height - 1) as f32;
        let top = (a.y.min(b.y) - reach).floor().max(by0);
        let bottom = (a.y.max(b.y) + reach).ceil().min(by1);
        if top > bottom {
            return;
        }
        for y in top as usize..=bottom as usize {
            let py = y as f32;
            let Some((lo, hi)) = capsule_span(a, b, reach, py) else {
                continue;
            };
            let lo = lo.floor().max(bx0);
            let hi = hi.ceil().min(bx1);
            if lo > hi {
                continue;
            }
            let row = (y - self.y0) * self.width;
            let mut covered: Option<(usize, usize)> = None;
            for x in lo as usize..=hi as usize {
                let d = Vec2::new(x as f32, py).distance_to_segment(a, b);
                let cov = edge.coverage(radius, d);
                if cov <= 0.0 {
                    continue;
                }
                let cell = &mut self.coverage[row + x - self.x0];
                *cell = cell.max(cov);
                covered = Some(covered.map_or((x, x), |(first, _)| (first, x)));
            }
            if let Some((first, last)) = covered {
                let span = &mut self.spans[y - self.y0];
                *span = Some(match *span {
                    Some((f, l)) => (f.min(first), l.max(last)),
                    None => (first, last),
                });
            }
        }
    }

    /// Coverage at a canvas pixel; zero outside the footprint.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < self.x0 || y < self.y0 || x >= self.x0 + self.width || y >= self.y0 + self.height {
            return 0.0;
        }
        self.coverage[(y - self.y0) * self.width + (x - self.x0)]
    }

    /// Per-tile regions holding every covered pixel, in row-major tile order.
    /// Tiles the stroke does not cover are left out.
    pub fn tile_regions(&self, tile_size: usize) -> Vec<TileRegion> {
        let ts = tile_size.max(1);
        let first_tx = self.x0 / ts;
        let tiles_across = (self.x0 + self.width - 1) / ts - first_tx + 1;
        let mut regions = Vec::new();
        let mut band: Vec<Option<(usize, usize, usize, usize)>> = vec![None; tiles_across];
        let mut band_ty = self.y0 / ts;

        let mut flush = |band: &mut Vec<Option<(usize, usize, usize, usize)>>, ty: usize| {
            for (i, slot) in band.iter_mut().enumerate() {
                if let Some((min_x, max_x, min_y, max_y)) = slot.take() {
                    let tx = first_tx + i;
                    regions.push(TileRegion {
                        tx,
                        ty,
                        x0: min_x - tx * ts,
                        y0: min_y - ty * ts,
                        width: max_x - min_x + 1,
                        height: max_y - min_y + 1,
                    });
                }
            }
        };

        for (row, span) in self.spans.iter().enumerate() {
            let y = self.y0 + row;
            if y / ts != band_ty {
                flush(&mut band, band_ty);
                band_ty = y / ts;
            }
            let Some((first, last)) = *span else {
                continue;
            };
            for tx in first / ts..=last / ts {
                let min_x = first.max(tx * ts);
                let max_x = last.min(tx * ts + ts - 1);
                let slot = &mut band[tx - first_tx];
                *slot = Some(match *slot {
                    Some((a, b, c, _)) => (a.min(min_x), b.max(max_x), c, y),
                    None => (min_x, max_x, y, y),
                });
            }
        }
        flush(&mut band, band_ty);
        regions
    }
}

/// Horizontal extent, on row `y`, of the points within `reach` of the
/// segment `a..b`. The capsule is convex, so this is a single interval.
fn capsule_span(a: Vec2, b: Vec2, reach: f32, y: f32) -> Option<(f32, f32)> {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    let mut include = |x: f32| {
        lo = lo.min(x);
        hi = hi.max(x);
    };
    // end caps
    for c in [a, b] {
        let dy = y - c.y;
        if dy.abs() <= reach {
            let half = (reach * reach - dy * dy).sqrt();
            include(c.x - half);
            include(c.x + half);
        }
    }
    // body: rectangle of half-width `reach` around the segment
    let d = b - a;
    let len = d.length();
    if len > f32::EPSILON {
        let n = Vec2::new(-d.y, d.x) * (reach / len);
        let corners = [a + n, b + n, b - n, a - n];
        for i in 0..4 {
            let (p, q) = (corners[i], corners[(i + 1) % 4]);
            if y < p.y.min(q.y) || y > p.y.max(q.y) {
                continue;
            }
            if p.y == q.y {
                include(p.x);
                include(q.x);
            } else {
                include(p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y));
            }
        }
    }
    (lo <= hi).then_some((lo, hi))
}
