use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::utils::color::{Pixel, PixelBuffer};

/// Edge length of a tile when settings don't say otherwise.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Square block of `tile_size * tile_size` pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pixels: Vec<Pixel>,
}

impl Tile {
    /// Allocate a tile without aborting on allocation failure.
    fn try_filled(len: usize, color: Pixel) -> Result<Self> {
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| EngineError::AllocationFailure {
                bytes: len * std::mem::size_of::<Pixel>(),
            })?;
        pixels.resize(len, color);
        Ok(Self { pixels })
    }

    fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::try_filled(self.pixels.len(), Pixel::TRANSPARENT)?;
        copy.pixels.copy_from_slice(&self.pixels);
        Ok(copy)
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
}

/// Sparse pixel storage for one layer, chunked into lazily allocated tiles.
///
/// Tiles are shared between clones and copied on first write, so cloning a
/// grid is proportional to the number of allocated tiles while every clone
/// still behaves as an independent deep copy.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: usize,
    tiles_x: usize,
    tiles_y: usize,
    tiles: HashMap<(usize, usize), Arc<Tile>>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_tile_size(width, height, DEFAULT_TILE_SIZE)
    }

    /// Create an empty grid. A zero tile size is bumped to 1.
    pub fn with_tile_size(width: usize, height: usize, tile_size: usize) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            width,
            height,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
            tiles: HashMap::new(),
        }
    }

    /// Build a grid holding `buffer`; fully transparent tiles stay unallocated.
    pub fn from_buffer(buffer: &PixelBuffer, tile_size: usize) -> Result<Self> {
        let mut grid = Self::with_tile_size(buffer.width(), buffer.height(), tile_size);
        grid.write_buffer(buffer)?;
        Ok(grid)
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

    /// Number of tile columns covering the logical width.
    pub fn tiles_x(&self) -> usize {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> usize {
        self.tiles_y
    }

    /// Number of materialised tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_tile_allocated(&self, tx: usize, ty: usize) -> bool {
        self.tiles.contains_key(&(tx, ty))
    }

    /// Coordinates of every materialised tile, in row-major order.
    pub fn allocated_tiles(&self) -> Vec<(usize, usize)> {
        let mut coords: Vec<_> = self.tiles.keys().copied().collect();
        coords.sort_unstable_by_key(|&(tx, ty)| (ty, tx));
        coords
    }

    pub fn tile(&self, tx: usize, ty: usize) -> Option<&Tile> {
        self.tiles.get(&(tx, ty)).map(|t| t.as_ref())
    }

    /// Pixel rectangle `(x0, y0, w, h)` of a tile clipped to the grid bounds.
    pub fn tile_rect(&self, tx: usize, ty: usize) -> (usize, usize, usize, usize) {
        let x0 = tx * self.tile_size;
        let y0 = ty * self.tile_size;
        let w = self.tile_size.min(self.width.saturating_sub(x0));
        let h = self.tile_size.min(self.height.saturating_sub(y0));
        (x0, y0, w, h)
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    fn locate(&self, x: usize, y: usize) -> ((usize, usize), usize) {
        let ts = self.tile_size;
        ((x / ts, y / ts), (y % ts) * ts + (x % ts))
    }

    /// Read a pixel; outside the bounds or in an unallocated tile this is transparent.
    pub fn get_pixel(&self, x: i32, y: i32) -> Pixel {
        if !self.contains(x, y) {
            return Pixel::TRANSPARENT;
        }
        let (key, idx) = self.locate(x as usize, y as usize);
        match self.tiles.get(&key) {
            Some(tile) => tile.pixels[idx],
            None => Pixel::TRANSPARENT,
        }
    }

    /// Write a pixel, materialising its tile. Writes outside the bounds are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, p: Pixel) -> Result<()> {
        self.update_pixel(x, y, |_| p)
    }

    /// Read-modify-write a single in-bounds pixel.
    pub fn update_pixel(&mut self, x: i32, y: i32, f: impl FnOnce(Pixel) -> Pixel) -> Result<()> {
        if !self.contains(x, y) {
            return Ok(());
        }
        let ((tx, ty), idx) = self.locate(x as usize, y as usize);
        let tile = self.tile_mut(tx, ty)?;
        tile.pixels[idx] = f(tile.pixels[idx]);
        Ok(())
    }

    /// Mutable access to a tile, allocating it (transparent) or un-sharing it first.
    pub(crate) fn tile_mut(&mut self, tx: usize, ty: usize) -> Result<&mut Tile> {
        let len = self.tile_size * self.tile_size;
        let slot = match self.tiles.entry((tx, ty)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Arc::new(Tile::try_filled(len, Pixel::TRANSPARENT)?)),
        };
        if Arc::strong_count(slot) > 1 {
            let copy = slot.try_clone()?;
            *slot = Arc::new(copy);
        }
        Ok(Arc::make_mut(slot))
    }

    /// Set every in-bounds pixel to `p`, materialising all tiles.
    pub fn fill(&mut self, p: Pixel) -> Result<()> {
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let (_, _, w, h) = self.tile_rect(tx, ty);
                let ts = self.tile_size;
                let tile = self.tile_mut(tx, ty)?;
                for row in tile.pixels.chunks_exact_mut(ts).take(h) {
                    row[..w].fill(p);
                }
            }
        }
        Ok(())
    }

    /// Drop every tile; the grid reads as fully transparent afterwards.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Flatten into a row-major buffer of `width * height` pixels.
    pub fn to_buffer(&self) -> PixelBuffer {
        let mut out = PixelBuffer::new(self.width, self.height);
        let width = self.width;
        for (&(tx, ty), tile) in &self.tiles {
            let (x0, y0, w, h) = self.tile_rect(tx, ty);
            let dst = out.pixels_mut();
            for row in 0..h {
                let src_start = row * self.tile_size;
                let dst_start = (y0 + row) * width + x0;
                dst[dst_start..dst_start + w].copy_from_slice(&tile.pixels[src_start..src_start + w]);
            }
        }
        out
    }

    /// Copy row `y` into `out` (which must be `width` long). Returns false
    /// when no tile on that row is allocated, leaving `out` transparent.
    pub fn read_row(&self, y: usize, out: &mut [Pixel]) -> bool {
        out.fill(Pixel::TRANSPARENT);
        if y >= self.height || self.tiles.is_empty() {
            return false;
        }
        let ty = y / self.tile_size;
        let row_start = (y % self.tile_size) * self.tile_size;
        let mut any = false;
        for tx in 0..self.tiles_x {
            let Some(tile) = self.tiles.get(&(tx, ty)) else {
                continue;
            };
            let (x0, _, w, _) = self.tile_rect(tx, ty);
            out[x0..x0 + w].copy_from_slice(&tile.pixels[row_start..row_start + w]);
            any = true;
        }
        any
    }

    /// Overwrite the grid with `buffer`, which must match the grid size.
    ///
    /// Regions that are fully transparent in `buffer` and unallocated in the
    /// grid stay unallocated.
    pub fn write_buffer(&mut self, buffer: &PixelBuffer) -> Result<()> {
        if buffer.width() != self.width || buffer.height() != self.height {
            return Err(EngineError::invalid(format!(
                "buffer is {}x{}, grid is {}x{}",
                buffer.width(),
                buffer.height(),
                self.width,
                self.height
            )));
        }
        let width = self.width;
        let ts = self.tile_size;
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let (x0, y0, w, h) = self.tile_rect(tx, ty);
                let src = buffer.pixels();
                let row_of = |row: usize| {
                    let start = (y0 + row) * width + x0;
                    &src[start..start + w]
                };
                if !self.is_tile_allocated(tx, ty)
                    && (0..h).all(|row| row_of(row).iter().all(|p| *p == Pixel::TRANSPARENT))
                {
                    continue;
                }
                let tile = self.tile_mut(tx, ty)?;
                for row in 0..h {
                    let start = row * ts;
                    tile.pixels[start..start + w].copy_from_slice(row_of(row));
                }
            }
        }
        Ok(())
    }

    /// Bounding box `(x0, y0, x1, y1)` (exclusive max) of pixels with alpha > 0.
    pub fn content_bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (&(tx, ty), tile) in &self.tiles {
            let (x0, y0, w, h) = self.tile_rect(tx, ty);
            for row in 0..h {
                for col in 0..w {
                    if tile.pixels[row * self.tile_size + col].a == 0 {
                        continue;
                    }
                    let (gx, gy) = (x0 + col, y0 + row);
                    bounds = Some(match bounds {
                        None => (gx, gy, gx + 1, gy + 1),
                        Some((a, b, c, d)) => (a.min(gx), b.min(gy), c.max(gx + 1), d.max(gy + 1)),
                    });
                }
            }
        }
        bounds
    }
}

impl PartialEq for TileGrid {
    /// Grids are equal when they have the same geometry and read back the
    /// same pixels; an allocated all-transparent tile equals an absent one.
    fn eq(&self, other: &Self) -> bool {
        if self.width != other.width
            || self.height != other.height
            || self.tile_size != other.tile_size
        {
            return false;
        }
        let blank = |t: &Tile| t.pixels.iter().all(|p| *p == Pixel::TRANSPARENT);
        let covered = |a: &Self, b: &Self| {
            a.tiles.iter().all(|(key, tile)| match b.tiles.get(key) {
                Some(other) => Arc::ptr_eq(tile, other) || tile.pixels == other.pixels,
                None => blank(tile.as_ref()),
            })
        };
        covered(self, other) && covered(other, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_outside_bounds_are_transparent_and_allocate_nothing() {
        let grid = TileGrid::with_tile_size(10, 10, 4);
        assert_eq!(grid.get_pixel(-1, 0), Pixel::TRANSPARENT);
        assert_eq!(grid.get_pixel(10, 3), Pixel::TRANSPARENT);
        assert_eq!(grid.get_pixel(3, 3), Pixel::TRANSPARENT);
        assert_eq!(grid.tile_count(), 0);
    }

    #[test]
    fn writes_materialise_only_the_touched_tile() {
        let mut grid = TileGrid::with_tile_size(10, 10, 4);
        grid.set_pixel(5, 9, Pixel::WHITE).unwrap();
        assert_eq!(grid.tile_count(), 1);
        assert!(grid.is_tile_allocated(1, 2));
        assert_eq!(grid.get_pixel(5, 9), Pixel::WHITE);
        assert_eq!(grid.get_pixel(4, 9), Pixel::TRANSPARENT);

        grid.set_pixel(10, 0, Pixel::WHITE).unwrap();
        grid.set_pixel(0, -1, Pixel::WHITE).unwrap();
        assert_eq!(grid.tile_count(), 1, "out of bounds writes must be ignored");
    }

    #[test]
    fn fill_covers_bounds_only() {
        let mut grid = TileGrid::with_tile_size(5, 3, 4);
        grid.fill(Pixel::BLACK).unwrap();
        assert_eq!(grid.tile_count(), 2);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(grid.get_pixel(x, y), Pixel::BLACK);
            }
        }
        // padding of the edge tile is outside the logical bounds
        let tile = grid.tile(1, 0).unwrap();
        assert_eq!(tile.pixels()[1], Pixel::TRANSPARENT);
        assert_eq!(grid.content_bounds(), Some((0, 0, 5, 3)));
    }

    #[test]
    fn clones_do_not_alias() {
        let mut grid = TileGrid::with_tile_size(8, 8, 4);
        grid.set_pixel(1, 1, Pixel::WHITE).unwrap();
        let snapshot = grid.clone();
        grid.set_pixel(1, 1, Pixel::BLACK).unwrap();
        grid.set_pixel(6, 6, Pixel::BLACK).unwrap();
        assert_eq!(snapshot.get_pixel(1, 1), Pixel::WHITE);
        assert_eq!(snapshot.get_pixel(6, 6), Pixel::TRANSPARENT);
        assert_eq!(snapshot.tile_count(), 1);
        assert_ne!(snapshot, grid);
    }

    #[test]
    fn buffer_round_trip_keeps_sparsity() {
        let mut buf = PixelBuffer::new(9, 9);
        buf.set(8, 8, Pixel::rgba(1, 2, 3, 4));
        let grid = TileGrid::from_buffer(&buf, 4).unwrap();
        assert_eq!(grid.tile_count(), 1);
        assert_eq!(grid.to_buffer(), buf);
    }

    #[test]
    fn read_row_spans_tiles() {
        let mut grid = TileGrid::with_tile_size(6, 6, 4);
        grid.set_pixel(5, 5, Pixel::WHITE).unwrap();
        let mut row = vec![Pixel::BLACK; 6];
        assert!(!grid.read_row(0, &mut row));
        assert!(row.iter().all(|p| *p == Pixel::TRANSPARENT));
        assert!(grid.read_row(5, &mut row));
        assert_eq!(row[5], Pixel::WHITE);
        assert_eq!(row[4], Pixel::TRANSPARENT);
    }

    #[test]
    fn blank_allocated_tile_equals_absent_tile() {
        let a = TileGrid::with_tile_size(8, 8, 4);
        let mut b = a.clone();
        b.set_pixel(0, 0, Pixel::TRANSPARENT).unwrap();
        assert_eq!(b.tile_count(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn write_buffer_rejects_wrong_size() {
        let mut grid = TileGrid::with_tile_size(4, 4, 4);
        let err = grid.write_buffer(&PixelBuffer::new(3, 4)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }
}
