use serde::{Deserialize, Serialize};
use wide::f32x4;

/// Straight (non-premultiplied) RGBA pixel with 8-bit channels.
///
/// Serialises as an `[r, g, b, a]` array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::rgba(0, 0, 0, 0);
    pub const WHITE: Pixel = Pixel::rgba(255, 255, 255, 255);
    pub const BLACK: Pixel = Pixel::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour convenience constructor.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_array(c: [u8; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }

    /// Channels as floats in 0..255, lane order r,g,b,a.
    #[inline]
    pub fn to_f32x4(self) -> f32x4 {
        f32x4::from([self.r as f32, self.g as f32, self.b as f32, self.a as f32])
    }

    /// Round each lane to nearest and clamp into 0..255.
    #[inline]
    pub fn from_f32x4(v: f32x4) -> Self {
        let c = v.round().max(f32x4::splat(0.0)).min(f32x4::splat(255.0)).to_array();
        Self::rgba(c[0] as u8, c[1] as u8, c[2] as u8, c[3] as u8)
    }
}

impl From<[u8; 4]> for Pixel {
    fn from(c: [u8; 4]) -> Self {
        Pixel::from_array(c)
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(p: Pixel) -> Self {
        p.to_array()
    }
}

/// Flattened, row-major image with no padding between rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl PixelBuffer {
    /// All-transparent buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Pixel::TRANSPARENT)
    }

    pub fn filled(width: usize, height: usize, color: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// Build from interleaved RGBA8 bytes (R,G,B,A order).
    pub fn from_rgba_bytes(width: usize, height: usize, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width * height * 4 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Pixel::rgba(c[0], c[1], c[2], c[3]))
            .collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Pixel at (x, y), transparent when outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Pixel {
        if x >= self.width || y >= self.height {
            return Pixel::TRANSPARENT;
        }
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, p: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = p;
        }
    }

    /// Interleaved RGBA8 bytes, row-major.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            bytes.extend_from_slice(&px.to_array());
        }
        bytes
    }
}
