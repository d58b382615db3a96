use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::error::{EngineError, Result};
use crate::utils::color::PixelBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    PNG,
    JPEG,
    TIFF,
    BMP,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::PNG => "PNG",
            ExportFormat::JPEG => "JPEG",
            ExportFormat::TIFF => "TIFF",
            ExportFormat::BMP => "BMP",
        }
    }

    /// Pick a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ExportFormat::PNG),
            "jpg" | "jpeg" => Some(ExportFormat::JPEG),
            "tif" | "tiff" => Some(ExportFormat::TIFF),
            "bmp" => Some(ExportFormat::BMP),
            _ => None,
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ExportFormat::PNG => ImageFormat::Png,
            ExportFormat::JPEG => ImageFormat::Jpeg,
            ExportFormat::TIFF => ImageFormat::Tiff,
            ExportFormat::BMP => ImageFormat::Bmp,
        }
    }
}

/// Decode any supported encoded image into an RGBA8 buffer.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (w, h) = img.dimensions();
    PixelBuffer::from_rgba_bytes(w as usize, h as usize, img.as_raw())
        .ok_or_else(|| EngineError::invalid("decoded image has inconsistent dimensions"))
}

/// Encode an RGBA8 buffer. JPEG has no alpha channel, so alpha is dropped there.
pub fn encode(buffer: &PixelBuffer, format: ExportFormat) -> Result<Vec<u8>> {
    let rgba = RgbaImage::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.to_rgba_bytes(),
    )
    .ok_or_else(|| EngineError::invalid("failed to build RGBA image"))?;

    let mut out = Cursor::new(Vec::new());
    match format {
        ExportFormat::JPEG => {
            image::DynamicImage::ImageRgba8(rgba)
                .to_rgb8()
                .write_to(&mut out, format.image_format())?;
        }
        _ => rgba.write_to(&mut out, format.image_format())?,
    }
    Ok(out.into_inner())
}
