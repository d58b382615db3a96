pub mod footprint;
pub mod stroke;

pub use stroke::StrokeRasterizer;
