pub mod blend;
pub mod history;
pub mod layer;
pub mod layer_stack;
pub mod tile_grid;

pub use history::{Snapshot, UndoManager};
pub use layer::{BlendMode, Layer};
pub use layer_stack::LayerStack;
pub use tile_grid::TileGrid;
