//! Spatial indexing for obstacle lookup

pub mod tile_grid;

pub use tile_grid::{TileEntity, TileGrid};
