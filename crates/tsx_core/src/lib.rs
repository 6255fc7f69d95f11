//! Core data structures for Tiled tilesets
//!
//! This crate reads and writes Tiled `.tsx` tileset documents:
//! - `Tileset` - Grid geometry, source image, per-tile probabilities and properties
//! - `TsxDocument` - Raw XML document model shared with the autotile crate
//! - `TilesetError` - Load errors carrying element, attribute and offending value
//!
//! # Example
//!
//! ```rust,ignore
//! use tsx_core::Tileset;
//!
//! let tileset = Tileset::load(&std::fs::read_to_string("maps/bg.tsx")?)?;
//! assert_eq!(tileset.rows(), 32);
//! assert_eq!(tileset.tile_probability(39), Some(0.5));
//! ```

mod color;
mod error;
pub mod format;
mod property;
mod tileset;

pub use color::Color;
pub use error::{parse_attr, parse_optional_tile, TilesetError};
pub use format::{parse_document, write_document, TsxDocument};
pub use property::{Properties, Property, PropertyType};
pub use tileset::{
    AnimationFrame, TileProperties, TileRect, Tileset, TilesetImage, Transformations,
    DEFAULT_PROBABILITY,
};
