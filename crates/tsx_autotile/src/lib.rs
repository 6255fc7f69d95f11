//! Tiled-compatible Wang sets and autotiling
//!
//! This crate turns the `<wangsets>` of a `.tsx` tileset into rule tables and
//! picks tiles from them.
//!
//! # Features
//! - Corner, Edge, and Mixed wang set types
//! - Neighborhood resolution with wildcards and probability weighting
//! - WangFiller terrain painting on a tile grid
//! - Lossless write-back of wang sets
//!
//! # Example
//!
//! ```rust,ignore
//! use tsx_autotile::{load_with_tileset, resolve, WangId};
//!
//! let (tileset, rules) = load_with_tileset(&std::fs::read_to_string("maps/bg.tsx")?)?;
//! let grassy = rules.get("ground-grassy").unwrap();
//!
//! // 0 leaves a position open
//! let tile = resolve(grassy, &"1,1,1,0,0,0,1,1".parse()?)?;
//! assert_eq!(tile, 39);
//! assert!(tileset.contains_tile(tile));
//! ```

pub mod filler;
pub mod resolve;
pub mod rules;
pub mod terrain;
pub mod wang;

pub use filler::{
    fill_cell, paint, paint_corner, paint_horizontal_edge, paint_vertical_edge, CellInfo,
    FillReport, PaintTarget, TileGrid, WangFiller,
};
pub use resolve::{resolve, Candidate, NoMatch, Resolver, TieBreak};
pub use rules::{load_with_tileset, write_tsx, WangRuleTable};
pub use terrain::{WangColor, WangSet, WangSetType, WangTile};
pub use wang::{ColorId, WangId, WangIdParseError, WangPosition};

pub use tsx_core;
