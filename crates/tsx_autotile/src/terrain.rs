//! Wang set types and data structures
//!
//! A wang set is a flat rule table: colors in declaration order and wang
//! tiles in declaration order, indexed by tile id.

use crate::wang::{ColorId, WangId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tsx_core::{Color, TilesetError};
use uuid::Uuid;

const CORNER_POSITIONS: [usize; 4] = [1, 3, 5, 7];
const EDGE_POSITIONS: [usize; 4] = [0, 2, 4, 6];
const ALL_POSITIONS: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Type of wang set - determines which positions take part in matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WangSetType {
    /// 4 corners per tile
    /// Good for basic terrain transitions
    #[default]
    Corner,
    /// 4 edges per tile
    /// Good for roads, walls, paths
    Edge,
    /// 4 corners + 4 edges per tile
    Mixed,
}

impl WangSetType {
    /// Parse the `type` attribute of a `<wangset>`
    pub fn from_attr(value: &str) -> Result<Self, TilesetError> {
        match value {
            "corner" => Ok(Self::Corner),
            "edge" => Ok(Self::Edge),
            "mixed" => Ok(Self::Mixed),
            other => Err(TilesetError::parse(
                "wangset",
                "type",
                other,
                "expected corner, edge or mixed",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Corner => "corner",
            Self::Edge => "edge",
            Self::Mixed => "mixed",
        }
    }

    /// Wang id indices this set type assigns terrain to
    pub fn active_positions(&self) -> &'static [usize] {
        match self {
            Self::Corner => &CORNER_POSITIONS,
            Self::Edge => &EDGE_POSITIONS,
            Self::Mixed => &ALL_POSITIONS,
        }
    }

    pub fn position_count(&self) -> usize {
        self.active_positions().len()
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active_positions().contains(&index)
    }
}

/// A terrain class within a set (e.g., "grass", "brick")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WangColor {
    pub name: String,
    /// Display color for visualization
    pub color: Color,
    /// Representative tile for this color
    pub tile: Option<u32>,
    pub probability: f32,
}

impl WangColor {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            tile: None,
            probability: 1.0,
        }
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }
}

/// A tile with its terrain assignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WangTile {
    pub tile_id: u32,
    pub wang_id: WangId,
    /// Spawn probability of the tile in its tileset
    pub probability: f32,
}

/// A named wang set attached to a tileset
#[derive(Debug, Clone, Serialize)]
pub struct WangSet {
    pub id: Uuid,
    pub name: String,
    /// Which tileset this wang set belongs to
    pub tileset_id: Uuid,
    pub set_type: WangSetType,
    /// Representative tile for the whole set
    pub tile: Option<u32>,
    /// Colors in declaration order; color id `n` is `colors[n - 1]`
    pub colors: Vec<WangColor>,
    tiles: Vec<WangTile>,
    #[serde(skip)]
    index: HashMap<u32, usize>,
}

impl WangSet {
    pub fn new(name: impl Into<String>, tileset_id: Uuid, set_type: WangSetType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tileset_id,
            set_type,
            tile: None,
            colors: Vec::new(),
            tiles: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a color, returning its 1-based id
    pub fn add_color(&mut self, color: WangColor) -> ColorId {
        self.colors.push(color);
        self.colors.len() as ColorId
    }

    /// Register a wang tile after the ones already declared
    ///
    /// Fails if the tile is already registered or its vector uses a color
    /// that has not been declared.
    pub fn add_tile(
        &mut self,
        tile_id: u32,
        wang_id: WangId,
        probability: f32,
    ) -> Result<(), TilesetError> {
        if self.index.contains_key(&tile_id) {
            return Err(TilesetError::parse(
                "wangtile",
                "tileid",
                tile_id.to_string(),
                format!("tile already listed in wang set '{}'", self.name),
            ));
        }
        if let Some(max) = wang_id.max_color() {
            if max as usize > self.colors.len() {
                return Err(TilesetError::reference(
                    "wangtile",
                    "wangid",
                    wang_id.to_string(),
                    format!(
                        "terrain id {max} is not declared in wang set '{}' ({} colors)",
                        self.name,
                        self.colors.len()
                    ),
                ));
            }
        }

        if wang_id
            .colors
            .iter()
            .enumerate()
            .any(|(i, c)| c.is_some() && !self.set_type.is_active(i))
        {
            tracing::warn!(
                "Wang set '{}' ({}) tile {} assigns terrain to unused positions: {}",
                self.name,
                self.set_type.as_str(),
                tile_id,
                wang_id
            );
        }

        self.index.insert(tile_id, self.tiles.len());
        self.tiles.push(WangTile {
            tile_id,
            wang_id,
            probability,
        });
        Ok(())
    }

    /// Get a color by its 1-based id
    pub fn color(&self, id: ColorId) -> Option<&WangColor> {
        (id as usize).checked_sub(1).and_then(|i| self.colors.get(i))
    }

    /// Get a color id by name
    pub fn color_id(&self, name: &str) -> Option<ColorId> {
        self.colors
            .iter()
            .position(|c| c.name == name)
            .map(|i| i as ColorId + 1)
    }

    /// Wang tiles in declaration order
    pub fn tiles(&self) -> &[WangTile] {
        &self.tiles
    }

    pub fn tile(&self, tile_id: u32) -> Option<&WangTile> {
        self.index.get(&tile_id).map(|&i| &self.tiles[i])
    }

    /// Wang id registered for a tile
    pub fn wang_id(&self, tile_id: u32) -> Option<&WangId> {
        self.tile(tile_id).map(|t| &t.wang_id)
    }

    pub fn contains_tile(&self, tile_id: u32) -> bool {
        self.index.contains_key(&tile_id)
    }

    /// Selection weight of a wang tile: its tile probability times the
    /// probability of every color it shows
    pub fn tile_weight(&self, tile: &WangTile) -> f32 {
        tile.wang_id
            .colors
            .iter()
            .flatten()
            .filter_map(|&c| self.color(c))
            .fold(tile.probability, |weight, color| weight * color.probability)
    }

    /// Find all tiles covered entirely by one color (fill tiles)
    pub fn uniform_tiles(&self, color: ColorId) -> Vec<u32> {
        self.tiles
            .iter()
            .filter(|t| {
                self.set_type
                    .active_positions()
                    .iter()
                    .all(|&i| t.wang_id.colors[i] == Some(color))
            })
            .map(|t| t.tile_id)
            .collect()
    }
}
