//! Wang ids: the 8-position terrain vector of a tile or a neighborhood

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 1-based index of a `wangcolor` within its wang set
pub type ColorId = u32;

/// Named positions of a Wang id, clockwise from the top edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WangPosition {
    Top = 0,
    TopRight = 1,
    Right = 2,
    BottomRight = 3,
    Bottom = 4,
    BottomLeft = 5,
    Left = 6,
    TopLeft = 7,
}

impl WangPosition {
    pub const ALL: [WangPosition; 8] = [
        WangPosition::Top,
        WangPosition::TopRight,
        WangPosition::Right,
        WangPosition::BottomRight,
        WangPosition::Bottom,
        WangPosition::BottomLeft,
        WangPosition::Left,
        WangPosition::TopLeft,
    ];

    pub fn from_index(i: usize) -> Self {
        Self::ALL[i % 8]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Grid offset of the neighbor in this direction (y grows downwards)
    pub fn offset(self) -> (i32, i32) {
        match self {
            WangPosition::Top => (0, -1),
            WangPosition::TopRight => (1, -1),
            WangPosition::Right => (1, 0),
            WangPosition::BottomRight => (1, 1),
            WangPosition::Bottom => (0, 1),
            WangPosition::BottomLeft => (-1, 1),
            WangPosition::Left => (-1, 0),
            WangPosition::TopLeft => (-1, -1),
        }
    }

    pub fn opposite(self) -> Self {
        Self::from_index(WangId::opposite_index(self.index()))
    }

    pub fn is_corner(self) -> bool {
        WangId::is_corner(self.index())
    }
}

/// Wang ID representing terrain colors at all 8 positions
/// Uses Tiled's position indexing:
///   7|0|1
///   6|X|2
///   5|4|3
/// - Even indices (0,2,4,6) = Edges (Top, Right, Bottom, Left)
/// - Odd indices (1,3,5,7) = Corners (TopRight, BottomRight, BottomLeft, TopLeft)
///
/// `None` is written as `0` in `.tsx` files: no terrain on a tile, wildcard
/// in a requested neighborhood. It is never a real color.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 8]", into = "[u32; 8]")]
pub struct WangId {
    pub colors: [Option<ColorId>; 8],
}

/// Why a `wangid` attribute could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WangIdParseError {
    #[error("expected 8 values, found {0}")]
    Length(usize),
    #[error("'{0}' is not a terrain id")]
    Value(String),
}

impl WangId {
    pub const WILDCARD: Self = WangId { colors: [None; 8] };

    /// Create a WangId with all positions set to one terrain
    pub fn filled(color: ColorId) -> Self {
        WangId {
            colors: [Some(color); 8],
        }
    }

    /// Parse the comma-separated form used by the `wangid` attribute
    pub fn parse(value: &str) -> Result<Self, WangIdParseError> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 8 {
            return Err(WangIdParseError::Length(parts.len()));
        }
        let mut raw = [0u32; 8];
        for (slot, part) in raw.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| WangIdParseError::Value(part.to_string()))?;
        }
        Ok(Self::from(raw))
    }

    pub fn color_at(&self, position: WangPosition) -> Option<ColorId> {
        self.colors[position.index()]
    }

    pub fn set_color(&mut self, position: WangPosition, color: Option<ColorId>) {
        self.colors[position.index()] = color;
    }

    /// Values as written in the file, `0` for no terrain
    pub fn to_raw(&self) -> [u32; 8] {
        self.colors.map(|c| c.unwrap_or(0))
    }

    pub fn has_any_terrain(&self) -> bool {
        self.colors.iter().any(Option::is_some)
    }

    /// Highest color id referenced, if any
    pub fn max_color(&self) -> Option<ColorId> {
        self.colors.iter().flatten().copied().max()
    }

    /// Whether this tile's vector satisfies a requested neighborhood
    ///
    /// Wildcards in the request match anything; every other requested
    /// position must carry exactly that color.
    pub fn satisfies(&self, request: &WangId) -> bool {
        self.colors
            .iter()
            .zip(&request.colors)
            .all(|(have, want)| want.is_none() || have == want)
    }

    /// Positions left open by the request where this tile still has terrain
    pub fn excess_over(&self, request: &WangId) -> usize {
        self.colors
            .iter()
            .zip(&request.colors)
            .filter(|(have, want)| want.is_none() && have.is_some())
            .count()
    }

    /// Get opposite index (position on neighbor that faces us)
    pub fn opposite_index(i: usize) -> usize {
        (i + 4) % 8
    }

    /// Check if index is a corner (odd indices: 1,3,5,7)
    pub fn is_corner(i: usize) -> bool {
        i % 2 == 1
    }

    /// Get next index clockwise
    pub fn next_index(i: usize) -> usize {
        (i + 1) % 8
    }

    /// Get previous index counter-clockwise
    pub fn prev_index(i: usize) -> usize {
        (i + 7) % 8
    }
}

impl From<[u32; 8]> for WangId {
    fn from(raw: [u32; 8]) -> Self {
        WangId {
            colors: raw.map(|c| (c != 0).then_some(c)),
        }
    }
}

impl From<WangId> for [u32; 8] {
    fn from(id: WangId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for WangId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.to_raw().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for WangId {
    type Err = WangIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
