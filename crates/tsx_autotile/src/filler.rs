//! Wang filler: place tiles on a grid so terrain lines up with the neighbors
//!
//! Works like Tiled's terrain brush. Painted positions become hard
//! constraints, the current tile and the colors neighbors expose on shared
//! edges and corners become soft preferences, and each placed tile pushes its
//! own colors onto the cells around it. Neighbors outside the painted region
//! that no longer fit are corrected once, without further propagation.
//!
//! Grids are row-major with y growing downwards, like Tiled maps.

use crate::resolve::{weighted_pick, Candidate};
use crate::terrain::WangSet;
use crate::wang::{ColorId, WangId, WangPosition};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A rectangular layer of tile ids, `None` for empty cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    tiles: Vec<Option<u32>>,
}

impl TileGrid {
    /// Create an empty grid
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, None)
    }

    pub fn filled(width: u32, height: u32, tile: Option<u32>) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; (width as usize) * (height as usize)],
        }
    }

    /// Wrap existing row-major data; `None` if the length does not fit
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Option<u32>>) -> Option<Self> {
        ((width as usize) * (height as usize) == tiles.len()).then_some(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn tiles(&self) -> &[Option<u32>] {
        &self.tiles
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && i64::from(x) < i64::from(self.width)
            && i64::from(y) < i64::from(self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).and_then(|i| self.tiles[i])
    }

    /// Set a cell; out of bounds writes are ignored
    pub fn set(&mut self, x: i32, y: i32, tile: Option<u32>) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = tile;
        }
    }
}

/// Information about constraints for a single cell
#[derive(Clone, Default, Debug, PartialEq)]
pub struct CellInfo {
    /// Desired terrain colors at each position
    pub desired: WangId,
    /// Which positions are hard-constrained (must match exactly)
    pub mask: [bool; 8],
}

impl CellInfo {
    /// Whether `wang_id` breaks one of the hard constraints
    fn violated_by(&self, wang_id: &WangId) -> bool {
        (0..8).any(|i| {
            self.mask[i]
                && self.desired.colors[i].is_some()
                && self.desired.colors[i] != wang_id.colors[i]
        })
    }
}

/// Outcome of one `WangFiller::apply`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Region cells that received a tile
    pub placed: usize,
    /// Cells outside the region replaced during the correction pass
    pub corrected: usize,
    /// Cells left unchanged because no tile fits them
    pub unresolved: Vec<(i32, i32)>,
}

/// Fills a region with Wang tiles based on constraints
pub struct WangFiller<'a> {
    set: &'a WangSet,
    /// Grid of cell constraints for the fill region
    cells: HashMap<(i32, i32), CellInfo>,
    /// Cells outside the region that need re-evaluation
    corrections: Vec<(i32, i32)>,
    /// Weighted random tie-break when seeded, first declared otherwise
    rng: Option<SmallRng>,
}

impl<'a> WangFiller<'a> {
    pub fn new(set: &'a WangSet) -> Self {
        Self {
            set,
            cells: HashMap::new(),
            corrections: Vec::new(),
            rng: None,
        }
    }

    pub fn with_seed(set: &'a WangSet, seed: u64) -> Self {
        Self {
            rng: Some(SmallRng::seed_from_u64(seed)),
            ..Self::new(set)
        }
    }

    /// Get or create cell info at position
    pub fn cell_mut(&mut self, x: i32, y: i32) -> &mut CellInfo {
        self.cells.entry((x, y)).or_default()
    }

    /// Require `color` at a position of a cell
    pub fn constrain(&mut self, x: i32, y: i32, position: WangPosition, color: ColorId) {
        let cell = self.cell_mut(x, y);
        cell.desired.set_color(position, Some(color));
        cell.mask[position.index()] = true;
    }

    fn wang_id_at(&self, grid: &TileGrid, x: i32, y: i32) -> Option<WangId> {
        grid.get(x, y).and_then(|tile| self.set.wang_id(tile)).copied()
    }

    /// Colors the 8 surrounding tiles expose towards this cell
    fn wang_id_from_surroundings(&self, grid: &TileGrid, x: i32, y: i32) -> WangId {
        let neighbors: [WangId; 8] = WangPosition::ALL.map(|p| {
            let (dx, dy) = p.offset();
            self.wang_id_at(grid, x + dx, y + dy).unwrap_or_default()
        });

        let mut result = WangId::WILDCARD;

        for i in [0, 2, 4, 6] {
            result.colors[i] = neighbors[i].colors[WangId::opposite_index(i)];
        }

        // Corners fall back to the edge neighbors on either side
        for i in [1, 3, 5, 7] {
            result.colors[i] = neighbors[i].colors[WangId::opposite_index(i)]
                .or(neighbors[WangId::prev_index(i)].colors[(i + 2) % 8])
                .or(neighbors[WangId::next_index(i)].colors[(i + 6) % 8]);
        }

        result
    }

    /// Fill unconstrained positions from the current tile, then the surroundings
    fn merge_preferences(&mut self, grid: &TileGrid, x: i32, y: i32) {
        let current = self.wang_id_at(grid, x, y).unwrap_or_default();
        let surroundings = self.wang_id_from_surroundings(grid, x, y);
        let active = self.set.set_type.active_positions();
        let cell = self.cell_mut(x, y);

        for &i in active {
            if !cell.mask[i] {
                if let Some(color) = current.colors[i].or(surroundings.colors[i]) {
                    cell.desired.colors[i] = Some(color);
                }
            }
        }
    }

    /// Best tile for a cell: hard constraints must hold, soft mismatches cost 1
    fn find_best_match(&mut self, info: &CellInfo) -> Option<u32> {
        let set = self.set;
        let active = set.set_type.active_positions();
        let mut best: Vec<Candidate> = Vec::new();
        let mut lowest_penalty = usize::MAX;

        for tile in set.tiles() {
            if !tile.wang_id.has_any_terrain() || info.violated_by(&tile.wang_id) {
                continue;
            }

            let penalty = active
                .iter()
                .filter(|&&i| {
                    !info.mask[i]
                        && info.desired.colors[i].is_some()
                        && info.desired.colors[i] != tile.wang_id.colors[i]
                })
                .count();

            if penalty < lowest_penalty {
                lowest_penalty = penalty;
                best.clear();
            }
            if penalty == lowest_penalty {
                best.push(Candidate {
                    tile_id: tile.tile_id,
                    penalty,
                    weight: set.tile_weight(tile),
                });
            }
        }

        match self.rng.as_mut() {
            Some(rng) => weighted_pick(&best, rng),
            None => best.first().map(|c| c.tile_id),
        }
    }

    /// Positions shared with the neighbor in `direction`, as
    /// (our position, neighbor position) pairs
    fn shared_positions(direction: usize) -> Vec<(usize, usize)> {
        let mut pairs = vec![(direction, WangId::opposite_index(direction))];
        if !WangId::is_corner(direction) {
            pairs.push((WangId::prev_index(direction), (direction + 5) % 8));
            pairs.push((WangId::next_index(direction), (direction + 3) % 8));
        }
        pairs
    }

    /// Constrain a neighbor of a freshly placed tile to match it
    fn update_adjacent(&mut self, placed: &WangId, nx: i32, ny: i32, direction: usize) {
        let set_type = self.set.set_type;
        let cell = self.cell_mut(nx, ny);
        for (ours, theirs) in Self::shared_positions(direction) {
            if set_type.is_active(theirs) {
                cell.desired.colors[theirs] = placed.colors[ours];
                cell.mask[theirs] = true;
            }
        }
    }

    /// Apply the filler to the cells of `region`
    pub fn apply(&mut self, grid: &mut TileGrid, region: &[(i32, i32)]) -> FillReport {
        let mut report = FillReport::default();
        let in_region: HashSet<(i32, i32)> = region.iter().copied().collect();

        // Phase 1: soft preferences from the current tile and the border
        for &(x, y) in region {
            self.merge_preferences(grid, x, y);
        }

        // Phase 2: resolve and push constraints outwards
        for &(x, y) in region {
            let cell = self.cells.get(&(x, y)).cloned().unwrap_or_default();
            let Some(tile) = self.find_best_match(&cell) else {
                tracing::debug!(
                    "Wang set '{}': no tile fits cell ({}, {}) wanting {}",
                    self.set.name,
                    x,
                    y,
                    cell.desired
                );
                report.unresolved.push((x, y));
                continue;
            };

            grid.set(x, y, Some(tile));
            report.placed += 1;

            let placed = self.set.wang_id(tile).copied().unwrap_or_default();
            for position in WangPosition::ALL {
                let (dx, dy) = position.offset();
                let (nx, ny) = (x + dx, y + dy);
                if !grid.in_bounds(nx, ny) {
                    continue;
                }

                // Only touch cells outside the region that already have a tile
                let inside = in_region.contains(&(nx, ny));
                if !inside && grid.get(nx, ny).is_none() {
                    continue;
                }

                self.update_adjacent(&placed, nx, ny, position.index());

                if inside || position.is_corner() || self.corrections.contains(&(nx, ny)) {
                    continue;
                }
                // Tiles from other sets are left alone
                let needs_correction = match (self.cells.get(&(nx, ny)), self.wang_id_at(grid, nx, ny)) {
                    (Some(info), Some(current)) => info.violated_by(&current),
                    _ => false,
                };
                if needs_correction {
                    self.corrections.push((nx, ny));
                }
            }
        }

        // Phase 3: single pass corrections, no further propagation
        let corrections: Vec<_> = self.corrections.drain(..).collect();
        for (x, y) in corrections {
            self.merge_preferences(grid, x, y);
            let cell = self.cells.get(&(x, y)).cloned().unwrap_or_default();
            match self.find_best_match(&cell) {
                Some(tile) => {
                    if grid.get(x, y) != Some(tile) {
                        grid.set(x, y, Some(tile));
                        report.corrected += 1;
                    }
                }
                None => {
                    tracing::debug!(
                        "Wang set '{}': cannot correct cell ({}, {}), keeping its tile",
                        self.set.name,
                        x,
                        y
                    );
                    report.unresolved.push((x, y));
                }
            }
        }

        report
    }
}

/// Represents what the terrain brush is painting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaintTarget {
    /// Grid intersection shared by up to 4 tiles
    Corner { corner_x: u32, corner_y: u32 },
    /// Edge between tile rows `edge_y - 1` and `edge_y` in column `tile_x`
    HorizontalEdge { tile_x: u32, edge_y: u32 },
    /// Edge between tile columns `edge_x - 1` and `edge_x` in row `tile_y`
    VerticalEdge { edge_x: u32, tile_y: u32 },
    /// Every active position of one tile
    Cell { x: u32, y: u32 },
}

impl PaintTarget {
    /// Cells touched by the target and the position painted on each
    /// Cells and positions the target touches; empty when it lies beyond `i32` coordinates
    fn affected(&self, set: &WangSet) -> Vec<(i32, i32, WangPosition)> {
        use WangPosition::*;
        let coords = |a: u32, b: u32| Some((i32::try_from(a).ok()?, i32::try_from(b).ok()?));
        let Some((a, b)) = (match *self {
            PaintTarget::Corner { corner_x, corner_y } => coords(corner_x, corner_y),
            PaintTarget::HorizontalEdge { tile_x, edge_y } => coords(tile_x, edge_y),
            PaintTarget::VerticalEdge { edge_x, tile_y } => coords(edge_x, tile_y),
            PaintTarget::Cell { x, y } => coords(x, y),
        }) else {
            tracing::debug!("Paint target {:?} is out of range", self);
            return Vec::new();
        };
        match *self {
            PaintTarget::Corner { .. } => {
                let (cx, cy) = (a, b);
                vec![
                    (cx - 1, cy - 1, BottomRight),
                    (cx, cy - 1, BottomLeft),
                    (cx - 1, cy, TopRight),
                    (cx, cy, TopLeft),
                ]
            }
            PaintTarget::HorizontalEdge { .. } => {
                let (tx, ey) = (a, b);
                vec![(tx, ey - 1, Bottom), (tx, ey, Top)]
            }
            PaintTarget::VerticalEdge { .. } => {
                let (ex, ty) = (a, b);
                vec![(ex - 1, ty, Right), (ex, ty, Left)]
            }
            PaintTarget::Cell { .. } => set
                .set_type
                .active_positions()
                .iter()
                .map(|&i| (a, b, WangPosition::from_index(i)))
                .collect(),
        }
    }
}

/// Paint one color at a target and fix up the surrounding tiles
pub fn paint(
    grid: &mut TileGrid,
    set: &WangSet,
    target: PaintTarget,
    color: ColorId,
    seed: Option<u64>,
) -> FillReport {
    let mut filler = match seed {
        Some(seed) => WangFiller::with_seed(set, seed),
        None => WangFiller::new(set),
    };
    let mut region = Vec::new();

    for (x, y, position) in target.affected(set) {
        if !grid.in_bounds(x, y) {
            continue;
        }
        if !set.set_type.is_active(position.index()) {
            tracing::debug!(
                "Wang set '{}' ({}) has no terrain at {:?}",
                set.name,
                set.set_type.as_str(),
                position
            );
            continue;
        }
        filler.constrain(x, y, position, color);
        if !region.contains(&(x, y)) {
            region.push((x, y));
        }
    }

    filler.apply(grid, &region)
}

/// Paint terrain at a corner intersection
pub fn paint_corner(
    grid: &mut TileGrid,
    set: &WangSet,
    corner_x: u32,
    corner_y: u32,
    color: ColorId,
) -> FillReport {
    paint(grid, set, PaintTarget::Corner { corner_x, corner_y }, color, None)
}

/// Paint terrain at a horizontal edge
pub fn paint_horizontal_edge(
    grid: &mut TileGrid,
    set: &WangSet,
    tile_x: u32,
    edge_y: u32,
    color: ColorId,
) -> FillReport {
    paint(grid, set, PaintTarget::HorizontalEdge { tile_x, edge_y }, color, None)
}

/// Paint terrain at a vertical edge
pub fn paint_vertical_edge(
    grid: &mut TileGrid,
    set: &WangSet,
    edge_x: u32,
    tile_y: u32,
    color: ColorId,
) -> FillReport {
    paint(grid, set, PaintTarget::VerticalEdge { edge_x, tile_y }, color, None)
}

/// Cover a whole tile with one color
pub fn fill_cell(grid: &mut TileGrid, set: &WangSet, x: u32, y: u32, color: ColorId) -> FillReport {
    paint(grid, set, PaintTarget::Cell { x, y }, color, None)
}
