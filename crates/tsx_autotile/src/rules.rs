//! Wang rule table: every wang set declared by a tileset, keyed by name

use crate::terrain::{WangColor, WangSet, WangSetType};
use crate::wang::WangId;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tsx_core::format::{self, RawWangColor, RawWangSet, RawWangSets, RawWangTile, TsxDocument};
use tsx_core::{parse_attr, parse_optional_tile, Color, Tileset, TilesetError};

/// All wang sets of one tileset, in declaration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct WangRuleTable {
    sets: Vec<WangSet>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl WangRuleTable {
    /// Parse the wang sets of a `.tsx` document
    ///
    /// The tileset geometry is validated too, since wang tile ids are checked
    /// against the tile count.
    pub fn load(source: &str) -> Result<Self, TilesetError> {
        let (_, rules) = load_with_tileset(source)?;
        Ok(rules)
    }

    /// Read and parse the wang sets of a `.tsx` file
    pub fn load_file(path: &Path) -> Result<Self, TilesetError> {
        let document = format::load_document(path)?;
        let tileset = Tileset::from_document(&document)?;
        Self::from_document(&document, &tileset)
    }

    /// Build the rule table from a parsed document and its validated tileset
    pub fn from_document(document: &TsxDocument, tileset: &Tileset) -> Result<Self, TilesetError> {
        let mut table = Self::default();
        let Some(wangsets) = &document.wangsets else {
            return Ok(table);
        };

        for raw in &wangsets.sets {
            let set = wang_set_from_raw(raw, tileset)?;
            table.insert(set)?;
        }

        tracing::debug!(
            "Loaded {} wang sets for tileset '{}': {}",
            table.len(),
            tileset.name,
            table.names().collect::<Vec<_>>().join(", ")
        );

        Ok(table)
    }

    /// Add a wang set; names must be unique
    pub fn insert(&mut self, set: WangSet) -> Result<(), TilesetError> {
        if self.by_name.contains_key(&set.name) {
            return Err(TilesetError::parse(
                "wangset",
                "name",
                set.name.clone(),
                "duplicate wang set name",
            ));
        }
        self.by_name.insert(set.name.clone(), self.sets.len());
        self.sets.push(set);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WangSet> {
        self.by_name.get(name).map(|&i| &self.sets[i])
    }

    /// Wang sets in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &WangSet> {
        self.sets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Raw `<wangsets>` element, `None` when the table is empty
    pub fn to_raw(&self) -> Option<RawWangSets> {
        if self.sets.is_empty() {
            return None;
        }
        Some(RawWangSets {
            sets: self.sets.iter().map(WangSet::to_raw).collect(),
        })
    }
}

impl<'a> IntoIterator for &'a WangRuleTable {
    type Item = &'a WangSet;
    type IntoIter = std::slice::Iter<'a, WangSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

impl WangSet {
    /// Raw `<wangset>` element for writing
    pub fn to_raw(&self) -> RawWangSet {
        RawWangSet {
            name: self.name.clone(),
            set_type: self.set_type.as_str().to_string(),
            tile: Some(tile_attr(self.tile)),
            colors: self
                .colors
                .iter()
                .map(|c| RawWangColor {
                    name: c.name.clone(),
                    color: c.color.to_hex(),
                    tile: Some(tile_attr(c.tile)),
                    probability: Some(c.probability.to_string()),
                })
                .collect(),
            tiles: self
                .tiles()
                .iter()
                .map(|t| RawWangTile {
                    tile_id: t.tile_id.to_string(),
                    wang_id: t.wang_id.to_string(),
                })
                .collect(),
        }
    }
}

/// Parse a whole `.tsx` source into its tileset and rule table
pub fn load_with_tileset(source: &str) -> Result<(Tileset, WangRuleTable), TilesetError> {
    let document = format::parse_document(source)?;
    let tileset = Tileset::from_document(&document)?;
    let rules = WangRuleTable::from_document(&document, &tileset)?;
    Ok((tileset, rules))
}

/// Write a tileset and its wang sets as `.tsx` text
pub fn write_tsx(tileset: &Tileset, rules: &WangRuleTable) -> Result<String, TilesetError> {
    let mut document = tileset.to_document();
    document.wangsets = rules.to_raw();
    format::write_document(&document)
}

fn tile_attr(tile: Option<u32>) -> String {
    tile.map_or_else(|| "-1".to_string(), |t| t.to_string())
}

fn wang_set_from_raw(raw: &RawWangSet, tileset: &Tileset) -> Result<WangSet, TilesetError> {
    let set_type = WangSetType::from_attr(&raw.set_type)?;
    let mut set = WangSet::new(raw.name.clone(), tileset.id, set_type);
    set.tile = checked_tile(tileset, "wangset", "tile", raw.tile.as_deref())?;

    for raw_color in &raw.colors {
        let color = Color::from_hex(&raw_color.color).ok_or_else(|| {
            TilesetError::parse("wangcolor", "color", &raw_color.color, "expected hex color")
        })?;
        let probability = match raw_color.probability.as_deref() {
            Some(value) => {
                let p = parse_attr::<f32>("wangcolor", "probability", value)?;
                if !p.is_finite() || p < 0.0 {
                    return Err(TilesetError::parse(
                        "wangcolor",
                        "probability",
                        value,
                        "probability must be a finite, non-negative number",
                    ));
                }
                p
            }
            None => 1.0,
        };
        set.add_color(WangColor {
            name: raw_color.name.clone(),
            color,
            tile: checked_tile(tileset, "wangcolor", "tile", raw_color.tile.as_deref())?,
            probability,
        });
    }

    for raw_tile in &raw.tiles {
        let tile_id = tileset.parse_tile_ref("wangtile", "tileid", &raw_tile.tile_id)?;
        let wang_id = WangId::parse(&raw_tile.wang_id).map_err(|e| {
            TilesetError::parse("wangtile", "wangid", &raw_tile.wang_id, e.to_string())
        })?;
        let probability = tileset.tile_probability(tile_id).unwrap_or(1.0);
        set.add_tile(tile_id, wang_id, probability)?;
    }

    Ok(set)
}

fn checked_tile(
    tileset: &Tileset,
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
) -> Result<Option<u32>, TilesetError> {
    let tile = parse_optional_tile(element, attribute, value)?;
    if let Some(id) = tile {
        if !tileset.contains_tile(id) {
            return Err(TilesetError::reference(
                element,
                attribute,
                id.to_string(),
                format!("tile id out of range [0, {})", tileset.tile_count),
            ));
        }
    }
    Ok(tile)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../maps/bg.tsx"));
    const BG_ALT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../maps/bg-alt.tsx"));

    fn with_wangset(wangset: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset name="t" tilewidth="8" tileheight="8" tilecount="64" columns="8">
 <wangsets>{wangset}</wangsets>
</tileset>"#
        )
    }

    #[test]
    fn test_load_bg_rules() {
        let rules = WangRuleTable::load(BG).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.names().collect::<Vec<_>>(), vec!["ground-grassy", "wall"]);

        let grassy = rules.get("ground-grassy").unwrap();
        assert_eq!(grassy.set_type, WangSetType::Mixed);
        assert_eq!(grassy.tile, None);
        assert_eq!(grassy.colors.len(), 1);
        assert_eq!(grassy.colors[0].name, "grass");
        assert_eq!(grassy.colors[0].color, Color::rgb(0, 255, 0));
        assert_eq!(grassy.tiles().len(), 17);
        assert_eq!(grassy.wang_id(40).unwrap().to_string(), "1,0,0,0,1,1,1,1");
        assert_eq!(grassy.tile(39).unwrap().probability, 0.5);

        let wall = rules.get("wall").unwrap();
        assert_eq!(wall.set_type, WangSetType::Edge);
        assert_eq!(wall.color_id("brick"), Some(1));
        assert_eq!(wall.tiles().first().unwrap().tile_id, 1);
        assert_eq!(wall.tiles().last().unwrap().tile_id, 67);

        assert!(rules.get("water").is_none());
    }

    #[test]
    fn test_wang_sets_reference_their_tileset() {
        let (tileset, rules) = load_with_tileset(BG_ALT).unwrap();
        for set in &rules {
            assert_eq!(set.tileset_id, tileset.id);
        }
        let grassy = rules.get("ground-grassy").unwrap();
        assert_eq!(grassy.color_id("dirt"), Some(2));
        assert_eq!(grassy.wang_id(40).unwrap().to_string(), "2,0,0,0,2,1,1,1");
    }

    #[test]
    fn test_every_vector_uses_declared_colors() {
        for source in [BG, BG_ALT] {
            let rules = WangRuleTable::load(source).unwrap();
            for set in &rules {
                for tile in set.tiles() {
                    assert_eq!(tile.wang_id.to_raw().len(), 8);
                    for color in tile.wang_id.colors.iter().flatten() {
                        assert!(set.color(*color).is_some());
                    }
                }
            }
        }
    }

    #[test]
    fn test_undeclared_terrain_id() {
        let xml = with_wangset(
            r##"<wangset name="wall" type="edge" tile="-1">
   <wangcolor name="brick" color="#ff0000" tile="-1" probability="1"/>
   <wangtile tileid="1" wangid="0,0,3,0,1,0,0,0"/>
  </wangset>"##,
        );
        let err = WangRuleTable::load(&xml).unwrap_err();
        assert!(err.is_reference_error());
        assert!(err.to_string().contains("wangid"));
    }

    #[test]
    fn test_wangid_length_must_be_eight() {
        let xml = with_wangset(
            r##"<wangset name="wall" type="edge" tile="-1">
   <wangcolor name="brick" color="#ff0000" tile="-1" probability="1"/>
   <wangtile tileid="1" wangid="0,0,1,0,1,0,0"/>
  </wangset>"##,
        );
        let err = WangRuleTable::load(&xml).unwrap_err();
        match err {
            TilesetError::Parse { element, attribute, value, reason } => {
                assert_eq!(element, "wangtile");
                assert_eq!(attribute, "wangid");
                assert_eq!(value, "0,0,1,0,1,0,0");
                assert!(reason.contains('7'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wang_tile_out_of_range() {
        let xml = with_wangset(
            r##"<wangset name="wall" type="edge" tile="-1">
   <wangcolor name="brick" color="#ff0000" tile="-1" probability="1"/>
   <wangtile tileid="64" wangid="0,0,1,0,1,0,0,0"/>
  </wangset>"##,
        );
        assert!(WangRuleTable::load(&xml).unwrap_err().is_reference_error());
    }

    #[test]
    fn test_bad_set_type_and_duplicate_names() {
        let bad_type = with_wangset(r#"<wangset name="w" type="hex" tile="-1"/>"#);
        assert!(WangRuleTable::load(&bad_type).unwrap_err().is_parse_error());

        let duplicate = with_wangset(
            r#"<wangset name="w" type="edge" tile="-1"/><wangset name="w" type="corner" tile="-1"/>"#,
        );
        assert!(WangRuleTable::load(&duplicate).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_empty_wangset_is_valid() {
        let xml = with_wangset(r#"<wangset name="empty" type="corner" tile="5"/>"#);
        let rules = WangRuleTable::load(&xml).unwrap();
        let set = rules.get("empty").unwrap();
        assert_eq!(set.tile, Some(5));
        assert!(set.tiles().is_empty());
        assert!(set.colors.is_empty());
    }

    #[test]
    fn test_no_wangsets() {
        let xml = r#"<tileset name="t" tilewidth="8" tileheight="8" tilecount="4" columns="2"/>"#;
        let rules = WangRuleTable::load(xml).unwrap();
        assert!(rules.is_empty());
        assert!(rules.to_raw().is_none());
    }

    #[test]
    fn test_round_trip_preserves_pairs() {
        for source in [BG, BG_ALT] {
            let (tileset, rules) = load_with_tileset(source).unwrap();
            let written = write_tsx(&tileset, &rules).unwrap();
            let (_, reloaded) = load_with_tileset(&written).unwrap();

            let original_doc = format::parse_document(source).unwrap();
            let written_doc = format::parse_document(&written).unwrap();
            assert_eq!(original_doc.wangsets, written_doc.wangsets);

            for (before, after) in rules.iter().zip(reloaded.iter()) {
                assert_eq!(before.name, after.name);
                let pairs = |set: &WangSet| {
                    set.tiles()
                        .iter()
                        .map(|t| (t.tile_id, t.wang_id.to_string()))
                        .collect::<Vec<_>>()
                };
                assert_eq!(pairs(before), pairs(after));
            }
        }
    }
}
