//! Tileset catalog: grid geometry, source image and per-tile overrides

use crate::color::Color;
use crate::error::{parse_attr, parse_flag, TilesetError};
use crate::format::{
    self, RawAnimation, RawFrame, RawImage, RawTile, RawTransformations, TsxDocument,
};
use crate::property::{properties_from_raw, properties_to_raw, Properties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Weight of every tile without a `probability` override
pub const DEFAULT_PROBABILITY: f32 = 1.0;

/// One frame of a tile animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile_id: u32,
    /// Frame duration in milliseconds
    pub duration: u32,
}

/// Per-tile overrides: spawn probability, type, animation and custom metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileProperties {
    /// Relative weight when the tile competes with other candidates
    pub probability: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_type: Option<String>,
    /// Animation frames for this tile
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animation: Vec<AnimationFrame>,
    /// Custom user-defined properties
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub custom: Properties,
    /// Whether `probability` was written explicitly in the source
    #[serde(skip)]
    explicit_probability: bool,
}

impl Default for TileProperties {
    fn default() -> Self {
        Self {
            probability: DEFAULT_PROBABILITY,
            tile_type: None,
            animation: Vec::new(),
            custom: Properties::new(),
            explicit_probability: false,
        }
    }
}

impl TileProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the spawn probability for this tile
    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self.explicit_probability = true;
        self
    }

    /// Check if this tile has an animation
    pub fn has_animation(&self) -> bool {
        self.animation.len() > 1
    }

    /// Whether the probability differs from the default or was declared
    pub fn has_probability_override(&self) -> bool {
        self.explicit_probability || self.probability != DEFAULT_PROBABILITY
    }

    /// Get a custom property
    pub fn get_custom(&self, key: &str) -> Option<&crate::Property> {
        self.custom.get(key)
    }
}

/// The image the tiles are cut from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetImage {
    /// Path to the image file, relative to the `.tsx`
    pub source: String,
    /// Chroma key rendered as transparent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans: Option<Color>,
    pub width: u32,
    pub height: u32,
}

/// Allowed tile transformations for terrain filling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformations {
    pub hflip: bool,
    pub vflip: bool,
    pub rotate: bool,
    pub prefer_untransformed: bool,
}

/// Pixel rectangle of a tile inside the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tileset catalog - immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiled_version: Option<String>,
    pub tile_width: u32,
    pub tile_height: u32,
    #[serde(default)]
    pub spacing: u32,
    #[serde(default)]
    pub margin: u32,
    pub tile_count: u32,
    pub columns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<TilesetImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Transformations>,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    /// Per-tile overrides keyed by tile id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tile_properties: BTreeMap<u32, TileProperties>,
}

impl Tileset {
    /// Parse a tileset from `.tsx` source text
    pub fn load(source: &str) -> Result<Self, TilesetError> {
        let document = format::parse_document(source)?;
        Self::from_document(&document)
    }

    /// Read and parse a tileset from a `.tsx` file
    pub fn load_file(path: &Path) -> Result<Self, TilesetError> {
        let document = format::load_document(path)?;
        Self::from_document(&document)
    }

    /// Build and validate a tileset from a parsed document
    pub fn from_document(document: &TsxDocument) -> Result<Self, TilesetError> {
        let tile_width = parse_dimension("tilewidth", &document.tile_width)?;
        let tile_height = parse_dimension("tileheight", &document.tile_height)?;
        let tile_count = parse_dimension("tilecount", &document.tile_count)?;
        let columns = parse_dimension("columns", &document.columns)?;
        let spacing = parse_optional_u32("tileset", "spacing", document.spacing.as_deref())?;
        let margin = parse_optional_u32("tileset", "margin", document.margin.as_deref())?;

        if tile_count % columns != 0 {
            return Err(TilesetError::parse(
                "tileset",
                "tilecount",
                &document.tile_count,
                format!("not a whole number of rows of {columns} columns"),
            ));
        }

        let image = document.image.as_ref().map(image_from_raw).transpose()?;
        let transformations = document
            .transformations
            .as_ref()
            .map(transformations_from_raw)
            .transpose()?;

        let mut tileset = Self {
            id: Uuid::new_v4(),
            name: document.name.clone(),
            version: document.version.clone(),
            tiled_version: document.tiled_version.clone(),
            tile_width,
            tile_height,
            spacing,
            margin,
            tile_count,
            columns,
            image,
            transformations,
            properties: properties_from_raw(document.properties.as_ref())?,
            tile_properties: BTreeMap::new(),
        };

        for raw in &document.tiles {
            let tile_id = tileset.parse_tile_ref("tile", "id", &raw.id)?;
            if tileset.tile_properties.contains_key(&tile_id) {
                return Err(TilesetError::parse("tile", "id", &raw.id, "duplicate tile id"));
            }
            let properties = tileset.tile_from_raw(raw)?;
            tileset.tile_properties.insert(tile_id, properties);
        }

        tileset.check_image_fit();

        tracing::debug!(
            "Loaded tileset '{}': {}x{} tiles of {}x{} px, {} overrides",
            tileset.name,
            tileset.columns,
            tileset.rows(),
            tileset.tile_width,
            tileset.tile_height,
            tileset.tile_properties.len()
        );

        Ok(tileset)
    }

    /// Parse a tile id attribute and check it lies inside the tileset
    pub fn parse_tile_ref(
        &self,
        element: &'static str,
        attribute: &'static str,
        value: &str,
    ) -> Result<u32, TilesetError> {
        let tile_id = parse_attr::<u32>(element, attribute, value)?;
        if !self.contains_tile(tile_id) {
            return Err(TilesetError::reference(
                element,
                attribute,
                value,
                format!("tile id out of range [0, {})", self.tile_count),
            ));
        }
        Ok(tile_id)
    }

    fn tile_from_raw(&self, raw: &RawTile) -> Result<TileProperties, TilesetError> {
        let mut properties = TileProperties::new();

        if let Some(value) = raw.probability.as_deref() {
            let probability = parse_attr::<f32>("tile", "probability", value)?;
            if !probability.is_finite() || probability < 0.0 {
                return Err(TilesetError::parse(
                    "tile",
                    "probability",
                    value,
                    "probability must be a finite, non-negative number",
                ));
            }
            properties = properties.with_probability(probability);
        }

        properties.tile_type = raw.tile_type.clone();
        properties.custom = properties_from_raw(raw.properties.as_ref())?;

        if let Some(animation) = &raw.animation {
            for frame in &animation.frames {
                properties.animation.push(AnimationFrame {
                    tile_id: self.parse_tile_ref("frame", "tileid", &frame.tile_id)?,
                    duration: parse_attr("frame", "duration", &frame.duration)?,
                });
            }
        }

        Ok(properties)
    }

    /// Warn when the declared grid does not fit in the declared image
    fn check_image_fit(&self) {
        let Some(image) = &self.image else {
            return;
        };
        if image.width == 0 || image.height == 0 {
            return;
        }
        // `None` when the extent overflows, which never fits
        let span = |count: u32, size: u32| -> Option<u64> {
            let count = u64::from(count);
            u64::from(self.margin)
                .checked_mul(2)?
                .checked_add(count.checked_mul(u64::from(size))?)?
                .checked_add(count.saturating_sub(1).checked_mul(u64::from(self.spacing))?)
        };
        let fits = |needed: Option<u64>, available: u32| {
            needed.is_some_and(|n| n <= u64::from(available))
        };
        let needed_width = span(self.columns, self.tile_width);
        let needed_height = span(self.rows(), self.tile_height);
        if !fits(needed_width, image.width) || !fits(needed_height, image.height) {
            let show = |n: Option<u64>| n.map_or_else(|| "too many".to_string(), |n| n.to_string());
            tracing::warn!(
                "Tileset '{}' grid needs {}x{} px but image '{}' is {}x{} px",
                self.name,
                show(needed_width),
                show(needed_height),
                image.source,
                image.width,
                image.height
            );
        }
    }

    /// Number of rows implied by `tilecount / columns`
    pub fn rows(&self) -> u32 {
        self.tile_count / self.columns
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub fn contains_tile(&self, tile_id: u32) -> bool {
        tile_id < self.tile_count
    }

    /// Iterate over every tile id in the tileset
    pub fn tile_ids(&self) -> std::ops::Range<u32> {
        0..self.tile_count
    }

    /// Spawn probability for a tile; `None` for ids outside the tileset
    pub fn tile_probability(&self, tile_id: u32) -> Option<f32> {
        if !self.contains_tile(tile_id) {
            return None;
        }
        Some(
            self.tile_properties
                .get(&tile_id)
                .map(|p| p.probability)
                .unwrap_or(DEFAULT_PROBABILITY),
        )
    }

    /// Tiles whose probability was declared, in id order
    pub fn probability_overrides(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.tile_properties
            .iter()
            .filter(|(_, p)| p.has_probability_override())
            .map(|(&id, p)| (id, p.probability))
    }

    /// Get properties for a tile, if any were declared
    pub fn tile_properties(&self, tile_id: u32) -> Option<&TileProperties> {
        self.tile_properties.get(&tile_id)
    }

    /// Tileset-level custom properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Convert tile id to (column, row)
    pub fn tile_position(&self, tile_id: u32) -> Option<(u32, u32)> {
        if !self.contains_tile(tile_id) {
            return None;
        }
        Some((tile_id % self.columns, tile_id / self.columns))
    }

    /// Convert (column, row) to tile id
    pub fn tile_at(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.columns || row >= self.rows() {
            return None;
        }
        Some(row * self.columns + column)
    }

    /// Pixel rectangle of a tile in the source image
    pub fn tile_rect(&self, tile_id: u32) -> Option<TileRect> {
        let (column, row) = self.tile_position(tile_id)?;
        let offset = |index: u32, size: u32| {
            size.checked_add(self.spacing)?
                .checked_mul(index)?
                .checked_add(self.margin)
        };
        Some(TileRect {
            x: offset(column, self.tile_width)?,
            y: offset(row, self.tile_height)?,
            width: self.tile_width,
            height: self.tile_height,
        })
    }

    /// Convert back to the raw document layout (without wang sets)
    pub fn to_document(&self) -> TsxDocument {
        TsxDocument {
            version: self.version.clone(),
            tiled_version: self.tiled_version.clone(),
            name: self.name.clone(),
            tile_width: self.tile_width.to_string(),
            tile_height: self.tile_height.to_string(),
            spacing: (self.spacing != 0).then(|| self.spacing.to_string()),
            margin: (self.margin != 0).then(|| self.margin.to_string()),
            tile_count: self.tile_count.to_string(),
            columns: self.columns.to_string(),
            properties: properties_to_raw(&self.properties),
            transformations: self.transformations.map(|t| RawTransformations {
                hflip: Some(flag(t.hflip)),
                vflip: Some(flag(t.vflip)),
                rotate: Some(flag(t.rotate)),
                prefer_untransformed: Some(flag(t.prefer_untransformed)),
            }),
            image: self.image.as_ref().map(|image| RawImage {
                source: image.source.clone(),
                trans: image.trans.map(|c| c.to_hex_bare()),
                width: Some(image.width.to_string()),
                height: Some(image.height.to_string()),
            }),
            tiles: self
                .tile_properties
                .iter()
                .map(|(&id, p)| RawTile {
                    id: id.to_string(),
                    tile_type: p.tile_type.clone(),
                    probability: p.has_probability_override().then(|| p.probability.to_string()),
                    properties: properties_to_raw(&p.custom),
                    animation: (!p.animation.is_empty()).then(|| RawAnimation {
                        frames: p
                            .animation
                            .iter()
                            .map(|f| RawFrame {
                                tile_id: f.tile_id.to_string(),
                                duration: f.duration.to_string(),
                            })
                            .collect(),
                    }),
                })
                .collect(),
            wangsets: None,
        }
    }

    /// Write this tileset as `.tsx` text
    pub fn to_xml(&self) -> Result<String, TilesetError> {
        format::write_document(&self.to_document())
    }
}

fn flag(value: bool) -> String {
    let digit = if value { "1" } else { "0" };
    digit.to_string()
}

fn parse_dimension(attribute: &'static str, value: &str) -> Result<u32, TilesetError> {
    let parsed = parse_attr::<i64>("tileset", attribute, value)?;
    if parsed <= 0 {
        return Err(TilesetError::parse("tileset", attribute, value, "must be positive"));
    }
    u32::try_from(parsed).map_err(|e| TilesetError::parse("tileset", attribute, value, e.to_string()))
}

fn parse_optional_u32(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
) -> Result<u32, TilesetError> {
    value.map_or(Ok(0), |v| parse_attr(element, attribute, v))
}

fn image_from_raw(raw: &RawImage) -> Result<TilesetImage, TilesetError> {
    let trans = raw
        .trans
        .as_deref()
        .map(|hex| {
            Color::from_hex(hex)
                .ok_or_else(|| TilesetError::parse("image", "trans", hex, "expected hex color"))
        })
        .transpose()?;
    Ok(TilesetImage {
        source: raw.source.clone(),
        trans,
        width: parse_optional_u32("image", "width", raw.width.as_deref())?,
        height: parse_optional_u32("image", "height", raw.height.as_deref())?,
    })
}

fn transformations_from_raw(raw: &RawTransformations) -> Result<Transformations, TilesetError> {
    Ok(Transformations {
        hflip: parse_flag("transformations", "hflip", raw.hflip.as_deref())?,
        vflip: parse_flag("transformations", "vflip", raw.vflip.as_deref())?,
        rotate: parse_flag("transformations", "rotate", raw.rotate.as_deref())?,
        prefer_untransformed: parse_flag(
            "transformations",
            "preferuntransformed",
            raw.prefer_untransformed.as_deref(),
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../maps/bg.tsx"));

    fn minimal(attrs: &str, body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tileset name=\"t\" {attrs}>{body}</tileset>"
        )
    }

    #[test]
    fn test_huge_geometry_does_not_overflow() {
        let source = minimal(
            r#"tilewidth="70000" tileheight="8" tilecount="70000" columns="70000""#,
            r#"<image source="a.png" width="16" height="16"/>"#,
        );
        let tileset = Tileset::load(&source).unwrap();
        assert_eq!(tileset.rows(), 1);
        assert_eq!(tileset.tile_rect(0).unwrap().x, 0);
        // 69999 * 70000 does not fit in u32
        assert_eq!(tileset.tile_rect(69_999), None);
    }

    #[test]
    fn test_bg_geometry() {
        let tileset = Tileset::load(BG).unwrap();

        assert_eq!(tileset.name, "bg");
        assert_eq!(tileset.tile_width, 8);
        assert_eq!(tileset.tile_height, 8);
        assert_eq!(tileset.tile_count(), 1024);
        assert_eq!(tileset.columns, 32);
        assert_eq!(tileset.rows(), 32);
        assert_eq!(tileset.tile_count, tileset.columns * tileset.rows());

        let image = tileset.image.as_ref().unwrap();
        assert_eq!(image.source, "../gfx/bg.png");
        assert_eq!(image.trans, Some(Color::MAGENTA));
        assert_eq!((image.width, image.height), (256, 256));

        let transformations = tileset.transformations.unwrap();
        assert!(transformations.prefer_untransformed);
        assert!(!transformations.rotate);
    }

    #[test]
    fn test_bg_probabilities() {
        let tileset = Tileset::load(BG).unwrap();

        assert_eq!(tileset.tile_probability(39), Some(0.5));
        assert_eq!(tileset.tile_probability(34), Some(1.5));
        assert_eq!(tileset.tile_probability(0), Some(1.0));
        assert_eq!(tileset.tile_probability(1023), Some(1.0));
        assert_eq!(tileset.tile_probability(1024), None);

        let overrides: Vec<_> = tileset.probability_overrides().collect();
        assert_eq!(overrides, vec![(34, 1.5), (37, 1.5), (38, 1.5), (39, 0.5)]);
    }

    #[test]
    fn test_default_weight_for_every_unlisted_tile() {
        let tileset = Tileset::load(BG).unwrap();
        let listed: Vec<u32> = tileset.probability_overrides().map(|(id, _)| id).collect();
        for id in tileset.tile_ids().filter(|id| !listed.contains(id)) {
            assert_eq!(tileset.tile_probability(id), Some(DEFAULT_PROBABILITY));
        }
    }

    #[test]
    fn test_tile_position_and_rect() {
        let xml = minimal(
            r#"tilewidth="16" tileheight="16" spacing="2" margin="1" tilecount="12" columns="4""#,
            r#"<image source="t.png" width="72" height="54"/>"#,
        );
        let tileset = Tileset::load(&xml).unwrap();

        assert_eq!(tileset.rows(), 3);
        assert_eq!(tileset.tile_position(5), Some((1, 1)));
        assert_eq!(tileset.tile_at(1, 1), Some(5));
        assert_eq!(tileset.tile_at(4, 0), None);
        assert_eq!(
            tileset.tile_rect(5),
            Some(TileRect { x: 19, y: 19, width: 16, height: 16 })
        );
        assert_eq!(tileset.tile_rect(12), None);
    }

    #[test]
    fn test_non_positive_dimensions() {
        let zero = minimal(r#"tilewidth="0" tileheight="8" tilecount="4" columns="2""#, "");
        let err = Tileset::load(&zero).unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("tilewidth"));

        let negative = minimal(r#"tilewidth="8" tileheight="8" tilecount="4" columns="-2""#, "");
        assert!(Tileset::load(&negative).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_tilecount_must_fill_rows() {
        let xml = minimal(r#"tilewidth="8" tileheight="8" tilecount="1000" columns="32""#, "");
        let err = Tileset::load(&xml).unwrap_err();
        match err {
            TilesetError::Parse { element, attribute, value, .. } => {
                assert_eq!(element, "tileset");
                assert_eq!(attribute, "tilecount");
                assert_eq!(value, "1000");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_probability_override_out_of_range() {
        let xml = minimal(
            r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
            r#"<tile id="4" probability="2"/>"#,
        );
        let err = Tileset::load(&xml).unwrap_err();
        assert!(err.is_reference_error());
        assert!(err.to_string().contains("\"4\""));
    }

    #[test]
    fn test_bad_probability_values() {
        for bad in ["abc", "-1", "NaN"] {
            let xml = minimal(
                r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
                &format!(r#"<tile id="1" probability="{bad}"/>"#),
            );
            assert!(Tileset::load(&xml).unwrap_err().is_parse_error(), "{bad}");
        }
    }

    #[test]
    fn test_duplicate_tile_id() {
        let xml = minimal(
            r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
            r#"<tile id="1" probability="2"/><tile id="1" probability="3"/>"#,
        );
        assert!(Tileset::load(&xml).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_animation_frames() {
        let xml = minimal(
            r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
            r#"<tile id="0"><animation><frame tileid="0" duration="100"/><frame tileid="3" duration="50"/></animation></tile>"#,
        );
        let tileset = Tileset::load(&xml).unwrap();
        let tile = tileset.tile_properties(0).unwrap();
        assert!(tile.has_animation());
        assert_eq!(tile.animation[1], AnimationFrame { tile_id: 3, duration: 50 });
        assert!(!tile.has_probability_override());
        assert_eq!(tileset.tile_probability(0), Some(1.0));

        let dangling = minimal(
            r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
            r#"<tile id="0"><animation><frame tileid="9" duration="100"/></animation></tile>"#,
        );
        assert!(Tileset::load(&dangling).unwrap_err().is_reference_error());
    }

    #[test]
    fn test_bad_trans_color() {
        let xml = minimal(
            r#"tilewidth="8" tileheight="8" tilecount="4" columns="2""#,
            r#"<image source="a.png" trans="pink" width="16" height="16"/>"#,
        );
        assert!(Tileset::load(&xml).unwrap_err().is_parse_error());
    }

    #[test]
    fn test_xml_round_trip() {
        let tileset = Tileset::load(BG).unwrap();
        let written = tileset.to_xml().unwrap();
        assert!(written.contains("trans=\"ff00ff\""));
        assert!(written.contains("<tile id=\"39\" probability=\"0.5\"/>"));

        let reloaded = Tileset::load(&written).unwrap();
        assert_eq!(reloaded.tile_count, tileset.tile_count);
        assert_eq!(reloaded.image, tileset.image);
        assert_eq!(reloaded.transformations, tileset.transformations);
        assert_eq!(reloaded.tile_properties, tileset.tile_properties);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.tsx");
        std::fs::write(&path, BG).unwrap();

        let tileset = Tileset::load_file(&path).unwrap();
        assert_eq!(tileset.rows(), 32);

        let missing = Tileset::load_file(&dir.path().join("missing.tsx")).unwrap_err();
        assert!(matches!(missing, TilesetError::Io(_)));
    }
}
