//! Raw `.tsx` document model
//!
//! These types mirror the XML layout of a Tiled tileset one-to-one. Attribute
//! values are kept as strings so that validation in [`crate::Tileset`] and the
//! Wang rule table can report the exact offending value. Elements the engine
//! does not model (tile collision shapes, per-tile images, grids) are skipped
//! on read.

use crate::error::TilesetError;
use serde::{Deserialize, Serialize};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Top-level `<tileset>` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "tileset")]
pub struct TsxDocument {
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "@tiledversion", default, skip_serializing_if = "Option::is_none")]
    pub tiled_version: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@tilewidth")]
    pub tile_width: String,
    #[serde(rename = "@tileheight")]
    pub tile_height: String,
    #[serde(rename = "@spacing", default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    #[serde(rename = "@margin", default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(rename = "@tilecount")]
    pub tile_count: String,
    #[serde(rename = "@columns")]
    pub columns: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RawProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<RawTransformations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<RawImage>,
    #[serde(rename = "tile", default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<RawTile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wangsets: Option<RawWangSets>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransformations {
    #[serde(rename = "@hflip", default, skip_serializing_if = "Option::is_none")]
    pub hflip: Option<String>,
    #[serde(rename = "@vflip", default, skip_serializing_if = "Option::is_none")]
    pub vflip: Option<String>,
    #[serde(rename = "@rotate", default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<String>,
    #[serde(rename = "@preferuntransformed", default, skip_serializing_if = "Option::is_none")]
    pub prefer_untransformed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(rename = "@source")]
    pub source: String,
    #[serde(rename = "@trans", default, skip_serializing_if = "Option::is_none")]
    pub trans: Option<String>,
    #[serde(rename = "@width", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(rename = "@height", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// `<tile>` element carrying per-tile overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTile {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub tile_type: Option<String>,
    #[serde(rename = "@probability", default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RawProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<RawAnimation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProperties {
    #[serde(rename = "property", default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProperty {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(rename = "@value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Multi-line string properties store their value as element text
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnimation {
    #[serde(rename = "frame", default)]
    pub frames: Vec<RawFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "@tileid")]
    pub tile_id: String,
    #[serde(rename = "@duration")]
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWangSets {
    #[serde(rename = "wangset", default)]
    pub sets: Vec<RawWangSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWangSet {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type")]
    pub set_type: String,
    #[serde(rename = "@tile", default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<String>,
    #[serde(rename = "wangcolor", default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<RawWangColor>,
    #[serde(rename = "wangtile", default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<RawWangTile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWangColor {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@color")]
    pub color: String,
    #[serde(rename = "@tile", default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<String>,
    #[serde(rename = "@probability", default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWangTile {
    #[serde(rename = "@tileid")]
    pub tile_id: String,
    #[serde(rename = "@wangid")]
    pub wang_id: String,
}

/// Parse a `.tsx` document from a string
pub fn parse_document(source: &str) -> Result<TsxDocument, TilesetError> {
    quick_xml::de::from_str(source).map_err(|e| TilesetError::Xml(e.to_string()))
}

/// Read and parse a `.tsx` document from disk
pub fn load_document(path: &std::path::Path) -> Result<TsxDocument, TilesetError> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content)
}

/// Write a document as `.tsx` text with the editor's one-space indentation
pub fn write_document(document: &TsxDocument) -> Result<String, TilesetError> {
    let mut body = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut body);
    serializer.indent(' ', 1);
    document
        .serialize(serializer)
        .map_err(|e| TilesetError::Serialize(e.to_string()))?;

    let mut output = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    output.push_str(XML_DECLARATION);
    output.push_str(&body);
    output.push('\n');
    Ok(output)
}
