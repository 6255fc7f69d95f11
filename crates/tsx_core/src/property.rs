//! Custom properties attached to tilesets and tiles

use crate::error::{parse_attr, TilesetError};
use crate::format::{RawProperties, RawProperty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tiled property type (`type` attribute, `string` when absent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Color,
    File,
    Object,
}

impl PropertyType {
    pub fn from_attr(value: Option<&str>) -> Result<Self, TilesetError> {
        Ok(match value.unwrap_or("string") {
            "string" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "color" => Self::Color,
            "file" => Self::File,
            "object" => Self::Object,
            other => {
                return Err(TilesetError::parse(
                    "property",
                    "type",
                    other,
                    "unsupported property type",
                ))
            }
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Color => "color",
            Self::File => "file",
            Self::Object => "object",
        }
    }
}

/// A typed custom property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub kind: PropertyType,
    pub value: serde_json::Value,
}

impl Property {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: PropertyType::String,
            value: serde_json::Value::String(value.into()),
        }
    }

    fn from_raw(raw: &RawProperty) -> Result<Self, TilesetError> {
        let kind = PropertyType::from_attr(raw.property_type.as_deref())?;
        let text = raw
            .value
            .as_deref()
            .or(raw.text.as_deref())
            .unwrap_or_default();

        let value = match kind {
            PropertyType::Int | PropertyType::Object => {
                serde_json::Value::from(parse_attr::<i64>("property", "value", text)?)
            }
            PropertyType::Float => {
                let number = parse_attr::<f64>("property", "value", text)?;
                serde_json::Number::from_f64(number)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| TilesetError::parse("property", "value", text, "not a finite number"))?
            }
            PropertyType::Bool => match text {
                "true" => serde_json::Value::Bool(true),
                "false" => serde_json::Value::Bool(false),
                other => {
                    return Err(TilesetError::parse(
                        "property",
                        "value",
                        other,
                        "expected true or false",
                    ))
                }
            },
            PropertyType::String | PropertyType::Color | PropertyType::File => {
                serde_json::Value::String(text.to_string())
            }
        };

        Ok(Self { kind, value })
    }

    fn to_raw(&self, name: &str) -> RawProperty {
        let text = match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let multiline = text.contains('\n');
        RawProperty {
            name: name.to_string(),
            property_type: (self.kind != PropertyType::String).then(|| self.kind.as_str().to_string()),
            value: (!multiline).then(|| text.clone()),
            text: multiline.then_some(text),
        }
    }
}

/// Properties keyed by name
pub type Properties = BTreeMap<String, Property>;

pub(crate) fn properties_from_raw(raw: Option<&RawProperties>) -> Result<Properties, TilesetError> {
    let mut properties = Properties::new();
    if let Some(raw) = raw {
        for property in &raw.properties {
            properties.insert(property.name.clone(), Property::from_raw(property)?);
        }
    }
    Ok(properties)
}

pub(crate) fn properties_to_raw(properties: &Properties) -> Option<RawProperties> {
    if properties.is_empty() {
        return None;
    }
    Some(RawProperties {
        properties: properties
            .iter()
            .map(|(name, property)| property.to_raw(name))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, kind: Option<&str>, value: &str) -> RawProperty {
        RawProperty {
            name: name.to_string(),
            property_type: kind.map(str::to_string),
            value: Some(value.to_string()),
            text: None,
        }
    }

    #[test]
    fn test_typed_values() {
        let raw = RawProperties {
            properties: vec![
                raw("depth", Some("int"), "3"),
                raw("speed", Some("float"), "1.5"),
                raw("solid", Some("bool"), "true"),
                raw("label", None, "pond"),
            ],
        };
        let props = properties_from_raw(Some(&raw)).unwrap();
        assert_eq!(props["depth"].value, serde_json::json!(3));
        assert_eq!(props["speed"].value, serde_json::json!(1.5));
        assert_eq!(props["solid"].value, serde_json::json!(true));
        assert_eq!(props["label"], Property::string("pond"));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let bad_int = RawProperties {
            properties: vec![raw("depth", Some("int"), "deep")],
        };
        assert!(properties_from_raw(Some(&bad_int)).unwrap_err().is_parse_error());

        let bad_type = RawProperties {
            properties: vec![raw("x", Some("vector"), "1")],
        };
        assert!(properties_from_raw(Some(&bad_type)).is_err());
    }

    #[test]
    fn test_raw_round_trip() {
        let raw_props = RawProperties {
            properties: vec![raw("depth", Some("int"), "3"), raw("solid", Some("bool"), "false")],
        };
        let props = properties_from_raw(Some(&raw_props)).unwrap();
        assert_eq!(properties_to_raw(&props), Some(raw_props));
        assert_eq!(properties_to_raw(&Properties::new()), None);
    }
}
