//! Errors produced while loading or writing tileset documents

use thiserror::Error;

/// Errors that can occur when loading, validating or writing a `.tsx` document
///
/// Every load error is fatal for the resource being loaded; there is no
/// partially loaded tileset. `Parse` and `Reference` carry the element,
/// attribute and offending value so the document can be fixed by hand.
#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed document: {0}")]
    Xml(String),
    #[error("Parse error in <{element}> attribute '{attribute}' = \"{value}\": {reason}")]
    Parse {
        element: &'static str,
        attribute: &'static str,
        value: String,
        reason: String,
    },
    #[error("Reference error in <{element}> attribute '{attribute}' = \"{value}\": {reason}")]
    Reference {
        element: &'static str,
        attribute: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to write document: {0}")]
    Serialize(String),
}

impl TilesetError {
    pub fn parse(
        element: &'static str,
        attribute: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            element,
            attribute,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn reference(
        element: &'static str,
        attribute: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Reference {
            element,
            attribute,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Structurally invalid document (bad XML, bad attribute value, bad geometry)
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Xml(_) | Self::Parse { .. })
    }

    /// Dangling tile id or terrain id
    pub fn is_reference_error(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }
}

/// Parse a numeric attribute, reporting the element and attribute on failure
pub fn parse_attr<T>(element: &'static str, attribute: &'static str, value: &str) -> Result<T, TilesetError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| TilesetError::parse(element, attribute, value, e.to_string()))
}

/// Parse a tile reference where `-1` means "no tile"
pub fn parse_optional_tile(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
) -> Result<Option<u32>, TilesetError> {
    match value.map(str::trim) {
        None | Some("-1") => Ok(None),
        Some(raw) => parse_attr::<u32>(element, attribute, raw).map(Some),
    }
}

/// Parse a `0`/`1` flag attribute
pub fn parse_flag(element: &'static str, attribute: &'static str, value: Option<&str>) -> Result<bool, TilesetError> {
    match value.map(str::trim) {
        None | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(TilesetError::parse(element, attribute, other, "expected 0 or 1")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attr_reports_context() {
        let err = parse_attr::<u32>("tileset", "columns", "abc").unwrap_err();
        assert!(err.is_parse_error());
        let msg = err.to_string();
        assert!(msg.contains("<tileset>"));
        assert!(msg.contains("columns"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_optional_tile() {
        assert_eq!(parse_optional_tile("wangset", "tile", Some("-1")).unwrap(), None);
        assert_eq!(parse_optional_tile("wangset", "tile", None).unwrap(), None);
        assert_eq!(parse_optional_tile("wangset", "tile", Some("12")).unwrap(), Some(12));
        assert!(parse_optional_tile("wangset", "tile", Some("-7")).is_err());
    }

    #[test]
    fn test_flag() {
        assert!(parse_flag("transformations", "hflip", Some("1")).unwrap());
        assert!(!parse_flag("transformations", "hflip", None).unwrap());
        assert!(parse_flag("transformations", "hflip", Some("yes")).is_err());
    }
}
