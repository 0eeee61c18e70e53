use serde::{Deserialize, Serialize};

use super::binary::BinaryValue;

/// Type tag of a content property value.
///
/// All values are carried in string-encoded form; the kind decides how the
/// value converter turns them into the target store's native representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyKind {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Decimal,
    Path,
    #[default]
    Undefined,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PropertyKind::String => "STRING",
            PropertyKind::Binary => "BINARY",
            PropertyKind::Long => "LONG",
            PropertyKind::Double => "DOUBLE",
            PropertyKind::Date => "DATE",
            PropertyKind::Boolean => "BOOLEAN",
            PropertyKind::Decimal => "DECIMAL",
            PropertyKind::Path => "PATH",
            PropertyKind::Undefined => "UNDEFINED",
        };
        f.write_str(name)
    }
}

/// A named, typed property holding string-encoded values.
///
/// A single-valued property (`multiple == false`) holds at most one value
/// after any mutation. A multi-valued property may legally hold zero values;
/// that state is distinct from the property being absent and must survive
/// binding with its declared kind intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProperty {
    name: String,
    #[serde(rename = "type")]
    kind: PropertyKind,
    #[serde(default)]
    multiple: bool,
    #[serde(default)]
    values: Vec<String>,
}

impl ContentProperty {
    /// Create a single-valued property of the given kind with no value yet.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: false,
            values: Vec::new(),
        }
    }

    /// Create an empty multi-valued property of the given kind.
    pub fn new_multiple(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: true,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// All string-encoded values, in order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The first value, if any.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Replace the stored values with a single value.
    ///
    /// On a single-valued property this is the only legal way to mutate the
    /// value list besides [`clear_values`](Self::clear_values).
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.values.clear();
        self.values.push(value.into());
    }

    /// Append a value. Only meaningful on multi-valued properties; on a
    /// single-valued property this replaces the existing value instead.
    pub fn add_value(&mut self, value: impl Into<String>) {
        if !self.multiple {
            self.values.clear();
        }
        self.values.push(value.into());
    }

    /// Store a binary payload as its URI-string encoding (data URI for inline
    /// payloads, locator string for external ones).
    pub fn set_binary_value(&mut self, payload: &BinaryValue) {
        self.set_value(payload.to_uri_string());
    }

    /// Append a binary payload as its URI-string encoding.
    pub fn add_binary_value(&mut self, payload: &BinaryValue) {
        self.add_value(payload.to_uri_string());
    }

    pub fn clear_values(&mut self) {
        self.values.clear();
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_valued_holds_at_most_one_value() {
        let mut prop = ContentProperty::new("title", PropertyKind::String);
        prop.set_value("first");
        prop.add_value("second");

        assert_eq!(prop.value_count(), 1);
        assert_eq!(prop.value(), Some("second"));
    }

    #[test]
    fn test_empty_multi_valued_is_legal() {
        let prop = ContentProperty::new_multiple("ids", PropertyKind::Long);

        assert!(prop.is_multiple());
        assert_eq!(prop.kind(), PropertyKind::Long);
        assert_eq!(prop.value_count(), 0);
        assert_eq!(prop.value(), None);
    }

    #[test]
    fn test_multi_valued_appends_in_order() {
        let mut prop = ContentProperty::new_multiple("tags", PropertyKind::String);
        prop.add_value("a");
        prop.add_value("b");

        assert_eq!(prop.values(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_kind_display_matches_wire_names() {
        assert_eq!(PropertyKind::Decimal.to_string(), "DECIMAL");
        assert_eq!(PropertyKind::Undefined.to_string(), "UNDEFINED");
    }

    #[test]
    fn test_serde_round_trip() {
        let mut prop = ContentProperty::new_multiple("nums", PropertyKind::Long);
        prop.add_value("1");
        prop.add_value("2");

        let json = serde_json::to_string(&prop).unwrap();
        let back: ContentProperty = serde_json::from_str(&json).unwrap();
        assert_eq!(prop, back);
        assert!(json.contains("\"type\":\"LONG\""));
    }
}
