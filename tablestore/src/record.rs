//! Records and their text encoding.
//!
//! A record is an ordered list of named, typed attributes. On disk each
//! attribute is rendered as `name(type_tag|value)` and the fields are
//! concatenated with no separator; the closing parenthesis terminates a field.
//!
//! The format does not escape `(`, `)` or `|`. Values containing those
//! characters will not decode back to the same record.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Logical record identifier, taken from the `id` attribute.
pub type RecordId = i32;

/// Name of the attribute that carries a record's identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// Logical type of an attribute value.
///
/// Values are always stored as text; the type only drives schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Int,
    String,
    Double,
    /// A tag this build does not know about. Kept so records round-trip.
    Other(i32),
}

impl AttributeType {
    /// Numeric tag written into the encoded record.
    #[must_use]
    pub const fn tag(self) -> i32 {
        match self {
            Self::Int => 1,
            Self::String => 2,
            Self::Double => 3,
            Self::Other(tag) => tag,
        }
    }

    /// Type name as it appears in a table schema.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::Double => "double",
            Self::Other(_) => "unknown",
        }
    }

    /// Parse a schema type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "string" => Some(Self::String),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    /// Whether `value` is a valid textual rendering of this type.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Int => value.trim().parse::<i64>().is_ok(),
            Self::Double => value.trim().parse::<f64>().is_ok(),
            Self::String | Self::Other(_) => true,
        }
    }
}

impl From<i32> for AttributeType {
    fn from(tag: i32) -> Self {
        match tag {
            1 => Self::Int,
            2 => Self::String,
            3 => Self::Double,
            other => Self::Other(other),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single named, typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
    pub value: String,
}

/// An ordered sequence of attributes identified by its `id` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    attributes: Vec<Attribute>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Append an attribute. Insertion order is preserved.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        attribute_type: AttributeType,
        value: impl Into<String>,
    ) {
        self.attributes.push(Attribute {
            name: name.into(),
            attribute_type,
            value: value.into(),
        });
    }

    /// Builder form of [`Record::push`].
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        attribute_type: AttributeType,
        value: impl Into<String>,
    ) -> Self {
        self.push(name, attribute_type, value);
        self
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// First attribute with the given name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Value of the first attribute with the given name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|attr| attr.value.as_str())
    }

    /// The record's identifier, if it has a numeric `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.value(ID_ATTRIBUTE)?.trim().parse().ok()
    }

    /// Attribute values keyed by name. For a repeated name the first value
    /// wins, matching [`Record::attribute`].
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for attr in &self.attributes {
            map.entry(attr.name.clone())
                .or_insert_with(|| attr.value.clone());
        }
        map
    }

    /// Render the record as `name(type_tag|value)` fields.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for attr in &self.attributes {
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "{}({}|{})",
                attr.name,
                attr.attribute_type.tag(),
                attr.value
            );
        }
        out
    }

    /// Parse an encoded record.
    ///
    /// Malformed fields are skipped. Returns `None` if no attribute could be
    /// recovered.
    #[must_use]
    pub fn decode(data: &str) -> Option<Self> {
        let mut record = Self::new();

        for token in data.split(')') {
            if token.is_empty() {
                continue;
            }
            let Some((name, rest)) = token.split_once('(') else {
                tracing::warn!("skipping malformed field (no '('): {token:?}");
                continue;
            };
            let Some((tag, value)) = rest.split_once('|') else {
                tracing::warn!("skipping malformed field (no '|'): {token:?}");
                continue;
            };
            if name.is_empty() || tag.is_empty() || value.is_empty() {
                tracing::warn!("skipping field with empty component: {token:?}");
                continue;
            }
            let Ok(tag) = tag.trim().parse::<i32>() else {
                tracing::warn!("skipping field with non-numeric type tag: {token:?}");
                continue;
            };
            record.push(name, AttributeType::from(tag), value);
        }

        if record.is_empty() {
            None
        } else {
            Some(record)
        }
    }

    /// Decode raw page bytes. Non-UTF-8 input never yields a record.
    #[must_use]
    pub fn decode_bytes(data: &[u8]) -> Option<Self> {
        std::str::from_utf8(data).ok().and_then(Self::decode)
    }
}
