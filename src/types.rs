//! Core types shared by the flattener, inliner and model resolver.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PointerError;
use crate::pointer;

/// Schema reference keyword.
pub const REF: &str = "$ref";

/// Schema type keyword.
pub const TYPE: &str = "type";

/// Keywords folded into their surrounding object schema during flattening.
pub const COMBINERS: &[&str] = &["oneOf", "anyOf", "allOf"];

/// Keywords whose values must agree when two schemas are merged.
pub const NON_MERGEABLE_KEYS: &[&str] = &["uniqueItems", "insertionOrder"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truthiness of a schema keyword value.
///
/// `additionalProperties: {}` and `additionalProperties: false` both allow
/// flattening; a non-empty schema or `true` does not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Location of a schema inside a document, as an ordered list of segments.
///
/// Array indices are stored as their decimal string, so a path survives a
/// trip through [`SchemaPath::to_pointer`] and [`SchemaPath::from_pointer`]
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<String>);

impl SchemaPath {
    /// The document root (`#`).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Decode a `#/...` pointer.
    pub fn from_pointer(pointer: &str) -> Result<Self, PointerError> {
        pointer::decode(pointer, "#").map(Self)
    }

    /// Encode as a `#/...` pointer.
    pub fn to_pointer(&self) -> String {
        pointer::encode(&self.0, "#")
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// A new path with every segment of `tail` appended.
    pub fn join<I, S>(&self, tail: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = self.0.clone();
        segments.extend(tail.into_iter().map(Into::into));
        Self(segments)
    }
}

impl<S: Into<String>> FromIterator<S> for SchemaPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

impl Serialize for SchemaPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_pointer())
    }
}

/// A `$ref` target.
///
/// `Unresolved` holds the pointer text as written in a document and needs a
/// traversal from the document root. `Canonical` names a path the flattener
/// has already identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref {
    Unresolved(String),
    Canonical(SchemaPath),
}

impl Ref {
    /// Read the `$ref` of a schema object, if it has a string one.
    pub fn from_schema(schema: &Map<String, Value>) -> Option<Self> {
        schema
            .get(REF)
            .and_then(Value::as_str)
            .map(|pointer| Ref::Unresolved(pointer.to_string()))
    }

    /// The pointer text of this reference.
    pub fn pointer(&self) -> String {
        match self {
            Ref::Unresolved(pointer) => pointer.clone(),
            Ref::Canonical(path) => path.to_pointer(),
        }
    }

    /// The `{"$ref": "#/..."}` schema object for this reference.
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert(REF.to_string(), Value::String(self.pointer()));
        Value::Object(schema)
    }
}
