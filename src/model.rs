//! Model resolution.
//!
//! Takes a flattened schema map and builds a full set of models using the
//! pseudo-types `primitive`, `model`, `list`, `set`, `dict` and `multiple`.
//! Value types are the JSON Schema primitives plus an `undefined` sentinel,
//! which makes it easy for code generators to map the resolved types to
//! language types.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ModelResolverError;
use crate::flattener::FlattenedSchemaMap;
use crate::types::{SchemaPath, REF, TYPE};

/// Format reported for primitives that declare none.
pub const FORMAT_DEFAULT: &str = "default";

/// Class name → property name → resolved type.
pub type ModelMap = IndexMap<String, IndexMap<String, ResolvedType>>;

/// JSON Schema primitive, or `Undefined` for values of arbitrary JSON type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Undefined,
}

impl PrimitiveType {
    /// Parse a JSON Schema `type` name.
    ///
    /// Returns `None` for `object`, `array` and unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PrimitiveType::String),
            "integer" => Some(PrimitiveType::Integer),
            "number" => Some(PrimitiveType::Number),
            "boolean" => Some(PrimitiveType::Boolean),
            "null" => Some(PrimitiveType::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Null => "null",
            PrimitiveType::Undefined => "undefined",
        }
    }
}

/// Language-neutral type of one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "container", rename_all = "lowercase")]
pub enum ResolvedType {
    Primitive { kind: PrimitiveType, format: String },
    Model { class_name: String },
    List { element: Box<ResolvedType> },
    Set { element: Box<ResolvedType> },
    Dict { value: Box<ResolvedType> },
    Multiple { candidates: Vec<String> },
}

impl ResolvedType {
    /// A primitive with the default format.
    pub fn primitive(kind: PrimitiveType) -> Self {
        ResolvedType::Primitive {
            kind,
            format: FORMAT_DEFAULT.to_string(),
        }
    }

    pub fn model(class_name: impl Into<String>) -> Self {
        ResolvedType::Model {
            class_name: class_name.into(),
        }
    }

    pub fn list(element: ResolvedType) -> Self {
        ResolvedType::List {
            element: Box::new(element),
        }
    }

    pub fn set(element: ResolvedType) -> Self {
        ResolvedType::Set {
            element: Box::new(element),
        }
    }

    pub fn dict(value: ResolvedType) -> Self {
        ResolvedType::Dict {
            value: Box::new(value),
        }
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::Primitive { kind, format } if format == FORMAT_DEFAULT => {
                f.write_str(kind.as_str())
            }
            ResolvedType::Primitive { kind, format } => write!(f, "{}({})", kind.as_str(), format),
            ResolvedType::Model { class_name } => f.write_str(class_name),
            ResolvedType::List { element } => write!(f, "List<{element}>"),
            ResolvedType::Set { element } => write!(f, "Set<{element}>"),
            ResolvedType::Dict { value } => write!(f, "Dict<{value}>"),
            ResolvedType::Multiple { candidates } => {
                write!(f, "Multiple<{}>", candidates.join("|"))
            }
        }
    }
}

/// Derives class names for a flattened map and resolves property types.
pub struct ModelResolver<'a> {
    flattened: &'a FlattenedSchemaMap,
    class_names: IndexMap<SchemaPath, String>,
}

impl<'a> ModelResolver<'a> {
    /// Assign a class name to every entry of the flattened map.
    ///
    /// The root path gets `root_class_name`; every other entry is named from
    /// its path, with `_` appended until the name is unique.
    ///
    /// # Errors
    ///
    /// Returns `ModelResolverError::NoClassName` if a path has no segment a
    /// class name can be derived from.
    pub fn new(
        flattened: &'a FlattenedSchemaMap,
        root_class_name: &str,
    ) -> Result<Self, ModelResolverError> {
        let mut class_names = IndexMap::new();
        let root = SchemaPath::root();
        if flattened.contains_key(&root) {
            class_names.insert(root, root_class_name.to_string());
        }

        for path in flattened.keys().filter(|path| !path.is_root()) {
            let mut class_name = base_class_from_ref(path)?;
            while class_names.values().any(|taken| *taken == class_name) {
                class_name.push('_');
            }
            debug!(path = %path, class_name = %class_name, "assigned class name");
            class_names.insert(path.clone(), class_name);
        }

        Ok(Self {
            flattened,
            class_names,
        })
    }

    /// Class name assigned to a canonical path.
    pub fn class_name(&self, path: &SchemaPath) -> Option<&str> {
        self.class_names.get(path).map(String::as_str)
    }

    /// Build the class → property → type mapping.
    ///
    /// Classes appear in the naming order (root first); properties keep their
    /// schema order.
    pub fn resolve_models(&self) -> Result<ModelMap, ModelResolverError> {
        let mut models = ModelMap::new();
        for (path, class_name) in &self.class_names {
            let schema = &self.flattened[path];
            let properties = schema
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| ModelResolverError::NotAnObject {
                    path: path.to_pointer(),
                })?;

            let mut resolved = IndexMap::new();
            for (name, property) in properties {
                let property_path = path.join(["properties", name.as_str()]);
                resolved.insert(name.clone(), self.resolve_type(property, &property_path)?);
            }
            models.insert(class_name.clone(), resolved);
        }
        Ok(models)
    }

    /// Resolve the pseudo-type of one flattened property schema.
    ///
    /// Refs become models via the class name table; everything else is
    /// resolved from its declared (or default `object`) type.
    pub fn resolve_type(
        &self,
        schema: &Value,
        path: &SchemaPath,
    ) -> Result<ResolvedType, ModelResolverError> {
        // boolean schemas accept any value
        let Value::Object(schema) = schema else {
            return Ok(ResolvedType::primitive(PrimitiveType::Undefined));
        };

        if let Some(reference) = schema.get(REF) {
            return self.model_from_ref(reference);
        }

        let type_name = match schema.get(TYPE) {
            None => "object",
            Some(Value::String(t)) => t.as_str(),
            Some(Value::Array(types)) => {
                let mut candidates: Vec<String> = Vec::new();
                for t in types {
                    let t = t.as_str().ok_or_else(|| ModelResolverError::UnknownType {
                        path: path.to_pointer(),
                        type_name: t.to_string(),
                    })?;
                    if !candidates.iter().any(|c| c == t) {
                        candidates.push(t.to_string());
                    }
                }
                match candidates.as_slice() {
                    [] => "object",
                    [single] if single.starts_with('#') => {
                        return self.model_from_ref(&Value::String(single.clone()));
                    }
                    [_] => types[0].as_str().unwrap_or("object"),
                    _ => return Ok(ResolvedType::Multiple { candidates }),
                }
            }
            Some(other) => {
                return Err(ModelResolverError::UnknownType {
                    path: path.to_pointer(),
                    type_name: other.to_string(),
                })
            }
        };

        match type_name {
            "array" => self.resolve_array_type(schema, path),
            "object" => self.resolve_object_type(schema, path),
            other => {
                let kind =
                    PrimitiveType::parse(other).ok_or_else(|| ModelResolverError::UnknownType {
                        path: path.to_pointer(),
                        type_name: other.to_string(),
                    })?;
                Ok(primitive_type(kind, schema))
            }
        }
    }

    fn model_from_ref(&self, reference: &Value) -> Result<ResolvedType, ModelResolverError> {
        let unknown = || ModelResolverError::UnknownRef {
            reference: reference.as_str().map_or_else(|| reference.to_string(), String::from),
        };
        let pointer = reference.as_str().ok_or_else(unknown)?;
        let path = SchemaPath::from_pointer(pointer).map_err(|_| unknown())?;
        let class_name = self.class_name(&path).ok_or_else(unknown)?;
        Ok(ResolvedType::model(class_name))
    }

    /// Arrays have list semantics unless they are explicitly unordered and unique.
    fn resolve_array_type(
        &self,
        schema: &Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<ResolvedType, ModelResolverError> {
        let element = match schema.get("items") {
            Some(items) => self.resolve_type(items, &path.child("items"))?,
            None => ResolvedType::primitive(PrimitiveType::Undefined),
        };

        let insertion_order = schema
            .get("insertionOrder")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let unique_items = schema
            .get("uniqueItems")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if unique_items && !insertion_order {
            Ok(ResolvedType::set(element))
        } else {
            Ok(ResolvedType::list(element))
        }
    }

    /// Objects are dictionaries with string keys, so only the value type is
    /// resolved.
    ///
    /// A single `patternProperties` entry determines the value type. With none,
    /// or several, the value is an arbitrary JSON value (`undefined`). Nested
    /// `properties` never show up here: flattening turned them into refs.
    fn resolve_object_type(
        &self,
        schema: &Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<ResolvedType, ModelResolverError> {
        let single_pattern = schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .filter(|patterns| patterns.len() == 1)
            .and_then(|patterns| patterns.iter().next());
        let value = match single_pattern {
            Some((pattern, value_schema)) => self.resolve_type(
                value_schema,
                &path.join(["patternProperties", pattern.as_str()]),
            )?,
            None => ResolvedType::primitive(PrimitiveType::Undefined),
        };
        Ok(ResolvedType::dict(value))
    }
}

fn primitive_type(kind: PrimitiveType, schema: &Map<String, Value>) -> ResolvedType {
    ResolvedType::Primitive {
        kind,
        format: schema
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or(FORMAT_DEFAULT)
            .to_string(),
    }
}

/// Resolve class names and property types for a flattened map.
///
/// # Errors
///
/// Returns `ModelResolverError` if a class name cannot be derived or a ref
/// points outside the map.
pub fn resolve(
    flattened: &FlattenedSchemaMap,
    root_class_name: &str,
) -> Result<ModelMap, ModelResolverError> {
    ModelResolver::new(flattened, root_class_name)?.resolve_models()
}

/// Determine the class name for a canonical path.
///
/// Scanning from the last segment, the first segment that is either a child of
/// `properties`/`definitions`, or not itself a structural keyword (and not a
/// pattern), is upper-camel-cased into the name.
///
/// ```
/// use schema_model::{base_class_from_ref, SchemaPath};
///
/// let path: SchemaPath = ["properties", "foo", "items"].into_iter().collect();
/// assert_eq!(base_class_from_ref(&path).unwrap(), "Foo");
/// ```
pub fn base_class_from_ref(path: &SchemaPath) -> Result<String, ModelResolverError> {
    const PARENT_KEYWORDS: &[&str] = &["properties", "definitions"];
    const SCHEMA_KEYWORDS: &[&str] = &["items", "patternProperties", "properties"];

    let segments = path.segments();
    for (idx, elem) in segments.iter().enumerate().rev() {
        let parent = idx.checked_sub(1).map(|i| segments[i].as_str());
        let under_container = parent.is_some_and(|p| PARENT_KEYWORDS.contains(&p));
        let is_keyword = SCHEMA_KEYWORDS.contains(&elem.as_str());

        if under_container || (!is_keyword && parent != Some("patternProperties")) {
            let last = elem.rsplit('/').next().unwrap_or(elem);
            let class_name = upper_camel_case(last);
            if class_name.is_empty() {
                break;
            }
            return Ok(class_name);
        }
    }

    Err(ModelResolverError::NoClassName {
        path: path.to_pointer(),
    })
}

/// `foo_bar-baz` → `FooBarBaz`; existing inner capitals are kept.
fn upper_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
