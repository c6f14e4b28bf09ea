//! Schema flattening.
//!
//! Reduces one self-contained document into a minimal collection of object
//! schemas: every object with `properties` gets its own entry keyed by its
//! canonical path, nested objects are replaced with `{"$ref": ...}` to that
//! entry, and refs to anything else are inlined in place.
//!
//! Assumptions about the input:
//! 1. the document root is an object schema
//! 2. combiners (`allOf`, `anyOf`, `oneOf`) on object schemas are squashed into
//!    the surrounding object; members that are refs to other objects stay refs
//!    and unify into a type union
//! 3. truthy `additionalProperties` and `additionalItems` are not allowed
//! 4. `properties` and `patternProperties` are mutually exclusive

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::FlattenError;
use crate::merge::{schema_merge, traverse};
use crate::types::{is_truthy, json_type_name, Ref, SchemaPath, COMBINERS, TYPE};

/// Canonical path → flattened object schema, in the order entries were completed.
pub type FlattenedSchemaMap = IndexMap<SchemaPath, Map<String, Value>>;

/// Flatten a self-contained schema document.
///
/// # Errors
///
/// Returns `FlattenError` if the schema violates a flattening constraint,
/// contains a cycle through an object schema, or has a `$ref` that cannot be
/// resolved inside the document. No partial map is returned.
pub fn flatten(document: &Value) -> Result<FlattenedSchemaMap, FlattenError> {
    SchemaFlattener::new(document).flatten_schema()
}

/// Render a flattened map as a JSON object keyed by pointer.
pub fn flattened_to_value(map: &FlattenedSchemaMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(path, schema)| (path.to_pointer(), Value::Object(schema.clone())))
            .collect(),
    )
}

/// Result of walking one subschema.
#[derive(Debug, Clone, PartialEq)]
enum Walked {
    /// The subschema became (or already was) an entry of the map.
    Canonical(SchemaPath),
    /// The subschema stays where it is.
    Inline(Value),
}

impl Walked {
    fn into_value(self) -> Value {
        match self {
            Walked::Canonical(path) => Ref::Canonical(path).to_schema(),
            Walked::Inline(value) => value,
        }
    }
}

pub struct SchemaFlattener<'a> {
    document: &'a Value,
    schema_map: FlattenedSchemaMap,
    /// Paths currently being resolved, outermost first.
    in_progress: IndexSet<SchemaPath>,
}

impl<'a> SchemaFlattener<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            schema_map: IndexMap::new(),
            in_progress: IndexSet::new(),
        }
    }

    pub fn flatten_schema(mut self) -> Result<FlattenedSchemaMap, FlattenError> {
        let root = SchemaPath::root();
        if !self.document.is_object() {
            return Err(FlattenError::constraint(&root, "is not an object schema"));
        }
        let document = self.document;
        self.walk(document, root)?;
        Ok(self.schema_map)
    }

    fn walk(&mut self, schema: &Value, path: SchemaPath) -> Result<Walked, FlattenError> {
        if self.in_progress.contains(&path) {
            return Err(self.circular(&path));
        }
        if self.schema_map.contains_key(&path) {
            trace!(path = %path, "reusing flattened schema");
            return Ok(Walked::Canonical(path));
        }

        let schema = match schema {
            Value::Object(schema) => schema,
            // boolean schemas have nothing to flatten
            Value::Bool(_) => return Ok(Walked::Inline(schema.clone())),
            other => {
                return Err(FlattenError::constraint(
                    &path,
                    format!("holds a {} instead of a schema", json_type_name(other)),
                ))
            }
        };

        self.in_progress.insert(path.clone());
        let result = match Ref::from_schema(schema) {
            Some(reference) => self.walk_ref(&reference),
            None => self.walk_typed(schema, &path),
        };
        self.in_progress.shift_remove(&path);
        result
    }

    fn walk_typed(
        &mut self,
        schema: &Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<Walked, FlattenError> {
        // schemas without type are assumed to be objects
        match schema.get(TYPE) {
            None => self.flatten_object_type(schema, path),
            Some(Value::String(t)) if t == "object" => self.flatten_object_type(schema, path),
            Some(Value::String(t)) if t == "array" => self.flatten_array_type(schema, path),
            _ => Ok(Walked::Inline(Value::Object(schema.clone()))),
        }
    }

    /// Follow a reference and flatten its target at the target's own path.
    ///
    /// Refs to objects come back as canonical refs; refs to anything else are
    /// inlined.
    fn walk_ref(&mut self, reference: &Ref) -> Result<Walked, FlattenError> {
        let (target, path) = self.find_subschema(reference)?;
        trace!(reference = %reference.pointer(), target = %path, "following ref");
        self.walk(&target, path)
    }

    /// Look up the schema a reference points at.
    ///
    /// Canonical refs to completed entries are served from the map; anything
    /// else is found by traversing the document from its root.
    fn find_subschema(&self, reference: &Ref) -> Result<(Value, SchemaPath), FlattenError> {
        let path = match reference {
            Ref::Unresolved(pointer) => {
                SchemaPath::from_pointer(pointer).map_err(|e| FlattenError::InvalidRef {
                    reference: pointer.clone(),
                    message: e.to_string(),
                })?
            }
            Ref::Canonical(path) => path.clone(),
        };

        if let Some(done) = self.schema_map.get(&path) {
            return Ok((Value::Object(done.clone()), path));
        }

        let target = traverse(self.document, &path).ok_or_else(|| FlattenError::InvalidRef {
            reference: reference.pointer(),
            message: "no schema at this location".to_string(),
        })?;
        Ok((target.clone(), path))
    }

    fn flatten_array_type(
        &mut self,
        schema: &Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<Walked, FlattenError> {
        if schema.get("additionalItems").is_some_and(is_truthy) {
            return Err(FlattenError::constraint(path, "has 'additionalItems'"));
        }

        let mut schema = schema.clone();
        if let Some(items) = schema.get("items").cloned() {
            if items.is_array() {
                return Err(FlattenError::constraint(path, "has tuple-typed 'items'"));
            }
            let walked = self.walk(&items, path.child("items"))?;
            schema.insert("items".to_string(), walked.into_value());
        }
        Ok(Walked::Inline(Value::Object(schema)))
    }

    fn flatten_object_type(
        &mut self,
        schema: &Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<Walked, FlattenError> {
        let mut schema = schema.clone();
        self.flatten_combiners(&mut schema, path)?;

        if schema.get("additionalProperties").is_some_and(is_truthy) {
            return Err(FlattenError::constraint(path, "has 'additionalProperties'"));
        }

        if schema.contains_key("properties") && schema.contains_key("patternProperties") {
            return Err(FlattenError::constraint(
                path,
                "has mutually exclusive 'properties' and 'patternProperties'",
            ));
        }

        if let Some(properties) = schema.get("properties").cloned() {
            let flattened = self.flatten_members(&properties, path, "properties")?;
            schema.insert("properties".to_string(), flattened);
            trace!(path = %path, "adding flattened schema");
            self.schema_map.insert(path.clone(), schema);
            return Ok(Walked::Canonical(path.clone()));
        }

        if let Some(patterns) = schema.get("patternProperties").cloned() {
            let flattened = self.flatten_members(&patterns, path, "patternProperties")?;
            schema.insert("patternProperties".to_string(), flattened);
        }

        Ok(Walked::Inline(Value::Object(schema)))
    }

    /// Walk every member schema of `properties` or `patternProperties`.
    fn flatten_members(
        &mut self,
        members: &Value,
        path: &SchemaPath,
        keyword: &str,
    ) -> Result<Value, FlattenError> {
        let Value::Object(members) = members else {
            return Err(FlattenError::constraint(
                path,
                format!("has non-object '{keyword}'"),
            ));
        };

        let mut flattened = Map::new();
        for (name, member) in members {
            let walked = self.walk(member, path.join([keyword, name.as_str()]))?;
            flattened.insert(name.clone(), walked.into_value());
        }
        Ok(Value::Object(flattened))
    }

    /// Squash `allOf`, `anyOf` and `oneOf` into the surrounding schema.
    fn flatten_combiners(
        &mut self,
        schema: &mut Map<String, Value>,
        path: &SchemaPath,
    ) -> Result<(), FlattenError> {
        for combiner in COMBINERS {
            let Some(subschemas) = schema.remove(*combiner) else {
                continue;
            };
            let Value::Array(subschemas) = subschemas else {
                return Err(FlattenError::constraint(
                    path,
                    format!("has non-array '{combiner}'"),
                ));
            };

            for (index, subschema) in subschemas.iter().enumerate() {
                let sub_path = path.join([*combiner, index.to_string().as_str()]);
                let shared = self.schema_map.contains_key(&sub_path);

                let resolved = match self.walk(subschema, sub_path.clone())? {
                    // nothing else refers to this entry, its properties are
                    // squashed into the surrounding object
                    Walked::Canonical(target) if target == sub_path && !shared => self
                        .schema_map
                        .shift_remove(&target)
                        .map(Value::Object)
                        .unwrap_or_default(),
                    // another ref already uses this entry, so it stays and
                    // its contents are copied
                    Walked::Canonical(target) if target == sub_path => {
                        self.find_subschema(&Ref::Canonical(target))?.0
                    }
                    // a ref to an object elsewhere stays a ref; several of
                    // them unify into a type union
                    Walked::Canonical(target) => Ref::Canonical(target).to_schema(),
                    Walked::Inline(value) => value,
                };

                if let Value::Object(resolved) = resolved {
                    schema_merge(schema, &resolved, path)?;
                }
            }
        }
        Ok(())
    }

    fn circular(&self, path: &SchemaPath) -> FlattenError {
        let chain = self
            .in_progress
            .iter()
            .skip_while(|p| *p != path)
            .chain(std::iter::once(path))
            .map(SchemaPath::to_pointer)
            .collect();
        FlattenError::CircularRef {
            path: path.to_pointer(),
            chain,
        }
    }
}
