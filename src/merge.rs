//! Schema merging and document traversal.

use serde_json::{Map, Value};

use crate::error::FlattenError;
use crate::types::{SchemaPath, NON_MERGEABLE_KEYS, REF, TYPE};

/// Follow `path` from the document root.
///
/// Segments address object keys, or array indices when the current value is
/// an array. Returns `None` if any segment is missing.
pub fn traverse<'a>(document: &'a Value, path: &SchemaPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(document, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Mutable variant of [`traverse`].
pub fn traverse_mut<'a>(document: &'a mut Value, path: &SchemaPath) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(document, |current, segment| match current {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        })
}

/// Merge `src` into `target` in place.
///
/// - keys only in `src` are copied
/// - object values present on both sides are merged recursively
/// - `type` and `$ref` unify into one ordered, de-duplicated `type` list,
///   except two identical `$ref`s, which stay a single `$ref`
/// - `required` lists are unioned and sorted
/// - `uniqueItems` and `insertionOrder` must agree
/// - anything else is overwritten by `src`
///
/// # Errors
///
/// Returns `FlattenError::Constraint` naming `path` when a non-mergeable key
/// has different values on each side.
pub fn schema_merge(
    target: &mut Map<String, Value>,
    src: &Map<String, Value>,
    path: &SchemaPath,
) -> Result<(), FlattenError> {
    for (key, src_value) in src {
        if key == TYPE || key == REF {
            merge_type(target, key, src_value);
            continue;
        }

        let Some(target_value) = target.get_mut(key) else {
            target.insert(key.clone(), src_value.clone());
            continue;
        };

        match (target_value, src_value) {
            (Value::Object(target_obj), Value::Object(src_obj)) if is_member_map(key) => {
                merge_members(target_obj, src_obj, &path.child(key.as_str()))?;
            }
            (Value::Object(target_obj), Value::Object(src_obj)) => {
                schema_merge(target_obj, src_obj, &path.child(key.as_str()))?;
            }
            (target_value, src_value) if key == "required" => {
                *target_value = union_sorted(target_value, src_value);
            }
            (target_value, src_value) => {
                if NON_MERGEABLE_KEYS.contains(&key.as_str()) && *target_value != *src_value {
                    return Err(FlattenError::constraint(
                        path,
                        format!(
                            "declared multiple values for '{}': found '{}' and '{}'",
                            key, target_value, src_value
                        ),
                    ));
                }
                *target_value = src_value.clone();
            }
        }
    }
    Ok(())
}

/// Keys whose values map names to schemas rather than holding keywords.
fn is_member_map(key: &str) -> bool {
    key == "properties" || key == "patternProperties"
}

/// Merge two name → schema maps; same-named schemas are merged as schemas.
fn merge_members(
    target: &mut Map<String, Value>,
    src: &Map<String, Value>,
    path: &SchemaPath,
) -> Result<(), FlattenError> {
    for (name, src_schema) in src {
        match (target.get_mut(name), src_schema) {
            (Some(Value::Object(target_schema)), Value::Object(src_schema)) => {
                schema_merge(target_schema, src_schema, &path.child(name.as_str()))?;
            }
            _ => {
                target.insert(name.clone(), src_schema.clone());
            }
        }
    }
    Ok(())
}

/// Unify a `type` or `$ref` from the source schema into the target.
fn merge_type(target: &mut Map<String, Value>, key: &str, src_value: &Value) {
    let has_type = target.contains_key(TYPE);
    let has_ref = target.contains_key(REF);

    if !has_type && !has_ref {
        target.insert(key.to_string(), src_value.clone());
        return;
    }

    // both sides point at the same schema
    if key == REF && !has_type && target.get(REF) == Some(src_value) {
        return;
    }

    let mut types = Vec::new();
    if let Some(existing) = target.remove(TYPE) {
        extend_type_set(&mut types, &existing);
    }
    if let Some(existing) = target.remove(REF) {
        extend_type_set(&mut types, &existing);
    }
    extend_type_set(&mut types, src_value);

    let merged = if types.len() == 1 {
        types.remove(0)
    } else {
        Value::Array(types)
    };
    target.insert(TYPE.to_string(), merged);
}

/// Append the members of a `type` value to an ordered set.
pub fn extend_type_set(types: &mut Vec<Value>, value: &Value) {
    let members = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    for member in members {
        if !types.contains(member) {
            types.push(member.clone());
        }
    }
}

fn union_sorted(left: &Value, right: &Value) -> Value {
    let mut names: Vec<String> = [left, right]
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect::<Vec<_>>(),
            Value::String(s) => vec![s.as_str()],
            _ => Vec::new(),
        })
        .map(String::from)
        .collect();
    names.sort();
    names.dedup();
    Value::Array(names.into_iter().map(Value::String).collect())
}
