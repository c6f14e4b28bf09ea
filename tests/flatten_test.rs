//! Integration tests for schema flattening.

use serde_json::{json, Value};
use schema_model::{flatten, flattened_to_value, FlattenError, FlattenedSchemaMap, SchemaPath};

fn path(segments: &[&str]) -> SchemaPath {
    segments.iter().copied().collect()
}

fn entry<'a>(map: &'a FlattenedSchemaMap, segments: &[&str]) -> Value {
    Value::Object(
        map.get(&path(segments))
            .unwrap_or_else(|| panic!("no entry at {:?}", segments))
            .clone(),
    )
}

// === Canonical Entries ===

mod canonical_entries {
    use super::*;

    #[test]
    fn end_to_end_example_has_three_entries() {
        let schema = json!({
            "properties": {
                "state": {"$ref": "#/definitions/location"},
                "coordinates": {"type": "array", "items": {"$ref": "#/definitions/coordinate"}}
            },
            "definitions": {
                "location": {"type": "object", "properties": {"country": {"type": "string"}}},
                "coordinate": {"type": "object", "properties": {"lat": {"type": "number"}}}
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(flattened.len(), 3);
        assert_eq!(
            entry(&flattened, &[]),
            json!({
                "properties": {
                    "state": {"$ref": "#/definitions/location"},
                    "coordinates": {"type": "array", "items": {"$ref": "#/definitions/coordinate"}}
                },
                "definitions": {
                    "location": {"type": "object", "properties": {"country": {"type": "string"}}},
                    "coordinate": {"type": "object", "properties": {"lat": {"type": "number"}}}
                }
            })
        );
        assert_eq!(
            entry(&flattened, &["definitions", "location"]),
            json!({"type": "object", "properties": {"country": {"type": "string"}}})
        );
        assert_eq!(
            entry(&flattened, &["definitions", "coordinate"]),
            json!({"type": "object", "properties": {"lat": {"type": "number"}}})
        );
    }

    #[test]
    fn nested_objects_become_refs() {
        let schema = json!({
            "properties": {
                "outer": {
                    "properties": {
                        "inner": {"properties": {"leaf": {"type": "boolean"}}}
                    }
                }
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(
            entry(&flattened, &[])["properties"]["outer"],
            json!({"$ref": "#/properties/outer"})
        );
        assert_eq!(
            entry(&flattened, &["properties", "outer"])["properties"]["inner"],
            json!({"$ref": "#/properties/outer/properties/inner"})
        );
        assert!(flattened.contains_key(&path(&["properties", "outer", "properties", "inner"])));
    }

    #[test]
    fn no_entry_is_array_or_primitive_shaped() {
        let schema = json!({
            "properties": {
                "list": {"type": "array", "items": {"properties": {"a": {"type": "string"}}}},
                "name": {"type": "string"},
                "tags": {"patternProperties": {".*": {"type": "string"}}},
                "free": {"type": "object"}
            }
        });

        let flattened = flatten(&schema).unwrap();
        for (path, schema) in &flattened {
            assert!(schema.contains_key("properties"), "entry {path} has no properties");
            assert_ne!(schema.get("type"), Some(&json!("array")));
        }
        assert_eq!(flattened.len(), 2);
        assert!(flattened.contains_key(&path(&["properties", "list", "items"])));
    }

    #[test]
    fn diamond_refs_share_one_entry() {
        let schema = json!({
            "properties": {
                "home": {"$ref": "#/definitions/address"},
                "work": {"$ref": "#/definitions/address"}
            },
            "definitions": {
                "address": {"properties": {"street": {"type": "string"}}}
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(flattened.len(), 2);
        let root = entry(&flattened, &[]);
        assert_eq!(root["properties"]["home"], json!({"$ref": "#/definitions/address"}));
        assert_eq!(root["properties"]["work"], json!({"$ref": "#/definitions/address"}));
    }

    #[test]
    fn refs_to_primitives_are_inlined() {
        let schema = json!({
            "properties": {
                "id": {"$ref": "#/definitions/id"}
            },
            "definitions": {
                "id": {"$ref": "#/definitions/uuid"},
                "uuid": {"type": "string", "format": "uuid"}
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(flattened.len(), 1);
        assert_eq!(
            entry(&flattened, &[])["properties"]["id"],
            json!({"type": "string", "format": "uuid"})
        );
    }

    #[test]
    fn escaped_keys_round_trip_through_refs() {
        let schema = json!({
            "properties": {"a": {"$ref": "#/definitions/a~1b%20c"}},
            "definitions": {"a/b c": {"properties": {"x": {"type": "integer"}}}}
        });

        let flattened = flatten(&schema).unwrap();
        assert!(flattened.contains_key(&path(&["definitions", "a/b c"])));
        assert_eq!(
            entry(&flattened, &[])["properties"]["a"],
            json!({"$ref": "#/definitions/a~1b%20c"})
        );
    }

    #[test]
    fn flattening_is_idempotent_on_canonical_documents() {
        let schema = json!({
            "properties": {
                "state": {"$ref": "#/definitions/location"},
                "count": {"type": "integer"}
            },
            "definitions": {
                "location": {"properties": {"country": {"type": "string"}}}
            }
        });

        let first = flatten(&schema).unwrap();
        let second = flatten(&schema).unwrap();
        assert_eq!(first, second);
        assert_eq!(entry(&first, &[]), schema);
    }

    #[test]
    fn flattened_value_is_keyed_by_pointer() {
        let schema = json!({
            "properties": {"a": {"properties": {"b": {"type": "string"}}}}
        });
        let value = flattened_to_value(&flatten(&schema).unwrap());
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["#/properties/a", "#"]);
    }
}

// === Combiners ===

mod combiners {
    use super::*;

    #[test]
    fn all_of_properties_are_squashed() {
        for combiner in ["allOf", "anyOf", "oneOf"] {
            let mut schema = serde_json::Map::new();
            schema.insert("required".into(), json!(["a"]));
            schema.insert(
                combiner.into(),
                json!([
                    {"properties": {"a": {"type": "string"}}, "required": ["b"]},
                    {"properties": {"b": {"type": "integer"}}}
                ]),
            );

            let flattened = flatten(&Value::Object(schema)).unwrap();
            assert_eq!(flattened.len(), 1, "{combiner}");
            assert_eq!(
                entry(&flattened, &[]),
                json!({
                    "required": ["a", "b"],
                    "properties": {"a": {"type": "string"}, "b": {"type": "integer"}}
                })
            );
        }
    }

    #[test]
    fn combiner_refs_stay_refs() {
        let schema = json!({
            "allOf": [
                {"$ref": "#/definitions/base"},
                {"properties": {"extra": {"type": "boolean"}}}
            ],
            "definitions": {
                "base": {"properties": {"id": {"type": "string"}}}
            }
        });

        let flattened = flatten(&schema).unwrap();
        let root = entry(&flattened, &[]);
        assert_eq!(root["$ref"], "#/definitions/base");
        assert_eq!(root["properties"], json!({"extra": {"type": "boolean"}}));
        assert_eq!(
            entry(&flattened, &["definitions", "base"]),
            json!({"properties": {"id": {"type": "string"}}})
        );
    }

    #[test]
    fn distinct_object_refs_become_a_type_union() {
        let schema = json!({
            "properties": {
                "pet": {"oneOf": [{"$ref": "#/definitions/cat"}, {"$ref": "#/definitions/dog"}]},
                "same": {"anyOf": [{"$ref": "#/definitions/cat"}, {"$ref": "#/definitions/cat"}]}
            },
            "definitions": {
                "cat": {"properties": {"meow": {"type": "string"}}},
                "dog": {"properties": {"bark": {"type": "string"}}}
            }
        });

        let flattened = flatten(&schema).unwrap();
        let root = entry(&flattened, &[]);
        assert_eq!(
            root["properties"]["pet"],
            json!({"type": ["#/definitions/cat", "#/definitions/dog"]})
        );
        assert_eq!(root["properties"]["same"], json!({"$ref": "#/definitions/cat"}));
        assert!(flattened.contains_key(&path(&["definitions", "cat"])));
        assert!(flattened.contains_key(&path(&["definitions", "dog"])));
    }

    #[test]
    fn properties_named_like_keywords_are_merged_as_properties() {
        let schema = json!({
            "allOf": [
                {"properties": {"type": {"type": "string"}, "required": {"type": "boolean"}}},
                {"properties": {
                    "type": {"type": "string", "maxLength": 5},
                    "name": {"type": "string"}
                }}
            ]
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(
            entry(&flattened, &[]),
            json!({
                "properties": {
                    "type": {"type": "string", "maxLength": 5},
                    "required": {"type": "boolean"},
                    "name": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn refs_into_combiners_before_and_after() {
        let schema = json!({
            "properties": {
                "p1": {"$ref": "#/properties/p2/allOf/0"},
                "p2": {
                    "allOf": [
                        {"properties": {"a2": {"type": "integer"}}},
                        {"properties": {"a2": {"type": "integer"}}}
                    ]
                },
                "p3": {"$ref": "#/properties/p2/allOf/1"}
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(flattened.len(), 4);
        assert_eq!(
            entry(&flattened, &[]),
            json!({
                "properties": {
                    "p1": {"$ref": "#/properties/p2/allOf/0"},
                    "p2": {"$ref": "#/properties/p2"},
                    "p3": {"$ref": "#/properties/p2/allOf/1"}
                }
            })
        );
        let expected = json!({"properties": {"a2": {"type": "integer"}}});
        assert_eq!(entry(&flattened, &["properties", "p2"]), expected);
        assert_eq!(entry(&flattened, &["properties", "p2", "allOf", "0"]), expected);
        assert_eq!(entry(&flattened, &["properties", "p2", "allOf", "1"]), expected);
    }

    #[test]
    fn primitive_type_union_is_kept() {
        let schema = json!({
            "properties": {
                "value": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
            }
        });

        let flattened = flatten(&schema).unwrap();
        assert_eq!(
            entry(&flattened, &[])["properties"]["value"],
            json!({"type": ["string", "integer"]})
        );
    }

    #[test]
    fn conflicting_unique_items_names_path() {
        let schema = json!({
            "properties": {
                "tags": {
                    "properties": {},
                    "allOf": [
                        {"properties": {"list": {"type": "array", "uniqueItems": true}}},
                        {"properties": {"list": {"type": "array", "uniqueItems": false}}}
                    ]
                }
            }
        });

        let err = flatten(&schema).unwrap_err();
        match err {
            FlattenError::Constraint { path, message } => {
                assert_eq!(path, "#/properties/tags/properties/list");
                assert!(message.contains("uniqueItems"), "{message}");
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }
}

// === Constraints ===

mod constraints {
    use super::*;

    fn constraint_path(schema: Value) -> String {
        match flatten(&schema).unwrap_err() {
            FlattenError::Constraint { path, .. } => path,
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn additional_properties_truthy_is_rejected() {
        let schema = json!({
            "properties": {"a": {"properties": {}, "additionalProperties": {"type": "string"}}}
        });
        assert_eq!(constraint_path(schema), "#/properties/a");
    }

    #[test]
    fn additional_properties_false_or_empty_is_allowed() {
        for additional in [json!(false), json!({})] {
            let schema = json!({
                "properties": {"a": {"type": "string"}},
                "additionalProperties": additional
            });
            assert!(flatten(&schema).is_ok());
        }
    }

    #[test]
    fn additional_items_truthy_is_rejected() {
        let schema = json!({
            "properties": {"a": {"type": "array", "additionalItems": true}}
        });
        assert_eq!(constraint_path(schema), "#/properties/a");
    }

    #[test]
    fn properties_and_pattern_properties_are_exclusive() {
        let schema = json!({
            "properties": {"foo": {"type": "string"}},
            "patternProperties": {"bar": {"type": "string"}}
        });
        assert_eq!(constraint_path(schema), "#");
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert_eq!(constraint_path(json!(true)), "#");
        assert_eq!(constraint_path(json!([])), "#");
    }
}

// === References ===

mod references {
    use super::*;

    fn assert_circular(schema: Value) {
        match flatten(&schema).unwrap_err() {
            FlattenError::CircularRef { chain, .. } => {
                assert!(chain.iter().any(|p| p == "#/properties/a"), "{chain:?}");
            }
            other => panic!("expected circular ref, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_circular() {
        assert_circular(json!({"properties": {"a": {"$ref": "#/properties/a"}}}));
    }

    #[test]
    fn mutual_reference_is_circular() {
        assert_circular(json!({
            "properties": {
                "a": {"$ref": "#/properties/z"},
                "z": {"$ref": "#/properties/a"}
            }
        }));
    }

    #[test]
    fn indirect_reference_is_circular() {
        assert_circular(json!({
            "properties": {
                "a": {"$ref": "#/properties/b"},
                "b": {"$ref": "#/properties/c"},
                "c": {"$ref": "#/properties/a"}
            }
        }));
    }

    #[test]
    fn nested_reference_is_circular() {
        assert_circular(json!({
            "properties": {
                "a": {"$ref": "#/properties/b"},
                "b": {"properties": {"a": {"$ref": "#/properties/a"}}}
            }
        }));
    }

    #[test]
    fn circular_chain_display() {
        let err = flatten(&json!({"properties": {"a": {"$ref": "#/properties/a"}}})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "circular reference at '#/properties/a': #/properties/a -> #/properties/a"
        );
    }

    #[test]
    fn missing_target_is_invalid_ref() {
        let err = flatten(&json!({"properties": {"a": {"$ref": "#/definitions/nope"}}})).unwrap_err();
        assert!(matches!(err, FlattenError::InvalidRef { ref reference, .. } if reference == "#/definitions/nope"));
    }

    #[test]
    fn remote_ref_is_invalid_ref() {
        let err = flatten(&json!({"properties": {"a": {"$ref": "other.json#/a"}}})).unwrap_err();
        assert!(matches!(err, FlattenError::InvalidRef { .. }));
    }
}
