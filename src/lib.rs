//! Schema Model
//!
//! Turns resource JSON Schemas into language-neutral class models for code
//! generators.
//!
//! The pipeline has three stages:
//!
//! 1. [`inline`] pulls every cross-document `$ref` into the root document,
//!    under the reserved `remote` key.
//! 2. [`flatten`] walks the self-contained document and produces one entry
//!    per object schema with `properties`, replacing nested object schemas
//!    with refs and folding `allOf`/`anyOf`/`oneOf` into their parent.
//! 3. [`resolve`] names a class for every entry and resolves each property
//!    to a [`ResolvedType`].
//!
//! # Example
//!
//! ```
//! use schema_model::{flatten, resolve, PrimitiveType, ResolvedType, SchemaPath};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "properties": {
//!         "state": {"$ref": "#/definitions/location"},
//!         "coordinates": {
//!             "type": "array",
//!             "items": {"$ref": "#/definitions/coordinate"}
//!         }
//!     },
//!     "definitions": {
//!         "location": {
//!             "type": "object",
//!             "properties": {"country": {"type": "string"}}
//!         },
//!         "coordinate": {
//!             "type": "object",
//!             "properties": {"lat": {"type": "number"}}
//!         }
//!     }
//! });
//!
//! let flattened = flatten(&schema).unwrap();
//! assert_eq!(flattened.len(), 3);
//! assert!(flattened.contains_key(&SchemaPath::root()));
//!
//! let models = resolve(&flattened, "Root").unwrap();
//! assert_eq!(models["Root"]["state"], ResolvedType::model("Location"));
//! assert_eq!(
//!     models["Root"]["coordinates"],
//!     ResolvedType::list(ResolvedType::model("Coordinate"))
//! );
//! assert_eq!(
//!     models["Location"]["country"],
//!     ResolvedType::primitive(PrimitiveType::String)
//! );
//! ```
//!
//! # Type Mapping
//!
//! | Property schema | Resolved type |
//! |-----------------|---------------|
//! | `{"$ref": ...}` | `Model` of the referenced class |
//! | `array` with `uniqueItems: true`, `insertionOrder: false` | `Set` |
//! | any other `array` | `List` |
//! | `object` or no type | `Dict` (value from a single `patternProperties` entry) |
//! | several types | `Multiple` |
//! | anything else | `Primitive` with its `format` |

mod error;
mod flattener;
mod inliner;
mod loader;
mod merge;
mod model;
mod pipeline;
pub mod pointer;
mod registry;
mod types;

pub use error::{
    FlattenError, InlineError, LoadError, ModelResolverError, PointerError, SchemaError,
};
pub use flattener::{flatten, flattened_to_value, FlattenedSchemaMap, SchemaFlattener};
pub use inliner::{inline, Fetch, RefInliner, REMOTE_KEY};
pub use loader::{
    base_uri_for, is_url, load_schema, load_schema_auto, load_schema_str, load_uri,
    DocumentFetcher,
};
pub use merge::{schema_merge, traverse};
pub use model::{
    base_class_from_ref, resolve, ModelMap, ModelResolver, PrimitiveType, ResolvedType,
    FORMAT_DEFAULT,
};
pub use pipeline::{
    load_models, prepare, resolve_models, PipelineOptions, ResolvedSchema,
    DEFAULT_ROOT_CLASS_NAME,
};
pub use registry::{Generator, GeneratorRegistry, JsonGenerator, TextGenerator};
pub use types::{Ref, SchemaPath};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
