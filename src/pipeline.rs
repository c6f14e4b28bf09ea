//! The load → inline → flatten → resolve pipeline.

use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;
use crate::flattener::{flatten, FlattenedSchemaMap};
use crate::inliner::{inline, Fetch};
use crate::model::{resolve, ModelMap};

/// Class name given to the root schema unless configured otherwise.
pub const DEFAULT_ROOT_CLASS_NAME: &str = "ResourceModel";

/// Options for [`load_models`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Absolute URI the document was loaded from.
    pub base_uri: String,
    /// Class name of the root schema.
    pub root_class_name: String,
    /// When false, remote refs are left alone and the inliner is skipped.
    pub inline_remote: bool,
}

impl PipelineOptions {
    /// Create options with the default root class name and inlining enabled.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            root_class_name: DEFAULT_ROOT_CLASS_NAME.to_string(),
            inline_remote: true,
        }
    }

    /// Set the class name of the root schema.
    pub fn root_class_name(mut self, name: impl Into<String>) -> Self {
        self.root_class_name = name.into();
        self
    }

    /// Enable or disable remote reference inlining.
    pub fn inline_remote(mut self, inline_remote: bool) -> Self {
        self.inline_remote = inline_remote;
        self
    }
}

/// Output of the full pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    /// The self-contained document the flattener ran on.
    pub document: Value,
    pub flattened: FlattenedSchemaMap,
    pub models: ModelMap,
}

/// Flatten a single self-contained document and resolve its models.
///
/// # Example
///
/// ```
/// use schema_model::{resolve_models, ResolvedType};
/// use serde_json::json;
///
/// let schema = json!({
///     "properties": {"state": {"$ref": "#/definitions/location"}},
///     "definitions": {
///         "location": {"properties": {"country": {"type": "string"}}}
///     }
/// });
///
/// let models = resolve_models(&schema, "Root").unwrap();
/// assert_eq!(models["Root"]["state"], ResolvedType::model("Location"));
/// ```
///
/// # Errors
///
/// Returns `SchemaError::Flatten` or `SchemaError::Model`.
pub fn resolve_models(document: &Value, root_class_name: &str) -> Result<ModelMap, SchemaError> {
    let flattened = flatten(document)?;
    Ok(resolve(&flattened, root_class_name)?)
}

/// Inline the document if configured.
///
/// # Errors
///
/// Returns `SchemaError::Inline` if inlining fails.
pub fn prepare<F>(
    document: Value,
    fetch: &mut F,
    options: &PipelineOptions,
) -> Result<Value, SchemaError>
where
    F: Fetch + ?Sized,
{
    if !options.inline_remote {
        debug!("remote inlining disabled");
        return Ok(document);
    }
    Ok(inline(document, &options.base_uri, fetch)?)
}

/// Run the full pipeline on a parsed document.
///
/// # Errors
///
/// Returns the first error of any stage; no partial result is produced.
pub fn load_models<F>(
    document: Value,
    fetch: &mut F,
    options: &PipelineOptions,
) -> Result<ResolvedSchema, SchemaError>
where
    F: Fetch + ?Sized,
{
    let document = prepare(document, fetch, options)?;
    let flattened = flatten(&document)?;
    debug!(entries = flattened.len(), "flattened schema");
    let models = resolve(&flattened, &options.root_class_name)?;
    debug!(classes = models.len(), "resolved models");

    Ok(ResolvedSchema {
        document,
        flattened,
        models,
    })
}
