//! Error types for schema loading, inlining, flattening and model resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("expected prefix '{expected}', but was '{actual}'")]
    MissingPrefix { expected: String, actual: String },

    #[error("invalid percent-encoding in pointer segment '{segment}'")]
    InvalidEncoding { segment: String },
}

/// Errors while loading a schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot load '{uri}': unsupported URI scheme")]
    UnsupportedScheme { uri: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors during schema flattening.
///
/// Paths are rendered as URI fragment pointers (`#/properties/foo`).
#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("object at '{path}' {message}")]
    Constraint { path: String, message: String },

    #[error("circular reference at '{path}': {}", chain.join(" -> "))]
    CircularRef { path: String, chain: Vec<String> },

    #[error("invalid ref '{reference}': {message}")]
    InvalidRef { reference: String, message: String },
}

impl FlattenError {
    pub(crate) fn constraint(path: &crate::types::SchemaPath, message: impl Into<String>) -> Self {
        FlattenError::Constraint {
            path: path.to_pointer(),
            message: message.into(),
        }
    }
}

/// Errors while inlining cross-document references.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("schema already contains remote schemas under '{key}'")]
    ReservedKey { key: String },

    #[error("invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("failed to fetch {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: LoadError,
    },

    #[error("invalid ref '{reference}': {message}")]
    InvalidRef { reference: String, message: String },

    #[error("circular reference at '{path}': {}", chain.join(" -> "))]
    CircularRef { path: String, chain: Vec<String> },

    #[error("document '{uri}' is not a JSON object")]
    InvalidDocument { uri: String },
}

impl InlineError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            InlineError::Fetch { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while deriving class names and property types.
#[derive(Debug, Error)]
pub enum ModelResolverError {
    #[error("could not create a valid class from schema at '{path}'")]
    NoClassName { path: String },

    #[error("ref '{reference}' does not point at a flattened schema")]
    UnknownRef { reference: String },

    #[error("flattened schema at '{path}' has no properties")]
    NotAnObject { path: String },

    #[error("unknown type '{type_name}' at '{path}'")]
    UnknownType { path: String, type_name: String },
}

/// Any error produced by the load → inline → flatten → resolve pipeline.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Inline(#[from] InlineError),

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Model(#[from] ModelResolverError),
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::Load(e) => e.exit_code(),
            SchemaError::Inline(e) => e.exit_code(),
            _ => 2,
        }
    }
}
