//! Cross-document reference inlining.
//!
//! Every `$ref` that leaves the base document is followed, the target
//! document is fetched once, and its content is stored under the reserved
//! top-level key [`REMOTE_KEY`]. Afterwards, every `$ref` in the result is a
//! local `#/...` pointer, so the flattener only ever sees one document.
//!
//! ```
//! use schema_model::{inline, LoadError};
//! use serde_json::{json, Value};
//! use url::Url;
//!
//! let schema = json!({
//!     "properties": {"foo": {"$ref": "common.json#/definitions/tag"}}
//! });
//! let mut fetch = |_: &Url| -> Result<Value, LoadError> {
//!     Ok(json!({"definitions": {"tag": {"type": "string"}}}))
//! };
//!
//! let inlined = inline(schema, "file:///schemas/base.json", &mut fetch).unwrap();
//! assert_eq!(
//!     inlined["properties"]["foo"]["$ref"],
//!     "#/remote/schema0/definitions/tag"
//! );
//! assert_eq!(
//!     inlined["remote"]["schema0"]["$comment"],
//!     "file:///schemas/common.json"
//! );
//! ```

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::error::{InlineError, LoadError};
use crate::merge::{traverse, traverse_mut};
use crate::pointer;
use crate::types::{SchemaPath, REF};

/// Top-level key holding the inlined remote documents.
pub const REMOTE_KEY: &str = "remote";

/// Source of remote schema documents.
///
/// Called at most once per absolute document URI (without fragment).
/// Any closure `FnMut(&Url) -> Result<Value, LoadError>` is a `Fetch`.
pub trait Fetch {
    fn fetch(&mut self, uri: &Url) -> Result<Value, LoadError>;
}

impl<F> Fetch for F
where
    F: FnMut(&Url) -> Result<Value, LoadError>,
{
    fn fetch(&mut self, uri: &Url) -> Result<Value, LoadError> {
        self(uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Namespace {
    Base,
    Remote(String),
}

/// A position inside one of the known documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Location {
    namespace: Namespace,
    path: SchemaPath,
}

impl Location {
    fn base(path: SchemaPath) -> Self {
        Self {
            namespace: Namespace::Base,
            path,
        }
    }

    fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            path: self.path.child(segment),
        }
    }

    /// Path of this location once remote documents live under [`REMOTE_KEY`].
    fn local_path(&self) -> SchemaPath {
        match &self.namespace {
            Namespace::Base => self.path.clone(),
            Namespace::Remote(name) => {
                SchemaPath::new(vec![REMOTE_KEY.to_string(), name.clone()])
                    .join(self.path.segments().iter().cloned())
            }
        }
    }

    fn to_pointer(&self) -> String {
        self.local_path().to_pointer()
    }
}

/// Inline all remote references of `document`.
///
/// `base_uri` is the absolute URI `document` was loaded from; relative refs
/// are resolved against it, and refs that name it explicitly are shortened
/// to plain local pointers.
///
/// # Errors
///
/// - `InlineError::ReservedKey` if a remote ref is found but `document`
///   already has a top-level `remote` key
/// - `InlineError::Fetch` if fetching a remote document fails
/// - `InlineError::InvalidRef` if a ref does not resolve to a value
/// - `InlineError::CircularRef` if a chain of refs leads back to itself
pub fn inline<F>(document: Value, base_uri: &str, fetch: &mut F) -> Result<Value, InlineError>
where
    F: Fetch + ?Sized,
{
    RefInliner::new(document, base_uri, fetch)?.inline()
}

/// Walks a document and every document it references, recording an edge for
/// each `$ref` it meets.
pub struct RefInliner<'f, F: Fetch + ?Sized> {
    base_uri: Url,
    renames: IndexMap<String, Namespace>,
    documents: IndexMap<Namespace, Value>,
    ref_graph: IndexMap<Location, Location>,
    fetch: &'f mut F,
}

impl<'f, F: Fetch + ?Sized> RefInliner<'f, F> {
    /// # Errors
    ///
    /// Returns `InlineError::InvalidUri` if `base_uri` is not an absolute URI.
    pub fn new(document: Value, base_uri: &str, fetch: &'f mut F) -> Result<Self, InlineError> {
        let mut base_uri = Url::parse(base_uri).map_err(|e| InlineError::InvalidUri {
            uri: base_uri.to_string(),
            message: e.to_string(),
        })?;
        base_uri.set_fragment(None);

        let mut renames = IndexMap::new();
        renames.insert(base_uri.to_string(), Namespace::Base);
        let mut documents = IndexMap::new();
        documents.insert(Namespace::Base, document);

        Ok(Self {
            base_uri,
            renames,
            documents,
            ref_graph: IndexMap::new(),
            fetch,
        })
    }

    /// Walk, rewrite refs, and attach remote documents.
    pub fn inline(mut self) -> Result<Value, InlineError> {
        let root = self.documents[&Namespace::Base].clone();
        let scope = self.base_uri.clone();
        self.walk(&root, Location::base(SchemaPath::root()), &scope)?;
        debug!(
            refs = self.ref_graph.len(),
            documents = self.documents.len(),
            "walked reference graph"
        );

        self.rewrite_refs()?;
        self.inline_remote_documents()
    }

    fn walk(&mut self, value: &Value, location: Location, scope: &Url) -> Result<(), InlineError> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get(REF) {
                    self.walk_ref(reference, location.clone(), scope)?;
                }
                for (key, child) in map {
                    if key == REF && child.is_string() {
                        continue;
                    }
                    self.walk(child, location.child(key.as_str()), scope)?;
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.walk(item, location.child(index.to_string()), scope)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn walk_ref(&mut self, reference: &str, from: Location, scope: &Url) -> Result<(), InlineError> {
        let url = scope.join(reference).map_err(|e| InlineError::InvalidUri {
            uri: reference.to_string(),
            message: e.to_string(),
        })?;
        let (document_uri, to, fetched) = self.parse_ref_url(&url)?;
        debug!(from = %from.to_pointer(), to = %to.to_pointer(), %url, "edge");

        if traverse(&self.documents[&to.namespace], &to.path).is_none() {
            return Err(InlineError::InvalidRef {
                reference: url.to_string(),
                message: format!("nothing at '{}'", to.path),
            });
        }
        self.ref_graph.insert(from, to.clone());

        // every document is walked in full exactly once, when it is first
        // seen, so refs outside the referenced subtree are rewritten too
        if fetched {
            let document = self.documents[&to.namespace].clone();
            let root = Location {
                namespace: to.namespace,
                path: SchemaPath::root(),
            };
            self.walk(&document, root, &document_uri)?;
        }
        Ok(())
    }

    /// Split `url` into its document URI and a location, fetching the
    /// document the first time it is seen.
    ///
    /// The flag is true when this call fetched the document.
    fn parse_ref_url(&mut self, url: &Url) -> Result<(Url, Location, bool), InlineError> {
        let segments = pointer::decode(url.fragment().unwrap_or(""), "").map_err(|e| {
            InlineError::InvalidRef {
                reference: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let mut document_uri = url.clone();
        document_uri.set_fragment(None);

        let (namespace, fetched) = match self.renames.get(document_uri.as_str()) {
            Some(namespace) => (namespace.clone(), false),
            None => (self.load_remote(&document_uri)?, true),
        };

        Ok((
            document_uri,
            Location {
                namespace,
                path: SchemaPath::new(segments),
            },
            fetched,
        ))
    }

    fn load_remote(&mut self, uri: &Url) -> Result<Namespace, InlineError> {
        if self.documents[&Namespace::Base].get(REMOTE_KEY).is_some() {
            return Err(InlineError::ReservedKey {
                key: REMOTE_KEY.to_string(),
            });
        }

        // the base document occupies the first rename
        let namespace = Namespace::Remote(format!("schema{}", self.renames.len() - 1));
        debug!(%uri, ?namespace, "fetching remote schema");
        let document = self
            .fetch
            .fetch(uri)
            .map_err(|source| InlineError::Fetch {
                uri: uri.to_string(),
                source,
            })?;
        if !document.is_object() {
            return Err(InlineError::InvalidDocument {
                uri: uri.to_string(),
            });
        }

        self.renames.insert(uri.to_string(), namespace.clone());
        self.documents.insert(namespace.clone(), document);
        Ok(namespace)
    }

    /// Follow alias edges until a location that is not itself a ref.
    fn final_target(&self, from: &Location) -> Result<&Location, InlineError> {
        let mut seen = IndexSet::new();
        seen.insert(from);
        let mut current = &self.ref_graph[from];
        while let Some(next) = self.ref_graph.get(current) {
            if !seen.insert(current) {
                let mut chain: Vec<String> = seen.iter().map(|l| l.to_pointer()).collect();
                chain.push(current.to_pointer());
                return Err(InlineError::CircularRef {
                    path: from.to_pointer(),
                    chain,
                });
            }
            current = next;
        }
        Ok(current)
    }

    fn rewrite_refs(&mut self) -> Result<(), InlineError> {
        let mut rewrites = Vec::with_capacity(self.ref_graph.len());
        for from in self.ref_graph.keys() {
            let target = self.final_target(from)?;
            rewrites.push((from.clone(), target.to_pointer()));
        }

        for (from, new_ref) in rewrites {
            let document = self
                .documents
                .get_mut(&from.namespace)
                .and_then(|document| traverse_mut(document, &from.path))
                .and_then(Value::as_object_mut)
                .ok_or_else(|| InlineError::InvalidRef {
                    reference: from.to_pointer(),
                    message: "ref location disappeared".to_string(),
                })?;
            trace!(from = %from.to_pointer(), to = %new_ref, "rewriting ref");
            document.insert(REF.to_string(), Value::String(new_ref));
        }
        Ok(())
    }

    fn inline_remote_documents(mut self) -> Result<Value, InlineError> {
        let mut root = self
            .documents
            .shift_remove(&Namespace::Base)
            .unwrap_or(Value::Null);

        let mut remote = Map::new();
        for (uri, namespace) in &self.renames {
            let Namespace::Remote(name) = namespace else {
                continue;
            };
            let Some(Value::Object(content)) = self.documents.shift_remove(namespace) else {
                continue;
            };
            debug!(%uri, name = %name, "inlining remote schema");
            let mut inlined = Map::new();
            inlined.insert("$comment".to_string(), Value::String(uri.clone()));
            inlined.extend(content);
            remote.insert(name.clone(), Value::Object(inlined));
        }

        if remote.is_empty() {
            return Ok(root);
        }
        match root.as_object_mut() {
            Some(root_map) => {
                root_map.insert(REMOTE_KEY.to_string(), Value::Object(remote));
                Ok(root)
            }
            None => Err(InlineError::InvalidDocument {
                uri: self.base_uri.to_string(),
            }),
        }
    }
}
