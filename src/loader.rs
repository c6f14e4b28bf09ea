//! Schema loading from various sources.
//!
//! Handles loading schemas from files, strings, and HTTP URLs, and supplies
//! the [`DocumentFetcher`] the inliner uses for remote references.

use std::path::Path;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::LoadError;
use crate::inliner::Fetch;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_schema_str(&content)
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or the response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    // Check for HTTP errors before parsing
    client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(network_error)?
        .json()
        .map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema from a file path or URL.
///
/// The source is turned into an absolute URI with [`base_uri_for`] and loaded
/// through [`load_uri`], so both accept the same schemes. URL loading requires
/// the `remote` feature.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` for a missing file,
/// `LoadError::UnsupportedScheme` for an unloadable URL, and the usual load
/// errors otherwise.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    load_uri(&base_uri_for(source)?)
}

/// Load the document an absolute `file`, `http` or `https` URI points at.
///
/// The fragment, if any, is ignored.
///
/// # Errors
///
/// Returns `LoadError::UnsupportedScheme` for any other scheme (or for
/// `http`/`https` without the `remote` feature), and the usual load errors
/// otherwise.
pub fn load_uri(uri: &Url) -> Result<Value, LoadError> {
    let unsupported = || LoadError::UnsupportedScheme {
        uri: uri.to_string(),
    };

    match uri.scheme() {
        "file" => {
            let path = uri.to_file_path().map_err(|()| unsupported())?;
            load_schema(&path)
        }
        #[cfg(feature = "remote")]
        "http" | "https" => {
            let mut document_uri = uri.clone();
            document_uri.set_fragment(None);
            load_schema_url(document_uri.as_str())
        }
        _ => Err(unsupported()),
    }
}

/// Absolute base URI for a schema source given on the command line.
///
/// URLs are used as-is; file paths are canonicalized into `file://` URIs so
/// relative `$ref`s resolve next to the file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if a file path doesn't exist.
pub fn base_uri_for(source: &str) -> Result<Url, LoadError> {
    if is_url(source) {
        return Url::parse(source).map_err(|_| LoadError::UnsupportedScheme {
            uri: source.to_string(),
        });
    }

    let path = Path::new(source);
    let canonical = path.canonicalize().map_err(|_| LoadError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    Url::from_file_path(&canonical).map_err(|()| LoadError::UnsupportedScheme {
        uri: canonical.display().to_string(),
    })
}

/// [`Fetch`] implementation backed by [`load_uri`].
///
/// Keeps a log of every URI it loaded, which the CLI reports at debug level.
#[derive(Debug, Default)]
pub struct DocumentFetcher {
    fetched: Vec<Url>,
}

impl DocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// URIs loaded so far, in fetch order.
    pub fn fetched(&self) -> &[Url] {
        &self.fetched
    }
}

impl Fetch for DocumentFetcher {
    fn fetch(&mut self, uri: &Url) -> Result<Value, LoadError> {
        debug!(%uri, "loading referenced schema");
        let document = load_uri(uri)?;
        self.fetched.push(uri.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn load_schema_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn load_schema_file_not_found() {
        let result = load_schema(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_schema_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_schema(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_schema_str_invalid() {
        let result = load_schema_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/schema.json"));
        assert!(is_url("http://example.com/schema.json"));
        assert!(!is_url("/path/to/schema.json"));
        assert!(!is_url("./schema.json"));
        assert!(!is_url("file:///schema.json"));
    }

    #[test]
    fn load_schema_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "string"}}"#).unwrap();

        let schema = load_schema_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(schema["type"], "string");
    }

    #[test]
    fn load_schema_auto_missing_file() {
        let result = load_schema_auto("/nonexistent/schema.json");
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn base_uri_for_file_is_absolute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "{}").unwrap();

        let uri = base_uri_for(path.to_str().unwrap()).unwrap();
        assert_eq!(uri.scheme(), "file");
        assert!(uri.path().ends_with("/schema.json"));
    }

    #[test]
    fn base_uri_for_missing_file() {
        let result = base_uri_for("/nonexistent/schema.json");
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn base_uri_for_url_is_kept() {
        let uri = base_uri_for("https://example.com/schemas/a.json").unwrap();
        assert_eq!(uri.as_str(), "https://example.com/schemas/a.json");
    }

    #[test]
    fn load_uri_file_ignores_fragment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, r#"{"nested": {"bar": {"type": "string"}}}"#).unwrap();

        let mut uri = Url::from_file_path(path.canonicalize().unwrap()).unwrap();
        uri.set_fragment(Some("/nested/bar"));
        let document = load_uri(&uri).unwrap();
        assert!(document.get("nested").is_some());
    }

    #[test]
    fn load_uri_unsupported_scheme() {
        let uri = Url::parse("ftp://example.com/schema.json").unwrap();
        let result = load_uri(&uri);
        assert!(matches!(result, Err(LoadError::UnsupportedScheme { .. })));
    }

    #[test]
    fn document_fetcher_records_uris() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, "{}").unwrap();
        let uri = Url::from_file_path(path.canonicalize().unwrap()).unwrap();

        let mut fetcher = DocumentFetcher::new();
        fetcher.fetch(&uri).unwrap();
        assert_eq!(fetcher.fetched(), &[uri]);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_schema_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"type": "object"}"#)
                .create();

            let schema = load_schema_url(&format!("{}/schema.json", server.url())).unwrap();
            assert_eq!(schema["type"], "object");
            mock.assert();
        }

        #[test]
        fn load_schema_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_schema_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }

        #[test]
        fn load_schema_auto_url() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_body(r#"{"type": "string"}"#)
                .create();

            let schema = load_schema_auto(&format!("{}/schema.json", server.url())).unwrap();
            assert_eq!(schema["type"], "string");
            mock.assert();
        }

        #[test]
        fn load_uri_http_drops_fragment() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/common.json")
                .with_status(200)
                .with_body(r#"{"definitions": {}}"#)
                .create();

            let uri = Url::parse(&format!("{}/common.json#/definitions", server.url())).unwrap();
            let document = load_uri(&uri).unwrap();
            assert!(document.get("definitions").is_some());
            mock.assert();
        }
    }
}
