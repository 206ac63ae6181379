//! Document storage collaborator.
//!
//! The dispatcher asks the store whether a document exists before any provider
//! query runs; handlers open documents to read preview lines and to decode
//! semantic tokens against the source text.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lsp_types::Uri;
use tokio::fs;

use crate::utils::{language_id_for_path, uri_to_path};

/// Snapshot of a document's text read for a single tool call.
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub uri: Uri,
    pub language_id: String,
    text: String,
}

impl TextDocument {
    pub fn new(uri: Uri, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            text: text.into(),
        }
    }

    /// Returns the zero-based `line` without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.text
            .lines()
            .nth(line as usize)
            .map(|l| l.trim_end_matches('\r'))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether the document behind `uri` exists.
    async fn exists(&self, uri: &Uri) -> bool;

    async fn open(&self, uri: &Uri) -> Result<TextDocument>;
}

/// Reads documents straight from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDocumentStore;

impl FsDocumentStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn exists(&self, uri: &Uri) -> bool {
        match uri_to_path(uri.as_str()) {
            Ok(path) => fs::metadata(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn open(&self, uri: &Uri) -> Result<TextDocument> {
        let path = uri_to_path(uri.as_str())?;
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        if !metadata.is_file() {
            return Err(anyhow!("not a regular file: {}", path.display()));
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let language_id = language_id_for_path(&path).to_string();
        Ok(TextDocument::new(uri.clone(), language_id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::path_to_uri;
    use tempfile::tempdir;

    fn uri_for(path: &std::path::Path) -> Uri {
        path_to_uri(path).unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn opens_existing_file_with_language() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "fn main() {\r\n    run();\r\n}\n").unwrap();

        let store = FsDocumentStore::new();
        let uri = uri_for(&path);
        assert!(store.exists(&uri).await);

        let doc = store.open(&uri).await.unwrap();
        assert_eq!(doc.language_id, "rust");
        assert_eq!(doc.line(0), Some("fn main() {"));
        assert_eq!(doc.line(1), Some("    run();"));
        assert_eq!(doc.line(7), None);
    }

    #[tokio::test]
    async fn missing_file_does_not_exist() {
        let dir = tempdir().unwrap();
        let uri = uri_for(&dir.path().join("missing.py"));
        let store = FsDocumentStore::new();
        assert!(!store.exists(&uri).await);
        assert!(store.open(&uri).await.is_err());
    }

    #[tokio::test]
    async fn non_file_scheme_does_not_exist() {
        let uri: Uri = "untitled:Untitled-1".parse().unwrap();
        assert!(!FsDocumentStore::new().exists(&uri).await);
    }
}
