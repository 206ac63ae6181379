//! Best-effort preview lines for resolved locations.

use lsp_types::Uri;

use crate::store::DocumentStore;

/// Opens `uri` and returns the trimmed text of `line`.
///
/// Failures are logged and turned into `None`; a missing preview never fails
/// the surrounding tool call.
pub async fn resolve_preview(store: &dyn DocumentStore, uri: &Uri, line: u32) -> Option<String> {
    let document = match store.open(uri).await {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(uri = %uri.as_str(), line, ?err, "Failed to open document for preview");
            return None;
        }
    };
    match document.line(line) {
        Some(text) => Some(text.trim().to_string()),
        None => {
            tracing::warn!(uri = %uri.as_str(), line, "Preview line out of range");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::FakeStore;

    #[tokio::test]
    async fn trims_requested_line() {
        let store =
            FakeStore::new().with_document("file:///src/a.rs", "rust", "fn a() {\n    call();\n}\n");
        let uri: Uri = "file:///src/a.rs".parse().unwrap();
        assert_eq!(resolve_preview(&store, &uri, 1).await.as_deref(), Some("call();"));
    }

    #[tokio::test]
    async fn tolerates_unreadable_documents_and_lines() {
        let store = FakeStore::new()
            .with_document("file:///src/a.rs", "rust", "one line\n")
            .with_unreadable("file:///src/b.rs");
        let a: Uri = "file:///src/a.rs".parse().unwrap();
        let b: Uri = "file:///src/b.rs".parse().unwrap();
        assert_eq!(resolve_preview(&store, &a, 4).await, None);
        assert_eq!(resolve_preview(&store, &b, 0).await, None);
    }
}
