//! Document synchronization with the language server.
//!
//! The server only answers queries about documents it has been told about.
//! Before each document-scoped query the provider syncs the document here,
//! sending didOpen for new documents and a full-text didChange when the file's
//! modification time moved since the last sync.

use std::collections::HashMap;
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::fs;

use crate::lsp_bridge::LspBridge;
use crate::utils::{language_id_for_path, uri_to_path};

#[derive(Debug)]
struct DocumentState {
    version: i32,
    mtime: SystemTime,
}

/// What a sync has to send for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncAction {
    Skip,
    Open,
    Change { version: i32 },
}

#[derive(Debug, Default)]
pub struct DocumentManager {
    open: HashMap<String, DocumentState>,
}

impl DocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures the server has the current text of `uri`.
    pub async fn ensure_open(&mut self, lsp: &LspBridge, uri: &str) -> Result<()> {
        let path = uri_to_path(uri)?;
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        let action = self.plan(uri, modified);
        if action == SyncAction::Skip {
            tracing::trace!(uri, "Document already synchronized");
            return Ok(());
        }

        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let version = match action {
            SyncAction::Open => {
                tracing::debug!(uri, "Opening document");
                let params = json!({
                    "textDocument": {
                        "uri": uri,
                        "languageId": language_id_for_path(&path),
                        "version": 1,
                        "text": text,
                    }
                });
                lsp.notify("textDocument/didOpen", params).await?;
                1
            }
            SyncAction::Change { version } => {
                tracing::debug!(uri, version, "Document modified, sending didChange");
                let params = json!({
                    "textDocument": { "uri": uri, "version": version },
                    "contentChanges": [{ "text": text }]
                });
                lsp.notify("textDocument/didChange", params).await?;
                version
            }
            SyncAction::Skip => return Ok(()),
        };
        self.record(uri, version, modified);
        Ok(())
    }

    pub async fn close_all(&mut self, lsp: &LspBridge) -> Result<()> {
        for uri in std::mem::take(&mut self.open).into_keys() {
            let params = json!({ "textDocument": { "uri": uri } });
            if let Err(err) = lsp.notify("textDocument/didClose", params).await {
                tracing::debug!(uri, ?err, "Failed to close document");
            }
        }
        Ok(())
    }

    fn plan(&self, uri: &str, modified: SystemTime) -> SyncAction {
        match self.open.get(uri) {
            None => SyncAction::Open,
            Some(state) if is_newer(modified, state.mtime) => SyncAction::Change {
                version: state.version + 1,
            },
            Some(_) => SyncAction::Skip,
        }
    }

    fn record(&mut self, uri: &str, version: i32, mtime: SystemTime) {
        self.open
            .insert(uri.to_string(), DocumentState { version, mtime });
    }
}

/// Checks if timestamp `a` is newer than timestamp `b`.
fn is_newer(a: SystemTime, b: SystemTime) -> bool {
    a.duration_since(b).is_ok_and(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const URI: &str = "file:///src/main.rs";

    #[test]
    fn plans_open_change_and_skip() {
        let mut docs = DocumentManager::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        assert_eq!(docs.plan(URI, t0), SyncAction::Open);

        docs.record(URI, 1, t0);
        assert_eq!(docs.plan(URI, t0), SyncAction::Skip);
        assert_eq!(docs.plan(URI, t0 - Duration::from_secs(5)), SyncAction::Skip);

        let t1 = t0 + Duration::from_millis(1);
        assert_eq!(docs.plan(URI, t1), SyncAction::Change { version: 2 });
        docs.record(URI, 2, t1);
        assert_eq!(docs.plan(URI, t1 + Duration::from_secs(1)), SyncAction::Change { version: 3 });
    }
}
