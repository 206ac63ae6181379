//! LSP bridge implementation.
//!
//! This module provides the `LspBridge` type which manages a single LSP server
//! process. It handles process spawning, the initialization handshake, and
//! graceful shutdown. Requests are multiplexed: each caller registers a
//! waiter under a fresh id, writes its request, and a background reader task
//! routes responses back by id. Server-initiated requests get a minimal reply
//! so the server never stalls waiting on us. Every request is bounded by a
//! 15-second timeout, and once the server's output closes new requests fail
//! immediately.

use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use lsp_types::{InitializeResult, ServerCapabilities};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use url::Url;

use crate::transport::{FramedReader, FramedWriter, Incoming};

type ServerInput = Pin<Box<dyn AsyncWrite + Send>>;
type SharedWriter<W> = Arc<Mutex<FramedWriter<W>>>;
type Waiter = oneshot::Sender<std::result::Result<Value, Value>>;
type PendingRequests = Arc<Mutex<HashMap<i64, Waiter>>>;

pub struct LspBridge {
    workspace: PathBuf,
    child: Option<Child>,
    writer: SharedWriter<ServerInput>,
    pending: PendingRequests,
    /// Set by the reader task, under the `pending` lock, when it stops.
    closed: Arc<AtomicBool>,
    next_request_id: AtomicI64,
    reader_task: JoinHandle<()>,
    capabilities: ServerCapabilities,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Token types we advertise; servers map their legend onto these.
const CLIENT_TOKEN_TYPES: &[&str] = &[
    "namespace",
    "type",
    "class",
    "enum",
    "interface",
    "struct",
    "typeParameter",
    "parameter",
    "variable",
    "property",
    "enumMember",
    "event",
    "function",
    "method",
    "macro",
    "keyword",
    "modifier",
    "comment",
    "string",
    "number",
    "regexp",
    "operator",
    "decorator",
];

const CLIENT_TOKEN_MODIFIERS: &[&str] = &[
    "declaration",
    "definition",
    "readonly",
    "static",
    "deprecated",
    "abstract",
    "async",
    "modification",
    "documentation",
    "defaultLibrary",
];

impl LspBridge {
    pub async fn new_with_command(
        command: &str,
        args: Vec<String>,
        workspace: PathBuf,
    ) -> Result<Self> {
        tracing::debug!(command = %command, ?args, "Spawning LSP child process");
        let mut cmd = Command::new(command);
        if !args.is_empty() {
            cmd.args(&args);
        }
        cmd.current_dir(&workspace);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn language server process '{command}'"))?;
        let stdout = child
            .stdout
            .take()
            .context("language server stdout not captured")?;
        let stdin = child
            .stdin
            .take()
            .context("language server stdin not captured")?;

        Ok(Self::over_streams(stdout, Box::pin(stdin), workspace, Some(child)))
    }

    fn over_streams<R>(
        output: R,
        input: ServerInput,
        workspace: PathBuf,
        child: Option<Child>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let writer = Arc::new(Mutex::new(FramedWriter::new(input)));
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader_task = tokio::spawn(read_loop(
            FramedReader::new(output),
            writer.clone(),
            pending.clone(),
            closed.clone(),
        ));

        Self {
            workspace,
            child,
            writer,
            pending,
            closed,
            next_request_id: AtomicI64::new(1),
            reader_task,
            capabilities: ServerCapabilities::default(),
        }
    }

    /// A bridge speaking to an in-process server over the given streams.
    #[cfg(test)]
    pub(crate) fn connected<R, W>(output: R, input: W, capabilities: ServerCapabilities) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        let mut bridge = Self::over_streams(output, Box::pin(input), PathBuf::from("."), None);
        bridge.capabilities = capabilities;
        bridge
    }

    pub async fn initialize(&mut self) -> Result<()> {
        let root_uri = Url::from_directory_path(&self.workspace)
            .map_err(|_| anyhow!("workspace path cannot be expressed as file URI"))?;
        let workspace_name = self
            .workspace
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("workspace");

        let params = json!({
            "processId": std::process::id(),
            "rootUri": root_uri,
            "rootPath": self.workspace,
            "capabilities": client_capabilities(),
            "workspaceFolders": [{
                "name": workspace_name,
                "uri": root_uri,
            }]
        });

        let response = self.request("initialize", params).await?;
        let result: InitializeResult =
            serde_json::from_value(response).context("invalid initialize result")?;
        if let Some(info) = &result.server_info {
            tracing::info!(server = %info.name, version = ?info.version, "LSP server initialized");
        }
        self.capabilities = result.capabilities;
        self.notify("initialized", json!({})).await?;
        Ok(())
    }

    /// Capabilities the server announced during `initialize`.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Sends a JSON-RPC request to the LSP server and waits for its response.
    ///
    /// Safe to call concurrently; responses are matched to callers by id.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::Acquire) {
                return Err(anyhow!("LSP server is no longer running; cannot send '{method}'"));
            }
            pending.insert(id, tx);
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(id, method, "Sending LSP request");
        let written = self.writer.lock().await.write(&payload).await;
        if let Err(err) = written {
            self.pending.lock().await.remove(&id);
            return Err(err.context(format!("failed to send '{method}'")));
        }

        match timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(error))) => Err(anyhow!("LSP error for '{method}': {error}")),
            Ok(Err(_)) => Err(anyhow!(
                "LSP server terminated unexpectedly before responding to '{method}'"
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(anyhow!(
                    "timed out after {:?} waiting for LSP response to '{}'",
                    REQUEST_TIMEOUT,
                    method
                ))
            }
        }
    }

    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.writer.lock().await.write(&payload).await
    }

    /// Gracefully shuts down the LSP server process.
    ///
    /// Sends `shutdown`, then `exit`, then waits for the process; any failed
    /// or timed-out step ends in a kill.
    pub async fn shutdown(mut self) -> Result<()> {
        tracing::debug!("Initiating graceful LSP shutdown");

        let shutdown = self.request("shutdown", Value::Null).await;
        let Some(mut child) = self.child.take() else {
            return shutdown.map(|_| ());
        };
        if let Err(err) = shutdown {
            tracing::warn!(?err, "LSP shutdown request failed; forcing kill");
            child
                .kill()
                .await
                .context("failed to kill LSP child after shutdown failure")?;
            return Ok(());
        }

        if let Err(err) = self.notify("exit", Value::Null).await {
            tracing::warn!(
                ?err,
                "Failed to send LSP exit notification; will still wait for process"
            );
        }

        match timeout(REQUEST_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "LSP server exited cleanly");
            }
            Ok(Err(err)) => {
                tracing::warn!(?err, "Error waiting for LSP process; forcing kill");
                child
                    .kill()
                    .await
                    .context("failed to kill unresponsive LSP process")?;
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?REQUEST_TIMEOUT,
                    "Timed out waiting for LSP to exit; forcing kill"
                );
                child
                    .kill()
                    .await
                    .context("failed to kill timed-out LSP process")?;
            }
        }
        Ok(())
    }
}

impl Drop for LspBridge {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// Routes everything the server writes until its output closes.
async fn read_loop<R, W>(
    mut reader: FramedReader<R>,
    writer: SharedWriter<W>,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let message = match reader.read().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!("LSP server closed its output");
                break;
            }
            Err(err) => {
                tracing::warn!(?err, "Failed to read from LSP server");
                break;
            }
        };

        match Incoming::classify(message) {
            Ok(Incoming::Response { id, result }) => {
                let waiter = match response_id(&id) {
                    Some(id) => pending.lock().await.remove(&id),
                    None => None,
                };
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => tracing::trace!("Skipping response for unknown id: {id:?}"),
                }
            }
            Ok(Incoming::Request { id, method, params }) => {
                tracing::debug!(%method, "Answering server request");
                let reply = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": reply_to_server(&method, &params),
                });
                if let Err(err) = writer.lock().await.write(&reply).await {
                    tracing::warn!(?err, %method, "Failed to answer server request");
                }
            }
            Ok(Incoming::Notification { method, .. }) => {
                tracing::trace!(%method, "discarding notification");
            }
            Err(err) => tracing::warn!(?err, "received malformed message"),
        }
    }

    // Dropping the waiters tells every in-flight caller the server is gone.
    let mut pending = pending.lock().await;
    closed.store(true, Ordering::Release);
    pending.clear();
}

/// Minimal answers to server-initiated requests.
///
/// `workspace/configuration` expects one entry per requested item; everything
/// else (progress tokens, capability registration) is acknowledged with null.
fn reply_to_server(method: &str, params: &Value) -> Value {
    match method {
        "workspace/configuration" => {
            let items = params
                .get("items")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            Value::Array(vec![Value::Null; items])
        }
        _ => Value::Null,
    }
}

/// LSP allows ids to be either numbers or strings; ours are always numeric.
fn response_id(id: &Value) -> Option<i64> {
    id.as_i64()
        .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
}

fn client_capabilities() -> Value {
    json!({
        "textDocument": {
            "synchronization": { "didSave": false },
            "hover": { "contentFormat": ["markdown", "plaintext"] },
            "completion": { "completionItem": { "snippetSupport": false } },
            "signatureHelp": {
                "signatureInformation": {
                    "documentationFormat": ["markdown", "plaintext"],
                    "parameterInformation": { "labelOffsetSupport": true }
                }
            },
            "definition": { "linkSupport": true },
            "implementation": { "linkSupport": true },
            "references": {},
            "documentSymbol": { "hierarchicalDocumentSymbolSupport": true },
            "rename": { "prepareSupport": false },
            "codeAction": {
                "codeActionLiteralSupport": {
                    "codeActionKind": {
                        "valueSet": ["", "quickfix", "refactor", "refactor.extract",
                                     "refactor.inline", "refactor.rewrite", "source",
                                     "source.organizeImports"]
                    }
                }
            },
            "codeLens": {},
            "semanticTokens": {
                "requests": { "full": true },
                "tokenTypes": CLIENT_TOKEN_TYPES,
                "tokenModifiers": CLIENT_TOKEN_MODIFIERS,
                "formats": ["relative"]
            },
            "callHierarchy": {},
            "typeHierarchy": {}
        },
        "workspace": {
            "configuration": true,
            "workspaceEdit": { "documentChanges": true },
            "executeCommand": {}
        },
        "window": { "workDoneProgress": true }
    })
}
