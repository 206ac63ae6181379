//! [`Provider`] backed by a language server process.
//!
//! Every document-scoped query first syncs the document through the
//! [`DocumentManager`], then sends one LSP request and deserializes the result
//! into its `lsp_types` shape. A null result becomes `Ok(None)`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, CodeActionResponse,
    CodeLens, CompletionResponse, DocumentSymbolResponse, GotoDefinitionResponse,
    Hover, Location, Position, Range, SemanticTokensLegend, SemanticTokensResult,
    SemanticTokensServerCapabilities, ServerCapabilities, SignatureHelp, TypeHierarchyItem, Uri,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::documents::DocumentManager;
use crate::lsp_bridge::LspBridge;
use crate::provider::{PackedTokens, Provider, RenameEdit};

/// Attempts for navigation queries that come back empty while the server is
/// still indexing.
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(150);

pub struct LspProvider {
    bridge: LspBridge,
    documents: Mutex<DocumentManager>,
    languages: Vec<String>,
}

impl LspProvider {
    /// Spawns and initializes the configured server.
    pub async fn start(config: &Config, workspace_base: &Path) -> Result<Self> {
        let workspace = config.server.resolve_root_dir(workspace_base)?;
        let (program, args) = config.server.program()?;

        let mut bridge = LspBridge::new_with_command(program, args, workspace).await?;
        bridge
            .initialize()
            .await
            .with_context(|| format!("failed to initialize language server '{program}'"))?;
        Ok(Self::new(bridge, config.languages()))
    }

    pub fn new(bridge: LspBridge, languages: Vec<String>) -> Self {
        Self {
            bridge,
            documents: Mutex::new(DocumentManager::new()),
            languages,
        }
    }

    pub async fn shutdown(self) -> Result<()> {
        self.documents
            .into_inner()
            .close_all(&self.bridge)
            .await?;
        self.bridge.shutdown().await
    }

    async fn sync(&self, uri: &Uri) -> Result<()> {
        self.documents
            .lock()
            .await
            .ensure_open(&self.bridge, uri.as_str())
            .await
            .with_context(|| format!("failed to sync document {}", uri.as_str()))
    }

    async fn query<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let raw = self.bridge.request(method, params).await?;
        if raw.is_null() {
            return Ok(None);
        }
        serde_json::from_value(raw)
            .map(Some)
            .with_context(|| format!("unexpected '{method}' response shape"))
    }

    async fn at_position<T: DeserializeOwned>(
        &self,
        method: &str,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<T>> {
        self.sync(uri).await?;
        self.query(method, position_params(uri, position)).await
    }

    /// Repeats a navigation query while it comes back empty.
    async fn navigate<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        is_empty: fn(&T) -> bool,
    ) -> Result<Option<T>> {
        let mut result = None;
        for attempt in 1..=MAX_RETRIES {
            result = self.query::<T>(method, params.clone()).await?;
            if result.as_ref().is_some_and(|found| !is_empty(found)) {
                break;
            }
            if attempt < MAX_RETRIES {
                tracing::debug!(method, attempt, "Empty result, retrying while server indexes");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
        Ok(result)
    }

    fn resolves_code_lenses(&self) -> bool {
        self.bridge
            .capabilities()
            .code_lens_provider
            .as_ref()
            .and_then(|options| options.resolve_provider)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Provider for LspProvider {
    async fn references(&self, uri: &Uri, position: Position) -> Result<Option<Vec<Location>>> {
        self.sync(uri).await?;
        let mut params = position_params(uri, position);
        params["context"] = json!({ "includeDeclaration": true });
        self.navigate("textDocument/references", params, Vec::is_empty)
            .await
    }

    async fn definition(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.sync(uri).await?;
        let params = position_params(uri, position);
        self.navigate("textDocument/definition", params, definition_is_empty)
            .await
    }

    async fn implementations(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.sync(uri).await?;
        let params = position_params(uri, position);
        self.navigate("textDocument/implementation", params, definition_is_empty)
            .await
    }

    async fn hover(&self, uri: &Uri, position: Position) -> Result<Option<Hover>> {
        self.at_position("textDocument/hover", uri, position).await
    }

    async fn document_symbols(&self, uri: &Uri) -> Result<Option<DocumentSymbolResponse>> {
        self.sync(uri).await?;
        self.query("textDocument/documentSymbol", document_params(uri))
            .await
    }

    async fn completions(
        &self,
        uri: &Uri,
        position: Position,
        trigger_character: Option<&str>,
    ) -> Result<Option<CompletionResponse>> {
        self.sync(uri).await?;
        let mut params = position_params(uri, position);
        params["context"] = match trigger_character {
            Some(trigger) => json!({ "triggerKind": 2, "triggerCharacter": trigger }),
            None => json!({ "triggerKind": 1 }),
        };
        self.query("textDocument/completion", params).await
    }

    async fn signature_help(&self, uri: &Uri, position: Position) -> Result<Option<SignatureHelp>> {
        self.at_position("textDocument/signatureHelp", uri, position)
            .await
    }

    async fn rename(
        &self,
        uri: &Uri,
        position: Position,
        new_name: &str,
    ) -> Result<Option<RenameEdit>> {
        self.sync(uri).await?;
        let mut params = position_params(uri, position);
        params["newName"] = json!(new_name);
        self.query("textDocument/rename", params).await
    }

    async fn code_actions(&self, uri: &Uri, range: Range) -> Result<Option<CodeActionResponse>> {
        self.sync(uri).await?;
        let params = json!({
            "textDocument": { "uri": uri },
            "range": range,
            "context": { "diagnostics": [] },
        });
        self.query("textDocument/codeAction", params).await
    }

    async fn code_lenses(&self, uri: &Uri) -> Result<Option<Vec<CodeLens>>> {
        self.sync(uri).await?;
        let Some(lenses) = self
            .query::<Vec<CodeLens>>("textDocument/codeLens", document_params(uri))
            .await?
        else {
            return Ok(None);
        };
        if !self.resolves_code_lenses() {
            return Ok(Some(lenses));
        }

        let mut resolved = Vec::with_capacity(lenses.len());
        for lens in lenses {
            if lens.command.is_some() {
                resolved.push(lens);
                continue;
            }
            match self
                .query::<CodeLens>("codeLens/resolve", serde_json::to_value(&lens)?)
                .await
            {
                Ok(Some(full)) => resolved.push(full),
                Ok(None) => resolved.push(lens),
                Err(err) => {
                    tracing::warn!(?err, "Failed to resolve code lens; keeping it unresolved");
                    resolved.push(lens);
                }
            }
        }
        Ok(Some(resolved))
    }

    async fn execute_command(&self, command: &str, arguments: Vec<Value>) -> Result<Option<Value>> {
        let params = json!({ "command": command, "arguments": arguments });
        let result = self.bridge.request("workspace/executeCommand", params).await?;
        Ok((!result.is_null()).then_some(result))
    }

    async fn languages(&self) -> Result<Vec<String>> {
        Ok(self.languages.clone())
    }

    async fn semantic_tokens(&self, uri: &Uri) -> Result<Option<PackedTokens>> {
        let legend = semantic_legend(self.bridge.capabilities())
            .ok_or_else(|| anyhow!("language server does not provide semantic tokens"))?;
        self.sync(uri).await?;
        let tokens: Option<SemanticTokensResult> = self
            .query("textDocument/semanticTokens/full", document_params(uri))
            .await?;
        Ok(tokens.map(|tokens| PackedTokens { tokens, legend }))
    }

    async fn prepare_call_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>> {
        self.at_position("textDocument/prepareCallHierarchy", uri, position)
            .await
    }

    async fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>> {
        self.query("callHierarchy/incomingCalls", json!({ "item": item }))
            .await
    }

    async fn outgoing_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>> {
        self.query("callHierarchy/outgoingCalls", json!({ "item": item }))
            .await
    }

    async fn prepare_type_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.at_position("textDocument/prepareTypeHierarchy", uri, position)
            .await
    }

    async fn supertypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.query("typeHierarchy/supertypes", json!({ "item": item }))
            .await
    }

    async fn subtypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.query("typeHierarchy/subtypes", json!({ "item": item }))
            .await
    }
}

fn document_params(uri: &Uri) -> Value {
    json!({ "textDocument": { "uri": uri } })
}

fn position_params(uri: &Uri, position: Position) -> Value {
    json!({
        "textDocument": { "uri": uri },
        "position": position,
    })
}

fn definition_is_empty(response: &GotoDefinitionResponse) -> bool {
    match response {
        GotoDefinitionResponse::Scalar(_) => false,
        GotoDefinitionResponse::Array(locations) => locations.is_empty(),
        GotoDefinitionResponse::Link(links) => links.is_empty(),
    }
}

/// Legend the server uses to encode token types, if it supports tokens at all.
fn semantic_legend(capabilities: &ServerCapabilities) -> Option<SemanticTokensLegend> {
    match capabilities.semantic_tokens_provider.as_ref()? {
        SemanticTokensServerCapabilities::SemanticTokensOptions(options) => {
            Some(options.legend.clone())
        }
        SemanticTokensServerCapabilities::SemanticTokensRegistrationOptions(options) => {
            Some(options.semantic_tokens_options.legend.clone())
        }
    }
}
