//! Language-intelligence provider interface.
//!
//! The provider answers positional queries over documents. The core treats it
//! as an opaque oracle and only normalizes what it returns; [`crate::lsp_provider`]
//! implements it on top of a language server process.

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, CodeActionResponse,
    CodeLens, CompletionResponse, DocumentChanges, DocumentSymbolResponse, GotoDefinitionResponse,
    Hover, Location, Position, Range, SemanticTokensLegend, SemanticTokensResult, SignatureHelp,
    TextEdit, TypeHierarchyItem, Uri,
};
use serde::Deserialize;
use serde_json::Value;

/// Packed semantic tokens together with the legend needed to decode them.
#[derive(Debug, Clone)]
pub struct PackedTokens {
    pub tokens: SemanticTokensResult,
    pub legend: SemanticTokensLegend,
}

/// A rename `WorkspaceEdit` whose `changes` keep the document order the
/// provider listed them in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameEdit {
    #[serde(default)]
    pub changes: Option<IndexMap<Uri, Vec<TextEdit>>>,
    #[serde(default)]
    pub document_changes: Option<DocumentChanges>,
}

/// One query method per tool category. `Ok(None)` means the provider ran and
/// had nothing to say; `Err` means the query itself failed.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn references(&self, uri: &Uri, position: Position) -> Result<Option<Vec<Location>>>;

    async fn definition(&self, uri: &Uri, position: Position)
    -> Result<Option<GotoDefinitionResponse>>;

    async fn implementations(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<GotoDefinitionResponse>>;

    async fn hover(&self, uri: &Uri, position: Position) -> Result<Option<Hover>>;

    async fn document_symbols(&self, uri: &Uri) -> Result<Option<DocumentSymbolResponse>>;

    async fn completions(
        &self,
        uri: &Uri,
        position: Position,
        trigger_character: Option<&str>,
    ) -> Result<Option<CompletionResponse>>;

    async fn signature_help(&self, uri: &Uri, position: Position) -> Result<Option<SignatureHelp>>;

    async fn rename(
        &self,
        uri: &Uri,
        position: Position,
        new_name: &str,
    ) -> Result<Option<RenameEdit>>;

    async fn code_actions(&self, uri: &Uri, range: Range) -> Result<Option<CodeActionResponse>>;

    async fn code_lenses(&self, uri: &Uri) -> Result<Option<Vec<CodeLens>>>;

    /// Runs a provider command, e.g. the command carried by a code lens.
    async fn execute_command(&self, command: &str, arguments: Vec<Value>) -> Result<Option<Value>>;

    /// Language identifiers the provider is currently registered for.
    async fn languages(&self) -> Result<Vec<String>>;

    async fn semantic_tokens(&self, uri: &Uri) -> Result<Option<PackedTokens>>;

    async fn prepare_call_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>>;

    async fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>>;

    async fn outgoing_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>>;

    async fn prepare_type_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<TypeHierarchyItem>>>;

    async fn supertypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>>;

    async fn subtypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>>;
}
