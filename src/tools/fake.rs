//! Spy provider and in-memory store shared by handler and dispatcher tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, CodeActionResponse,
    CodeLens, CompletionResponse, DocumentSymbolResponse, GotoDefinitionResponse, Hover, Location,
    Position, Range, SignatureHelp, SymbolKind, TypeHierarchyItem, Uri,
};
use serde_json::Value;

use crate::provider::{PackedTokens, Provider, RenameEdit};
use crate::store::{DocumentStore, TextDocument};

pub fn uri(raw: &str) -> Uri {
    raw.parse().unwrap()
}

pub fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
    Range::new(Position::new(sl, sc), Position::new(el, ec))
}

pub fn location(raw: &str, line: u32) -> Location {
    Location::new(uri(raw), range(line, 4, line, 9))
}

pub fn call_item(name: &str, line: u32) -> CallHierarchyItem {
    CallHierarchyItem {
        name: name.to_string(),
        kind: SymbolKind::FUNCTION,
        tags: None,
        detail: Some(format!("fn {name}()")),
        uri: uri("file:///src/lib.rs"),
        range: range(line, 0, line + 2, 1),
        selection_range: range(line, 3, line, 3 + name.len() as u32),
        data: None,
    }
}

pub fn type_item(name: &str, line: u32) -> TypeHierarchyItem {
    TypeHierarchyItem {
        name: name.to_string(),
        kind: SymbolKind::CLASS,
        tags: None,
        detail: None,
        uri: uri("file:///src/shapes.ts"),
        range: range(line, 0, line + 4, 1),
        selection_range: range(line, 6, line, 6 + name.len() as u32),
        data: None,
    }
}

/// Provider returning canned answers and recording every query it receives.
#[derive(Default)]
pub struct FakeProvider {
    pub references: Option<Vec<Location>>,
    pub definition: Option<GotoDefinitionResponse>,
    pub implementations: Option<GotoDefinitionResponse>,
    pub hover: Option<Hover>,
    pub symbols: Option<DocumentSymbolResponse>,
    pub completions: Option<CompletionResponse>,
    pub signature: Option<SignatureHelp>,
    pub rename: Option<RenameEdit>,
    pub code_actions: Option<CodeActionResponse>,
    pub code_lenses: Option<Vec<CodeLens>>,
    pub command_result: Option<Value>,
    pub languages: Vec<String>,
    pub semantic_tokens: Option<PackedTokens>,
    pub call_items: Option<Vec<CallHierarchyItem>>,
    pub incoming: Option<Vec<CallHierarchyIncomingCall>>,
    pub outgoing: Option<Vec<CallHierarchyOutgoingCall>>,
    pub type_items: Option<Vec<TypeHierarchyItem>>,
    pub supertypes: Option<Vec<TypeHierarchyItem>>,
    pub subtypes: Option<Vec<TypeHierarchyItem>>,
    /// Queries that fail instead of answering.
    pub failing: HashSet<&'static str>,
    /// Artificial latency per query.
    pub delays: HashMap<&'static str, Duration>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, query: &'static str) -> Self {
        self.failing.insert(query);
        self
    }

    pub fn delayed(mut self, query: &'static str, delay: Duration) -> Self {
        self.delays.insert(query, delay);
        self
    }

    /// Every query received so far, in order, with notable arguments inlined.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, query: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(query) && !call.ends_with(":done"))
            .count()
    }

    async fn record(&self, query: &'static str, detail: Option<String>) -> Result<()> {
        let entry = match detail {
            Some(detail) => format!("{query}:{detail}"),
            None => query.to_string(),
        };
        self.calls.lock().unwrap().push(entry);
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        self.calls.lock().unwrap().push(format!("{query}:done"));
        if self.failing.contains(query) {
            return Err(anyhow!("{query} unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn references(&self, _uri: &Uri, _position: Position) -> Result<Option<Vec<Location>>> {
        self.record("references", None).await?;
        Ok(self.references.clone())
    }

    async fn definition(
        &self,
        _uri: &Uri,
        _position: Position,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.record("definition", None).await?;
        Ok(self.definition.clone())
    }

    async fn implementations(
        &self,
        _uri: &Uri,
        _position: Position,
    ) -> Result<Option<GotoDefinitionResponse>> {
        self.record("implementations", None).await?;
        Ok(self.implementations.clone())
    }

    async fn hover(&self, _uri: &Uri, _position: Position) -> Result<Option<Hover>> {
        self.record("hover", None).await?;
        Ok(self.hover.clone())
    }

    async fn document_symbols(&self, _uri: &Uri) -> Result<Option<DocumentSymbolResponse>> {
        self.record("document_symbols", None).await?;
        Ok(self.symbols.clone())
    }

    async fn completions(
        &self,
        _uri: &Uri,
        _position: Position,
        trigger_character: Option<&str>,
    ) -> Result<Option<CompletionResponse>> {
        self.record("completions", trigger_character.map(str::to_string))
            .await?;
        Ok(self.completions.clone())
    }

    async fn signature_help(
        &self,
        _uri: &Uri,
        _position: Position,
    ) -> Result<Option<SignatureHelp>> {
        self.record("signature_help", None).await?;
        Ok(self.signature.clone())
    }

    async fn rename(
        &self,
        _uri: &Uri,
        _position: Position,
        new_name: &str,
    ) -> Result<Option<RenameEdit>> {
        self.record("rename", Some(new_name.to_string())).await?;
        Ok(self.rename.clone())
    }

    async fn code_actions(&self, _uri: &Uri, range: Range) -> Result<Option<CodeActionResponse>> {
        let detail = format!(
            "{}.{}-{}.{}",
            range.start.line, range.start.character, range.end.line, range.end.character
        );
        self.record("code_actions", Some(detail)).await?;
        Ok(self.code_actions.clone())
    }

    async fn code_lenses(&self, _uri: &Uri) -> Result<Option<Vec<CodeLens>>> {
        self.record("code_lenses", None).await?;
        Ok(self.code_lenses.clone())
    }

    async fn execute_command(&self, command: &str, arguments: Vec<Value>) -> Result<Option<Value>> {
        let detail = format!("{command}{}", Value::Array(arguments));
        self.record("execute_command", Some(detail)).await?;
        Ok(self.command_result.clone())
    }

    async fn languages(&self) -> Result<Vec<String>> {
        self.record("languages", None).await?;
        Ok(self.languages.clone())
    }

    async fn semantic_tokens(&self, _uri: &Uri) -> Result<Option<PackedTokens>> {
        self.record("semantic_tokens", None).await?;
        Ok(self.semantic_tokens.clone())
    }

    async fn prepare_call_hierarchy(
        &self,
        _uri: &Uri,
        _position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>> {
        self.record("prepare_call_hierarchy", None).await?;
        Ok(self.call_items.clone())
    }

    async fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>> {
        self.record("incoming_calls", Some(item.name.clone())).await?;
        Ok(self.incoming.clone())
    }

    async fn outgoing_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>> {
        self.record("outgoing_calls", Some(item.name.clone())).await?;
        Ok(self.outgoing.clone())
    }

    async fn prepare_type_hierarchy(
        &self,
        _uri: &Uri,
        _position: Position,
    ) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.record("prepare_type_hierarchy", None).await?;
        Ok(self.type_items.clone())
    }

    async fn supertypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.record("supertypes", Some(item.name.clone())).await?;
        Ok(self.supertypes.clone())
    }

    async fn subtypes(&self, item: &TypeHierarchyItem) -> Result<Option<Vec<TypeHierarchyItem>>> {
        self.record("subtypes", Some(item.name.clone())).await?;
        Ok(self.subtypes.clone())
    }
}

/// In-memory document store. Unreadable documents exist but fail to open.
#[derive(Default)]
pub struct FakeStore {
    documents: HashMap<String, TextDocument>,
    unreadable: HashSet<String>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, raw: &str, language_id: &str, text: &str) -> Self {
        self.documents
            .insert(raw.to_string(), TextDocument::new(uri(raw), language_id, text));
        self
    }

    pub fn with_unreadable(mut self, raw: &str) -> Self {
        self.unreadable.insert(raw.to_string());
        self
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn exists(&self, uri: &Uri) -> bool {
        self.documents.contains_key(uri.as_str()) || self.unreadable.contains(uri.as_str())
    }

    async fn open(&self, uri: &Uri) -> Result<TextDocument> {
        self.documents
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("cannot open {}", uri.as_str()))
    }
}
