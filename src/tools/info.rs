//! Informational tools: hover, completions, signature help and document symbols.

use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionResponse, CompletionTextEdit, DocumentSymbol,
    DocumentSymbolResponse, Documentation, HoverContents, MarkedString, ParameterLabel, Position,
    SignatureHelp, SignatureInformation, SymbolKind, Uri,
};
use serde::Serialize;

use crate::codec::{WireRange, slice_utf16};
use crate::error::{ToolError, ToolResult};
use crate::preview::resolve_preview;
use crate::tools::{ToolContext, ToolName};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverInfo {
    pub contents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<WireRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub range: WireRange,
    pub children: Vec<SymbolNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CompletionItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<WireRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEntry {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_parameter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_signature: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterEntry {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

pub async fn hover(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Vec<HoverInfo>> {
    let Some(hover) = cx
        .provider
        .hover(uri, position)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetHoverInfo.as_str(), err))?
    else {
        return Ok(Vec::new());
    };

    let contents = match hover.contents {
        HoverContents::Scalar(marked) => vec![marked_text(marked)],
        HoverContents::Array(items) => items.into_iter().map(marked_text).collect(),
        HoverContents::Markup(markup) => vec![markup.value],
    };
    let preview = match hover.range {
        Some(range) => resolve_preview(cx.store, uri, range.start.line).await,
        None => None,
    };
    Ok(vec![HoverInfo {
        contents,
        range: hover.range.map(WireRange::from),
        preview,
    }])
}

pub async fn document_symbols(
    cx: ToolContext<'_>,
    uri: &Uri,
) -> ToolResult<Option<Vec<SymbolNode>>> {
    let response = cx
        .provider
        .document_symbols(uri)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetDocumentSymbols.as_str(), err))?;
    Ok(response.map(normalize_symbols))
}

/// Normalizes either symbol response shape into a tree.
///
/// Flat `SymbolInformation` lists carry no hierarchy, so each entry becomes a
/// childless node.
pub fn normalize_symbols(response: DocumentSymbolResponse) -> Vec<SymbolNode> {
    match response {
        DocumentSymbolResponse::Nested(symbols) => symbols.into_iter().map(symbol_node).collect(),
        DocumentSymbolResponse::Flat(symbols) => symbols
            .into_iter()
            .map(|info| SymbolNode {
                name: info.name,
                kind: info.kind,
                range: info.location.range.into(),
                children: Vec::new(),
            })
            .collect(),
    }
}

fn symbol_node(symbol: DocumentSymbol) -> SymbolNode {
    SymbolNode {
        name: symbol.name,
        kind: symbol.kind,
        range: symbol.range.into(),
        children: symbol
            .children
            .unwrap_or_default()
            .into_iter()
            .map(symbol_node)
            .collect(),
    }
}

pub async fn completions(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
    trigger_character: Option<&str>,
) -> ToolResult<Option<Vec<CompletionEntry>>> {
    let response = cx
        .provider
        .completions(uri, position, trigger_character)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetCompletions.as_str(), err))?;
    let items = match response {
        None => return Ok(None),
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
    };
    Ok(Some(items.into_iter().map(completion_entry).collect()))
}

fn completion_entry(item: CompletionItem) -> CompletionEntry {
    // Insert-and-replace edits carry two ranges; only a plain edit has one.
    let range = match &item.text_edit {
        Some(CompletionTextEdit::Edit(edit)) => Some(edit.range.into()),
        Some(CompletionTextEdit::InsertAndReplace(_)) | None => None,
    };
    CompletionEntry {
        label: item.label,
        kind: item.kind,
        detail: item.detail,
        documentation: item.documentation.map(documentation_text),
        sort_text: item.sort_text,
        filter_text: item.filter_text,
        insert_text: item.insert_text,
        range,
    }
}

pub async fn signature_help(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Option<Vec<SignatureEntry>>> {
    let help = cx
        .provider
        .signature_help(uri, position)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetSignatureHelp.as_str(), err))?;
    Ok(help.map(signature_entries))
}

fn signature_entries(help: SignatureHelp) -> Vec<SignatureEntry> {
    let SignatureHelp {
        signatures,
        active_signature,
        active_parameter,
    } = help;
    signatures
        .into_iter()
        .map(|signature| {
            let SignatureInformation {
                label,
                documentation,
                parameters,
                active_parameter: own_active,
            } = signature;
            let parameters = parameters.map(|params| {
                params
                    .into_iter()
                    .map(|param| ParameterEntry {
                        label: parameter_label(&label, param.label),
                        documentation: param.documentation.map(documentation_text),
                    })
                    .collect()
            });
            SignatureEntry {
                documentation: documentation.map(documentation_text),
                parameters,
                active_parameter: own_active.or(active_parameter),
                active_signature,
                label,
            }
        })
        .collect()
}

/// Offset labels point into the signature label in UTF-16 code units.
fn parameter_label(signature_label: &str, label: ParameterLabel) -> String {
    match label {
        ParameterLabel::Simple(text) => text,
        ParameterLabel::LabelOffsets([start, end]) => {
            slice_utf16(signature_label, start, end.saturating_sub(start)).to_string()
        }
    }
}

fn marked_text(marked: MarkedString) -> String {
    match marked {
        MarkedString::String(text) => text,
        MarkedString::LanguageString(code) => code.value,
    }
}

fn documentation_text(doc: Documentation) -> String {
    match doc {
        Documentation::String(text) => text,
        Documentation::MarkupContent(markup) => markup.value,
    }
}
