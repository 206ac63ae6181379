//! Semantic tokens with a document-symbol fallback.
//!
//! The packed stream is decoded against the provider's legend and the current
//! document text. When the token query itself fails, document symbols stand
//! in for tokens so the caller still gets a classified outline.

use lsp_types::{SemanticToken, SemanticTokensLegend, SemanticTokensResult, SymbolKind, Uri};
use serde::Serialize;

use crate::codec::{WireRange, slice_utf16, symbol_kind_ordinal};
use crate::error::{ToolError, ToolResult};
use crate::provider::PackedTokens;
use crate::store::TextDocument;
use crate::tools::info::normalize_symbols;
use crate::tools::{ToolContext, ToolName, ToolOutput};

pub const NO_TOKENS: &str = "No semantic tokens found in document";
pub const FALLBACK_NOTE: &str = "Using document symbols as fallback";
pub const FALLBACK_FAILED: &str = "Semantic tokens provider not available and fallback failed";

/// Token type names indexed by symbol kind ordinal minus one.
const TOKEN_TYPES: [&str; 23] = [
    "namespace",
    "class",
    "enum",
    "interface",
    "struct",
    "typeParameter",
    "type",
    "parameter",
    "variable",
    "property",
    "enumMember",
    "decorator",
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
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    pub tokens: Vec<DecodedToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedToken {
    pub line: u32,
    pub character: u32,
    pub length: u32,
    pub token_type: String,
    pub token_modifiers: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackReport {
    pub fallback: &'static str,
    pub symbols: Vec<FallbackSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: WireRange,
    pub token_type: &'static str,
}

pub async fn semantic_tokens(cx: ToolContext<'_>, uri: &Uri) -> ToolResult<ToolOutput> {
    const TOOL: &str = ToolName::GetSemanticTokens.as_str();

    let document = cx
        .store
        .open(uri)
        .await
        .map_err(|err| ToolError::provider(TOOL, err))?;
    let languages = cx
        .provider
        .languages()
        .await
        .map_err(|err| ToolError::provider(TOOL, err))?;
    if !languages.contains(&document.language_id) {
        return Ok(ToolOutput::SoftFail(format!(
            "Semantic tokens not supported for language: {}",
            document.language_id
        )));
    }

    match cx.provider.semantic_tokens(uri).await {
        Ok(None) => Ok(ToolOutput::Notice(NO_TOKENS.to_string())),
        Ok(Some(packed)) => ToolOutput::payload(&decode_report(packed, &document)),
        Err(err) => {
            tracing::warn!(
                uri = %uri.as_str(),
                ?err,
                "Semantic tokens failed; falling back to document symbols"
            );
            symbol_fallback(cx, uri).await
        }
    }
}

async fn symbol_fallback(cx: ToolContext<'_>, uri: &Uri) -> ToolResult<ToolOutput> {
    let symbols = match cx.provider.document_symbols(uri).await {
        Ok(Some(response)) => normalize_symbols(response),
        Ok(None) => return Err(ToolError::FallbackExhausted(FALLBACK_FAILED)),
        Err(err) => {
            tracing::warn!(uri = %uri.as_str(), ?err, "Document symbol fallback failed");
            return Err(ToolError::FallbackExhausted(FALLBACK_FAILED));
        }
    };
    let symbols = symbols
        .into_iter()
        .map(|symbol| FallbackSymbol {
            token_type: token_type_for_kind(symbol_kind_ordinal(symbol.kind)),
            name: symbol.name,
            kind: symbol.kind,
            range: symbol.range,
        })
        .collect();
    ToolOutput::payload(&FallbackReport {
        fallback: FALLBACK_NOTE,
        symbols,
    })
}

/// Maps a 1-based symbol kind ordinal to a token type name.
pub fn token_type_for_kind(ordinal: u32) -> &'static str {
    ordinal
        .checked_sub(1)
        .and_then(|index| TOKEN_TYPES.get(index as usize))
        .copied()
        .unwrap_or("unknown")
}

fn decode_report(packed: PackedTokens, document: &TextDocument) -> TokenReport {
    let (result_id, data) = match packed.tokens {
        SemanticTokensResult::Tokens(tokens) => (tokens.result_id, tokens.data),
        SemanticTokensResult::Partial(partial) => (None, partial.data),
    };
    TokenReport {
        result_id,
        tokens: decode_tokens(&data, &packed.legend, document),
    }
}

/// Expands relative token positions into absolute ones.
///
/// `delta_start` is relative to the previous token only when both sit on the
/// same line. A delta that overflows the position ends decoding, since every
/// later token is positioned relative to it.
pub fn decode_tokens(
    data: &[SemanticToken],
    legend: &SemanticTokensLegend,
    document: &TextDocument,
) -> Vec<DecodedToken> {
    let mut line = 0u32;
    let mut character = 0u32;
    let mut tokens = Vec::with_capacity(data.len());
    for token in data {
        let next = if token.delta_line == 0 {
            character.checked_add(token.delta_start).map(|c| (line, c))
        } else {
            line.checked_add(token.delta_line).map(|l| (l, token.delta_start))
        };
        let Some((next_line, next_character)) = next else {
            tracing::warn!(
                decoded = tokens.len(),
                remaining = data.len() - tokens.len(),
                "Semantic token position overflows; dropping the rest of the stream"
            );
            break;
        };
        line = next_line;
        character = next_character;
        let token_type = legend
            .token_types
            .get(token.token_type as usize)
            .map(|ty| ty.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let token_modifiers = legend
            .token_modifiers
            .iter()
            .enumerate()
            .filter(|(bit, _)| *bit < 32 && token.token_modifiers_bitset & (1 << bit) != 0)
            .map(|(_, modifier)| modifier.as_str().to_string())
            .collect();
        let text = document
            .line(line)
            .map(|text| slice_utf16(text, character, token.length).to_string())
            .unwrap_or_default();
        tokens.push(DecodedToken {
            line,
            character,
            length: token.length,
            token_type,
            token_modifiers,
            text,
        });
    }
    tokens
}
