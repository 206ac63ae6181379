//! MCP tool implementations.
//!
//! This module publishes the tool catalog and the handlers that wrap provider
//! queries. Each handler owns one explicit mapping from the provider's native
//! response shape to the wire shape in [`crate::codec`].

pub mod code_actions;
pub mod code_lens;
pub mod hierarchy;
pub mod info;
pub mod navigation;
pub mod rename;
pub mod semantic_tokens;

#[cfg(test)]
pub(crate) mod fake;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{WirePosition, WireRange};
use crate::error::{ToolError, ToolResult};
use crate::provider::Provider;
use crate::store::DocumentStore;

/// Collaborators a handler may query during one call.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub provider: &'a dyn Provider,
    pub store: &'a dyn DocumentStore,
}

/// Successful outcome of a tool call.
///
/// `Notice` and `SoftFail` are delivered as text envelopes; only `SoftFail`
/// sets `isError`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Payload(Value),
    Notice(String),
    SoftFail(String),
}

impl ToolOutput {
    pub fn payload<T: Serialize>(value: &T) -> ToolResult<Self> {
        Ok(Self::Payload(serde_json::to_value(value)?))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::SoftFail(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    FindUsages,
    GoToDefinition,
    FindImplementations,
    GetHoverInfo,
    GetDocumentSymbols,
    GetCompletions,
    GetSignatureHelp,
    GetRenameLocations,
    GetCodeActions,
    GetCodeLens,
    ExecuteCodeLens,
    GetSemanticTokens,
    GetCallHierarchy,
    GetTypeHierarchy,
}

impl ToolName {
    pub const ALL: [ToolName; 14] = [
        ToolName::FindUsages,
        ToolName::GoToDefinition,
        ToolName::FindImplementations,
        ToolName::GetHoverInfo,
        ToolName::GetDocumentSymbols,
        ToolName::GetCompletions,
        ToolName::GetSignatureHelp,
        ToolName::GetRenameLocations,
        ToolName::GetCodeActions,
        ToolName::GetCodeLens,
        ToolName::ExecuteCodeLens,
        ToolName::GetSemanticTokens,
        ToolName::GetCallHierarchy,
        ToolName::GetTypeHierarchy,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ToolName::FindUsages => "find_usages",
            ToolName::GoToDefinition => "go_to_definition",
            ToolName::FindImplementations => "find_implementations",
            ToolName::GetHoverInfo => "get_hover_info",
            ToolName::GetDocumentSymbols => "get_document_symbols",
            ToolName::GetCompletions => "get_completions",
            ToolName::GetSignatureHelp => "get_signature_help",
            ToolName::GetRenameLocations => "get_rename_locations",
            ToolName::GetCodeActions => "get_code_actions",
            ToolName::GetCodeLens => "get_code_lens",
            ToolName::ExecuteCodeLens => "execute_code_lens",
            ToolName::GetSemanticTokens => "get_semantic_tokens",
            ToolName::GetCallHierarchy => "get_call_hierarchy",
            ToolName::GetTypeHierarchy => "get_type_hierarchy",
        }
    }

    /// Looks `name` up in the published catalog.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::FindUsages => {
                "Find all references to the symbol at a position, with a preview of each referencing line"
            }
            ToolName::GoToDefinition => "Return the definition locations of the symbol at a position",
            ToolName::FindImplementations => {
                "Find implementations of the interface or abstract member at a position, with previews"
            }
            ToolName::GetHoverInfo => "Return hover documentation and type information at a position",
            ToolName::GetDocumentSymbols => "Return the symbol tree of a document",
            ToolName::GetCompletions => "Return completion candidates at a position",
            ToolName::GetSignatureHelp => "Return signature help for the call surrounding a position",
            ToolName::GetRenameLocations => {
                "Return the workspace edits needed to rename the symbol at a position (not applied)"
            }
            ToolName::GetCodeActions => {
                "Return code actions (quick fixes, refactorings) available at a position or range"
            }
            ToolName::GetCodeLens => "List the code lenses of a document",
            ToolName::ExecuteCodeLens => {
                "Execute the code lens command located at a position, matched by command identifier"
            }
            ToolName::GetSemanticTokens => {
                "Return decoded semantic tokens of a document, falling back to document symbols"
            }
            ToolName::GetCallHierarchy => "Return incoming and outgoing calls of the function at a position",
            ToolName::GetTypeHierarchy => "Return supertypes and subtypes of the type at a position",
        }
    }

    /// Whether the tool cannot run without `args.position`.
    pub fn requires_position(self) -> bool {
        !matches!(
            self,
            ToolName::GetDocumentSymbols
                | ToolName::GetCodeLens
                | ToolName::GetSemanticTokens
                | ToolName::GetCodeActions
        )
    }

    /// JSON schema of the tool's arguments.
    pub fn input_schema(self) -> Map<String, Value> {
        let schema = match self {
            ToolName::GetDocumentSymbols | ToolName::GetCodeLens | ToolName::GetSemanticTokens => {
                schemars::schema_for!(DocumentArgs)
            }
            ToolName::GetCompletions => schemars::schema_for!(CompletionArgs),
            ToolName::GetRenameLocations => schemars::schema_for!(RenameArgs),
            ToolName::GetCodeActions => schemars::schema_for!(CodeActionArgs),
            ToolName::ExecuteCodeLens => schemars::schema_for!(ExecuteCodeLensArgs),
            _ => schemars::schema_for!(PositionArgs),
        };
        let mut object = match serde_json::to_value(schema) {
            Ok(Value::Object(object)) => object,
            _ => Map::new(),
        };
        object.remove("$schema");
        object
    }

    /// Decodes the tool-specific argument struct from the raw payload.
    pub fn decode_args<T: for<'de> Deserialize<'de>>(self, args: &Value) -> ToolResult<T> {
        serde_json::from_value(args.clone()).map_err(|err| ToolError::InvalidArguments {
            tool: self.as_str(),
            reason: err.to_string(),
        })
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TextDocumentArg {
    /// Document URI, e.g. file:///path/to/file.rs
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentArgs {
    pub text_document: TextDocumentArg,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionArgs {
    pub text_document: TextDocumentArg,
    pub position: WirePosition,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionArgs {
    pub text_document: TextDocumentArg,
    pub position: WirePosition,
    /// Character that triggered completion, e.g. "."
    #[serde(default)]
    pub trigger_character: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameArgs {
    pub text_document: TextDocumentArg,
    pub position: WirePosition,
    /// New symbol name; defaults to "newName"
    #[serde(default)]
    pub new_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeActionArgs {
    pub text_document: TextDocumentArg,
    #[serde(default)]
    pub position: Option<WirePosition>,
    /// Selection to query; a zero-width range at `position` when omitted
    #[serde(default)]
    pub range: Option<WireRange>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCodeLensArgs {
    pub text_document: TextDocumentArg,
    /// Start position of the lens range
    pub position: WirePosition,
    pub command: LensCommandArg,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LensCommandArg {
    /// Command identifier of the lens to execute
    pub command: String,
    #[serde(default)]
    pub arguments: Option<Vec<Value>>,
}
