//! Code actions available at a position or selection.

use lsp_types::{CodeActionOrCommand, DiagnosticSeverity, Range, Uri};
use serde::Serialize;

use crate::codec::WireRange;
use crate::error::{ToolError, ToolResult};
use crate::tools::{ToolContext, ToolName};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_preferred: Option<bool>,
    pub diagnostics: Vec<DiagnosticEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticEntry {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosticSeverity>,
    pub range: WireRange,
}

pub async fn code_actions(
    cx: ToolContext<'_>,
    uri: &Uri,
    range: Range,
) -> ToolResult<Vec<ActionEntry>> {
    let actions = cx
        .provider
        .code_actions(uri, range)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetCodeActions.as_str(), err))?
        .unwrap_or_default();
    Ok(actions.into_iter().map(action_entry).collect())
}

fn action_entry(action: CodeActionOrCommand) -> ActionEntry {
    match action {
        CodeActionOrCommand::Command(command) => ActionEntry {
            title: command.title,
            kind: None,
            is_preferred: None,
            diagnostics: Vec::new(),
        },
        CodeActionOrCommand::CodeAction(action) => ActionEntry {
            title: action.title,
            kind: action.kind.map(|kind| kind.as_str().to_string()),
            is_preferred: action.is_preferred,
            diagnostics: action
                .diagnostics
                .unwrap_or_default()
                .into_iter()
                .map(|diag| DiagnosticEntry {
                    message: diag.message,
                    severity: diag.severity,
                    range: diag.range.into(),
                })
                .collect(),
        },
    }
}
