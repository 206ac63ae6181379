//! Code lens listing and execution.
//!
//! Lenses have no durable id. A lens is addressed by the pair of its start
//! position and command identifier, and the list is fetched again on every
//! execute call so the pair is matched against what the provider reports now.

use lsp_types::{CodeLens, Command, Position, Uri};
use serde::Serialize;
use serde_json::Value;

use crate::codec::WireRange;
use crate::error::{ToolError, ToolResult};
use crate::tools::{ToolContext, ToolName, ToolOutput};

pub const NO_LENSES: &str = "No CodeLens items found in document";
pub const NO_LENS_AT_POSITION: &str = "No CodeLens found at the specified position";
pub const NO_MATCHING_LENS: &str = "No matching CodeLens command found at the specified position";

/// Identity of a lens: where it starts and which command it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensKey {
    pub start: Position,
    pub command: String,
}

impl LensKey {
    pub fn new(start: Position, command: impl Into<String>) -> Self {
        Self {
            start,
            command: command.into(),
        }
    }

    /// Whether `lens` starts exactly at `start` and carries `command`.
    pub fn matches(&self, lens: &CodeLens) -> bool {
        lens.range.start == self.start
            && lens
                .command
                .as_ref()
                .is_some_and(|command| command.command == self.command)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LensEntry {
    pub range: WireRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<LensCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LensCommand {
    pub title: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<Value>>,
}

impl From<Command> for LensCommand {
    fn from(command: Command) -> Self {
        Self {
            title: command.title,
            command: command.command,
            arguments: command.arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedLens {
    pub command: LensCommand,
    pub result: Option<Value>,
}

pub async fn list_code_lenses(cx: ToolContext<'_>, uri: &Uri) -> ToolResult<ToolOutput> {
    let lenses = cx
        .provider
        .code_lenses(uri)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetCodeLens.as_str(), err))?
        .unwrap_or_default();
    if lenses.is_empty() {
        return Ok(ToolOutput::Notice(NO_LENSES.to_string()));
    }
    let entries: Vec<LensEntry> = lenses
        .into_iter()
        .map(|lens| LensEntry {
            range: lens.range.into(),
            command: lens.command.map(LensCommand::from),
        })
        .collect();
    ToolOutput::payload(&entries)
}

pub async fn execute_code_lens(
    cx: ToolContext<'_>,
    uri: &Uri,
    key: LensKey,
) -> ToolResult<ToolOutput> {
    let lenses = match cx.provider.code_lenses(uri).await {
        Ok(lenses) => lenses.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(uri = %uri.as_str(), ?err, "CodeLens provider failed");
            return Ok(ToolOutput::SoftFail(format!(
                "Error executing CodeLens command: {err:#}"
            )));
        }
    };
    if lenses.is_empty() {
        return Ok(ToolOutput::SoftFail(NO_LENS_AT_POSITION.to_string()));
    }

    let Some(command) = lenses
        .into_iter()
        .find(|lens| key.matches(lens))
        .and_then(|lens| lens.command)
    else {
        tracing::debug!(
            line = key.start.line,
            character = key.start.character,
            command = %key.command,
            "No code lens matched"
        );
        return Ok(ToolOutput::SoftFail(NO_MATCHING_LENS.to_string()));
    };

    let arguments = command.arguments.clone().unwrap_or_default();
    match cx.provider.execute_command(&command.command, arguments).await {
        Ok(result) => ToolOutput::payload(&ExecutedLens {
            command: command.into(),
            result,
        }),
        Err(err) => {
            tracing::warn!(command = %command.command, ?err, "CodeLens command failed");
            Ok(ToolOutput::SoftFail(format!(
                "Error executing CodeLens command: {err:#}"
            )))
        }
    }
}
