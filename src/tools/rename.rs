//! Rename planning: the provider's workspace edit flattened per document.

use lsp_types::{
    DocumentChangeOperation, DocumentChanges, OneOf, Position, TextDocumentEdit, TextEdit, Uri,
};
use serde::Serialize;

use crate::codec::WireRange;
use crate::error::{ToolError, ToolResult};
use crate::provider::RenameEdit;
use crate::tools::{ToolContext, ToolName};

/// Placeholder used when the caller does not name the new symbol.
pub const DEFAULT_NEW_NAME: &str = "newName";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEdits {
    pub uri: String,
    pub edits: Vec<WireEdit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdit {
    pub range: WireRange,
    pub new_text: String,
}

pub async fn rename_locations(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
    new_name: Option<&str>,
) -> ToolResult<Vec<FileEdits>> {
    let new_name = new_name.filter(|name| !name.is_empty()).unwrap_or(DEFAULT_NEW_NAME);
    let edit = cx
        .provider
        .rename(uri, position, new_name)
        .await
        .map_err(|err| ToolError::provider(ToolName::GetRenameLocations.as_str(), err))?;
    Ok(edit.map(flatten_rename_edit).unwrap_or_default())
}

/// Flattens both `changes` and `documentChanges` in provider order.
fn flatten_rename_edit(edit: RenameEdit) -> Vec<FileEdits> {
    let mut files = Vec::new();
    if let Some(changes) = edit.changes {
        for (uri, edits) in changes {
            files.push(FileEdits {
                uri: uri.as_str().to_string(),
                edits: edits.iter().map(wire_edit).collect(),
            });
        }
    }
    match edit.document_changes {
        Some(DocumentChanges::Edits(edits)) => {
            files.extend(edits.into_iter().map(document_edit));
        }
        Some(DocumentChanges::Operations(operations)) => {
            for operation in operations {
                match operation {
                    DocumentChangeOperation::Edit(edit) => files.push(document_edit(edit)),
                    DocumentChangeOperation::Op(op) => {
                        tracing::debug!(?op, "Skipping resource operation in rename plan");
                    }
                }
            }
        }
        None => {}
    }
    files
}

fn document_edit(edit: TextDocumentEdit) -> FileEdits {
    FileEdits {
        uri: edit.text_document.uri.as_str().to_string(),
        edits: edit
            .edits
            .iter()
            .map(|edit| match edit {
                OneOf::Left(plain) => wire_edit(plain),
                OneOf::Right(annotated) => wire_edit(&annotated.text_edit),
            })
            .collect(),
    }
}

fn wire_edit(edit: &TextEdit) -> WireEdit {
    WireEdit {
        range: edit.range.into(),
        new_text: edit.new_text.clone(),
    }
}
