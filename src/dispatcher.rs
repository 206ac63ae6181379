//! Tool-call dispatch.
//!
//! Validates the tool name, checks that the target document exists, extracts
//! the common arguments and hands the call to exactly one handler.

use std::sync::Arc;

use lsp_types::{Position, Range, Uri};
use serde_json::Value;

use crate::codec::{WirePosition, WireRange};
use crate::error::{ToolError, ToolResult};
use crate::provider::Provider;
use crate::store::DocumentStore;
use crate::tools::code_lens::LensKey;
use crate::tools::{
    CodeActionArgs, CompletionArgs, ExecuteCodeLensArgs, RenameArgs, ToolContext, ToolName,
    ToolOutput, code_actions, code_lens, hierarchy, info, navigation, rename, semantic_tokens,
};
use crate::utils::display_path;

pub struct Dispatcher {
    provider: Arc<dyn Provider>,
    store: Arc<dyn DocumentStore>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { provider, store }
    }

    /// Runs the tool `name` with the raw argument payload `args`.
    pub async fn dispatch(&self, name: &str, args: &Value) -> ToolResult<ToolOutput> {
        let tool = ToolName::lookup(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let raw_uri = args
            .pointer("/textDocument/uri")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(uri) = self.existing_document(raw_uri).await else {
            tracing::debug!(tool = %tool, uri = raw_uri, "Target document not found");
            return Ok(ToolOutput::SoftFail(format!(
                "Error: File not found - {}",
                display_path(raw_uri)
            )));
        };

        let position = match args.get("position") {
            Some(value) if !value.is_null() => Some(
                serde_json::from_value::<WirePosition>(value.clone())
                    .map(Position::from)
                    .map_err(|err| ToolError::InvalidArguments {
                        tool: tool.as_str(),
                        reason: format!("position: {err}"),
                    })?,
            ),
            _ => None,
        };
        if tool.requires_position() && position.is_none() {
            return Ok(ToolOutput::SoftFail(format!(
                "Error: {tool} requires a position"
            )));
        }

        tracing::debug!(tool = %tool, uri = %uri.as_str(), ?position, "Dispatching tool call");
        let cx = ToolContext {
            provider: self.provider.as_ref(),
            store: self.store.as_ref(),
        };
        self.route(cx, tool, &uri, position, args).await
    }

    async fn existing_document(&self, raw_uri: &str) -> Option<Uri> {
        let uri = raw_uri.parse::<Uri>().ok()?;
        self.store.exists(&uri).await.then_some(uri)
    }

    async fn route(
        &self,
        cx: ToolContext<'_>,
        tool: ToolName,
        uri: &Uri,
        position: Option<Position>,
        args: &Value,
    ) -> ToolResult<ToolOutput> {
        let at = || {
            position.ok_or_else(|| ToolError::InvalidArguments {
                tool: tool.as_str(),
                reason: "missing position".to_string(),
            })
        };
        match tool {
            ToolName::FindUsages => {
                ToolOutput::payload(&navigation::find_usages(cx, uri, at()?).await?)
            }
            ToolName::GoToDefinition => {
                ToolOutput::payload(&navigation::go_to_definition(cx, uri, at()?).await?)
            }
            ToolName::FindImplementations => {
                ToolOutput::payload(&navigation::find_implementations(cx, uri, at()?).await?)
            }
            ToolName::GetHoverInfo => ToolOutput::payload(&info::hover(cx, uri, at()?).await?),
            ToolName::GetDocumentSymbols => {
                ToolOutput::payload(&info::document_symbols(cx, uri).await?)
            }
            ToolName::GetCompletions => {
                let CompletionArgs {
                    trigger_character, ..
                } = tool.decode_args(args)?;
                let items = info::completions(cx, uri, at()?, trigger_character.as_deref()).await?;
                ToolOutput::payload(&items)
            }
            ToolName::GetSignatureHelp => {
                ToolOutput::payload(&info::signature_help(cx, uri, at()?).await?)
            }
            ToolName::GetRenameLocations => {
                let RenameArgs { new_name, .. } = tool.decode_args(args)?;
                let plan = rename::rename_locations(cx, uri, at()?, new_name.as_deref()).await?;
                ToolOutput::payload(&plan)
            }
            ToolName::GetCodeActions => {
                let CodeActionArgs { range, .. } = tool.decode_args(args)?;
                let range: Range = match (range, position) {
                    (Some(range), _) => range.into(),
                    (None, Some(position)) => WireRange::point(position.into()).into(),
                    (None, None) => {
                        return Ok(ToolOutput::SoftFail(format!(
                            "Error: {tool} requires a position or range"
                        )));
                    }
                };
                ToolOutput::payload(&code_actions::code_actions(cx, uri, range).await?)
            }
            ToolName::GetCodeLens => code_lens::list_code_lenses(cx, uri).await,
            ToolName::ExecuteCodeLens => {
                let ExecuteCodeLensArgs { command, .. } = tool.decode_args(args)?;
                let key = LensKey::new(at()?, command.command);
                code_lens::execute_code_lens(cx, uri, key).await
            }
            ToolName::GetSemanticTokens => semantic_tokens::semantic_tokens(cx, uri).await,
            ToolName::GetCallHierarchy => {
                ToolOutput::payload(&hierarchy::call_hierarchy(cx, uri, at()?).await?)
            }
            ToolName::GetTypeHierarchy => {
                ToolOutput::payload(&hierarchy::type_hierarchy(cx, uri, at()?).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::{FakeProvider, FakeStore, location};
    use serde_json::json;

    const DOC: &str = "file:///src/main.rs";

    fn dispatcher(provider: FakeProvider) -> (Arc<FakeProvider>, Dispatcher) {
        let provider = Arc::new(provider);
        let store = FakeStore::new().with_document(DOC, "rust", "fn main() {\n    helper();\n}\n");
        let dispatcher = Dispatcher::new(provider.clone(), Arc::new(store));
        (provider, dispatcher)
    }

    fn at(line: u32, character: u32) -> Value {
        json!({
            "textDocument": {"uri": DOC},
            "position": {"line": line, "character": character},
        })
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_any_query() {
        let (provider, dispatcher) = dispatcher(FakeProvider::new());
        for name in ["definition", "FIND_USAGES", "", "get_diagnostics"] {
            let err = dispatcher.dispatch(name, &at(0, 0)).await.unwrap_err();
            assert!(matches!(err, ToolError::UnknownTool(ref n) if n == name));
            assert_eq!(err.to_string(), format!("Unknown tool: {name}"));
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_document_soft_fails_without_queries() {
        let (provider, dispatcher) = dispatcher(FakeProvider::new());
        for tool in ToolName::ALL {
            let args = json!({
                "textDocument": {"uri": "file:///src/missing.rs"},
                "position": {"line": 0, "character": 0},
            });
            let output = dispatcher.dispatch(tool.as_str(), &args).await.unwrap();
            assert_eq!(
                output,
                ToolOutput::SoftFail("Error: File not found - /src/missing.rs".into())
            );
        }
        let output = dispatcher.dispatch("find_usages", &json!({})).await.unwrap();
        assert!(output.is_error());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn positional_tools_require_a_position() {
        let (provider, dispatcher) = dispatcher(FakeProvider::new());
        let args = json!({"textDocument": {"uri": DOC}});
        let output = dispatcher.dispatch("get_hover_info", &args).await.unwrap();
        assert_eq!(
            output,
            ToolOutput::SoftFail("Error: get_hover_info requires a position".into())
        );
        let output = dispatcher.dispatch("get_code_actions", &args).await.unwrap();
        assert!(output.is_error());
        assert!(provider.calls().is_empty());

        let output = dispatcher.dispatch("get_document_symbols", &args).await.unwrap();
        assert_eq!(output, ToolOutput::Payload(Value::Null));
        assert_eq!(provider.count("document_symbols"), 1);
    }

    #[tokio::test]
    async fn malformed_position_is_invalid_arguments() {
        let (_, dispatcher) = dispatcher(FakeProvider::new());
        let args = json!({
            "textDocument": {"uri": DOC},
            "position": {"line": -1, "character": 0},
        });
        let err = dispatcher.dispatch("go_to_definition", &args).await.unwrap_err();
        assert!(err.is_protocol_fatal());
    }

    #[tokio::test]
    async fn routes_references_with_previews() {
        let (provider, dispatcher) = dispatcher(FakeProvider {
            references: Some(vec![location(DOC, 1)]),
            ..FakeProvider::new()
        });
        let output = dispatcher.dispatch("find_usages", &at(1, 4)).await.unwrap();
        let ToolOutput::Payload(value) = output else {
            panic!("expected payload");
        };
        assert_eq!(value[0]["preview"], "helper();");
        assert_eq!(value[0]["uri"], DOC);
        assert_eq!(provider.calls(), vec!["references", "references:done"]);
    }

    #[tokio::test]
    async fn code_actions_use_point_range_at_position() {
        let (provider, dispatcher) = dispatcher(FakeProvider::new());
        let output = dispatcher.dispatch("get_code_actions", &at(1, 6)).await.unwrap();
        assert_eq!(output, ToolOutput::Payload(json!([])));
        assert_eq!(provider.calls()[0], "code_actions:1.6-1.6");

        let args = json!({
            "textDocument": {"uri": DOC},
            "range": {"start": {"line": 1, "character": 4}, "end": {"line": 1, "character": 10}},
        });
        dispatcher.dispatch("get_code_actions", &args).await.unwrap();
        assert!(provider.calls().contains(&"code_actions:1.4-1.10".to_string()));
    }

    #[tokio::test]
    async fn rename_defaults_new_name() {
        let (provider, dispatcher) = dispatcher(FakeProvider::new());
        let output = dispatcher.dispatch("get_rename_locations", &at(1, 4)).await.unwrap();
        assert_eq!(output, ToolOutput::Payload(json!([])));
        assert_eq!(provider.calls()[0], "rename:newName");
    }

    #[tokio::test]
    async fn execute_code_lens_needs_command_argument() {
        let (_, dispatcher) = dispatcher(FakeProvider::new());
        let err = dispatcher.dispatch("execute_code_lens", &at(0, 0)).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { tool: "execute_code_lens", .. }));
    }

    #[tokio::test]
    async fn hierarchy_without_candidate_is_null() {
        let (_, dispatcher) = dispatcher(FakeProvider::new());
        let output = dispatcher.dispatch("get_type_hierarchy", &at(0, 3)).await.unwrap();
        assert_eq!(output, ToolOutput::Payload(Value::Null));
    }
}
