//! MCP service implementation for wayfinder.
//!
//! Publishes the tool catalog and forwards every tool call to the
//! [`Dispatcher`], mapping its tiered outcome onto the MCP result envelope:
//! payloads and notices are successes, soft failures and provider errors are
//! `isError` results, and only unknown tools or malformed arguments become
//! protocol errors.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext,
};
use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::tools::{ToolName, ToolOutput};

#[derive(Clone)]
pub struct WayfinderService {
    dispatcher: Arc<Dispatcher>,
}

impl WayfinderService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The published tool catalog, in catalog order.
    pub fn catalog() -> Vec<Tool> {
        ToolName::ALL
            .into_iter()
            .map(|tool| Tool::new(tool.as_str(), tool.description(), Arc::new(tool.input_schema())))
            .collect()
    }

    /// Runs one tool call and wraps the outcome for the MCP client.
    pub async fn run(&self, name: &str, args: Value) -> Result<CallToolResult, McpError> {
        match self.dispatcher.dispatch(name, &args).await {
            Ok(ToolOutput::Payload(value)) => {
                let content = Content::json(value).map_err(|e| {
                    McpError::internal_error(format!("content creation failed: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![content]))
            }
            Ok(ToolOutput::Notice(text)) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Ok(ToolOutput::SoftFail(text)) => {
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
            Err(err) if err.is_protocol_fatal() => {
                tracing::debug!(tool = name, %err, "Rejecting tool call");
                Err(McpError::invalid_params(err.to_string(), None))
            }
            Err(err) => {
                tracing::warn!(tool = name, %err, "Tool call failed");
                Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
            }
        }
    }
}

impl ServerHandler for WayfinderService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("Code intelligence over MCP, backed by a Language Server Protocol server. Navigation, hover, symbols, completions, refactoring previews, code lenses, semantic tokens and call/type hierarchies for files addressed by file:// URI with zero-based positions.".to_string()),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        tracing::info!("MCP client connected and initialized");
        Ok(self.get_info())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::catalog()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        self.run(&request.name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::{FakeProvider, FakeStore};
    use serde_json::json;

    const DOC: &str = "file:///src/main.rs";

    fn service(provider: FakeProvider) -> WayfinderService {
        let store = FakeStore::new().with_document(DOC, "rust", "fn main() {}\n");
        WayfinderService::new(Dispatcher::new(Arc::new(provider), Arc::new(store)))
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn catalog_lists_every_tool_once() {
        let tools = WayfinderService::catalog();
        assert_eq!(tools.len(), 14);
        assert_eq!(tools[0].name, "find_usages");
        assert_eq!(tools[13].name, "get_type_hierarchy");
        assert!(tools.iter().all(|tool| tool.input_schema.contains_key("properties")));
    }

    #[tokio::test]
    async fn payloads_are_json_successes() {
        let service = service(FakeProvider::new());
        let args = json!({"textDocument": {"uri": DOC}, "position": {"line": 0, "character": 3}});
        let result = service.run("go_to_definition", args).await.unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(text(&result), "[]");
    }

    #[tokio::test]
    async fn notices_and_soft_failures_are_text() {
        let service = service(FakeProvider::new());
        let result = service
            .run("get_code_lens", json!({"textDocument": {"uri": DOC}}))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert!(!text(&result).is_empty());

        let missing = json!({
            "textDocument": {"uri": "file:///src/gone.rs"},
            "position": {"line": 0, "character": 0},
        });
        let result = service.run("get_hover_info", missing).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), "Error: File not found - /src/gone.rs");
    }

    #[tokio::test]
    async fn provider_failures_are_error_results() {
        let service = service(FakeProvider::new().failing("hover"));
        let args = json!({"textDocument": {"uri": DOC}, "position": {"line": 0, "character": 3}});
        let result = service.run("get_hover_info", args).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("get_hover_info failed"));
    }

    #[tokio::test]
    async fn unknown_tools_are_protocol_errors() {
        let service = service(FakeProvider::new());
        let err = service.run("definition", json!({})).await.unwrap_err();
        assert_eq!(err.message, "Unknown tool: definition");
    }
}
