//! Hard-failure kinds raised by the dispatcher and tool handlers.
//!
//! Soft failures are not errors; they travel as [`crate::tools::ToolOutput::SoftFail`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool name is not part of the published catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The argument payload could not be decoded for the tool.
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    /// A provider query failed and the tool has no substitute signal.
    #[error("{tool} failed: {source:#}")]
    Provider {
        tool: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Both the primary query and its fallback produced nothing usable.
    #[error("{0}")]
    FallbackExhausted(&'static str),

    #[error("failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    pub fn provider(tool: &'static str, source: anyhow::Error) -> Self {
        Self::Provider { tool, source }
    }

    /// Protocol-fatal errors abort the call channel instead of producing an
    /// `isError` tool result.
    pub fn is_protocol_fatal(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidArguments { .. })
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;
