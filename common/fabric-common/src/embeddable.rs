//! In-process tool invocation
//!
//! [`EmbeddableMcp`] lets a host (the `call` CLI subcommand, tests, another
//! process embedding the server) invoke tools by name with JSON arguments,
//! skipping the stdio transport entirely.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

/// Error type for in-process tool calls
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// No tool with that name
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments did not match the tool's parameter type
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The tool ran and failed
    #[error("tool execution failed: {0}")]
    ExecutionError(String),

    /// Arguments were not valid JSON for the parameter type
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// Error reported by the tool handler
    #[error("mcp error: {0}")]
    McpError(String),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        if err.code == rmcp::model::ErrorCode::INVALID_PARAMS {
            EmbeddableError::InvalidParams(err.message.to_string())
        } else {
            EmbeddableError::McpError(err.message.to_string())
        }
    }
}

pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// An MCP server whose tools can be called directly
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Server id, as used in editor configuration files
    fn server_name(&self) -> &str;

    /// All tools with their input schemas
    fn list_tools(&self) -> Vec<Tool>;

    /// Run `name` with JSON `params`
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn server_description(&self) -> Option<&str> {
        None
    }

    fn server_version(&self) -> Option<&str> {
        None
    }
}
