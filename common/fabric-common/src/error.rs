//! Error mapping for MCP tool handlers
//!
//! Domain errors stay `thiserror` enums; at the tool boundary they become
//! `rmcp::ErrorData` through [`IntoMcpError`] so handlers can use `?`.

use rmcp::ErrorData as McpError;

use crate::auth::AuthError;

/// Type alias for MCP tool results
pub type McpResult<T> = Result<T, McpError>;

/// Conversion into an MCP error
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for AuthError {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("Authentication failed: {}", self), None)
    }
}

impl IntoMcpError for reqwest::Error {
    fn into_mcp_error(self) -> McpError {
        let message = if self.is_timeout() {
            format!("Request timed out: {}", self)
        } else if self.is_connect() {
            format!("Could not connect (check the endpoint and network): {}", self)
        } else {
            format!("HTTP error: {}", self)
        };
        McpError::internal_error(message, None)
    }
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("JSON error: {}", self), None)
    }
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        // `{:#}` keeps the context chain on one line
        McpError::internal_error(format!("{:#}", self), None)
    }
}

impl IntoMcpError for String {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self, None)
    }
}

impl IntoMcpError for &str {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self.to_string(), None)
    }
}

/// Extension trait giving any `Result<T, E: IntoMcpError>` a `to_mcp_err()`
///
/// ```rust,ignore
/// let token = credential.get_token(SQL_SCOPE).await.to_mcp_err()?;
/// ```
pub trait ResultExt<T> {
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(IntoMcpError::into_mcp_error)
    }
}

/// Internal error with a message
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Invalid params error with a message
///
/// Also used when a tool's backend is not configured, since the fix is on
/// the caller's side (set an env var or pass the missing argument).
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_keeps_hint() {
        let err = AuthError::CliNotFound.into_mcp_error();
        assert!(err.message.contains("Authentication failed"));
        assert!(err.message.contains("az login"));
    }

    #[test]
    fn test_anyhow_context_chain() {
        let err = anyhow::anyhow!("socket closed").context("Failed to query lakehouse");
        let mcp = err.into_mcp_error();
        assert_eq!(mcp.message, "Failed to query lakehouse: socket closed");
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), AuthError> = Err(AuthError::NotConfigured("AZURE_CLIENT_ID not set".into()));
        let err = result.to_mcp_err().unwrap_err();
        assert!(err.message.contains("AZURE_CLIENT_ID"));
    }

    #[test]
    fn test_invalid_params() {
        let err = invalid_params("query cannot be empty");
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("query cannot be empty"));
    }
}
