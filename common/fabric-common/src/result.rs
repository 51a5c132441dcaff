//! Helpers for building `CallToolResult` responses

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Serialize `data` as pretty JSON text content
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Plain text content
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::RawContent;

    #[derive(Serialize)]
    struct Rows {
        row_count: usize,
    }

    fn text_of(result: &CallToolResult) -> &str {
        match &result.content[0].raw {
            RawContent::Text(t) => t.text.as_str(),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn test_json_success() {
        let result = json_success(&Rows { row_count: 3 }).unwrap();
        assert!(!result.is_error.unwrap_or(false));
        let value: serde_json::Value = serde_json::from_str(text_of(&result)).unwrap();
        assert_eq!(value["row_count"], 3);
    }

    #[test]
    fn test_text_success() {
        let result = text_success("done");
        assert_eq!(text_of(&result), "done");
    }
}
