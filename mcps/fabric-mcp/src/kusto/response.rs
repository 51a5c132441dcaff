//! Kusto v1 REST response parsing
//!
//! A v1 response is `{"Tables": [...]}`; for queries `Tables[0]` is the
//! primary result and later tables hold query statistics. Control commands
//! return a single table.

use serde::Deserialize;
use serde_json::Value;

use super::KustoError;
use crate::types::QueryResult;

#[derive(Debug, Deserialize)]
struct V1Response {
    #[serde(rename = "Tables")]
    tables: Vec<V1Table>,
}

#[derive(Debug, Deserialize)]
struct V1Table {
    #[serde(rename = "Columns")]
    columns: Vec<V1Column>,
    #[serde(rename = "Rows")]
    rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct V1Column {
    #[serde(rename = "ColumnName")]
    name: String,
    #[serde(rename = "ColumnType", default)]
    column_type: Option<String>,
    #[serde(rename = "DataType", default)]
    data_type: Option<String>,
}

/// Extract the primary result table
pub fn parse_primary(body: &[u8]) -> Result<QueryResult, KustoError> {
    let response: V1Response =
        serde_json::from_slice(body).map_err(|e| KustoError::InvalidResponse(e.to_string()))?;

    let table = response
        .tables
        .into_iter()
        .next()
        .ok_or_else(|| KustoError::InvalidResponse("response has no tables".to_string()))?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for row in table.rows {
        match row {
            Value::Array(cells) => rows.push(cells),
            // Partial failures show up as an object in place of a row
            Value::Object(obj) => {
                let message = obj
                    .get("Exceptions")
                    .and_then(Value::as_array)
                    .map(|ex| {
                        ex.iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join("; ")
                    })
                    .unwrap_or_else(|| Value::Object(obj.clone()).to_string());
                return Err(KustoError::PartialFailure(message));
            }
            other => {
                return Err(KustoError::InvalidResponse(format!(
                    "unexpected row value: {}",
                    other
                )))
            }
        }
    }

    let (columns, column_types): (Vec<String>, Vec<String>) = table
        .columns
        .into_iter()
        .map(|c| {
            let ty = c.column_type.or(c.data_type).unwrap_or_default();
            (c.name, ty)
        })
        .unzip();

    let mut result = QueryResult::new(columns, rows, false);
    result.column_types = column_types;
    Ok(result)
}

/// Pull a readable message out of a Kusto error body
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let message = parsed.as_ref().and_then(|v| {
        let err = v.get("error")?;
        err.get("@message")
            .or_else(|| err.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.len() > 500 {
            let cut = trimmed
                .char_indices()
                .nth(500)
                .map(|(i, _)| i)
                .unwrap_or(trimmed.len());
            format!("{}...", &trimmed[..cut])
        } else {
            trimmed.to_string()
        }
    })
}
