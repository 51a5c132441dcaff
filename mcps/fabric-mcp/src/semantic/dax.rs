//! DAX queries for relationship metadata and parsing of `executeQueries` results

use serde_json::{json, Value};

use crate::types::Relationship;

/// Relationships via the `INFO.RELATIONSHIPS()` DAX function
pub const RELATIONSHIPS_QUERY: &str = "EVALUATE SELECTCOLUMNS(INFO.RELATIONSHIPS(), \
\"Name\", [Name], \
\"FromTable\", [FromTable], \
\"FromColumn\", [FromColumn], \
\"ToTable\", [ToTable], \
\"ToColumn\", [ToColumn], \
\"CrossFilteringBehavior\", [CrossFilteringBehavior], \
\"IsActive\", [IsActive])";

/// Relationships via the tabular schema DMV, for models without `INFO` functions
pub const DMV_RELATIONSHIPS_QUERY: &str = "EVALUATE $SYSTEM.TMSCHEMA_RELATIONSHIPS";

/// Which query produced a result; the two name the filter direction differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipSource {
    InfoFunction,
    SchemaDmv,
}

impl RelationshipSource {
    pub fn query(self) -> &'static str {
        match self {
            Self::InfoFunction => RELATIONSHIPS_QUERY,
            Self::SchemaDmv => DMV_RELATIONSHIPS_QUERY,
        }
    }

    fn cross_filter_key(self) -> &'static str {
        match self {
            Self::InfoFunction => "CrossFilteringBehavior",
            Self::SchemaDmv => "CrossFilterDirection",
        }
    }
}

/// Request body for `POST .../executeQueries`
pub fn request_body(query: &str) -> Value {
    json!({ "queries": [{ "query": query }] })
}

/// Map the rows of the first table of the first result
///
/// A response without results yields an empty list.
pub fn parse_relationships(body: &Value, source: RelationshipSource) -> Vec<Relationship> {
    let rows = body
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("tables"))
        .and_then(|t| t.get(0))
        .and_then(|t| t.get("rows"))
        .and_then(Value::as_array);

    let Some(rows) = rows else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| Relationship {
            name: text_field(row, "Name"),
            from_table: text_field(row, "FromTable"),
            from_column: text_field(row, "FromColumn"),
            to_table: text_field(row, "ToTable"),
            to_column: text_field(row, "ToColumn"),
            cross_filtering: text_field(row, source.cross_filter_key()),
            is_active: field(row, "IsActive").and_then(as_flag).unwrap_or(true),
        })
        .collect()
}

/// Look up `key` as-is or in the `[key]` form Power BI uses for selected columns
fn field<'a>(row: &'a Value, key: &str) -> Option<&'a Value> {
    row.get(key)
        .or_else(|| row.get(format!("[{}]", key).as_str()))
        .filter(|v| !v.is_null())
}

fn text_field(row: &Value, key: &str) -> String {
    match field(row, key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
