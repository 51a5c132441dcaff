//! Response types shared by the Lakehouse, semantic model and Kusto tools

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tabular result with column names and rows
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// Engine type names, parallel to `columns` (Kusto only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub column_types: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// True if rows were dropped to honour the row limit
    pub truncated: bool,
    /// Hint for the caller, set when the result is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, truncated: bool) -> Self {
        Self {
            columns,
            column_types: Vec::new(),
            row_count: rows.len(),
            rows,
            truncated,
            note: None,
        }
    }

    /// Keep at most `max_rows` rows
    pub fn limit(mut self, max_rows: usize) -> Self {
        if self.rows.len() > max_rows {
            self.rows.truncate(max_rows);
            self.row_count = max_rows;
            self.truncated = true;
        }
        self
    }

    /// Attach `note` if there are no rows
    pub fn note_if_empty(mut self, note: impl Into<String>) -> Self {
        if self.rows.is_empty() {
            self.note = Some(note.into());
        }
        self
    }

    /// Column index by case-insensitive name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// A table in the Lakehouse SQL endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

/// Row from `sys.external_data_sources`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExternalDataSource {
    pub name: String,
    pub data_source_type: String,
    pub location: String,
}

/// Column definition from `INFORMATION_SCHEMA.COLUMNS`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    pub ordinal: i64,
}

/// Column schema result for one table
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

/// A relationship between two tables, from a semantic model or foreign key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cross_filtering: String,
    pub is_active: bool,
}

/// `(from_table, from_column, to_table, to_column, name, cross_filtering)`
pub type RelationshipTuple = (String, String, String, String, String, String);

impl Relationship {
    /// Flatten into the tuple shape shared by SQL and semantic model tools
    pub fn into_tuple(self) -> RelationshipTuple {
        (
            self.from_table,
            self.from_column,
            self.to_table,
            self.to_column,
            self.name,
            self.cross_filtering,
        )
    }
}

/// A Power BI dataset (semantic model)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SemanticModel {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured_by: Option<String>,
}

/// Summary of the semantic model behind the configured Lakehouse
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SemanticModelInfo {
    NotFound {
        found: bool,
        message: String,
    },
    Found {
        found: bool,
        workspace_id: String,
        dataset_id: String,
        lakehouse_name: String,
        relationship_count: usize,
        relationships: Vec<Relationship>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limit_marks_truncated() {
        let rows = (0..5).map(|i| vec![json!(i)]).collect();
        let result = QueryResult::new(vec!["n".into()], rows, false).limit(3);
        assert_eq!(result.row_count, 3);
        assert_eq!(result.rows.len(), 3);
        assert!(result.truncated);
    }

    #[test]
    fn test_limit_noop_when_small() {
        let result = QueryResult::new(vec!["n".into()], vec![vec![json!(1)]], false).limit(10);
        assert!(!result.truncated);
        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn test_note_only_when_empty() {
        let empty = QueryResult::new(vec![], vec![], false).note_if_empty("check the table name");
        assert_eq!(empty.note.as_deref(), Some("check the table name"));

        let full = QueryResult::new(vec!["a".into()], vec![vec![json!(1)]], false).note_if_empty("x");
        assert!(full.note.is_none());
        let value = serde_json::to_value(&full).unwrap();
        assert!(value.get("note").is_none());
        assert!(value.get("column_types").is_none());
    }

    #[test]
    fn test_relationship_tuple_order() {
        let rel = Relationship {
            name: "Sales_Customer".into(),
            from_table: "Sales".into(),
            from_column: "CustomerKey".into(),
            to_table: "Customer".into(),
            to_column: "CustomerKey".into(),
            cross_filtering: "OneDirection".into(),
            is_active: true,
        };
        let tuple = rel.into_tuple();
        assert_eq!(tuple.0, "Sales");
        assert_eq!(tuple.4, "Sales_Customer");
        assert_eq!(tuple.5, "OneDirection");
    }

    #[test]
    fn test_semantic_model_info_shape() {
        let info = SemanticModelInfo::NotFound {
            found: false,
            message: "No semantic model found for lakehouse 'Sales'".into(),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"found": false, "message": "No semantic model found for lakehouse 'Sales'"})
        );
    }
}
