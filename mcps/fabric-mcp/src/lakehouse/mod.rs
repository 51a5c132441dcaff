//! Lakehouse SQL endpoint
//!
//! [`LakehouseBackend`] is the seam between the tool handlers and the TDS
//! connection; [`TdsLakehouse`] is the real implementation. The catalog
//! helpers below run the canned metadata queries and map their rows.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use fabric_common::auth::AuthError;

use crate::config::MissingSetting;
use crate::types::{ColumnDef, ExternalDataSource, QueryResult, Relationship, TableRef};

pub mod client;
pub mod convert;
pub mod guard;

pub use client::TdsLakehouse;
pub use guard::{check_read_only, GuardError};

/// External data sources visible to the endpoint
pub const DATASOURCES_QUERY: &str = "\
SELECT name, data_source_type, location
FROM sys.external_data_sources
ORDER BY name";

/// Base tables, all schemas
pub const TABLES_QUERY: &str = "\
SELECT TABLE_SCHEMA, TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// Base tables in one schema (`@P1`)
pub const TABLES_IN_SCHEMA_QUERY: &str = "\
SELECT TABLE_SCHEMA, TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = @P1
ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// Columns of `@P1`.`@P2`
pub const COLUMNS_QUERY: &str = "\
SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, CHARACTER_MAXIMUM_LENGTH, ORDINAL_POSITION
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
ORDER BY ORDINAL_POSITION";

/// Foreign keys as relationship rows
pub const FOREIGN_KEYS_QUERY: &str = "\
SELECT
    OBJECT_SCHEMA_NAME(fk.parent_object_id) + '.' + OBJECT_NAME(fk.parent_object_id) AS from_table,
    pc.name AS from_column,
    OBJECT_SCHEMA_NAME(fk.referenced_object_id) + '.' + OBJECT_NAME(fk.referenced_object_id) AS to_table,
    rc.name AS to_column,
    fk.name AS constraint_name
FROM sys.foreign_keys fk
JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
ORDER BY from_table, constraint_name";

/// Errors from the Lakehouse SQL endpoint
#[derive(Error, Debug)]
pub enum LakehouseError {
    #[error(transparent)]
    NotConfigured(#[from] MissingSetting),

    #[error("could not get a SQL access token: {0}")]
    Auth(#[from] AuthError),

    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL error: {0}")]
    Sql(#[from] tiberius::error::Error),

    #[error("query timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    ReadOnly(#[from] GuardError),
}

/// Something that can run SQL against a Lakehouse
#[async_trait]
pub trait LakehouseBackend: Send + Sync {
    /// `host/database`, for logs
    fn describe(&self) -> String;

    /// Run `sql` with positional string parameters (`@P1`, `@P2`, ...)
    ///
    /// With no parameters the batch is sent as-is, so multi-statement
    /// batches work. Only the first result set is returned.
    async fn query(&self, sql: &str, params: &[String]) -> Result<QueryResult, LakehouseError>;
}

/// `sys.external_data_sources`
pub async fn list_external_data_sources(
    backend: &dyn LakehouseBackend,
) -> Result<Vec<ExternalDataSource>, LakehouseError> {
    let result = backend.query(DATASOURCES_QUERY, &[]).await?;
    Ok(result
        .rows
        .iter()
        .map(|row| ExternalDataSource {
            name: cell_str(row, 0),
            data_source_type: cell_str(row, 1),
            location: cell_str(row, 2),
        })
        .collect())
}

/// Base tables, optionally in one schema
pub async fn list_tables(
    backend: &dyn LakehouseBackend,
    schema: Option<&str>,
) -> Result<Vec<TableRef>, LakehouseError> {
    let result = match schema {
        Some(schema) => backend.query(TABLES_IN_SCHEMA_QUERY, &[schema.to_string()]).await?,
        None => backend.query(TABLES_QUERY, &[]).await?,
    };

    Ok(result
        .rows
        .iter()
        .map(|row| TableRef {
            schema: cell_str(row, 0),
            name: cell_str(row, 1),
        })
        .collect())
}

/// Column definitions for `schema.table`; empty if the table does not exist
pub async fn describe_table(
    backend: &dyn LakehouseBackend,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDef>, LakehouseError> {
    let result = backend
        .query(COLUMNS_QUERY, &[schema.to_string(), table.to_string()])
        .await?;

    Ok(result
        .rows
        .iter()
        .map(|row| ColumnDef {
            name: cell_str(row, 0),
            data_type: cell_str(row, 1),
            nullable: cell_str(row, 2).eq_ignore_ascii_case("YES"),
            max_length: row.get(3).and_then(Value::as_i64),
            ordinal: row.get(4).and_then(Value::as_i64).unwrap_or_default(),
        })
        .collect())
}

/// Foreign keys declared in the endpoint, as relationships
pub async fn foreign_keys(
    backend: &dyn LakehouseBackend,
) -> Result<Vec<Relationship>, LakehouseError> {
    let result = backend.query(FOREIGN_KEYS_QUERY, &[]).await?;
    Ok(result
        .rows
        .iter()
        .map(|row| Relationship {
            from_table: cell_str(row, 0),
            from_column: cell_str(row, 1),
            to_table: cell_str(row, 2),
            to_column: cell_str(row, 3),
            name: cell_str(row, 4),
            // SQL foreign keys filter from the many side only
            cross_filtering: "OneDirection".to_string(),
            is_active: true,
        })
        .collect())
}

/// Split `schema.table`; a bare name lands in `dbo`
pub fn split_table_name(name: &str) -> (String, String) {
    let strip = |s: &str| s.trim().trim_start_matches('[').trim_end_matches(']').to_string();
    match name.split_once('.') {
        Some((schema, table)) => (strip(schema), strip(table)),
        None => ("dbo".to_string(), strip(name)),
    }
}

fn cell_str(row: &[Value], idx: usize) -> String {
    match row.get(idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
