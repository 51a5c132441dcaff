//! Tool parameter types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Lakehouse
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SqlQueryParams {
    #[schemars(description = "T-SQL to run against the Lakehouse SQL endpoint. In read-only mode (default) only SELECT and WITH statements are allowed.")]
    pub query: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    #[schemars(description = "Only list tables in this schema (e.g. 'dbo')")]
    pub schema: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DescribeTableParams {
    #[schemars(description = "Table name, optionally schema-qualified ('dbo.orders'). Bare names are looked up in 'dbo'.")]
    pub table: String,
    #[schemars(description = "Schema, if not given in the table name")]
    pub schema: Option<String>,
}

// ============================================================================
// Semantic models
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceParams {
    #[schemars(description = "Fabric workspace id (defaults to FABRIC_WORKSPACE_ID)")]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct FindModelParams {
    #[schemars(description = "Lakehouse name to match against dataset names (defaults to FABRIC_LAKEHOUSE_NAME)")]
    pub lakehouse_name: Option<String>,
    #[schemars(description = "Fabric workspace id (defaults to FABRIC_WORKSPACE_ID)")]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipsParams {
    #[schemars(description = "Dataset (semantic model) id. If omitted, the model of the configured Lakehouse is used.")]
    pub dataset_id: Option<String>,
    #[schemars(description = "Fabric workspace id (defaults to FABRIC_WORKSPACE_ID)")]
    pub workspace_id: Option<String>,
}

// ============================================================================
// Kusto
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct KustoQueryParams {
    #[schemars(description = "KQL query")]
    pub query: String,
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct KustoCommandParams {
    #[schemars(description = "Control command, starting with '.' (e.g. '.show tables'). Only .show commands are allowed in read-only mode.")]
    pub command: String,
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct KustoClusterParams {
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct KustoDatabaseParams {
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct KustoTableParams {
    #[schemars(description = "Table name")]
    pub table: String,
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct KustoSampleParams {
    #[schemars(description = "Table name")]
    pub table: String,
    #[schemars(description = "Number of rows to sample (default 10)")]
    pub sample_size: Option<usize>,
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct KustoIngestParams {
    #[schemars(description = "Target table name")]
    pub table: String,
    #[schemars(description = "CSV rows to ingest, one per line, in the table's column order")]
    pub data: String,
    #[schemars(description = "Database (defaults to KUSTO_SERVICE_DEFAULT_DB)")]
    pub database: Option<String>,
    #[schemars(description = "Eventhouse query URI, one of kusto_known_services (defaults to KUSTO_SERVICE_URI)")]
    pub cluster_uri: Option<String>,
}

/// Default row count for `kusto_sample_table_data`
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
