//! Fabric MCP Server implementation

use std::collections::HashMap;
use std::sync::Arc;

use fabric_common::auth::{default_chain, TokenCredential};
use fabric_common::{
    async_trait, invalid_params, json_success, EmbeddableError, EmbeddableMcp, EmbeddableResult,
    IntoMcpError, McpError, McpResult, ResultExt,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::config::{Config, MissingSetting, KNOWN_SERVICES_ENV, KUSTO_DB_ENV, KUSTO_URI_ENV};
use crate::kusto::{self, KustoClient, KustoError};
use crate::lakehouse::{self, guard, LakehouseBackend, LakehouseError, TdsLakehouse};
use crate::params::*;
use crate::semantic::{SemanticModelClient, SemanticModelError};
use crate::types::{RelationshipTuple, TableSchema};

/// Column names for relationship tuples in tool output
pub const RELATIONSHIP_COLUMNS: [&str; 6] = [
    "from_table",
    "from_column",
    "to_table",
    "to_column",
    "name",
    "cross_filtering",
];

const EMPTY_SQL_NOTE: &str = "Query returned no rows. Verify the table and schema names with \
lakehouse_list_tables, and that the SQL endpoint has finished syncing recent Lakehouse data.";

const EMPTY_KQL_NOTE: &str = "Query returned no rows. Verify the database and table names with \
kusto_list_tables, and check the time range the query filters on.";

// ============================================================================
// Error Mapping
// ============================================================================

impl IntoMcpError for LakehouseError {
    fn into_mcp_error(self) -> McpError {
        match self {
            LakehouseError::NotConfigured(_) | LakehouseError::ReadOnly(_) => {
                invalid_params(self.to_string())
            }
            LakehouseError::Auth(e) => e.into_mcp_error(),
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl IntoMcpError for KustoError {
    fn into_mcp_error(self) -> McpError {
        match self {
            KustoError::NotConfigured(_)
            | KustoError::ReadOnly(_)
            | KustoError::Empty
            | KustoError::InvalidUri { .. } => {
                invalid_params(self.to_string())
            }
            KustoError::Auth(e) => e.into_mcp_error(),
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl IntoMcpError for SemanticModelError {
    fn into_mcp_error(self) -> McpError {
        match self {
            SemanticModelError::NotConfigured(_) => invalid_params(self.to_string()),
            SemanticModelError::Auth(e) => e.into_mcp_error(),
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl IntoMcpError for MissingSetting {
    fn into_mcp_error(self) -> McpError {
        invalid_params(self.to_string())
    }
}

// ============================================================================
// Server Implementation
// ============================================================================

/// Fabric MCP Server
///
/// Every backend is optional: tools for a backend that is not configured
/// fail with an invalid-params error naming the setting to add.
#[derive(Clone)]
pub struct FabricMcpServer {
    config: Arc<Config>,
    credential: Arc<dyn TokenCredential>,
    lakehouse: Result<Arc<dyn LakehouseBackend>, MissingSetting>,
    semantic: Arc<SemanticModelClient>,
    kusto: Arc<RwLock<HashMap<String, Arc<KustoClient>>>>,
    tool_router: ToolRouter<Self>,
}

impl FabricMcpServer {
    /// Create a server using the default Azure AD credential chain
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let credential = default_chain(&config.auth_options());
        Self::with_credential(config, credential)
    }

    /// Create a server with an explicit credential
    pub fn with_credential(config: Config, credential: Arc<dyn TokenCredential>) -> anyhow::Result<Self> {
        let lakehouse = config.sql_target().map(|target| {
            tracing::info!("Lakehouse SQL endpoint: {}:{}/{}", target.host, target.port, target.database);
            Arc::new(TdsLakehouse::new(target, credential.clone(), &config.lakehouse))
                as Arc<dyn LakehouseBackend>
        });
        if let Err(missing) = &lakehouse {
            tracing::info!("Lakehouse tools disabled: {}", missing);
        }

        let semantic = SemanticModelClient::new(&config.semantic_model.api_base_url, credential.clone())?;

        Ok(Self {
            config: Arc::new(config),
            credential,
            lakehouse,
            semantic: Arc::new(semantic),
            kusto: Arc::new(RwLock::new(HashMap::new())),
            tool_router: Self::tool_router(),
        })
    }

    /// Replace the Lakehouse backend
    pub fn with_lakehouse(mut self, backend: Arc<dyn LakehouseBackend>) -> Self {
        self.lakehouse = Ok(backend);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lakehouse(&self) -> McpResult<&dyn LakehouseBackend> {
        match &self.lakehouse {
            Ok(backend) => Ok(backend.as_ref()),
            Err(missing) => Err(missing.clone().into_mcp_error()),
        }
    }

    fn workspace(&self, explicit: Option<String>) -> McpResult<String> {
        match explicit.filter(|w| !w.trim().is_empty()) {
            Some(ws) => Ok(ws),
            None => self.config.workspace_id().map(str::to_string).to_mcp_err(),
        }
    }

    fn lakehouse_name(&self, explicit: Option<String>) -> McpResult<String> {
        match explicit.filter(|n| !n.trim().is_empty()) {
            Some(name) => Ok(name),
            None => self.config.lakehouse_name().map(str::to_string).to_mcp_err(),
        }
    }

    /// Client for `cluster_uri`, or the configured Eventhouse
    ///
    /// An explicit `cluster_uri` must be one of `kusto_services()`; the
    /// bearer token is never sent to any other host.
    async fn kusto_client(&self, cluster_uri: Option<&str>) -> McpResult<Arc<KustoClient>> {
        let uri = match cluster_uri.map(str::trim).filter(|u| !u.is_empty()) {
            Some(requested) => {
                let uri = kusto::normalize_uri(requested).to_mcp_err()?;
                let known = self
                    .config
                    .kusto_services()
                    .iter()
                    .any(|s| s.service_uri.eq_ignore_ascii_case(&uri));
                if !known {
                    return Err(invalid_params(format!(
                        "{} is not a known Eventhouse - add it to {} or {} to query it",
                        uri, KUSTO_URI_ENV, KNOWN_SERVICES_ENV
                    )));
                }
                uri
            }
            None => kusto::normalize_uri(self.config.kusto_uri().to_mcp_err()?).to_mcp_err()?,
        };

        if let Some(client) = self.kusto.read().await.get(&uri) {
            return Ok(client.clone());
        }

        let mut clients = self.kusto.write().await;
        if let Some(client) = clients.get(&uri) {
            return Ok(client.clone());
        }

        // A scope override only applies to the configured service
        let configured = self.config.kusto_uri().ok().and_then(|u| kusto::normalize_uri(u).ok());
        let mut settings = self.config.kusto.clone();
        if configured.map_or(true, |c| !c.eq_ignore_ascii_case(&uri)) {
            settings.scope = None;
        }

        let client = Arc::new(KustoClient::new(&uri, self.credential.clone(), &settings).to_mcp_err()?);
        clients.insert(uri, client.clone());
        Ok(client)
    }

    /// Explicit database, else the default for the service
    fn kusto_database(&self, explicit: Option<String>, client: &KustoClient) -> McpResult<String> {
        if let Some(db) = explicit.filter(|d| !d.trim().is_empty()) {
            return Ok(db);
        }

        self.config
            .kusto_services()
            .into_iter()
            .find(|s| s.service_uri.eq_ignore_ascii_case(client.service_uri()))
            .and_then(|s| s.default_database)
            .ok_or_else(|| {
                invalid_params(format!(
                    "No database given and no default database for {} - pass 'database' or set {}",
                    client.service_uri(),
                    KUSTO_DB_ENV
                ))
            })
    }

    fn missing_settings(&self) -> Vec<MissingSetting> {
        [
            self.config.sql_target().err(),
            self.config.workspace_id().err(),
            self.config.kusto_uri().err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn relationship_table(rows: Vec<RelationshipTuple>, empty_note: &str) -> Value {
    let mut body = json!({
        "columns": RELATIONSHIP_COLUMNS,
        "count": rows.len(),
        "relationships": rows,
    });
    if body["count"] == 0 {
        body["note"] = json!(empty_note);
    }
    body
}

#[tool_router]
impl FabricMcpServer {
    // ------------------------------------------------------------------------
    // Lakehouse
    // ------------------------------------------------------------------------

    #[tool(description = "Run a T-SQL query against the Fabric Lakehouse SQL endpoint. Returns column names and rows as JSON. Read-only by default: only SELECT and WITH statements are allowed.")]
    async fn lakehouse_sql_query(&self, Parameters(params): Parameters<SqlQueryParams>) -> Result<CallToolResult, McpError> {
        let backend = self.lakehouse()?;

        if self.config.lakehouse.allow_writes {
            if guard::is_blank(&params.query) {
                return Err(LakehouseError::from(guard::GuardError::Empty).into_mcp_error());
            }
        } else {
            guard::check_read_only(&params.query)
                .map_err(LakehouseError::from)
                .to_mcp_err()?;
        }

        let result = backend.query(&params.query, &[]).await.to_mcp_err()?;
        json_success(&result.note_if_empty(EMPTY_SQL_NOTE))
    }

    #[tool(description = "List the base tables in the Lakehouse SQL endpoint, optionally only those in one schema.")]
    async fn lakehouse_list_tables(&self, Parameters(params): Parameters<ListTablesParams>) -> Result<CallToolResult, McpError> {
        let backend = self.lakehouse()?;
        let schema = params.schema.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let tables = lakehouse::list_tables(backend, schema).await.to_mcp_err()?;

        let mut body = json!({ "count": tables.len(), "tables": tables });
        if tables.is_empty() {
            let note = match schema {
                Some(s) => format!("No tables found in schema '{}'. Check the schema name, or omit it to list every schema.", s),
                None => "No tables found. Check FABRIC_LAKEHOUSE_NAME and that the Lakehouse has tables.".to_string(),
            };
            body["note"] = json!(note);
        }
        json_success(&body)
    }

    #[tool(description = "List the external data sources (OneLake shortcuts and other sources) visible to the Lakehouse SQL endpoint.")]
    async fn lakehouse_list_external_data_sources(&self) -> Result<CallToolResult, McpError> {
        let backend = self.lakehouse()?;
        let sources = lakehouse::list_external_data_sources(backend).await.to_mcp_err()?;

        let mut body = json!({ "count": sources.len(), "data_sources": sources });
        if sources.is_empty() {
            body["note"] = json!("No external data sources are defined for this Lakehouse.");
        }
        json_success(&body)
    }

    #[tool(description = "Describe the columns of a Lakehouse table: name, data type, nullability, maximum length and ordinal position.")]
    async fn lakehouse_describe_table(&self, Parameters(params): Parameters<DescribeTableParams>) -> Result<CallToolResult, McpError> {
        let backend = self.lakehouse()?;

        let (mut schema, table) = lakehouse::split_table_name(&params.table);
        if let Some(explicit) = params.schema.filter(|s| !s.trim().is_empty()) {
            if !params.table.contains('.') {
                schema = explicit.trim().to_string();
            }
        }

        let columns = lakehouse::describe_table(backend, &schema, &table).await.to_mcp_err()?;
        if columns.is_empty() {
            return Err(invalid_params(format!(
                "Table '{}.{}' not found. Use lakehouse_list_tables to see available tables.",
                schema, table
            )));
        }

        json_success(&TableSchema { schema, table, columns })
    }

    #[tool(description = "List foreign key relationships declared on the Lakehouse SQL endpoint as (from_table, from_column, to_table, to_column, name, cross_filtering) rows.")]
    async fn lakehouse_foreign_keys(&self) -> Result<CallToolResult, McpError> {
        let backend = self.lakehouse()?;
        let rels = lakehouse::foreign_keys(backend).await.to_mcp_err()?;

        json_success(&relationship_table(
            rels.into_iter().map(|r| r.into_tuple()).collect(),
            "No foreign keys are declared on the SQL endpoint. Lakehouse relationships usually live in \
             the semantic model: try semantic_model_relationships.",
        ))
    }

    // ------------------------------------------------------------------------
    // Semantic models
    // ------------------------------------------------------------------------

    #[tool(description = "List the semantic models (Power BI datasets) in a Fabric workspace.")]
    async fn semantic_model_list(&self, Parameters(params): Parameters<WorkspaceParams>) -> Result<CallToolResult, McpError> {
        let workspace_id = self.workspace(params.workspace_id)?;
        let models = self.semantic.list_models(&workspace_id).await.to_mcp_err()?;

        let mut body = json!({ "workspace_id": workspace_id, "count": models.len(), "models": models });
        if models.is_empty() {
            body["note"] = json!("No semantic models found. Check the workspace id and that your account has access to the workspace.");
        }
        json_success(&body)
    }

    #[tool(description = "Find the semantic model associated with a Lakehouse: the first dataset whose name contains the Lakehouse name.")]
    async fn semantic_model_find(&self, Parameters(params): Parameters<FindModelParams>) -> Result<CallToolResult, McpError> {
        let workspace_id = self.workspace(params.workspace_id)?;
        let lakehouse_name = self.lakehouse_name(params.lakehouse_name)?;

        let body = match self
            .semantic
            .find_for_lakehouse(&workspace_id, &lakehouse_name)
            .await
            .to_mcp_err()?
        {
            Some(model) => json!({ "found": true, "model": model }),
            None => json!({
                "found": false,
                "message": format!("No semantic model found for lakehouse '{}'", lakehouse_name),
            }),
        };
        json_success(&body)
    }

    #[tool(description = "List the relationships defined in a semantic model as (from_table, from_column, to_table, to_column, name, cross_filtering) rows. Without dataset_id, uses the model of the configured Lakehouse.")]
    async fn semantic_model_relationships(&self, Parameters(params): Parameters<RelationshipsParams>) -> Result<CallToolResult, McpError> {
        let workspace_id = self.workspace(params.workspace_id)?;

        let rows = match params.dataset_id.filter(|d| !d.trim().is_empty()) {
            Some(dataset_id) => self
                .semantic
                .relationships(&workspace_id, &dataset_id)
                .await
                .to_mcp_err()?
                .into_iter()
                .map(|r| r.into_tuple())
                .collect(),
            None => {
                let lakehouse_name = self.lakehouse_name(None)?;
                self.semantic
                    .lakehouse_relationships(&workspace_id, &lakehouse_name)
                    .await
                    .to_mcp_err()?
            }
        };

        json_success(&relationship_table(
            rows,
            "No relationships found. The semantic model may not define any, or it may not exist: \
             check semantic_model_find.",
        ))
    }

    #[tool(description = "Summarise the semantic model behind the configured Lakehouse: dataset id and its relationships.")]
    async fn semantic_model_info(&self) -> Result<CallToolResult, McpError> {
        let workspace_id = self.workspace(None)?;
        let lakehouse_name = self.lakehouse_name(None)?;

        let info = self.semantic.info(&workspace_id, &lakehouse_name).await.to_mcp_err()?;
        json_success(&info)
    }

    // ------------------------------------------------------------------------
    // Kusto
    // ------------------------------------------------------------------------

    #[tool(description = "List the Eventhouse (Kusto) services this server knows about, with their default databases.")]
    async fn kusto_known_services(&self) -> Result<CallToolResult, McpError> {
        let services = self.config.kusto_services();

        let mut body = json!({ "count": services.len(), "services": services });
        if services.is_empty() {
            body["note"] = json!("No Eventhouse configured. Set KUSTO_SERVICE_URI (and optionally KUSTO_KNOWN_SERVICES).");
        }
        json_success(&body)
    }

    #[tool(description = "Run a KQL query against an Eventhouse database. Returns column names, column types and rows as JSON.")]
    async fn kusto_query(&self, Parameters(params): Parameters<KustoQueryParams>) -> Result<CallToolResult, McpError> {
        if kusto::is_command(&params.query) {
            return Err(invalid_params("Control commands (starting with '.') must be run with kusto_command"));
        }

        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;

        let result = client.execute(&database, &params.query).await.to_mcp_err()?;
        json_success(&result.note_if_empty(EMPTY_KQL_NOTE))
    }

    #[tool(description = "Run a Kusto control command (e.g. '.show tables'). In read-only mode (default) only .show commands are allowed.")]
    async fn kusto_command(&self, Parameters(params): Parameters<KustoCommandParams>) -> Result<CallToolResult, McpError> {
        if !kusto::is_command(&params.command) {
            return Err(invalid_params("Control commands start with '.'; use kusto_query for KQL queries"));
        }

        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;

        let result = client.execute(&database, &params.command).await.to_mcp_err()?;
        json_success(&result)
    }

    #[tool(description = "List the databases in an Eventhouse.")]
    async fn kusto_list_databases(&self, Parameters(params): Parameters<KustoClusterParams>) -> Result<CallToolResult, McpError> {
        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let result = client.list_databases().await.to_mcp_err()?;
        json_success(&result.note_if_empty("No databases visible. Check that your account has viewer access to the Eventhouse."))
    }

    #[tool(description = "List the tables in an Eventhouse database.")]
    async fn kusto_list_tables(&self, Parameters(params): Parameters<KustoDatabaseParams>) -> Result<CallToolResult, McpError> {
        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;

        let result = client.list_tables(&database).await.to_mcp_err()?;
        json_success(&result.note_if_empty(format!("No tables found in database '{}'.", database)))
    }

    #[tool(description = "Get the schema of an Eventhouse table as a CSL schema string (column:type pairs).")]
    async fn kusto_get_table_schema(&self, Parameters(params): Parameters<KustoTableParams>) -> Result<CallToolResult, McpError> {
        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;

        let result = client.table_schema(&database, &params.table).await.to_mcp_err()?;
        json_success(&result)
    }

    #[tool(description = "Return a random sample of rows from an Eventhouse table (10 by default).")]
    async fn kusto_sample_table_data(&self, Parameters(params): Parameters<KustoSampleParams>) -> Result<CallToolResult, McpError> {
        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;
        let size = params
            .sample_size
            .unwrap_or(DEFAULT_SAMPLE_SIZE)
            .clamp(1, self.config.kusto.max_rows.max(1));

        let result = client.sample(&database, &params.table, size).await.to_mcp_err()?;
        json_success(&result.note_if_empty(format!("Table '{}' has no rows.", params.table)))
    }

    #[tool(description = "Ingest CSV rows into an Eventhouse table with '.ingest inline'. Only available when Kusto writes are enabled.")]
    async fn kusto_ingest_inline_into_table(&self, Parameters(params): Parameters<KustoIngestParams>) -> Result<CallToolResult, McpError> {
        let client = self.kusto_client(params.cluster_uri.as_deref()).await?;
        let database = self.kusto_database(params.database, &client)?;

        let rows: Vec<String> = params
            .data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let result = client
            .ingest_inline(&database, &params.table, &rows)
            .await
            .to_mcp_err()?;
        json_success(&result)
    }

    // ------------------------------------------------------------------------
    // Server
    // ------------------------------------------------------------------------

    #[tool(description = "Show the server's effective configuration, which backends are enabled, and which settings are missing.")]
    async fn get_config(&self) -> Result<CallToolResult, McpError> {
        let missing: Vec<Value> = self
            .missing_settings()
            .into_iter()
            .map(|m| json!({ "setting": m.setting, "env": m.env }))
            .collect();

        json_success(&json!({
            "version": env!("CARGO_PKG_VERSION"),
            "config_file": self.config.source,
            "credential": self.credential.name(),
            "backends": {
                "lakehouse": self.lakehouse.is_ok(),
                "semantic_model": self.config.workspace_id().is_ok() && self.config.lakehouse_name().is_ok(),
                "kusto": self.config.kusto_uri().is_ok(),
            },
            "missing": missing,
            "config": &*self.config,
        }))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for FabricMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mode = |writes: bool| if writes { "read-write" } else { "read-only" };
        ServerInfo {
            instructions: Some(format!(
                "Microsoft Fabric MCP server. Lakehouse SQL tools (lakehouse_*) are {}; \
                Eventhouse KQL tools (kusto_*) are {}. Use lakehouse_list_tables and \
                lakehouse_describe_table before writing SQL, semantic_model_relationships \
                to learn how tables join, and kusto_list_tables / kusto_get_table_schema \
                before writing KQL. Call get_config if a tool reports missing settings.",
                mode(self.config.lakehouse.allow_writes),
                mode(self.config.kusto.allow_writes),
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for FabricMcpServer {
    fn server_name(&self) -> &str {
        "fabric-mcp"
    }

    fn server_description(&self) -> Option<&str> {
        Some(
            "Microsoft Fabric MCP Server - Lakehouse SQL, semantic model relationships \
             and Eventhouse KQL tools.",
        )
    }

    fn server_version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "lakehouse_sql_query" => {
                let params: SqlQueryParams = serde_json::from_value(params)?;
                self.lakehouse_sql_query(Parameters(params)).await.map_err(Into::into)
            }

            "lakehouse_list_tables" => {
                let params: ListTablesParams = serde_json::from_value(params)?;
                self.lakehouse_list_tables(Parameters(params)).await.map_err(Into::into)
            }

            "lakehouse_list_external_data_sources" => self
                .lakehouse_list_external_data_sources()
                .await
                .map_err(Into::into),

            "lakehouse_describe_table" => {
                let params: DescribeTableParams = serde_json::from_value(params)?;
                self.lakehouse_describe_table(Parameters(params)).await.map_err(Into::into)
            }

            "lakehouse_foreign_keys" => self.lakehouse_foreign_keys().await.map_err(Into::into),

            "semantic_model_list" => {
                let params: WorkspaceParams = serde_json::from_value(params)?;
                self.semantic_model_list(Parameters(params)).await.map_err(Into::into)
            }

            "semantic_model_find" => {
                let params: FindModelParams = serde_json::from_value(params)?;
                self.semantic_model_find(Parameters(params)).await.map_err(Into::into)
            }

            "semantic_model_relationships" => {
                let params: RelationshipsParams = serde_json::from_value(params)?;
                self.semantic_model_relationships(Parameters(params))
                    .await
                    .map_err(Into::into)
            }

            "semantic_model_info" => self.semantic_model_info().await.map_err(Into::into),

            "kusto_known_services" => self.kusto_known_services().await.map_err(Into::into),

            "kusto_query" => {
                let params: KustoQueryParams = serde_json::from_value(params)?;
                self.kusto_query(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_command" => {
                let params: KustoCommandParams = serde_json::from_value(params)?;
                self.kusto_command(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_list_databases" => {
                let params: KustoClusterParams = serde_json::from_value(params)?;
                self.kusto_list_databases(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_list_tables" => {
                let params: KustoDatabaseParams = serde_json::from_value(params)?;
                self.kusto_list_tables(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_get_table_schema" => {
                let params: KustoTableParams = serde_json::from_value(params)?;
                self.kusto_get_table_schema(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_sample_table_data" => {
                let params: KustoSampleParams = serde_json::from_value(params)?;
                self.kusto_sample_table_data(Parameters(params)).await.map_err(Into::into)
            }

            "kusto_ingest_inline_into_table" => {
                let params: KustoIngestParams = serde_json::from_value(params)?;
                self.kusto_ingest_inline_into_table(Parameters(params))
                    .await
                    .map_err(Into::into)
            }

            "get_config" => self.get_config().await.map_err(Into::into),

            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }
}
