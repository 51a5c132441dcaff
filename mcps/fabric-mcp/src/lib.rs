//! Fabric MCP Server
//!
//! MCP tools for Microsoft Fabric:
//!
//! - **Lakehouse**: T-SQL against the SQL analytics endpoint (TDS, Azure AD token auth)
//! - **Semantic models**: relationships from the Lakehouse's Power BI dataset
//! - **Eventhouse**: KQL queries and control commands over the Kusto REST API
//!
//! # Configuration
//! Set `FABRIC_SQL_ENDPOINT`, `FABRIC_LAKEHOUSE_NAME`, `FABRIC_WORKSPACE_ID`,
//! `KUSTO_SERVICE_URI` and `KUSTO_SERVICE_DEFAULT_DB`, or configure them in
//! `~/.fabric-mcp/config.toml`. Any subset works; tools for an unconfigured
//! backend report which variable is missing.
//!
//! # Embedding
//!
//! ```rust,ignore
//! use fabric_common::EmbeddableMcp;
//! use fabric_mcp::{Config, FabricMcpServer};
//!
//! let server = FabricMcpServer::new(Config::load()?)?;
//! let result = server.call_tool("kusto_list_tables", serde_json::json!({})).await?;
//! ```

pub mod cli;
pub mod config;
pub mod doctor;
pub mod kusto;
pub mod lakehouse;
pub mod params;
pub mod semantic;
pub mod server;
pub mod snippet;
pub mod types;

pub use config::Config;
pub use server::FabricMcpServer;
