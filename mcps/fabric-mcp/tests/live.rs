//! Live tests against real Fabric resources
//!
//! They read their targets from the same environment variables the server
//! uses and need a working Azure sign-in (`az login`, a service principal,
//! or `FABRIC_ACCESS_TOKEN`):
//!
//! - Lakehouse: `FABRIC_SQL_ENDPOINT`, `FABRIC_LAKEHOUSE_NAME`
//! - Semantic model: `FABRIC_WORKSPACE_ID`, `FABRIC_LAKEHOUSE_NAME`
//! - Eventhouse: `KUSTO_SERVICE_URI`, `KUSTO_SERVICE_DEFAULT_DB`
//!
//! # Running tests
//!
//! ```bash
//! cargo test -p fabric-mcp --test live -- --ignored
//! ```
//!
//! Tests whose variables are unset return early.

use fabric_common::EmbeddableMcp;
use fabric_mcp::{Config, FabricMcpServer};
use serde_json::json;

fn server() -> FabricMcpServer {
    let config = Config::load().expect("config should load");
    FabricMcpServer::new(config).expect("server should start")
}

#[tokio::test]
#[ignore = "integration test - requires a Lakehouse and Azure sign-in"]
async fn lakehouse_lists_tables() {
    let config = Config::load().unwrap();
    if config.sql_target().is_err() {
        eprintln!("skipping: Lakehouse not configured");
        return;
    }

    let result = server()
        .call_tool("lakehouse_list_tables", json!({}))
        .await
        .expect("lakehouse_list_tables failed");
    assert!(!result.content.is_empty());
}

#[tokio::test]
#[ignore = "integration test - requires a Lakehouse and Azure sign-in"]
async fn lakehouse_read_only_query() {
    let config = Config::load().unwrap();
    if config.sql_target().is_err() {
        eprintln!("skipping: Lakehouse not configured");
        return;
    }

    let result = server()
        .call_tool("lakehouse_sql_query", json!({ "query": "SELECT 1 AS one" }))
        .await
        .expect("query failed");
    assert!(!result.content.is_empty());
}

#[tokio::test]
#[ignore = "integration test - requires a Fabric workspace and Azure sign-in"]
async fn semantic_model_info() {
    let config = Config::load().unwrap();
    if config.workspace_id().is_err() || config.lakehouse_name().is_err() {
        eprintln!("skipping: workspace or Lakehouse name not configured");
        return;
    }

    server()
        .call_tool("semantic_model_info", json!({}))
        .await
        .expect("semantic_model_info failed");
}

#[tokio::test]
#[ignore = "integration test - requires an Eventhouse and Azure sign-in"]
async fn kusto_lists_databases() {
    let config = Config::load().unwrap();
    if config.kusto_uri().is_err() {
        eprintln!("skipping: Eventhouse not configured");
        return;
    }

    server()
        .call_tool("kusto_list_databases", json!({}))
        .await
        .expect("kusto_list_databases failed");
}
