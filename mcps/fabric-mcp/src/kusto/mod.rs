//! Eventhouse (Kusto) client
//!
//! Talks to the v1 REST endpoints: `/v1/rest/query` for KQL and
//! `/v1/rest/mgmt` for control commands (anything starting with `.`).
//! See: https://learn.microsoft.com/kusto/api/rest/request

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use fabric_common::auth::{kusto_scope, AuthError, TokenCredential};

use crate::config::{KustoConfig, MissingSetting};
use crate::types::QueryResult;

pub mod response;

/// Database used for cluster-level commands when none is given
const CLUSTER_DATABASE: &str = "NetDefaultDB";

/// Errors from the Kusto REST API
#[derive(Error, Debug)]
pub enum KustoError {
    #[error(transparent)]
    NotConfigured(#[from] MissingSetting),

    #[error("could not get a Kusto access token: {0}")]
    Auth(#[from] AuthError),

    #[error("Kusto request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Kusto returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("query failed part-way: {0}")]
    PartialFailure(String),

    #[error("invalid Kusto response: {0}")]
    InvalidResponse(String),

    #[error("read-only mode: control command '{0}' is not allowed. Set allow_writes = true under [kusto] to enable it")]
    ReadOnly(String),

    #[error("query is empty")]
    Empty,

    #[error("invalid Eventhouse URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// True if `csl` is a control command rather than a query
pub fn is_command(csl: &str) -> bool {
    csl.trim_start().starts_with('.')
}

/// Check a control command against read-only mode
///
/// Only `.show` commands are allowed unless writes are enabled.
pub fn check_command(csl: &str, allow_writes: bool) -> Result<(), KustoError> {
    if allow_writes {
        return Ok(());
    }

    let verb = csl
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if verb == ".show" {
        Ok(())
    } else {
        Err(KustoError::ReadOnly(verb))
    }
}

/// Quote a table or column name as a KQL bracketed literal: `['My Table']`
pub fn quote_name(name: &str) -> String {
    let escaped = name.trim().replace('\\', "\\\\").replace('\'', "\\'");
    format!("['{}']", escaped)
}

/// Normalise a service URI to `scheme://host[:port]` without a trailing slash
pub fn normalize_uri(service_uri: &str) -> Result<String, KustoError> {
    let invalid = |reason: &str| KustoError::InvalidUri {
        uri: service_uri.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(service_uri.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid("expected an https:// URI"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Kusto REST client for one Eventhouse
pub struct KustoClient {
    http: Client,
    service_uri: String,
    scope: String,
    credential: Arc<dyn TokenCredential>,
    max_rows: usize,
    allow_writes: bool,
}

impl KustoClient {
    pub fn new(
        service_uri: &str,
        credential: Arc<dyn TokenCredential>,
        settings: &KustoConfig,
    ) -> Result<Self, KustoError> {
        let service_uri = normalize_uri(service_uri)?;

        let http = Client::builder()
            .user_agent(concat!("fabric-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let scope = settings
            .scope
            .clone()
            .unwrap_or_else(|| kusto_scope(&service_uri));

        Ok(Self {
            http,
            service_uri,
            scope,
            credential,
            max_rows: settings.max_rows,
            allow_writes: settings.allow_writes,
        })
    }

    pub fn service_uri(&self) -> &str {
        &self.service_uri
    }

    pub fn allows_writes(&self) -> bool {
        self.allow_writes
    }

    /// Run a query or control command against `database`
    #[instrument(skip(self, csl), fields(service = %self.service_uri))]
    pub async fn execute(&self, database: &str, csl: &str) -> Result<QueryResult, KustoError> {
        if csl.trim().is_empty() {
            return Err(KustoError::Empty);
        }

        let endpoint = if is_command(csl) {
            check_command(csl, self.allow_writes)?;
            "mgmt"
        } else {
            "query"
        };

        let token = self.credential.get_token(&self.scope).await?;
        let url = format!("{}/v1/rest/{}", self.service_uri, endpoint);
        let request_id = format!("fabric-mcp;{}", uuid::Uuid::new_v4());

        debug!(%request_id, endpoint, "sending Kusto request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.secret())
            .header("x-ms-client-request-id", &request_id)
            .header("x-ms-app", "fabric-mcp")
            .json(&json!({ "db": database, "csl": csl }))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(KustoError::Service {
                status: status.as_u16(),
                message: response::error_message(&text),
            });
        }

        Ok(response::parse_primary(&body)?.limit(self.max_rows))
    }

    /// `.show databases`
    pub async fn list_databases(&self) -> Result<QueryResult, KustoError> {
        self.execute(CLUSTER_DATABASE, ".show databases").await
    }

    /// `.show tables`
    pub async fn list_tables(&self, database: &str) -> Result<QueryResult, KustoError> {
        self.execute(database, ".show tables").await
    }

    /// `.show table T cslschema`
    pub async fn table_schema(&self, database: &str, table: &str) -> Result<QueryResult, KustoError> {
        self.execute(database, &format!(".show table {} cslschema", quote_name(table)))
            .await
    }

    /// `T | sample N`
    pub async fn sample(&self, database: &str, table: &str, count: usize) -> Result<QueryResult, KustoError> {
        self.execute(database, &format!("{} | sample {}", quote_name(table), count))
            .await
    }

    /// `.ingest inline into table T <| rows` (write mode only)
    ///
    /// Each entry of `rows` is one CSV line.
    pub async fn ingest_inline(
        &self,
        database: &str,
        table: &str,
        rows: &[String],
    ) -> Result<QueryResult, KustoError> {
        if rows.is_empty() {
            return Err(KustoError::Empty);
        }
        let command = format!(
            ".ingest inline into table {} <|\n{}",
            quote_name(table),
            rows.join("\n")
        );
        self.execute(database, &command).await
    }
}
