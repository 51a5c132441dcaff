//! Configuration for the Fabric MCP server
//!
//! Configuration is loaded from:
//! 1. Environment variables (highest priority; these are what editor
//!    `env` blocks set)
//! 2. The TOML file at `FABRIC_MCP_CONFIG`
//! 3. `~/.fabric-mcp/config.toml`
//! 4. Default values
//!
//! Every backend is optional. A server with only `KUSTO_SERVICE_URI` set
//! starts fine and reports the missing Lakehouse settings per tool call.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fabric_common::auth::{AuthOptions, DEFAULT_AUTHORITY_HOST};

use crate::kusto::normalize_uri;

/// Path override for the config file
pub const CONFIG_PATH_ENV: &str = "FABRIC_MCP_CONFIG";
/// Lakehouse SQL endpoint host (`xxxx.datawarehouse.fabric.microsoft.com`)
pub const SQL_ENDPOINT_ENV: &str = "FABRIC_SQL_ENDPOINT";
/// Lakehouse (database) name
pub const LAKEHOUSE_NAME_ENV: &str = "FABRIC_LAKEHOUSE_NAME";
/// Fabric workspace id (GUID)
pub const WORKSPACE_ID_ENV: &str = "FABRIC_WORKSPACE_ID";
/// Eventhouse query URI
pub const KUSTO_URI_ENV: &str = "KUSTO_SERVICE_URI";
/// Default KQL database
pub const KUSTO_DB_ENV: &str = "KUSTO_SERVICE_DEFAULT_DB";
/// Extra Eventhouses, as a JSON array of `{"service_uri", "default_database", "description"}`
pub const KNOWN_SERVICES_ENV: &str = "KUSTO_KNOWN_SERVICES";
/// Azure AD tenant
pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";

/// A required setting is missing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{setting} is not configured - set {env} in the MCP server's env block or in the config file")]
pub struct MissingSetting {
    pub setting: &'static str,
    pub env: &'static str,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lakehouse: LakehouseConfig,
    #[serde(default)]
    pub semantic_model: SemanticModelConfig,
    #[serde(default)]
    pub kusto: KustoConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// File the settings were looked up in, whether or not it existed
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Lakehouse SQL endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakehouseConfig {
    /// SQL endpoint host; `tcp:` prefixes and `,port` suffixes are accepted
    pub sql_endpoint: Option<String>,
    /// Lakehouse name, used as the database
    pub database: Option<String>,
    #[serde(default = "default_sql_port")]
    pub port: u16,
    /// Allow statements other than SELECT / WITH
    #[serde(default)]
    pub allow_writes: bool,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_sql_timeout")]
    pub timeout_secs: u64,
}

/// Power BI / Fabric REST settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticModelConfig {
    pub workspace_id: Option<String>,
    #[serde(default = "default_powerbi_url")]
    pub api_base_url: String,
}

/// Eventhouse (Kusto) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KustoConfig {
    pub service_uri: Option<String>,
    pub default_database: Option<String>,
    /// Allow control commands other than `.show`
    #[serde(default)]
    pub allow_writes: bool,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_kusto_timeout")]
    pub timeout_secs: u64,
    /// Token scope; defaults to `<service_uri>/.default`
    pub scope: Option<String>,
    /// Other Eventhouses the assistant may target with `cluster_uri`
    #[serde(default)]
    pub known_services: Vec<KnownService>,
}

/// An Eventhouse listed by `kusto_known_services`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownService {
    pub service_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Azure AD settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_authority")]
    pub authority_host: String,
    pub tenant_id: Option<String>,
}

fn default_sql_port() -> u16 {
    1433
}

fn default_max_rows() -> usize {
    1000
}

fn default_sql_timeout() -> u64 {
    30
}

fn default_kusto_timeout() -> u64 {
    60
}

fn default_powerbi_url() -> String {
    "https://api.powerbi.com".to_string()
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

impl Default for LakehouseConfig {
    fn default() -> Self {
        Self {
            sql_endpoint: None,
            database: None,
            port: default_sql_port(),
            allow_writes: false,
            max_rows: default_max_rows(),
            timeout_secs: default_sql_timeout(),
        }
    }
}

impl Default for SemanticModelConfig {
    fn default() -> Self {
        Self {
            workspace_id: None,
            api_base_url: default_powerbi_url(),
        }
    }
}

impl Default for KustoConfig {
    fn default() -> Self {
        Self {
            service_uri: None,
            default_database: None,
            allow_writes: false,
            max_rows: default_max_rows(),
            timeout_secs: default_kusto_timeout(),
            scope: None,
            known_services: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authority_host: default_authority(),
            tenant_id: None,
        }
    }
}

/// Resolved Lakehouse connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_at(Self::config_path())
    }

    /// Load from `path` (if it exists) and apply environment overrides
    pub fn load_at(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path.as_deref() {
            Some(file) if file.exists() => {
                tracing::info!("Loading config from: {}", file.display());
                Self::load_from(file)?
            }
            _ => {
                tracing::info!("No config file found, using defaults and environment");
                Self::default()
            }
        };

        config.source = path;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a TOML file without applying environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Where the config file is looked up
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".fabric-mcp").join("config.toml"))
    }

    /// Overlay non-empty values from `lookup` (normally `std::env::var`)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(SQL_ENDPOINT_ENV) {
            self.lakehouse.sql_endpoint = Some(v);
        }
        if let Some(v) = get(LAKEHOUSE_NAME_ENV) {
            self.lakehouse.database = Some(v);
        }
        if let Some(v) = get(WORKSPACE_ID_ENV) {
            self.semantic_model.workspace_id = Some(v);
        }
        if let Some(v) = get(KUSTO_URI_ENV) {
            self.kusto.service_uri = Some(v);
        }
        if let Some(v) = get(KUSTO_DB_ENV) {
            self.kusto.default_database = Some(v);
        }
        if let Some(v) = get(KNOWN_SERVICES_ENV) {
            match serde_json::from_str::<Vec<KnownService>>(&v) {
                Ok(services) => self.kusto.known_services = services,
                Err(e) => tracing::warn!("Ignoring {}: {}", KNOWN_SERVICES_ENV, e),
            }
        }
        if let Some(v) = get(TENANT_ID_ENV) {
            self.auth.tenant_id = Some(v);
        }
    }

    /// The configured Eventhouse followed by the extra known services, without duplicates
    ///
    /// URIs are normalised the way [`KustoClient`](crate::kusto::KustoClient) stores them,
    /// so they compare equal to `service_uri()`.
    pub fn kusto_services(&self) -> Vec<KnownService> {
        let normalize = |uri: &str| {
            normalize_uri(uri).unwrap_or_else(|_| uri.trim().trim_end_matches('/').to_string())
        };

        let mut services = Vec::new();
        if let Ok(uri) = self.kusto_uri() {
            services.push(KnownService {
                service_uri: normalize(uri),
                default_database: non_empty(&self.kusto.default_database).map(str::to_string),
                description: Some("Default service".to_string()),
            });
        }
        for known in &self.kusto.known_services {
            let uri = normalize(&known.service_uri);
            if !services.iter().any(|s| s.service_uri.eq_ignore_ascii_case(&uri)) {
                services.push(KnownService {
                    service_uri: uri,
                    ..known.clone()
                });
            }
        }
        services
    }

    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            authority_host: self.auth.authority_host.clone(),
            tenant_id: self.auth.tenant_id.clone(),
        }
    }

    /// Lakehouse name (used by both SQL and semantic model lookups)
    pub fn lakehouse_name(&self) -> Result<&str, MissingSetting> {
        non_empty(&self.lakehouse.database).ok_or(MissingSetting {
            setting: "Lakehouse name",
            env: LAKEHOUSE_NAME_ENV,
        })
    }

    pub fn workspace_id(&self) -> Result<&str, MissingSetting> {
        non_empty(&self.semantic_model.workspace_id).ok_or(MissingSetting {
            setting: "Fabric workspace id",
            env: WORKSPACE_ID_ENV,
        })
    }

    pub fn kusto_uri(&self) -> Result<&str, MissingSetting> {
        non_empty(&self.kusto.service_uri).ok_or(MissingSetting {
            setting: "Eventhouse query URI",
            env: KUSTO_URI_ENV,
        })
    }

    /// Resolve host, port and database for the SQL endpoint
    pub fn sql_target(&self) -> Result<SqlTarget, MissingSetting> {
        let endpoint = non_empty(&self.lakehouse.sql_endpoint).ok_or(MissingSetting {
            setting: "Lakehouse SQL endpoint",
            env: SQL_ENDPOINT_ENV,
        })?;
        let database = self.lakehouse_name()?;
        let (host, port) = parse_sql_endpoint(endpoint);

        Ok(SqlTarget {
            host,
            port: port.unwrap_or(self.lakehouse.port),
            database: database.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Split `tcp:host,1433` / `host,1433` / `host` into host and optional port
pub fn parse_sql_endpoint(endpoint: &str) -> (String, Option<u16>) {
    let trimmed = endpoint.trim();
    let without_scheme = trimmed
        .strip_prefix("tcp:")
        .or_else(|| trimmed.strip_prefix("TCP:"))
        .unwrap_or(trimmed);

    match without_scheme.rsplit_once(',') {
        Some((host, port)) => match port.trim().parse() {
            Ok(port) => (host.trim().to_string(), Some(port)),
            Err(_) => (without_scheme.to_string(), None),
        },
        None => (without_scheme.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.lakehouse.port, 1433);
        assert_eq!(config.lakehouse.max_rows, 1000);
        assert!(!config.lakehouse.allow_writes);
        assert_eq!(config.semantic_model.api_base_url, "https://api.powerbi.com");
        assert_eq!(config.auth.authority_host, "https://login.microsoftonline.com");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [lakehouse]
            sql_endpoint = "old.datawarehouse.fabric.microsoft.com"
            database = "OldLakehouse"
            max_rows = 50

            [kusto]
            service_uri = "https://old.kusto.fabric.microsoft.com"
            "#,
        )
        .unwrap();

        config.apply_env(env(&[
            (SQL_ENDPOINT_ENV, "new.datawarehouse.fabric.microsoft.com"),
            (KUSTO_DB_ENV, "Telemetry"),
            (LAKEHOUSE_NAME_ENV, "   "),
        ]));

        assert_eq!(
            config.lakehouse.sql_endpoint.as_deref(),
            Some("new.datawarehouse.fabric.microsoft.com")
        );
        // Blank env values do not clobber the file
        assert_eq!(config.lakehouse.database.as_deref(), Some("OldLakehouse"));
        assert_eq!(config.lakehouse.max_rows, 50);
        assert_eq!(config.kusto.default_database.as_deref(), Some("Telemetry"));
        assert_eq!(
            config.kusto.service_uri.as_deref(),
            Some("https://old.kusto.fabric.microsoft.com")
        );
    }

    #[test]
    fn test_missing_settings_name_env_var() {
        let config = Config::default();

        let err = config.sql_target().unwrap_err();
        assert_eq!(err.env, SQL_ENDPOINT_ENV);
        assert!(err.to_string().contains("FABRIC_SQL_ENDPOINT"));

        assert_eq!(config.workspace_id().unwrap_err().env, WORKSPACE_ID_ENV);
        assert_eq!(config.kusto_uri().unwrap_err().env, KUSTO_URI_ENV);
    }

    #[test]
    fn test_known_services_from_env() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (KUSTO_URI_ENV, "https://a.kusto.fabric.microsoft.com/"),
            (KUSTO_DB_ENV, "Telemetry"),
            (
                KNOWN_SERVICES_ENV,
                r#"[{"service_uri": "https://A.kusto.fabric.microsoft.com"},
                    {"service_uri": "https://help.kusto.windows.net/", "default_database": "Samples", "description": "Public samples"}]"#,
            ),
        ]));

        let services = config.kusto_services();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service_uri, "https://a.kusto.fabric.microsoft.com");
        assert_eq!(services[0].default_database.as_deref(), Some("Telemetry"));
        assert_eq!(services[1].service_uri, "https://help.kusto.windows.net");
        assert_eq!(services[1].description.as_deref(), Some("Public samples"));
    }

    #[test]
    fn test_invalid_known_services_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(KNOWN_SERVICES_ENV, "not json")]));
        assert!(config.kusto.known_services.is_empty());
        assert!(config.kusto_services().is_empty());
    }

    #[test]
    fn test_sql_target_needs_database() {
        let mut config = Config::default();
        config.apply_env(env(&[(SQL_ENDPOINT_ENV, "x.datawarehouse.fabric.microsoft.com")]));
        assert_eq!(config.sql_target().unwrap_err().env, LAKEHOUSE_NAME_ENV);
    }

    #[test]
    fn test_sql_target_endpoint_forms() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (SQL_ENDPOINT_ENV, "tcp:abc.datawarehouse.fabric.microsoft.com,1444"),
            (LAKEHOUSE_NAME_ENV, "Sales"),
        ]));

        let target = config.sql_target().unwrap();
        assert_eq!(
            target,
            SqlTarget {
                host: "abc.datawarehouse.fabric.microsoft.com".into(),
                port: 1444,
                database: "Sales".into(),
            }
        );
    }

    #[test]
    fn test_parse_sql_endpoint() {
        assert_eq!(parse_sql_endpoint("host"), ("host".into(), None));
        assert_eq!(parse_sql_endpoint("host,1433"), ("host".into(), Some(1433)));
        assert_eq!(parse_sql_endpoint(" tcp:host , 99 "), ("host".into(), Some(99)));
        assert_eq!(parse_sql_endpoint("host,abc"), ("host,abc".into(), None));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [semantic_model]
            workspace_id = "0000-1111"

            [auth]
            tenant_id = "contoso.onmicrosoft.com"
            "#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.workspace_id().unwrap(), "0000-1111");
        assert_eq!(config.auth_options().tenant_id.as_deref(), Some("contoso.onmicrosoft.com"));
        assert_eq!(config.kusto.timeout_secs, 60);
        assert_eq!(config.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_load_at_records_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let config = Config::load_at(Some(path.clone())).unwrap();
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_kusto_services_normalise_uris() {
        let mut config = Config::default();
        config.kusto.service_uri = Some("https://help.kusto.windows.net:443".into());
        config.kusto.default_database = Some("Samples".into());
        config.kusto.known_services = vec![KnownService {
            service_uri: "https://HELP.kusto.windows.net/".into(),
            default_database: Some("Other".into()),
            description: None,
        }];

        let services = config.kusto_services();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].service_uri, "https://help.kusto.windows.net");
        assert_eq!(services[0].default_database.as_deref(), Some("Samples"));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[lakehouse\nport = ").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
