//! Editor configuration snippets
//!
//! Renders the block an editor needs to launch this server, filled in from
//! the current configuration so it can be pasted as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::config::{
    Config, KUSTO_DB_ENV, KUSTO_URI_ENV, LAKEHOUSE_NAME_ENV, SQL_ENDPOINT_ENV, TENANT_ID_ENV,
    WORKSPACE_ID_ENV,
};

/// Default server id in the generated block
pub const DEFAULT_SERVER_NAME: &str = "fabric-mcp";

/// Settings file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// `.vscode/mcp.json`: `{"servers": {...}}` with `"type": "stdio"`
    #[default]
    Vscode,
    /// Claude Desktop / Claude-style `{"mcpServers": {...}}`
    Claude,
}

impl Flavor {
    fn root_key(self) -> &'static str {
        match self {
            Flavor::Vscode => "servers",
            Flavor::Claude => "mcpServers",
        }
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vscode" | "code" => Ok(Flavor::Vscode),
            "claude" => Ok(Flavor::Claude),
            other => Err(format!("unknown flavor '{}' (expected vscode or claude)", other)),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Vscode => write!(f, "vscode"),
            Flavor::Claude => write!(f, "claude"),
        }
    }
}

/// Env vars carried into the snippet, if set
///
/// Credentials (`AZURE_CLIENT_SECRET`, `FABRIC_ACCESS_TOKEN`) are never
/// copied into a settings file.
fn snippet_env(config: &Config) -> BTreeMap<&'static str, String> {
    let candidates = [
        (SQL_ENDPOINT_ENV, config.lakehouse.sql_endpoint.as_deref()),
        (LAKEHOUSE_NAME_ENV, config.lakehouse.database.as_deref()),
        (WORKSPACE_ID_ENV, config.semantic_model.workspace_id.as_deref()),
        (KUSTO_URI_ENV, config.kusto.service_uri.as_deref()),
        (KUSTO_DB_ENV, config.kusto.default_database.as_deref()),
        (TENANT_ID_ENV, config.auth.tenant_id.as_deref()),
    ];

    candidates
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| (key, value.to_string()))
        })
        .collect()
}

/// Build the settings block for `config`
pub fn render(config: &Config, name: &str, flavor: Flavor, command: &str) -> Value {
    let mut server = json!({
        "command": command,
        "args": ["serve"],
        "env": snippet_env(config),
    });

    if flavor == Flavor::Vscode {
        server["type"] = json!("stdio");
    }

    json!({ flavor.root_key(): { name: server } })
}

/// Path of the running binary, falling back to the bare command name
pub fn current_command() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string())
}
