//! `fabric-mcp doctor`: configuration and sign-in checks
//!
//! Covers the usual reasons an editor shows no tools or empty results:
//! missing settings, no Azure sign-in, or a token that cannot be issued for
//! one of the services.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use fabric_common::auth::{kusto_scope, TokenCredential, POWERBI_SCOPE, SQL_SCOPE};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Ok => "ok",
            Status::Warn => "warn",
            Status::Fail => "fail",
        };
        write!(f, "{:<4}", label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub status: Status,
    pub detail: String,
}

impl Check {
    fn new(name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Result of all checks
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub checks: Vec<Check>,
}

impl Report {
    /// False if any check failed; warnings do not count
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != Status::Fail)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.checks.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for check in &self.checks {
            writeln!(f, "[{}] {:<width$}  {}", check.status, check.name, check.detail, width = width)?;
        }
        Ok(())
    }
}

/// Checks that need no network access
pub fn config_checks(config: &Config, config_path: Option<&Path>) -> Vec<Check> {
    let mut checks = vec![Check::new(
        "version",
        Status::Ok,
        format!("fabric-mcp {}", env!("CARGO_PKG_VERSION")),
    )];

    checks.push(match config_path {
        Some(path) if path.exists() => Check::new("config file", Status::Ok, path.display().to_string()),
        Some(path) => Check::new(
            "config file",
            Status::Warn,
            format!("{} not found, using environment variables only", path.display()),
        ),
        None => Check::new("config file", Status::Warn, "no config file located, using environment variables only"),
    });

    checks.push(match config.sql_target() {
        Ok(t) => Check::new("lakehouse", Status::Ok, format!("{}:{} database {}", t.host, t.port, t.database)),
        Err(missing) => Check::new("lakehouse", Status::Warn, format!("disabled: set {}", missing.env)),
    });

    checks.push(match (config.workspace_id(), config.lakehouse_name()) {
        (Ok(ws), Ok(name)) => Check::new("semantic model", Status::Ok, format!("workspace {} lakehouse {}", ws, name)),
        (Err(missing), _) | (_, Err(missing)) => {
            Check::new("semantic model", Status::Warn, format!("disabled: set {}", missing.env))
        }
    });

    checks.push(match config.kusto_uri() {
        Ok(uri) => {
            let db = config.kusto.default_database.as_deref().unwrap_or("(none)");
            Check::new("eventhouse", Status::Ok, format!("{} default database {}", uri, db))
        }
        Err(missing) => Check::new("eventhouse", Status::Warn, format!("disabled: set {}", missing.env)),
    });

    let any_backend = config.sql_target().is_ok() || config.workspace_id().is_ok() || config.kusto_uri().is_ok();
    if !any_backend {
        checks.push(Check::new(
            "backends",
            Status::Fail,
            "nothing configured - the server would start with every tool disabled",
        ));
    }

    checks
}

/// Token scopes needed by the configured backends, with a label for each
pub fn required_scopes(config: &Config) -> Vec<(&'static str, String)> {
    let mut scopes = Vec::new();
    if config.sql_target().is_ok() {
        scopes.push(("token: sql", SQL_SCOPE.to_string()));
    }
    if config.workspace_id().is_ok() {
        scopes.push(("token: power bi", POWERBI_SCOPE.to_string()));
    }
    if let Ok(uri) = config.kusto_uri() {
        let scope = config.kusto.scope.clone().unwrap_or_else(|| kusto_scope(uri));
        scopes.push(("token: kusto", scope));
    }
    scopes
}

/// Try to acquire a token for every required scope
pub async fn token_checks(config: &Config, credential: &dyn TokenCredential) -> Vec<Check> {
    let mut checks = Vec::new();

    for (label, scope) in required_scopes(config) {
        let check = match credential.get_token(&scope).await {
            Ok(token) => Check::new(
                label,
                Status::Ok,
                format!(
                    "{} via {}, expires {}",
                    scope,
                    token.source().unwrap_or(credential.name()),
                    token.expires_at().format("%Y-%m-%d %H:%M UTC")
                ),
            ),
            Err(e) => Check::new(label, Status::Fail, format!("{}: {}", scope, e)),
        };
        checks.push(check);
    }

    checks
}

/// Run every check
pub async fn run(config: &Config, credential: &dyn TokenCredential) -> Report {
    let mut checks = config_checks(config, config.source.as_deref());
    checks.extend(token_checks(config, credential).await);
    Report { checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fabric_common::auth::{AccessToken, AuthError, ChainedCredential, StaticTokenCredential};

    struct NotLoggedIn;

    #[async_trait]
    impl TokenCredential for NotLoggedIn {
        fn name(&self) -> &str {
            "azure-cli"
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
            Err(AuthError::NotLoggedIn("AADSTS70043".into()))
        }
    }

    fn kusto_only() -> Config {
        let mut config = Config::default();
        config.kusto.service_uri = Some("https://trd-x.z0.kusto.fabric.microsoft.com".into());
        config
    }

    fn status_of<'a>(checks: &'a [Check], name: &str) -> &'a Check {
        checks.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_nothing_configured_fails() {
        let checks = config_checks(&Config::default(), None);
        assert_eq!(status_of(&checks, "backends").status, Status::Fail);
        assert_eq!(status_of(&checks, "lakehouse").status, Status::Warn);
        assert!(status_of(&checks, "lakehouse").detail.contains("FABRIC_SQL_ENDPOINT"));
        assert!(!Report { checks }.passed());
    }

    #[test]
    fn test_missing_config_file_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let checks = config_checks(&kusto_only(), Some(&path));
        assert_eq!(status_of(&checks, "config file").status, Status::Warn);
        assert_eq!(status_of(&checks, "eventhouse").status, Status::Ok);
        assert!(Report { checks }.passed());
    }

    #[test]
    fn test_required_scopes() {
        let scopes = required_scopes(&kusto_only());
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].1, "https://trd-x.z0.kusto.fabric.microsoft.com/.default");
    }

    #[tokio::test]
    async fn test_token_checks() {
        let ok = token_checks(&kusto_only(), &StaticTokenCredential::new("t")).await;
        assert_eq!(ok[0].status, Status::Ok);
        assert!(ok[0].detail.contains("static-token"));

        let failed = token_checks(&kusto_only(), &NotLoggedIn).await;
        assert_eq!(failed[0].status, Status::Fail);
        assert!(failed[0].detail.contains("az login"));
    }

    #[tokio::test]
    async fn test_token_check_names_issuing_source() {
        let chain = ChainedCredential::new(vec![
            Box::new(NotLoggedIn),
            Box::new(StaticTokenCredential::new("t")),
        ]);

        let checks = token_checks(&kusto_only(), &chain).await;
        assert_eq!(checks[0].status, Status::Ok);
        assert!(checks[0].detail.contains("via static-token,"));
        assert!(!checks[0].detail.contains("chain("));
    }

    #[tokio::test]
    async fn test_run_reports_loaded_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "# fabric-mcp settings\n").unwrap();

        let config = Config::load_at(Some(path.clone())).unwrap();
        let report = run(&config, &StaticTokenCredential::new("t")).await;

        let check = status_of(&report.checks, "config file");
        assert_eq!(check.status, Status::Ok);
        assert_eq!(check.detail, path.display().to_string());
    }

    #[test]
    fn test_render() {
        let report = Report {
            checks: vec![
                Check::new("version", Status::Ok, "fabric-mcp 0.1.0"),
                Check::new("eventhouse", Status::Warn, "disabled"),
            ],
        };
        let text = report.to_string();
        assert!(text.contains("[ok  ] version     fabric-mcp 0.1.0"));
        assert!(text.contains("[warn] eventhouse  disabled"));
    }
}
