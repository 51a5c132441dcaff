//! Azure AD credentials for Fabric resources
//!
//! Every Fabric surface (SQL endpoint, Power BI REST, Kusto) accepts an
//! Azure AD bearer token for its own scope. [`TokenCredential`] is the seam;
//! [`default_chain`] builds the credential servers use when nothing more
//! specific is configured:
//!
//! 1. `FABRIC_ACCESS_TOKEN` (a pre-issued token, mostly for CI)
//! 2. `AZURE_TENANT_ID` + `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET` (service principal)
//! 3. The Azure CLI login (`az login`)
//!
//! The chain is wrapped in [`CachingCredential`] so each scope hits the
//! identity provider once per token lifetime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub mod azure_cli;
pub mod cache;
pub mod chain;
pub mod client_secret;
pub mod static_token;

pub use azure_cli::AzureCliCredential;
pub use cache::CachingCredential;
pub use chain::ChainedCredential;
pub use client_secret::ClientSecretCredential;
pub use static_token::StaticTokenCredential;

/// Scope for the Fabric / Azure SQL TDS endpoint
pub const SQL_SCOPE: &str = "https://database.windows.net/.default";

/// Scope for the Power BI / Fabric REST API
pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Default Azure AD authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Build the Kusto scope for a cluster URI (`https://x.kusto.fabric.microsoft.com` → `.../.default`)
pub fn kusto_scope(service_uri: &str) -> String {
    format!("{}/.default", service_uri.trim_end_matches('/'))
}

/// Errors raised while acquiring tokens
#[derive(Error, Debug)]
pub enum AuthError {
    /// A credential source is missing required settings
    #[error("credential not configured: {0}")]
    NotConfigured(String),

    /// `az` is not on PATH
    #[error("Azure CLI not found - install the Azure CLI and run 'az login'")]
    CliNotFound,

    /// `az` is installed but has no usable login
    #[error("Azure CLI is not logged in - run 'az login' ({0})")]
    NotLoggedIn(String),

    /// `az` exited with a failure we do not recognise
    #[error("Azure CLI failed (exit code {code}): {stderr}")]
    CliFailed {
        /// Exit code from the az process
        code: i32,
        /// Standard error output from az
        stderr: String,
    },

    /// The token endpoint answered with a non-success status
    #[error("token request failed with status {status}: {body}")]
    TokenRequest {
        /// HTTP status code
        status: u16,
        /// Response body, usually an AADSTS error
        body: String,
    },

    /// Transport failure talking to the token endpoint
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A token response could not be understood
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// Spawning a process failed for a reason other than NotFound
    #[error("failed to spawn credential process: {0}")]
    Io(#[from] std::io::Error),

    /// Every credential in a chain failed
    #[error("no credential could provide a token: {}", .0.join("; "))]
    Unavailable(Vec<String>),
}

/// An Azure AD access token
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
    source: Option<String>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
            source: None,
        }
    }

    /// Record the credential that issued the token, unless one is already set
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        if self.source.is_none() {
            self.source = Some(source.into());
        }
        self
    }

    /// Name of the credential that issued the token, when a chain recorded it
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The raw bearer token
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if the token is expired or will expire within `margin`
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at - margin <= Utc::now()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("source", &self.source)
            .finish()
    }
}

/// Source of Azure AD access tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Acquire a token for `scope`
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

/// Settings shared by credentials that talk to Azure AD
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Authority host, e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
    /// Tenant to request tokens from (service principal and `az --tenant`)
    pub tenant_id: Option<String>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id: None,
        }
    }
}

/// Build the default credential chain, cached per scope
///
/// Sources that are not configured in the environment are left out, so the
/// chain always ends with the Azure CLI.
pub fn default_chain(options: &AuthOptions) -> Arc<dyn TokenCredential> {
    let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();

    if let Some(static_token) = StaticTokenCredential::from_env() {
        sources.push(Box::new(static_token));
    }

    match ClientSecretCredential::from_env(options) {
        Ok(sp) => sources.push(Box::new(sp)),
        Err(e) => tracing::debug!("Service principal credential skipped: {}", e),
    }

    sources.push(Box::new(AzureCliCredential::new(options.tenant_id.clone())));

    Arc::new(CachingCredential::new(ChainedCredential::new(sources)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kusto_scope_trims_slash() {
        assert_eq!(
            kusto_scope("https://trd-abc.z1.kusto.fabric.microsoft.com/"),
            "https://trd-abc.z1.kusto.fabric.microsoft.com/.default"
        );
    }

    #[test]
    fn test_expires_within() {
        let soon = AccessToken::new("t", Utc::now() + Duration::minutes(2));
        assert!(soon.expires_within(Duration::minutes(5)));
        assert!(!soon.expires_within(Duration::seconds(10)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let token = AccessToken::new("super-secret", Utc::now());
        let printed = format!("{:?}", token);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_unavailable_lists_failures() {
        let err = AuthError::Unavailable(vec!["a: nope".into(), "b: also nope".into()]);
        assert_eq!(
            err.to_string(),
            "no credential could provide a token: a: nope; b: also nope"
        );
    }
}
