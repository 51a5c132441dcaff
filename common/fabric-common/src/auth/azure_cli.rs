//! Azure CLI credential
//!
//! Shells out to `az account get-access-token`, which reuses whatever
//! `az login` session the user already has.

use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use super::{AccessToken, AuthError, TokenCredential};

#[cfg(windows)]
const AZ_PROGRAM: &str = "az.cmd";
#[cfg(not(windows))]
const AZ_PROGRAM: &str = "az";

/// Token credential backed by the Azure CLI login
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2026-10-19 14:03:11.000000`
    expires_on: Option<String>,
    /// Unix seconds; newer az versions emit this alongside `expiresOn`
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl AzureCliCredential {
    pub fn new(tenant_id: Option<String>) -> Self {
        Self { tenant_id }
    }

    fn args<'a>(&'a self, scope: &'a str) -> Vec<&'a str> {
        let mut args = vec!["account", "get-access-token", "--scope", scope, "--output", "json"];
        if let Some(tenant) = &self.tenant_id {
            args.push("--tenant");
            args.push(tenant);
        }
        args
    }
}

/// Parse the JSON printed by `az account get-access-token`
pub fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, AuthError> {
    let raw: CliToken = serde_json::from_slice(stdout)
        .map_err(|e| AuthError::InvalidResponse(format!("az output: {}", e)))?;

    let expires_at = match (raw.expires_on_epoch, raw.expires_on.as_deref()) {
        (Some(epoch), _) => DateTime::<Utc>::from_timestamp(epoch, 0)
            .ok_or_else(|| AuthError::InvalidResponse(format!("expires_on {} out of range", epoch)))?,
        (None, Some(local)) => parse_local_expiry(local)?,
        (None, None) => {
            return Err(AuthError::InvalidResponse(
                "az output has no expiry".to_string(),
            ))
        }
    };

    Ok(AccessToken::new(raw.access_token, expires_at))
}

fn parse_local_expiry(value: &str) -> Result<DateTime<Utc>, AuthError> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| AuthError::InvalidResponse(format!("expiresOn '{}': {}", value, e)))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AuthError::InvalidResponse(format!("expiresOn '{}' is not a valid local time", value)))
}

fn classify_failure(code: i32, stderr: String) -> AuthError {
    if stderr.contains("az login") || stderr.contains("AADSTS") {
        AuthError::NotLoggedIn(stderr.trim().to_string())
    } else {
        AuthError::CliFailed { code, stderr }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &str {
        "azure-cli"
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let args = self.args(scope);
        debug!("executing: {} {}", AZ_PROGRAM, args.join(" "));

        let output = Command::new(AZ_PROGRAM)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AuthError::CliNotFound
                } else {
                    AuthError::Io(e)
                }
            })?
            .wait_with_output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            error!(code, "az account get-access-token failed");
            return Err(classify_failure(code, stderr));
        }

        parse_cli_token(&output.stdout)
    }
}
