//! Service principal (client credentials) flow

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{AccessToken, AuthError, AuthOptions, TokenCredential};

/// Service principal credential using the OAuth2 client-credentials grant
pub struct ClientSecretCredential {
    client: Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Seconds,
}

// AAD v2 returns a number; older endpoints and some proxies return a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(i64),
    Text(String),
}

impl Seconds {
    fn as_secs(&self) -> Result<i64, AuthError> {
        match self {
            Seconds::Number(n) => Ok(*n),
            Seconds::Text(s) => s
                .parse()
                .map_err(|_| AuthError::InvalidResponse(format!("expires_in '{}' is not a number", s))),
        }
    }
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`
    ///
    /// A tenant in `options` wins over `AZURE_TENANT_ID`.
    pub fn from_env(options: &AuthOptions) -> Result<Self, AuthError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AuthError::NotConfigured(format!("{} not set", name)))
        };

        let tenant_id = match &options.tenant_id {
            Some(t) => t.clone(),
            None => var("AZURE_TENANT_ID")?,
        };

        Ok(Self::new(
            options.authority_host.clone(),
            tenant_id,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
        ))
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &str {
        "client-secret"
    }

    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        debug!("requesting token from {}", self.token_url());

        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
                ("grant_type", "client_credentials"),
            ])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequest { status, body });
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let expires_at = Utc::now() + Duration::seconds(parsed.expires_in.as_secs()?);
        Ok(AccessToken::new(parsed.access_token, expires_at))
    }
}
