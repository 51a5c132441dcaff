//! Pre-issued token credential

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{AccessToken, AuthError, TokenCredential};

/// Environment variable holding a pre-issued bearer token
pub const ACCESS_TOKEN_ENV: &str = "FABRIC_ACCESS_TOKEN";

/// Returns the same token for every scope
///
/// Useful in CI or when a token was obtained out of band. The caller is
/// responsible for handing in a token whose audience matches the resource.
pub struct StaticTokenCredential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// Build from `FABRIC_ACCESS_TOKEN`, if set and non-empty
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Self::new(t.trim()))
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &str {
        "static-token"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new(self.token.clone(), self.expires_at))
    }
}
