//! Ordered fallback across credential sources

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AccessToken, AuthError, TokenCredential};

/// Tries each credential in order and returns the first token obtained
pub struct ChainedCredential {
    sources: Vec<Box<dyn TokenCredential>>,
    label: String,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        let label = format!("chain({})", names.join(", "));
        Self { sources, label }
    }

    /// Names of the sources, in the order they are tried
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    /// `chain(static-token, azure-cli)`
    fn name(&self) -> &str {
        &self.label
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(source = source.name(), scope, "token acquired");
                    return Ok(token.with_source(source.name()));
                }
                Err(e) => {
                    debug!(source = source.name(), error = %e, "credential failed, trying next");
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        warn!(scope, "no credential in the chain produced a token");
        Err(AuthError::Unavailable(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenCredential;

    struct Failing(&'static str);

    #[async_trait]
    impl TokenCredential for Failing {
        fn name(&self) -> &str {
            self.0
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
            Err(AuthError::CliNotFound)
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = ChainedCredential::new(vec![
            Box::new(Failing("broken")),
            Box::new(StaticTokenCredential::new("second")),
            Box::new(StaticTokenCredential::new("third")),
        ]);

        let token = chain.get_token("scope").await.unwrap();
        assert_eq!(token.secret(), "second");
        assert_eq!(token.source(), Some("static-token"));
    }

    #[tokio::test]
    async fn test_nested_chain_keeps_innermost_source() {
        let inner = ChainedCredential::new(vec![
            Box::new(Failing("client-secret")),
            Box::new(Failing("azure-cli")),
            Box::new(StaticTokenCredential::new("t")),
        ]);
        let outer = ChainedCredential::new(vec![Box::new(Failing("broken")), Box::new(inner)]);

        let token = outer.get_token("scope").await.unwrap();
        assert_eq!(token.source(), Some("static-token"));
    }

    #[tokio::test]
    async fn test_all_fail() {
        let chain = ChainedCredential::new(vec![Box::new(Failing("one")), Box::new(Failing("two"))]);

        match chain.get_token("scope").await.unwrap_err() {
            AuthError::Unavailable(failures) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("one: Azure CLI not found"));
                assert!(failures[1].starts_with("two:"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_source_names() {
        let chain = ChainedCredential::new(vec![
            Box::new(StaticTokenCredential::new("x")),
            Box::new(Failing("azure-cli")),
        ]);
        assert_eq!(chain.source_names(), vec!["static-token", "azure-cli"]);
        assert_eq!(chain.name(), "chain(static-token, azure-cli)");
    }
}
