//! Per-scope token cache

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{AccessToken, AuthError, TokenCredential};

/// One scope's token; its lock is held while that scope refreshes
type Slot = Arc<Mutex<Option<AccessToken>>>;

/// Wraps a credential and reuses tokens until they are close to expiry
///
/// Each scope refreshes under its own lock: concurrent callers for one
/// scope share a single refresh, and other scopes are never blocked by it.
pub struct CachingCredential<C> {
    inner: C,
    refresh_margin: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl<C: TokenCredential> CachingCredential<C> {
    /// Cache with the default five minute refresh margin
    pub fn new(inner: C) -> Self {
        Self::with_margin(inner, Duration::minutes(5))
    }

    pub fn with_margin(inner: C, refresh_margin: Duration) -> Self {
        Self {
            inner,
            refresh_margin,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached token
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    fn fresh(&self, token: &AccessToken) -> bool {
        !token.expires_within(self.refresh_margin)
    }

    async fn slot(&self, scope: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(scope) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(scope.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl<C: TokenCredential> TokenCredential for CachingCredential<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let slot = self.slot(scope).await;
        let mut cached = slot.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| self.fresh(t)) {
            return Ok(token.clone());
        }

        debug!(scope, "acquiring new token");
        let token = self.inner.get_token(scope).await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    struct Counting {
        calls: Arc<AtomicUsize>,
        lifetime: Duration,
    }

    #[async_trait]
    impl TokenCredential for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new(format!("{scope}#{n}"), Utc::now() + self.lifetime))
        }
    }

    fn counting(lifetime: Duration) -> (CachingCredential<Counting>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cred = CachingCredential::new(Counting {
            calls: calls.clone(),
            lifetime,
        });
        (cred, calls)
    }

    #[tokio::test]
    async fn test_reuses_fresh_token() {
        let (cred, calls) = counting(Duration::hours(1));

        let a = cred.get_token("scope-a").await.unwrap();
        let b = cred.get_token("scope-a").await.unwrap();

        assert_eq!(a.secret(), b.secret());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scopes_cached_separately() {
        let (cred, calls) = counting(Duration::hours(1));

        cred.get_token("scope-a").await.unwrap();
        cred.get_token("scope-b").await.unwrap();
        cred.get_token("scope-a").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refreshes_near_expiry() {
        // Tokens that live less than the margin are never reused
        let (cred, calls) = counting(Duration::minutes(1));

        cred.get_token("scope-a").await.unwrap();
        cred.get_token("scope-a").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl TokenCredential for Gated {
        fn name(&self) -> &str {
            "gated"
        }

        async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
            if scope == "slow" {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(AccessToken::new(scope, Utc::now() + Duration::hours(1)))
        }
    }

    #[tokio::test]
    async fn test_slow_refresh_does_not_block_other_scopes() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let cred = Arc::new(CachingCredential::new(Gated {
            entered: entered.clone(),
            release: release.clone(),
        }));

        let slow = tokio::spawn({
            let cred = cred.clone();
            async move { cred.get_token("slow").await }
        });
        entered.notified().await;

        let fast = tokio::time::timeout(std::time::Duration::from_secs(5), cred.get_token("fast"))
            .await
            .expect("other scope blocked by a slow refresh")
            .unwrap();
        assert_eq!(fast.secret(), "fast");

        release.notify_one();
        assert_eq!(slow.await.unwrap().unwrap().secret(), "slow");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let (cred, calls) = counting(Duration::hours(1));

        let (a, b) = tokio::join!(cred.get_token("scope-a"), cred.get_token("scope-a"));
        assert_eq!(a.unwrap().secret(), b.unwrap().secret());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (cred, calls) = counting(Duration::hours(1));

        cred.get_token("scope-a").await.unwrap();
        cred.clear().await;
        cred.get_token("scope-a").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
