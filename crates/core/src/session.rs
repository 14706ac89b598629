//! Mutex-guarded, lazily refreshed session state.
//!
//! Authenticated handlers share one session per platform across every
//! pipeline invocation. Checking expiry and refreshing happen under the same
//! lock, so concurrent callers that find the session stale wait for a single
//! refresh instead of each logging in on their own.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;

/// Session values that know when they stop being usable.
pub trait Expiring {
    fn is_expired(&self, now: DateTime<Utc>) -> bool;
}

/// Holds at most one session and refreshes it on demand.
#[derive(Debug)]
pub struct SessionCell<S> {
    slot: Mutex<Option<S>>,
    refreshes: AtomicUsize,
}

impl<S> Default for SessionCell<S> {
    fn default() -> Self {
        Self { slot: Mutex::new(None), refreshes: AtomicUsize::new(0) }
    }
}

impl<S> SessionCell<S>
where
    S: Clone + Expiring + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current session, running `refresh` first if there is none
    /// or it has expired. A failed refresh leaves the cell empty.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<S>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(session) = slot.as_ref()
            && !session.is_expired(Utc::now())
        {
            return Ok(session.clone());
        }

        debug!("refreshing session");
        *slot = None;
        let session = refresh().await?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        *slot = Some(session.clone());
        Ok(session)
    }

    /// Drops the current session if `is_stale` holds for it, so the next
    /// caller logs in again. A session another caller has already replaced
    /// is left alone. Returns whether the slot was cleared.
    pub async fn invalidate_if(&self, is_stale: impl FnOnce(&S) -> bool) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(is_stale) {
            *slot = None;
            return true;
        }
        false
    }

    /// Number of successful refreshes so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlimpseError;
    use chrono::Duration;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestSession {
        token: String,
        expires_at: DateTime<Utc>,
    }

    impl Expiring for TestSession {
        fn is_expired(&self, now: DateTime<Utc>) -> bool {
            now >= self.expires_at
        }
    }

    fn fresh(token: &str) -> TestSession {
        TestSession { token: token.to_string(), expires_at: Utc::now() + Duration::minutes(5) }
    }

    #[tokio::test]
    async fn test_refreshes_once_then_reuses() {
        let cell = SessionCell::new();
        let first = cell.get_or_refresh(|| async { Ok(fresh("a")) }).await.unwrap();
        let second = cell.get_or_refresh(|| async { Ok(fresh("b")) }).await.unwrap();

        assert_eq!(first.token, "a");
        assert_eq!(second.token, "a");
        assert_eq!(cell.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let cell = SessionCell::new();
        cell.get_or_refresh(|| async {
            Ok(TestSession { token: "old".into(), expires_at: Utc::now() - Duration::seconds(1) })
        })
        .await
        .unwrap();

        let session = cell.get_or_refresh(|| async { Ok(fresh("new")) }).await.unwrap();
        assert_eq!(session.token, "new");
        assert_eq!(cell.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cell_empty() {
        let cell: SessionCell<TestSession> = SessionCell::new();
        let result = cell.get_or_refresh(|| async { Err(GlimpseError::Auth("bad password".into())) }).await;
        assert!(matches!(result, Err(GlimpseError::Auth(_))));
        assert_eq!(cell.refresh_count(), 0);

        let session = cell.get_or_refresh(|| async { Ok(fresh("retry")) }).await.unwrap();
        assert_eq!(session.token, "retry");
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cell = SessionCell::new();
        cell.get_or_refresh(|| async { Ok(fresh("a")) }).await.unwrap();
        assert!(cell.invalidate_if(|current| current.token == "a").await);
        let session = cell.get_or_refresh(|| async { Ok(fresh("b")) }).await.unwrap();
        assert_eq!(session.token, "b");
    }

    #[tokio::test]
    async fn test_invalidate_keeps_a_newer_session() {
        let cell = SessionCell::new();
        let rejected = cell
            .get_or_refresh(|| async {
                Ok(TestSession { token: "old".into(), expires_at: Utc::now() - Duration::seconds(1) })
            })
            .await
            .unwrap();
        // Another caller refreshes before the rejection is reported.
        cell.get_or_refresh(|| async { Ok(fresh("new")) }).await.unwrap();

        assert!(!cell.invalidate_if(|current| current.token == rejected.token).await);
        let session = cell.get_or_refresh(|| async { Ok(fresh("third")) }).await.unwrap();
        assert_eq!(session.token, "new");
        assert_eq!(cell.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_empty_cell() {
        let cell: SessionCell<TestSession> = SessionCell::new();
        assert!(!cell.invalidate_if(|_| true).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let cell = Arc::new(SessionCell::new());
        let logins = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let logins = Arc::clone(&logins);
                tokio::spawn(async move {
                    cell.get_or_refresh(|| async move {
                        logins.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                        Ok(fresh("shared"))
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().token, "shared");
        }
        assert_eq!(logins.load(Ordering::SeqCst), 1);
        assert_eq!(cell.refresh_count(), 1);
    }
}
