use async_trait::async_trait;
use shrink_core::error::StorageError;
use shrink_core::repository::{InsertOutcome, Repository, Result, UrlRecord};
use shrink_core::ShortCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A repository decorator that bounds every call with a deadline.
///
/// A store call that outlives the deadline is abandoned and reported as
/// [`StorageError::Timeout`], which callers treat as retryable. An abandoned
/// insert may still complete on the backend; the next encode of the same URL
/// then finds it and stays idempotent.
#[derive(Debug, Clone)]
pub struct TimeoutRepository<R> {
    inner: R,
    timeout: Duration,
}

impl<R: Repository> TimeoutRepository<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn bounded<T: Send>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "storage call timed out");
                Err(StorageError::Timeout(format!(
                    "{operation} did not complete within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl<R: Repository> Repository for TimeoutRepository<R> {
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        self.bounded(
            "find_by_original_url",
            self.inner.find_by_original_url(original_url),
        )
        .await
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        self.bounded("find_by_code", self.inner.find_by_code(code)).await
    }

    async fn try_insert(&self, record: UrlRecord) -> Result<InsertOutcome> {
        self.bounded("try_insert", self.inner.try_insert(record)).await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("ping", self.inner.ping()).await
    }
}
