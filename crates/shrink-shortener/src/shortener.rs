use crate::error::Result;
use async_trait::async_trait;
use shrink_core::UrlRecord;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Returns the record for `original_url`, creating one on first use.
    async fn encode(&self, original_url: &str) -> Result<UrlRecord>;

    /// Resolves a short code to its stored record.
    /// Returns `None` if the code does not exist.
    async fn decode(&self, short_code: &str) -> Result<Option<UrlRecord>>;

    /// Checks that the mapping store is reachable.
    async fn ping(&self) -> Result<()>;
}
