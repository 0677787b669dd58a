use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored mapping between an original URL and its short code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened, kept byte-for-byte.
    pub original_url: String,
    /// The code assigned to the URL.
    pub short_code: ShortCode,
    /// When the mapping was first created.
    pub created_at: Timestamp,
}

impl UrlRecord {
    /// Creates a record stamped with the current time.
    pub fn new(original_url: impl Into<String>, short_code: ShortCode) -> Self {
        Self {
            original_url: original_url.into(),
            short_code,
            created_at: Timestamp::now(),
        }
    }
}

/// Which uniqueness constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKey {
    OriginalUrl,
    ShortCode,
    /// The backend reported a uniqueness violation without naming the key.
    Unknown,
}

/// Result of an optimistic insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict(ConflictKey),
}

/// The durable relation between original URLs and short codes.
///
/// Both `original_url` and `short_code` are unique across the store, and
/// [`Repository::try_insert`] must enforce both atomically: a concurrent
/// insert that already claimed either key yields
/// [`InsertOutcome::Conflict`] rather than an overwrite or a duplicate.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Looks up the record for an exact original URL.
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;

    /// Looks up the record for a short code.
    /// Returns `None` if the code does not exist.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Inserts a new record unless either of its keys is already taken.
    async fn try_insert(&self, record: UrlRecord) -> Result<InsertOutcome>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
