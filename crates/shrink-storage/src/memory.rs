use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use shrink_core::repository::{ConflictKey, InsertOutcome, Repository, Result, UrlRecord};
use shrink_core::ShortCode;

/// In-memory implementation of the Repository trait using DashMap.
///
/// Records are indexed by short code, with a second index from original URL
/// to code. Reads go straight to the sharded maps. Inserts take a
/// store-wide write lock so that checking both keys and claiming them is a
/// single step.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    by_code: DashMap<String, UrlRecord>,
    by_url: DashMap<String, ShortCode>,
    write_lock: Mutex<()>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_code: DashMap::with_capacity(capacity),
            by_url: DashMap::with_capacity(capacity),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let Some(code) = self.by_url.get(original_url).map(|entry| entry.clone()) else {
            return Ok(None);
        };

        Ok(self.by_code.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.by_code.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn try_insert(&self, record: UrlRecord) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock();

        if self.by_url.contains_key(&record.original_url) {
            return Ok(InsertOutcome::Conflict(ConflictKey::OriginalUrl));
        }
        if self.by_code.contains_key(record.short_code.as_str()) {
            return Ok(InsertOutcome::Conflict(ConflictKey::ShortCode));
        }

        // The code index is written first so a reader that finds the URL
        // can always follow it to the record.
        let url = record.original_url.clone();
        let code = record.short_code.clone();
        self.by_code.insert(code.as_str().to_owned(), record);
        self.by_url.insert(url, code);

        Ok(InsertOutcome::Inserted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(url: &str, short_code: &str) -> UrlRecord {
        UrlRecord::new(url, code(short_code))
    }

    #[tokio::test]
    async fn insert_and_find_by_both_keys() {
        let repo = InMemoryRepository::new();
        let rec = record("https://example.com", "abc123");

        let outcome = repo.try_insert(rec.clone()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let by_code = repo.find_by_code(&code("abc123")).await.unwrap().unwrap();
        let by_url = repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(by_code, rec);
        assert_eq!(by_url, rec);
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let repo = InMemoryRepository::new();

        assert!(repo.find_by_code(&code("nope00")).await.unwrap().is_none());
        assert!(repo
            .find_by_original_url("https://nope.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let repo = InMemoryRepository::new();
        repo.try_insert(record("https://one.example", "abc123"))
            .await
            .unwrap();

        let outcome = repo
            .try_insert(record("https://two.example", "abc123"))
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Conflict(ConflictKey::ShortCode));
        let stored = repo.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(stored.original_url, "https://one.example");
        assert!(repo
            .find_by_original_url("https://two.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_url_conflicts() {
        let repo = InMemoryRepository::new();
        repo.try_insert(record("https://example.com", "abc123"))
            .await
            .unwrap();

        let outcome = repo
            .try_insert(record("https://example.com", "xyz789"))
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Conflict(ConflictKey::OriginalUrl));
        assert!(repo.find_by_code(&code("xyz789")).await.unwrap().is_none());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn urls_are_matched_byte_for_byte() {
        let repo = InMemoryRepository::new();
        repo.try_insert(record("https://example.com", "abc123"))
            .await
            .unwrap();

        let outcome = repo
            .try_insert(record("https://example.com/", "xyz789"))
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_url_admit_exactly_one() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..32u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.try_insert(record("https://race.example", &format!("code{:04}", i)))
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_access() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let r = record(&format!("https://example{}.com", i), &format!("code{:03}", i));
                repo.try_insert(r).await.unwrap();
            }));
        }

        for i in 0..10u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let _ = repo.find_by_code(&code(&format!("code{:03}", i))).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let result = repo
                .find_by_code(&code(&format!("code{:03}", i)))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(result.original_url, format!("https://example{}.com", i));
        }
    }
}
