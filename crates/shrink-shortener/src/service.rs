use crate::error::{Result, ShortenerError};
use crate::shortener::Shortener;
use crate::validation::validate_url;
use async_trait::async_trait;
use shrink_core::{InsertOutcome, Repository, ShortCode, UrlRecord};
use shrink_generator::Generator;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// The code assignment engine.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - URL validation
/// - Idempotent encoding (one code per distinct URL, ever)
/// - Collision retry with a bounded number of attempts
///
/// The repository is the only collision detector. Nothing is locked here:
/// a candidate is inserted optimistically and a conflict is resolved by
/// reading the store again.
#[derive(Debug)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    max_attempts: u32,
}

impl<R, G> Clone for ShortenerService<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            max_attempts: self.max_attempts,
        }
    }
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Caps how many candidate codes one encode may try. At least one
    /// attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the record for `original_url`, creating it on first use.
    pub async fn encode(&self, original_url: &str) -> Result<UrlRecord> {
        validate_url(original_url).map_err(ShortenerError::Validation)?;

        if let Some(existing) = self.repository.find_by_original_url(original_url).await? {
            trace!(code = %existing.short_code, "url already encoded");
            return Ok(existing);
        }

        for attempt in 1..=self.max_attempts {
            let code: ShortCode = self.generator.generate().into();
            let candidate = UrlRecord::new(original_url, code);

            match self.repository.try_insert(candidate.clone()).await? {
                InsertOutcome::Inserted => {
                    info!(code = %candidate.short_code, attempt, "encoded new url");
                    return Ok(candidate);
                }
                InsertOutcome::Conflict(key) => {
                    // Either another writer stored this URL since the lookup
                    // above, or the candidate code is taken. Only the store
                    // can tell which, whatever the backend reported.
                    if let Some(winner) =
                        self.repository.find_by_original_url(original_url).await?
                    {
                        debug!(
                            code = %winner.short_code,
                            ?key,
                            "url was encoded concurrently, returning stored code"
                        );
                        return Ok(winner);
                    }
                    debug!(
                        code = %candidate.short_code,
                        attempt,
                        ?key,
                        "short code collision, generating another"
                    );
                }
            }
        }

        error!(
            attempts = self.max_attempts,
            "short code space exhausted: every candidate collided"
        );
        Err(ShortenerError::CapacityExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Looks up a short code. Unknown codes are `Ok(None)`.
    ///
    /// Codes that could never have been issued are answered without a store
    /// round trip.
    pub async fn decode(&self, short_code: &str) -> Result<Option<UrlRecord>> {
        let code = ShortCode::new_unchecked(short_code);
        if !code.is_well_formed() {
            trace!(code = %code, "malformed short code");
            return Ok(None);
        }
        let record = self.repository.find_by_code(&code).await?;
        if record.is_none() {
            trace!(code = %code, "short code not found");
        }
        Ok(record)
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn encode(&self, original_url: &str) -> Result<UrlRecord> {
        ShortenerService::encode(self, original_url).await
    }

    async fn decode(&self, short_code: &str) -> Result<Option<UrlRecord>> {
        ShortenerService::decode(self, short_code).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(self.repository.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::INVALID_FORMAT;
    use shrink_core::repository::Result as StorageResult;
    use shrink_core::{ConflictKey, StorageError};
    use shrink_generator::{RandomGenerator, SeqGenerator};
    use shrink_storage::InMemoryRepository;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_service() -> ShortenerService<InMemoryRepository, RandomGenerator> {
        ShortenerService::new(InMemoryRepository::new(), RandomGenerator::new())
    }

    /// Replays a fixed list of codes, then repeats the last one.
    struct ScriptedGenerator {
        codes: Mutex<VecDeque<&'static str>>,
        last: &'static str,
    }

    impl ScriptedGenerator {
        fn new(codes: &[&'static str]) -> Self {
            Self {
                codes: Mutex::new(codes.iter().copied().collect()),
                last: codes[codes.len() - 1],
            }
        }
    }

    impl Generator for ScriptedGenerator {
        type Output = ShortCode;

        fn generate(&self) -> ShortCode {
            let next = self.codes.lock().unwrap().pop_front().unwrap_or(self.last);
            ShortCode::new_unchecked(next)
        }
    }

    #[tokio::test]
    async fn encode_creates_record_with_six_character_code() {
        let service = test_service();

        let record = service.encode("https://www.new-url.com/path").await.unwrap();

        assert_eq!(record.original_url, "https://www.new-url.com/path");
        assert_eq!(record.short_code.as_str().len(), 6);
        assert!(record.short_code.is_well_formed());
        assert_eq!(service.repository().len(), 1);
    }

    #[tokio::test]
    async fn encode_is_idempotent() {
        let service = test_service();

        let first = service.encode("https://www.existing-url.com").await.unwrap();
        let second = service.encode("https://www.existing-url.com").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.repository().len(), 1);
    }

    #[tokio::test]
    async fn encode_does_not_normalize() {
        let service = test_service();

        let bare = service.encode("https://example.com").await.unwrap();
        let slash = service.encode("https://example.com/").await.unwrap();

        assert_ne!(bare.short_code, slash.short_code);
        assert_eq!(service.repository().len(), 2);
    }

    #[tokio::test]
    async fn encode_rejects_invalid_url_without_writing() {
        let service = test_service();

        let err = service.encode("not-a-url").await.unwrap_err();

        assert!(matches!(err, ShortenerError::Validation(_)));
        assert_eq!(err.details(), [INVALID_FORMAT.to_string()]);
        assert!(service.repository().is_empty());
    }

    #[tokio::test]
    async fn round_trip() {
        let service = test_service();
        let urls = [
            "https://codesubmit.io/library/react",
            "http://example.com/a?b=c",
            "https://example.org/%E2%9C%93",
        ];

        for url in urls {
            let record = service.encode(url).await.unwrap();
            let decoded = service
                .decode(record.short_code.as_str())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(decoded.original_url, url);
        }
    }

    #[tokio::test]
    async fn decode_unknown_code_is_none() {
        let service = test_service();

        assert!(service.decode("unknown-code").await.unwrap().is_none());
        assert!(service.decode("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_codes_never_reach_the_store() {
        let service = ShortenerService::new(BrokenRepository, RandomGenerator::new());

        for code in ["abcdé1", "ab", "abc-123", "abcdefghijk", "短縮コード12"] {
            assert!(service.decode(code).await.unwrap().is_none(), "{code}");
        }
    }

    #[tokio::test]
    async fn collision_regenerates_code() {
        let repo = InMemoryRepository::new();
        repo.try_insert(UrlRecord::new(
            "https://first.example",
            ShortCode::new_unchecked("TAKEN1"),
        ))
        .await
        .unwrap();
        let service =
            ShortenerService::new(repo, ScriptedGenerator::new(&["TAKEN1", "UNIQUE23"]));

        let record = service.encode("http://example2.com").await.unwrap();

        assert_eq!(record.short_code.as_str(), "UNIQUE23");
        assert_eq!(service.repository().len(), 2);
    }

    #[tokio::test]
    async fn exhausting_attempts_is_a_capacity_error() {
        let repo = InMemoryRepository::new();
        repo.try_insert(UrlRecord::new(
            "https://first.example",
            ShortCode::new_unchecked("TAKEN1"),
        ))
        .await
        .unwrap();
        let service = ShortenerService::new(repo, ScriptedGenerator::new(&["TAKEN1"]))
            .with_max_attempts(4);

        let err = service.encode("https://second.example").await.unwrap_err();

        assert!(matches!(
            err,
            ShortenerError::CapacityExhausted { attempts: 4 }
        ));
        assert_eq!(service.repository().len(), 1);
    }

    #[tokio::test]
    async fn max_attempts_is_at_least_one() {
        let service = test_service().with_max_attempts(0);
        assert_eq!(service.max_attempts(), 1);
        assert!(service.encode("https://example.com").await.is_ok());
    }

    /// Hides the first `stale_reads` URL lookups, as if another writer
    /// committed between this request's read and its insert.
    struct StaleReadRepository {
        inner: InMemoryRepository,
        stale_reads: AtomicUsize,
        racer: Mutex<Option<UrlRecord>>,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl Repository for StaleReadRepository {
        async fn find_by_original_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
            if self.stale_reads.load(Ordering::SeqCst) > 0 {
                self.stale_reads.fetch_sub(1, Ordering::SeqCst);
                let racer = self.racer.lock().unwrap().take();
                if let Some(racer) = racer {
                    self.inner.try_insert(racer).await?;
                }
                return Ok(None);
            }
            self.inner.find_by_original_url(url).await
        }

        async fn find_by_code(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
            self.inner.find_by_code(code).await
        }

        async fn try_insert(&self, record: UrlRecord) -> StorageResult<InsertOutcome> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.try_insert(record).await
        }

        async fn ping(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn losing_a_url_race_returns_the_winner_without_retrying() {
        let winner = UrlRecord::new("https://race.example", ShortCode::new_unchecked("WINNER"));
        let repo = StaleReadRepository {
            inner: InMemoryRepository::new(),
            stale_reads: AtomicUsize::new(1),
            racer: Mutex::new(Some(winner.clone())),
            inserts: AtomicUsize::new(0),
        };
        let service = ShortenerService::new(repo, SeqGenerator::new());

        let record = service.encode("https://race.example").await.unwrap();

        assert_eq!(record, winner);
        assert_eq!(service.repository().inserts.load(Ordering::SeqCst), 1);
        assert_eq!(service.repository().inner.len(), 1);
    }

    /// Reports every insert as an unattributed conflict.
    struct OpaqueConflictRepository {
        inner: InMemoryRepository,
        first_insert_done: AtomicBool,
    }

    #[async_trait]
    impl Repository for OpaqueConflictRepository {
        async fn find_by_original_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
            self.inner.find_by_original_url(url).await
        }

        async fn find_by_code(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
            self.inner.find_by_code(code).await
        }

        async fn try_insert(&self, record: UrlRecord) -> StorageResult<InsertOutcome> {
            if !self.first_insert_done.swap(true, Ordering::SeqCst) {
                return Ok(InsertOutcome::Conflict(ConflictKey::Unknown));
            }
            self.inner.try_insert(record).await
        }

        async fn ping(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unattributed_conflict_is_retried_when_url_is_still_absent() {
        let repo = OpaqueConflictRepository {
            inner: InMemoryRepository::new(),
            first_insert_done: AtomicBool::new(false),
        };
        let service = ShortenerService::new(repo, SeqGenerator::new());

        let record = service.encode("https://example.com").await.unwrap();

        assert_eq!(record.short_code.as_str(), "000001");
    }

    struct BrokenRepository;

    #[async_trait]
    impl Repository for BrokenRepository {
        async fn find_by_original_url(&self, _url: &str) -> StorageResult<Option<UrlRecord>> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn find_by_code(&self, _code: &ShortCode) -> StorageResult<Option<UrlRecord>> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn try_insert(&self, _record: UrlRecord) -> StorageResult<InsertOutcome> {
            Err(StorageError::Unavailable("connection refused".into()))
        }

        async fn ping(&self) -> StorageResult<()> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let service = ShortenerService::new(BrokenRepository, RandomGenerator::new());

        assert!(matches!(
            service.encode("https://example.com").await.unwrap_err(),
            ShortenerError::Storage(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            service.decode("abc123").await.unwrap_err(),
            ShortenerError::Storage(_)
        ));
        assert!(Shortener::ping(&service).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_encodes_of_distinct_urls_get_distinct_codes() {
        let service = test_service();
        let mut handles = vec![];

        for i in 0..64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .encode(&format!("https://example.com/{i}"))
                    .await
                    .unwrap()
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for handle in handles {
            codes.insert(handle.await.unwrap().short_code);
        }

        assert_eq!(codes.len(), 64);
        assert_eq!(service.repository().len(), 64);
    }

    #[tokio::test]
    async fn concurrent_encodes_of_one_url_agree_on_one_code() {
        let service = test_service();
        let mut handles = vec![];

        for _ in 0..64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.encode("https://same.example").await.unwrap()
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for handle in handles {
            codes.insert(handle.await.unwrap().short_code);
        }

        assert_eq!(codes.len(), 1);
        assert_eq!(service.repository().len(), 1);
    }
}
