use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::DEFAULT_CODE_LENGTH;
use crate::errors::{Result, ShortenerError};
use crate::storage::{Repository, StoredUrl};
use crate::utils::{generate_random_code, validate_url};

/// Deadline for the detached soft-delete task.
const DELETE_TIMEOUT: Duration = Duration::from_secs(30);

// ============ Request/Response DTOs ============

/// One batch shorten request item, correlated by a caller-supplied id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchShortenItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One batch shorten result, carrying the caller's correlation id back.
#[derive(Debug, Clone, Serialize)]
pub struct BatchShortenResult {
    pub correlation_id: String,
    pub record: StoredUrl,
}

/// Outcome of a single shorten request.
#[derive(Debug, Clone)]
pub struct ShortenOutcome {
    pub record: StoredUrl,
    /// false when the URL was already known and the existing record is
    /// returned instead; callers use this to pick the response status.
    pub is_new: bool,
}

// ============ UrlService ============

/// The shortening engine.
///
/// Generates short codes, enforces idempotence per original URL on the
/// single-item path, drives batch creation, and schedules background
/// soft-deletes. Storage is reached only through the injected repository,
/// which is what keeps the backends substitutable.
pub struct UrlService {
    repo: Arc<dyn Repository>,
    code_length: usize,
}

impl UrlService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self::with_code_length(repo, DEFAULT_CODE_LENGTH)
    }

    pub fn with_code_length(repo: Arc<dyn Repository>, code_length: usize) -> Self {
        UrlService { repo, code_length }
    }

    /// Shorten one URL, idempotently.
    ///
    /// A URL that is already mapped returns its existing record with
    /// `is_new = false`. On a miss a fresh code is generated and persisted
    /// without any pre-check against existing codes: the collision
    /// probability of an 8-character draw from a 62-symbol alphabet is
    /// negligible, and the storage uniqueness constraint catches the rest.
    /// A persist-time conflict (a concurrent writer got there first, or a
    /// code collision) is resolved by re-querying.
    pub async fn shorten_one(
        &self,
        original_url: &str,
        user_id: Option<&str>,
    ) -> Result<ShortenOutcome> {
        validate_url(original_url).map_err(|e| ShortenerError::validation(e.to_string()))?;
        let original_url = original_url.trim();

        if let Some(existing) = self.repo.find_by_original_url(original_url).await? {
            return Ok(ShortenOutcome {
                record: existing,
                is_new: false,
            });
        }

        let code = generate_random_code(self.code_length);
        let record = StoredUrl::new(&code, original_url, user_id);

        match self.repo.save(record.clone()).await {
            Ok(()) => {
                info!(
                    "created short url: {} -> {}",
                    record.short_url, record.original_url
                );
                Ok(ShortenOutcome {
                    record,
                    is_new: true,
                })
            }
            Err(e) if e.is_conflict() => {
                // Whoever won the race holds the mapping now.
                match self.repo.find_by_original_url(original_url).await? {
                    Some(existing) => Ok(ShortenOutcome {
                        record: existing,
                        is_new: false,
                    }),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a short code back to its record.
    ///
    /// Deleted records are returned as-is; what a soft-deleted mapping means
    /// to the response is the caller's decision.
    pub async fn resolve(&self, code: &str) -> Result<Option<StoredUrl>> {
        self.repo.find_by_short_code(code).await
    }

    /// Shorten a batch of URLs as one persistence unit.
    ///
    /// Unlike the single-item path, the batch path generates a fresh code
    /// per item unconditionally and performs NO idempotence lookup: a URL
    /// already known to the store gets a second code. Duplicate original
    /// URLs within or across batches are the caller's responsibility; on the
    /// relational backend they abort the whole transaction with a conflict.
    pub async fn shorten_batch(
        &self,
        items: Vec<BatchShortenItem>,
        user_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchShortenResult>> {
        for item in &items {
            validate_url(&item.original_url).map_err(|e| {
                ShortenerError::validation(format!("item {}: {}", item.correlation_id, e))
            })?;
        }

        let mut records = Vec::with_capacity(items.len());
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let code = generate_random_code(self.code_length);
            let record = StoredUrl::new(&code, item.original_url.trim(), user_id);
            records.push(record.clone());
            results.push(BatchShortenResult {
                correlation_id: item.correlation_id,
                record,
            });
        }

        self.repo.batch_save(records, cancel).await?;

        info!("batch shortened {} urls", results.len());
        Ok(results)
    }

    /// All records belonging to one owner, deleted ones included.
    pub async fn list_for_owner(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredUrl>> {
        self.repo.list_by_owner(user_id, cancel).await
    }

    /// Schedule a soft-delete of the owner's codes and return immediately.
    ///
    /// The mutation runs as a detached task bounded by a 30-second deadline.
    /// Failures and timeouts are logged, never retried and never surfaced to
    /// the caller; fire-and-forget is the contract here, not an accident.
    pub fn delete_for_owner(&self, user_id: &str, codes: Vec<String>) {
        let repo = Arc::clone(&self.repo);
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let work = repo.mark_deleted(&user_id, &codes, &cancel);

            match tokio::time::timeout(DELETE_TIMEOUT, work).await {
                Ok(Ok(())) => {
                    info!("marked {} urls deleted for {}", codes.len(), user_id);
                }
                Ok(Err(e)) => {
                    error!("failed to mark deleted for {}: {}", user_id, e);
                }
                Err(_) => {
                    error!(
                        "mark deleted for {} timed out after {:?}",
                        user_id, DELETE_TIMEOUT
                    );
                }
            }
        });
    }

    /// Liveness probe of the backing medium, for the caller's ping endpoint.
    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }
}
