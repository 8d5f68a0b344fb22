use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::errors::Result;

pub mod backends;
pub mod models;

pub use models::StoredUrl;

/// The storage contract every backend fulfills.
///
/// The shortening engine only ever talks to storage through this trait;
/// backends are selected once at startup and injected as `Arc<dyn
/// Repository>`, never inspected at runtime.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Full scan, used at startup to warm in-process state.
    async fn load(&self) -> Result<Vec<StoredUrl>>;

    /// Durably persist one new record. Fails with `Conflict` when the short
    /// code is taken or the original URL already maps to a non-deleted
    /// record.
    async fn save(&self, entry: StoredUrl) -> Result<()>;

    /// Point lookup by short code. Absence is `Ok(None)`, not an error.
    async fn find_by_short_code(&self, code: &str) -> Result<Option<StoredUrl>>;

    /// Point lookup by original URL. Absence is `Ok(None)`, not an error.
    async fn find_by_original_url(&self, url: &str) -> Result<Option<StoredUrl>>;

    /// Persist a batch as one unit. The file and in-memory backends append
    /// without duplicate checks; the relational backend aborts the whole
    /// transaction on any uniqueness violation. Cancellation is checked at
    /// every iteration boundary.
    async fn batch_save(&self, entries: Vec<StoredUrl>, cancel: &CancellationToken) -> Result<()>;

    /// All records for one owner, deleted ones included.
    async fn list_by_owner(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredUrl>>;

    /// Flip `is_deleted` on records matching both owner and code. Idempotent;
    /// codes that match nothing are ignored; an empty set short-circuits.
    async fn mark_deleted(
        &self,
        user_id: &str,
        codes: &[String],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Liveness probe of the backing medium. No-op for the in-memory backend.
    async fn health_check(&self) -> Result<()>;
}

pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Build the backend the configuration asks for.
    ///
    /// Selection order: relational when `database_url` is set, falling back
    /// to the file store (then to memory) when the database is unreachable
    /// rather than refusing to start.
    pub async fn create(config: &AppConfig) -> Result<Arc<dyn Repository>> {
        if let Some(url) = &config.database_url {
            match backends::sea_orm::SeaOrmRepository::new(url).await {
                Ok(repo) => {
                    info!("using relational storage backend");
                    return Self::warm_up(Arc::new(repo)).await;
                }
                Err(e) => {
                    warn!("database backend unavailable, falling back: {}", e);
                }
            }
        }

        if let Some(path) = &config.file_storage_path {
            let repo = backends::file::FileRepository::new(path)?;
            info!("using file storage backend: {}", path);
            return Self::warm_up(Arc::new(repo)).await;
        }

        info!("using in-memory storage backend");
        Self::warm_up(Arc::new(backends::memory::MemoryRepository::new())).await
    }

    async fn warm_up(repo: Arc<dyn Repository>) -> Result<Arc<dyn Repository>> {
        // Load failure is logged, not fatal: an unreadable medium will
        // surface again on the first real operation.
        match repo.load().await {
            Ok(existing) => info!("loaded {} stored urls", existing.len()),
            Err(e) => error!("failed to load existing records: {}", e),
        }
        Ok(repo)
    }
}
