use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, ShortenerError};
use crate::storage::{Repository, StoredUrl};

/// In-memory backend, keyed by short code.
///
/// Lookups by original URL and by owner scan the whole map; this backend
/// targets tests and development, not production scale. Nothing survives a
/// process restart.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<HashMap<String, StoredUrl>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn load(&self) -> Result<Vec<StoredUrl>> {
        Ok(self.data.read().values().cloned().collect())
    }

    async fn save(&self, entry: StoredUrl) -> Result<()> {
        let mut data = self.data.write();

        if data.contains_key(&entry.short_url) {
            return Err(ShortenerError::conflict(format!(
                "short code already taken: {}",
                entry.short_url
            )));
        }
        if data
            .values()
            .any(|e| !e.is_deleted && e.original_url == entry.original_url)
        {
            return Err(ShortenerError::conflict(format!(
                "original url already stored: {}",
                entry.original_url
            )));
        }

        data.insert(entry.short_url.clone(), entry);
        Ok(())
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<StoredUrl>> {
        Ok(self.data.read().get(code).cloned())
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<StoredUrl>> {
        Ok(self
            .data
            .read()
            .values()
            .find(|e| e.original_url == url)
            .cloned())
    }

    async fn batch_save(&self, entries: Vec<StoredUrl>, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("batch save cancelled"));
        }

        let mut data = self.data.write();

        // The batch path inserts without duplicate checks; see the engine's
        // shorten_batch for the rationale.
        for entry in entries {
            if cancel.is_cancelled() {
                return Err(ShortenerError::cancelled("batch save cancelled"));
            }
            data.insert(entry.short_url.clone(), entry);
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredUrl>> {
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("owner listing cancelled"));
        }

        let data = self.data.read();

        let mut result = Vec::new();
        for entry in data.values() {
            if cancel.is_cancelled() {
                return Err(ShortenerError::cancelled("owner listing cancelled"));
            }
            if entry.user_id.as_deref() == Some(user_id) {
                result.push(entry.clone());
            }
        }
        Ok(result)
    }

    async fn mark_deleted(
        &self,
        user_id: &str,
        codes: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if codes.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("mark deleted cancelled"));
        }

        let code_set: HashSet<&str> = codes.iter().map(String::as_str).collect();
        let mut data = self.data.write();

        for entry in data.values_mut() {
            if cancel.is_cancelled() {
                return Err(ShortenerError::cancelled("mark deleted cancelled"));
            }
            if entry.user_id.as_deref() == Some(user_id) && code_set.contains(entry.short_url.as_str())
            {
                entry.is_deleted = true;
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
