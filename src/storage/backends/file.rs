use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::{Repository, StoredUrl};

/// Append-only file backend: one JSON record per line.
///
/// Every mutation reads the whole file, recomputes the record set in memory,
/// writes a sibling `.tmp` file and renames it over the original. The rename
/// is atomic on one volume, so a reader never observes a partial rewrite.
/// One mutex serializes writers AND readers; the trade against read
/// concurrency is deliberate at this backend's modest target scale.
///
/// Every operation is O(n) in total record count. That is the scalability
/// ceiling of this backend; past moderate record counts use the relational
/// one.
pub struct FileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRepository {
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            fs::write(&path, "")?;
            info!("created empty url store: {}", path.display());
        }

        Ok(FileRepository {
            path,
            lock: Mutex::new(()),
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }

    /// Read every line, skipping ones that fail to parse. Partial corruption
    /// degrades the store gracefully instead of making it unusable.
    fn read_entries(&self, cancel: Option<&CancellationToken>) -> Result<Vec<StoredUrl>> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(ShortenerError::cancelled("file scan cancelled"));
                }
            }

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredUrl>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping malformed line in url store: {}", e),
            }
        }
        Ok(entries)
    }

    /// Write the full record set to a temp file, then rename it into place.
    fn rewrite(&self, entries: &[StoredUrl], cancel: Option<&CancellationToken>) -> Result<()> {
        let tmp_path = self.tmp_path();
        let mut writer = BufWriter::new(File::create(&tmp_path)?);

        for entry in entries {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    drop(writer);
                    let _ = fs::remove_file(&tmp_path);
                    return Err(ShortenerError::cancelled("file rewrite cancelled"));
                }
            }
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn load(&self) -> Result<Vec<StoredUrl>> {
        let _guard = self.lock.lock();
        self.read_entries(None)
    }

    async fn save(&self, entry: StoredUrl) -> Result<()> {
        let _guard = self.lock.lock();

        let mut entries = self.read_entries(None)?;
        if entries.iter().any(|e| e.short_url == entry.short_url) {
            return Err(ShortenerError::conflict(format!(
                "short code already taken: {}",
                entry.short_url
            )));
        }
        if entries
            .iter()
            .any(|e| !e.is_deleted && e.original_url == entry.original_url)
        {
            return Err(ShortenerError::conflict(format!(
                "original url already stored: {}",
                entry.original_url
            )));
        }

        entries.push(entry);
        self.rewrite(&entries, None)
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<StoredUrl>> {
        let _guard = self.lock.lock();
        Ok(self
            .read_entries(None)?
            .into_iter()
            .find(|e| e.short_url == code))
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<StoredUrl>> {
        let _guard = self.lock.lock();
        Ok(self
            .read_entries(None)?
            .into_iter()
            .find(|e| e.original_url == url))
    }

    async fn batch_save(&self, entries: Vec<StoredUrl>, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock.lock();

        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("batch save cancelled"));
        }

        // The batch path appends without duplicate checks; see the engine's
        // shorten_batch for the rationale.
        let mut all = self.read_entries(Some(cancel))?;
        all.extend(entries);
        self.rewrite(&all, Some(cancel))
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredUrl>> {
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("owner listing cancelled"));
        }

        let _guard = self.lock.lock();

        let entries = self.read_entries(Some(cancel))?;
        Ok(entries
            .into_iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .collect())
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

        let _guard = self.lock.lock();

        let code_set: HashSet<&str> = codes.iter().map(String::as_str).collect();
        let mut entries = self.read_entries(Some(cancel))?;

        for entry in &mut entries {
            if entry.user_id.as_deref() == Some(user_id)
                && code_set.contains(entry.short_url.as_str())
            {
                entry.is_deleted = true;
            }
        }

        self.rewrite(&entries, Some(cancel))
    }

    async fn health_check(&self) -> Result<()> {
        let _guard = self.lock.lock();
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;
        Ok(())
    }
}
