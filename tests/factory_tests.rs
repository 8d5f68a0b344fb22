//! Backend selection tests
//!
//! The factory picks exactly one backend per configuration and degrades to
//! the next one in line when the database is unreachable.

use tempfile::TempDir;

use urlcut::config::{AppConfig, DEFAULT_CODE_LENGTH};
use urlcut::storage::{Repository, RepositoryFactory, StoredUrl};

#[test]
fn test_config_constructors() {
    let mem = AppConfig::in_memory();
    assert!(mem.database_url.is_none());
    assert!(mem.file_storage_path.is_none());
    assert_eq!(mem.code_length, DEFAULT_CODE_LENGTH);

    let file = AppConfig::with_file_storage("/tmp/urls.jsonl");
    assert_eq!(file.file_storage_path.as_deref(), Some("/tmp/urls.jsonl"));

    let db = AppConfig::with_database("sqlite::memory:");
    assert_eq!(db.database_url.as_deref(), Some("sqlite::memory:"));
}

#[tokio::test]
async fn test_factory_defaults_to_memory() {
    let repo = RepositoryFactory::create(&AppConfig::in_memory())
        .await
        .unwrap();

    repo.save(StoredUrl::new("mem00001", "https://example.com/", None))
        .await
        .unwrap();
    assert!(repo.find_by_short_code("mem00001").await.unwrap().is_some());
}

#[tokio::test]
async fn test_factory_selects_file_backend() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");
    let config = AppConfig::with_file_storage(path.display().to_string());

    let repo = RepositoryFactory::create(&config).await.unwrap();
    repo.save(StoredUrl::new("file0001", "https://example.com/", None))
        .await
        .unwrap();

    // Durability across instances proves the file backend was selected.
    let reopened = RepositoryFactory::create(&config).await.unwrap();
    assert!(
        reopened
            .find_by_short_code("file0001")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_factory_selects_relational_backend() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("factory.db");
    let config = AppConfig::with_database(format!("sqlite://{}?mode=rwc", db_path.display()));

    let repo = RepositoryFactory::create(&config).await.unwrap();
    repo.save(StoredUrl::new("sql00001", "https://example.com/", None))
        .await
        .unwrap();

    let reopened = RepositoryFactory::create(&config).await.unwrap();
    assert!(
        reopened
            .find_by_short_code("sql00001")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_factory_falls_back_past_unreachable_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fallback.jsonl");

    let config = AppConfig {
        database_url: Some("unknown://not-a-database".to_string()),
        file_storage_path: Some(path.display().to_string()),
        code_length: DEFAULT_CODE_LENGTH,
    };

    let repo = RepositoryFactory::create(&config).await.unwrap();
    repo.save(StoredUrl::new("fall0001", "https://example.com/", None))
        .await
        .unwrap();

    // The record landed in the file store, not the broken database.
    assert!(path.exists());
}
