//! Relational backend tests
//!
//! Run against temporary SQLite databases; the sea-orm backend is the same
//! code path for PostgreSQL and MySQL, with only the driver differing.

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use urlcut::storage::backends::sea_orm::SeaOrmRepository;
use urlcut::storage::{Repository, StoredUrl};

fn entry(code: &str, url: &str, owner: Option<&str>) -> StoredUrl {
    StoredUrl::new(code, url, owner)
}

async fn create_temp_repo() -> (SeaOrmRepository, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let repo = SeaOrmRepository::new(&db_url)
        .await
        .expect("Failed to create repository");

    (repo, temp_dir)
}

#[tokio::test]
async fn test_empty_url_fails() {
    assert!(SeaOrmRepository::new("").await.is_err());
}

#[tokio::test]
async fn test_schema_init_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("twice.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    SeaOrmRepository::new(&db_url).await.unwrap();
    // Opening the same database again must not fail on the existing table.
    SeaOrmRepository::new(&db_url).await.unwrap();
}

#[tokio::test]
async fn test_save_and_find() {
    let (repo, _temp) = create_temp_repo().await;

    repo.save(entry("abc12345", "https://example.com/", Some("u1")))
        .await
        .expect("save should succeed");

    let by_code = repo
        .find_by_short_code("abc12345")
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(by_code.original_url, "https://example.com/");
    assert_eq!(by_code.user_id.as_deref(), Some("u1"));
    assert!(!by_code.is_deleted);

    let by_url = repo
        .find_by_original_url("https://example.com/")
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(by_url.short_url, "abc12345");

    assert!(repo.find_by_short_code("missing0").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_original_url_is_conflict() {
    let (repo, _temp) = create_temp_repo().await;

    repo.save(entry("code0001", "https://example.com/", None))
        .await
        .unwrap();

    let err = repo
        .save(entry("code0002", "https://example.com/", None))
        .await
        .unwrap_err();
    assert!(
        err.is_conflict(),
        "unique violation must map to Conflict, got: {}",
        err
    );
}

#[tokio::test]
async fn test_duplicate_short_code_is_conflict() {
    let (repo, _temp) = create_temp_repo().await;

    repo.save(entry("code0001", "https://one.example.com/", None))
        .await
        .unwrap();

    let err = repo
        .save(entry("code0001", "https://two.example.com/", None))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_batch_save_is_atomic() {
    let (repo, _temp) = create_temp_repo().await;

    repo.save(entry("existing", "https://taken.example.com/", None))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let err = repo
        .batch_save(
            vec![
                entry("batch001", "https://a.example.com/", None),
                // Conflicts with the pre-existing record.
                entry("batch002", "https://taken.example.com/", None),
                entry("batch003", "https://c.example.com/", None),
            ],
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The whole transaction must have rolled back.
    assert!(repo.find_by_short_code("batch001").await.unwrap().is_none());
    assert!(repo.find_by_short_code("batch003").await.unwrap().is_none());
    assert_eq!(repo.load().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_save_commits() {
    let (repo, _temp) = create_temp_repo().await;

    let cancel = CancellationToken::new();
    repo.batch_save(
        vec![
            entry("bulk0001", "https://a.example.com/", Some("u1")),
            entry("bulk0002", "https://b.example.com/", Some("u1")),
        ],
        &cancel,
    )
    .await
    .expect("batch save should succeed");

    assert_eq!(repo.load().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancelled_batch_persists_nothing() {
    let (repo, _temp) = create_temp_repo().await;

    let cancelled = CancellationToken::new();
    cancelled.cancel();

    let err = repo
        .batch_save(
            vec![entry("drop0001", "https://a.example.com/", None)],
            &cancelled,
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(repo.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_deleted_bulk_update() {
    let (repo, _temp) = create_temp_repo().await;
    let cancel = CancellationToken::new();

    repo.save(entry("owned001", "https://a.example.com/", Some("alice")))
        .await
        .unwrap();
    repo.save(entry("owned002", "https://b.example.com/", Some("alice")))
        .await
        .unwrap();
    repo.save(entry("owned003", "https://c.example.com/", Some("bob")))
        .await
        .unwrap();

    repo.mark_deleted(
        "alice",
        &[
            "owned001".to_string(),
            "owned002".to_string(),
            // bob's code in alice's request must not flip bob's record
            "owned003".to_string(),
        ],
        &cancel,
    )
    .await
    .unwrap();

    assert!(
        repo.find_by_short_code("owned001")
            .await
            .unwrap()
            .unwrap()
            .is_deleted
    );
    assert!(
        repo.find_by_short_code("owned002")
            .await
            .unwrap()
            .unwrap()
            .is_deleted
    );
    assert!(
        !repo
            .find_by_short_code("owned003")
            .await
            .unwrap()
            .unwrap()
            .is_deleted
    );

    // Empty code set short-circuits without touching the database.
    repo.mark_deleted("alice", &[], &cancel).await.unwrap();
}

#[tokio::test]
async fn test_list_by_owner() {
    let (repo, _temp) = create_temp_repo().await;
    let cancel = CancellationToken::new();

    repo.save(entry("list0001", "https://a.example.com/", Some("alice")))
        .await
        .unwrap();
    repo.save(entry("list0002", "https://b.example.com/", Some("bob")))
        .await
        .unwrap();

    let listed = repo.list_by_owner("alice", &cancel).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].short_url, "list0001");

    assert!(repo.list_by_owner("nobody", &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let (repo, _temp) = create_temp_repo().await;
    assert!(repo.health_check().await.is_ok());
}
