//! Account store behaviour against a real SQLite file.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use warden_core::auth::AuthError;
use warden_core::models::auth::NewAccount;
use warden_core::store::{AccountStore, SqliteAccountStore, connect_store};

async fn fresh_store() -> (TempDir, String, SqliteAccountStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("accounts.db").display());
    let store = SqliteAccountStore::connect(&url).await.expect("connect");
    store.initialize_schema().await.expect("schema");
    (dir, url, store)
}

#[tokio::test]
async fn initialize_schema_is_idempotent() {
    let (_dir, _url, store) = fresh_store().await;
    store.initialize_schema().await.expect("second init");
    store.initialize_schema().await.expect("third init");
}

#[tokio::test]
async fn create_returns_fully_populated_record() {
    let (_dir, _url, store) = fresh_store().await;

    let record = store
        .create(NewAccount::new("alice", "hash-1").with_display_name(Some("Alice".into())))
        .await
        .expect("create");

    assert!(record.id > 0);
    assert_eq!(record.username, "alice");
    assert_eq!(record.password_hash, "hash-1");
    assert_eq!(record.display_name.as_deref(), Some("Alice"));
    assert_eq!(record.trust_level, 0);
    let age = Utc::now() - record.created_at;
    assert!(age.num_seconds().abs() < 120, "created_at too far from now: {age}");
}

#[tokio::test]
async fn duplicate_username_is_rejected_and_original_kept() {
    let (_dir, _url, store) = fresh_store().await;

    let first = store
        .create(NewAccount::new("alice", "hash-1"))
        .await
        .expect("first create");
    let err = store
        .create(NewAccount::new("alice", "hash-2").with_trust_level(3))
        .await
        .expect_err("second create must fail");
    assert!(matches!(err, AuthError::DuplicateUsername(ref name) if name == "alice"));

    let found = store
        .find_by_username("alice")
        .await
        .expect("find")
        .expect("alice exists");
    assert_eq!(found.id, first.id);
    assert_eq!(found.password_hash, "hash-1");
    assert_eq!(found.trust_level, 0);
}

#[tokio::test]
async fn missing_username_is_none() {
    let (_dir, _url, store) = fresh_store().await;
    assert!(store.find_by_username("nobody").await.expect("find").is_none());
}

#[tokio::test]
async fn find_returns_stored_record() {
    let (_dir, _url, store) = fresh_store().await;
    let created = store
        .create(NewAccount::new("bob", "hash-b").with_trust_level(2))
        .await
        .expect("create");
    let found = store.find_by_username("bob").await.expect("find");
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn usernames_are_bound_not_interpolated() {
    let (_dir, _url, store) = fresh_store().await;
    let hostile = "alice'; DROP TABLE users; --";

    store
        .create(NewAccount::new(hostile, "hash"))
        .await
        .expect("create");
    let found = store.find_by_username(hostile).await.expect("find");
    assert_eq!(found.map(|r| r.username), Some(hostile.to_string()));
    assert!(store.find_by_username("alice").await.expect("find").is_none());
}

#[tokio::test]
async fn concurrent_registrations_admit_exactly_one() {
    let (_dir, _url, store) = fresh_store().await;
    let store: Arc<dyn AccountStore> = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .create(NewAccount::new("racer", format!("hash-{i}")))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => created += 1,
            Err(AuthError::DuplicateUsername(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(duplicates, 7);
}

#[tokio::test]
async fn missing_table_is_storage_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("empty.db").display());
    let store = SqliteAccountStore::connect(&url).await.expect("connect");

    let err = store
        .find_by_username("alice")
        .await
        .expect_err("no users table yet");
    assert!(matches!(err, AuthError::StorageUnavailable(_)));
}

#[tokio::test]
async fn accounts_survive_reconnect() {
    let (_dir, url, store) = fresh_store().await;
    let created = store
        .create(NewAccount::new("carol", "hash-c"))
        .await
        .expect("create");
    drop(store);

    let reopened = connect_store(&url).await.expect("reconnect");
    reopened.initialize_schema().await.expect("schema");
    let found = reopened.find_by_username("carol").await.expect("find");
    assert_eq!(found.map(|r| r.id), Some(created.id));
}

#[tokio::test]
async fn unsupported_url_is_storage_unavailable() {
    let err = connect_store("postgres://localhost/warden")
        .await
        .err()
        .expect("postgres is not supported");
    assert!(matches!(err, AuthError::StorageUnavailable(_)));
}
