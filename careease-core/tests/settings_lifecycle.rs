//! Integration test for the settings store.
//!
//! Exercises: open_db, migrate, SettingsStore get/set/clear, persistence
//! across connections.

use careease_core::db::{self, Settings, SettingsStore};

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("settings.db");
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn full_settings_lifecycle() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let store = SettingsStore::from_connection(conn);
    assert_eq!(store.load().await.unwrap(), Settings::default());
    assert_eq!(store.token().await.unwrap(), None);

    store.set_token("tok-1").await.unwrap();
    store.set_theme("light").await.unwrap();
    assert_eq!(store.token().await.unwrap().as_deref(), Some("tok-1"));

    // Upsert replaces instead of adding a second row.
    store.set_token("tok-2").await.unwrap();
    let settings = store.load().await.unwrap();
    assert_eq!(settings.token.as_deref(), Some("tok-2"));
    assert_eq!(settings.theme.as_deref(), Some("light"));

    store.clear_token().await.unwrap();
    assert_eq!(store.token().await.unwrap(), None);
    assert_eq!(store.theme().await.unwrap().as_deref(), Some("light"));

    // Persistence: a second store over the same file sees the same values.
    let reopened = SettingsStore::open(&path).await.unwrap();
    let settings = reopened.load().await.unwrap();
    assert_eq!(settings.token, None);
    assert_eq!(settings.theme.as_deref(), Some("light"));
}

#[tokio::test]
async fn open_creates_missing_parent_directories() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.db");

    let store = SettingsStore::open(&path).await.unwrap();
    store.set_theme("dark").await.unwrap();

    assert!(path.exists());
    assert_eq!(store.theme().await.unwrap().as_deref(), Some("dark"));
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let path = temp_db_path();
    let first = SettingsStore::open(&path).await.unwrap();
    first.set_token("keep-me").await.unwrap();

    let conn = db::open_db(&path).await.unwrap();
    let versions: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT COUNT(*) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(versions, 1, "re-opening must not re-apply v1");

    let store = SettingsStore::from_connection(conn);
    assert_eq!(store.token().await.unwrap().as_deref(), Some("keep-me"));
}
