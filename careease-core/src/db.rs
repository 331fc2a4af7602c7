//! Local settings store: the auth token and the theme preference.
//!
//! These two values are the only client-side state that outlives a run. They
//! are read once at startup ([`SettingsStore::load`]) and written whenever they
//! change; no other module touches the database.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::SettingsError;

const KEY_TOKEN: &str = "auth_token";
const KEY_THEME: &str = "theme";

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: impl AsRef<Path>) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path.as_ref()).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        crate::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Snapshot of every persisted setting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: Option<String>,
    pub theme: Option<String>,
}

/// Narrow get/set facade over the settings table.
#[derive(Clone)]
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the directory or database cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_db(path).await?;
        Ok(Self { conn })
    }

    /// Wraps an already-open connection (schema must be migrated).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Reads every setting in one round trip.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the query fails.
    pub async fn load(&self) -> Result<Settings, SettingsError> {
        let settings = self
            .conn
            .call(|db| -> rusqlite::Result<Settings> {
                let mut stmt = db.prepare("SELECT key, value FROM settings")?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                let mut settings = Settings::default();
                for (key, value) in rows {
                    match key.as_str() {
                        KEY_TOKEN => settings.token = Some(value),
                        KEY_THEME => settings.theme = Some(value),
                        _ => {}
                    }
                }
                Ok(settings)
            })
            .await?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the query fails.
    pub async fn token(&self) -> Result<Option<String>, SettingsError> {
        self.get(KEY_TOKEN).await
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the upsert fails.
    pub async fn set_token(&self, token: &str) -> Result<(), SettingsError> {
        debug!("storing auth token");
        self.put(KEY_TOKEN, token).await
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the delete fails.
    pub async fn clear_token(&self) -> Result<(), SettingsError> {
        debug!("clearing auth token");
        self.delete(KEY_TOKEN).await
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the query fails.
    pub async fn theme(&self) -> Result<Option<String>, SettingsError> {
        self.get(KEY_THEME).await
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Db`] if the upsert fails.
    pub async fn set_theme(&self, theme: &str) -> Result<(), SettingsError> {
        self.put(KEY_THEME, theme).await
    }

    async fn get(&self, key: &'static str) -> Result<Option<String>, SettingsError> {
        let value = self
            .conn
            .call(move |db| -> rusqlite::Result<Option<String>> {
                db.query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    rusqlite::params![key],
                    |r| r.get(0),
                )
                .optional()
            })
            .await?;
        Ok(value)
    }

    /// Upserts `key` inside `BEGIN IMMEDIATE`.
    async fn put(&self, key: &'static str, value: &str) -> Result<(), SettingsError> {
        let value = value.to_owned();
        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                    rusqlite::params![key, &value, now_secs()],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &'static str) -> Result<(), SettingsError> {
        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                db.execute("DELETE FROM settings WHERE key = ?1", rusqlite::params![key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
