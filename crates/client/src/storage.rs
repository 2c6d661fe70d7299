//! Durable key-value backing stores for the cart blob.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};

/// The single namespaced key the cart is persisted under.
///
/// The store never performs partial updates: the value is always the full
/// serialized line-item sequence, replaced wholesale on every persist.
pub const PRODUCTS_KEY: &str = "gomarket:products";

/// Durable string-keyed storage the cart store reads through and writes
/// behind.
///
/// Implementations own their own failure modes; the cart store treats a
/// failed read as absent data and reports failed writes only through
/// `flush`/`close`.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// The stored value for `key`, or `None` if it was never written.
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Overwrite the value for `key` unconditionally.
    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// SQLite-backed durable device storage: a single-file database with one
/// key-value table.
#[derive(Debug, Clone)]
pub struct SqliteBackingStore {
    pool: SqlitePool,
}

impl SqliteBackingStore {
    /// Open (creating if missing) the database at an explicit path.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create storage directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite backing store at {path:?}"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create kv_store table")?;

        Ok(Self { pool })
    }

    /// Open the database at the default device location:
    /// `{data_dir}/gomarket/cart.db`, where `{data_dir}` is the
    /// `GOMARKET_DATA_DIR` environment variable when set, otherwise the OS
    /// application-data directory.
    pub async fn open_default() -> anyhow::Result<Self> {
        Self::open(default_db_path()?).await
    }
}

#[async_trait]
impl BackingStore for SqliteBackingStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read key '{key}' from backing store"))?;

        row.map(|row| row.try_get("value"))
            .transpose()
            .context("failed to decode stored value")
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert key '{key}' in backing store"))?;

        Ok(())
    }
}

/// Resolve the default database path: `{data_dir}/gomarket/cart.db`.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = match std::env::var_os("GOMARKET_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut home| {
                    home.push(".local");
                    home.push("share");
                    home
                })
            })
            .context(
                "failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share",
            )?,
    };

    let mut path = base;
    path.push("gomarket");
    path.push("cart.db");
    Ok(path)
}

/// In-memory backing store for tests and ephemeral (preview) sessions.
///
/// Clones share the same underlying map, so one handle can seed data that a
/// store opened over another handle will see.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackingStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
