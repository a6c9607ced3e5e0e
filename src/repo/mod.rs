//! SQLite-backed persistent store for providers and computed tariffs.
//!
//! The store is the sole writer of persisted tariff data. Uniqueness of
//! provider names and of (provider, flag) pairs is enforced by the schema,
//! not by application convention.

pub mod providers;
pub mod tariffs;

pub use providers::ProviderRepository;
pub use tariffs::{TariffRepository, UpsertReport};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS concessionarias (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS tarifas (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    bandeira          TEXT NOT NULL,
    valor             REAL NOT NULL,
    unidade           TEXT NOT NULL DEFAULT 'R$/kWh',
    concessionaria_id INTEGER NOT NULL REFERENCES concessionarias(id),
    UNIQUE (concessionaria_id, bandeira)
);
"#;

/// Connection pool plus schema management; hands out per-table repositories.
#[derive(Clone)]
pub struct TariffStore {
    pool: SqlitePool,
}

impl TariffStore {
    /// Open the database file at `path`, creating file and schema if missing.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database for tests; a single connection keeps the data
    /// alive for the store's lifetime.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("database schema verified");
        Ok(())
    }

    pub fn providers(&self) -> ProviderRepository<'_> {
        ProviderRepository::new(&self.pool)
    }

    pub fn tariffs(&self) -> TariffRepository<'_> {
        TariffRepository::new(&self.pool)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
