use std::collections::HashMap;
use std::str::FromStr;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::domain::TariffFlag;
use crate::error::Result;

/// Per-write change summary; lets callers (and tests) observe idempotence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Read/write access to the `tarifas` table.
pub struct TariffRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TariffRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Write all per-flag values for one provider in a single transaction.
    ///
    /// The provider row is created when absent and its id resolved once up
    /// front. Unchanged values are skipped to avoid spurious writes; either
    /// every flag write commits or none do.
    pub async fn upsert_tariffs(
        &self,
        provider: &str,
        values: &HashMap<TariffFlag, f64>,
    ) -> Result<UpsertReport> {
        let mut tx = self.pool.begin().await?;
        let provider_id = Self::resolve_provider_id(&mut tx, provider).await?;
        let mut report = UpsertReport::default();

        for (flag, value) in values {
            let existing: Option<f64> = sqlx::query_scalar(
                "SELECT valor FROM tarifas WHERE concessionaria_id = ?1 AND bandeira = ?2",
            )
            .bind(provider_id)
            .bind(flag.label())
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(current) if current == *value => report.unchanged += 1,
                Some(_) => {
                    debug!(%provider, flag = %flag, value, "updating tariff");
                    sqlx::query(
                        "UPDATE tarifas SET valor = ?1 \
                         WHERE concessionaria_id = ?2 AND bandeira = ?3",
                    )
                    .bind(*value)
                    .bind(provider_id)
                    .bind(flag.label())
                    .execute(&mut *tx)
                    .await?;
                    report.updated += 1;
                }
                None => {
                    debug!(%provider, flag = %flag, value, "inserting tariff");
                    sqlx::query(
                        "INSERT INTO tarifas (bandeira, valor, concessionaria_id) \
                         VALUES (?1, ?2, ?3)",
                    )
                    .bind(flag.label())
                    .bind(*value)
                    .bind(provider_id)
                    .execute(&mut *tx)
                    .await?;
                    report.inserted += 1;
                }
            }
        }

        tx.commit().await?;
        info!(%provider, ?report, "tariffs persisted");
        Ok(report)
    }

    async fn resolve_provider_id(
        tx: &mut Transaction<'_, Sqlite>,
        provider: &str,
    ) -> Result<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM concessionarias WHERE nome = ?1")
                .bind(provider)
                .fetch_optional(&mut **tx)
                .await?;
        if let Some(id) = existing {
            return Ok(id);
        }
        info!(%provider, "creating provider on first tariff write");
        let id: i64 =
            sqlx::query_scalar("INSERT INTO concessionarias (nome) VALUES (?1) RETURNING id")
                .bind(provider)
                .fetch_one(&mut **tx)
                .await?;
        Ok(id)
    }

    /// Current persisted tariffs for a provider; empty map when the provider
    /// has no records yet.
    pub async fn read_tariffs(&self, provider: &str) -> Result<HashMap<TariffFlag, f64>> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT t.bandeira, t.valor FROM tarifas t \
             JOIN concessionarias c ON c.id = t.concessionaria_id \
             WHERE c.nome = ?1",
        )
        .bind(provider)
        .fetch_all(self.pool)
        .await?;

        let mut tariffs = HashMap::new();
        for (bandeira, valor) in rows {
            match TariffFlag::from_str(&bandeira) {
                Ok(flag) => {
                    tariffs.insert(flag, valor);
                }
                Err(_) => warn!(label = %bandeira, "stored tariff has unknown flag label, skipping"),
            }
        }
        Ok(tariffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::TariffStore;

    fn sample_tariffs() -> HashMap<TariffFlag, f64> {
        HashMap::from([
            (TariffFlag::Green, 0.45),
            (TariffFlag::Yellow, 0.46874),
            (TariffFlag::RedLevel1, 0.48971),
            (TariffFlag::RedLevel2, 0.54492),
        ])
    }

    #[tokio::test]
    async fn written_values_read_back_exactly() {
        let store = TariffStore::connect_in_memory().await.unwrap();
        let tariffs = store.tariffs();

        let report = tariffs.upsert_tariffs("ACME", &sample_tariffs()).await.unwrap();
        assert_eq!(report.inserted, 4);

        let read = tariffs.read_tariffs("ACME").await.unwrap();
        assert_eq!(read, sample_tariffs());
    }

    #[tokio::test]
    async fn identical_upsert_reports_zero_changes() {
        let store = TariffStore::connect_in_memory().await.unwrap();
        let tariffs = store.tariffs();

        tariffs.upsert_tariffs("CEMIG", &sample_tariffs()).await.unwrap();
        let second = tariffs.upsert_tariffs("CEMIG", &sample_tariffs()).await.unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 4);

        // No duplicate rows either.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tarifas")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn changed_values_update_in_place() {
        let store = TariffStore::connect_in_memory().await.unwrap();
        let tariffs = store.tariffs();

        tariffs.upsert_tariffs("CEMIG", &sample_tariffs()).await.unwrap();
        let mut revised = sample_tariffs();
        revised.insert(TariffFlag::Yellow, 0.47);

        let report = tariffs.upsert_tariffs("CEMIG", &revised).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 3);
        assert_eq!(report.inserted, 0);

        let read = tariffs.read_tariffs("CEMIG").await.unwrap();
        assert_eq!(read[&TariffFlag::Yellow], 0.47);
    }

    #[tokio::test]
    async fn unknown_provider_reads_back_empty() {
        let store = TariffStore::connect_in_memory().await.unwrap();
        let read = store.tariffs().read_tariffs("NOBODY").await.unwrap();
        assert!(read.is_empty());
    }

    #[tokio::test]
    async fn upsert_creates_the_provider_once() {
        let store = TariffStore::connect_in_memory().await.unwrap();
        store.tariffs().upsert_tariffs("ACME", &sample_tariffs()).await.unwrap();
        store.tariffs().upsert_tariffs("ACME", &sample_tariffs()).await.unwrap();

        assert_eq!(store.providers().list().await.unwrap(), vec!["ACME"]);
    }
}
