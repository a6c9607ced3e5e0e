use std::collections::BTreeSet;

use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Read/insert access to the `concessionarias` table.
pub struct ProviderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProviderRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert every code not yet present; existing rows are never rewritten.
    /// Returns the number of providers inserted.
    pub async fn ensure_providers(&self, codes: &BTreeSet<String>) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let known: Vec<String> = sqlx::query_scalar("SELECT nome FROM concessionarias")
            .fetch_all(&mut *tx)
            .await?;
        let known: BTreeSet<String> = known.into_iter().collect();

        let new: Vec<String> = codes.difference(&known).cloned().collect();
        if new.is_empty() {
            info!("no new providers to add");
            return Ok(0);
        }

        info!(count = new.len(), "adding new providers");
        for nome in &new {
            sqlx::query("INSERT INTO concessionarias (nome) VALUES (?1)")
                .bind(nome.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(new.len())
    }

    /// All known provider names, lexicographically ordered.
    pub async fn list(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT nome FROM concessionarias ORDER BY nome")
            .fetch_all(self.pool)
            .await?;
        Ok(names)
    }
}
