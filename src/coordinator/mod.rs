//! Refresh coordination: the acquisition-compute-persist cycle and its
//! daily cadence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::aneel::{AneelClient, TariffSource};
use crate::config::Config;
use crate::domain::RefreshResult;
use crate::error::{Result, TariffError};
use crate::repo::TariffStore;
use crate::valuation::compute_final_tariffs;

/// Shared application state handed to the API layer and the refresh tasks.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub refresher: Arc<Refresher>,
    pub store: TariffStore,
}

impl AppState {
    pub async fn new(cfg: Config) -> anyhow::Result<Self> {
        let store = TariffStore::connect(&cfg.db.path).await?;
        let client = AneelClient::new(
            cfg.aneel.base_url.clone(),
            Duration::from_secs(cfg.aneel.http_timeout_seconds),
        )?;
        let refresher = Arc::new(Refresher::new(Arc::new(client), store.clone()));
        Ok(Self {
            cfg,
            refresher,
            store,
        })
    }
}

/// Spawn one refresh loop per configured provider. Each loop runs an
/// immediate first cycle, then ticks at the configured interval; a failed
/// cycle leaves the previously persisted data in place until the next tick.
pub fn spawn_refresh_tasks(state: &AppState) {
    for provider in state.cfg.refresh.providers.clone() {
        let refresher = state.refresher.clone();
        let interval_hours = state.cfg.refresh.interval_hours.max(1);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_hours * 3600));
            loop {
                interval.tick().await;
                let today = Local::now().date_naive();
                match refresher.refresh_once(&provider, today).await {
                    Ok(result) => {
                        info!(%provider, active_flag = %result.active_flag, "scheduled refresh complete");
                    }
                    Err(err) => {
                        warn!(%provider, error = %err, "scheduled refresh failed");
                    }
                }
            }
        });
    }
}

/// Runs refresh cycles and keeps the latest result per provider for the
/// presentation layer. A per-provider mutex guarantees at most one cycle in
/// flight for the same provider; distinct providers refresh independently.
pub struct Refresher {
    source: Arc<dyn TariffSource>,
    store: TariffStore,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    latest: RwLock<HashMap<String, RefreshResult>>,
}

impl Refresher {
    pub fn new(source: Arc<dyn TariffSource>, store: TariffStore) -> Self {
        Self {
            source,
            store,
            in_flight: Mutex::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// One full cycle for `provider`: fetch surcharges and base tariff,
    /// compute, persist, read back, resolve the active flag. Aborts on the
    /// first missing input, leaving previously persisted tariffs untouched.
    pub async fn refresh_once(&self, provider: &str, today: NaiveDate) -> Result<RefreshResult> {
        let lock = self.provider_lock(provider).await;
        let _guard = lock.lock().await;

        info!(%provider, %today, "refresh cycle started");

        let surcharges = self.source.flag_surcharges(today).await?.ok_or_else(|| {
            TariffError::NoData(format!(
                "no price-flag surcharges published for {}",
                today.format("%Y-%m")
            ))
        })?;

        let base = self.source.base_tariff(provider, today).await?.ok_or_else(|| {
            TariffError::NoData(format!("no tariff schedule in effect for {provider}"))
        })?;

        let computed = compute_final_tariffs(base, &surcharges);

        self.store.tariffs().upsert_tariffs(provider, &computed).await?;
        // The returned map is always the confirmed read-back, so a
        // persistence bug surfaces here instead of being masked by the
        // in-memory computed values.
        let tariffs = self.store.tariffs().read_tariffs(provider).await?;

        let active_flag = self.source.active_flag(today).await?.ok_or_else(|| {
            TariffError::NoData(format!(
                "no activated flag published for {}",
                today.format("%Y-%m")
            ))
        })?;

        info!(%provider, active = %active_flag, "refresh cycle persisted");
        let result = RefreshResult {
            tariffs,
            active_flag,
        };
        self.latest
            .write()
            .await
            .insert(provider.to_string(), result.clone());
        Ok(result)
    }

    /// Latest successful cycle result for a provider, if any.
    pub async fn latest(&self, provider: &str) -> Option<RefreshResult> {
        self.latest.read().await.get(provider).cloned()
    }

    /// Setup-time provider sync: fetch the code universe and insert unknowns.
    /// Returns the number of providers added.
    pub async fn sync_providers(&self) -> Result<usize> {
        let codes = self.source.provider_codes().await?;
        self.store.providers().ensure_providers(&codes).await
    }

    async fn provider_lock(&self, provider: &str) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().await;
        map.entry(provider.to_string()).or_default().clone()
    }
}
