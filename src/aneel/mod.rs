//! Query client for the ANEEL open-data portal (CKAN datastore API).
//!
//! All upstream-format fragility lives in this module: query construction,
//! the response envelope, decimal-comma numerics and label mapping. Calls
//! are single best-effort requests; retry policy belongs to the refresh
//! cadence, not here.

mod client;
mod records;
mod sql;

pub use client::AneelClient;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{FlagLabel, TariffFlag};
use crate::error::Result;

/// Public ANEEL portal; overridden via config in tests.
pub const DEFAULT_BASE_URL: &str = "https://dadosabertos.aneel.gov.br";

/// CKAN resource holding the homologated tariff schedules.
pub const RESOURCE_ID_TARIFAS: &str = "fcf2906c-7c32-4b9b-a637-054e7a5234f4";
/// CKAN resource holding the price-flag schedule and activations.
pub const RESOURCE_ID_BANDEIRAS: &str = "0591b8f6-fe54-437b-b72b-1aa2efd46e42";

/// Upstream tariff data, as questions the rest of the system asks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TariffSource: Send + Sync {
    /// Per-flag surcharges for the given competency month. `Ok(None)` when
    /// the query succeeds but no schedule is published for that month.
    async fn flag_surcharges(&self, month: NaiveDate) -> Result<Option<HashMap<TariffFlag, f64>>>;

    /// Label of the flag activated for the given competency month; unmapped
    /// labels come back verbatim.
    async fn active_flag(&self, month: NaiveDate) -> Result<Option<FlagLabel>>;

    /// Distinct provider codes found in the tariff schedule resource. An
    /// empty result is an error, never an empty set: an empty provider
    /// universe is indistinguishable from an outage.
    async fn provider_codes(&self) -> Result<BTreeSet<String>>;

    /// Base tariff (TUSD + TE) for a provider's residential conventional
    /// schedule still valid past `as_of`. `Ok(None)` when no row matches.
    async fn base_tariff(&self, provider: &str, as_of: NaiveDate) -> Result<Option<f64>>;
}
