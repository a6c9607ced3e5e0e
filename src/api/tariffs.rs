use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, State};
use axum::Json;
use chrono::Local;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::coordinator::AppState;
use crate::domain::{FlagLabel, TariffFlag};

#[derive(Debug, Serialize)]
pub struct TariffsResponse {
    provider: String,
    unit: &'static str,
    tariffs: BTreeMap<String, f64>,
}

/// GET /api/v1/tariffs/:provider - the persisted per-flag tariffs.
pub async fn get_tariffs(
    State(st): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<TariffsResponse>, ApiError> {
    let tariffs = st.store.tariffs().read_tariffs(&provider).await?;
    if tariffs.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no tariffs recorded for {provider}"
        )));
    }
    Ok(Json(TariffsResponse {
        provider,
        unit: "R$/kWh",
        tariffs: by_label(&tariffs),
    }))
}

#[derive(Debug, Serialize)]
pub struct CurrentTariffResponse {
    provider: String,
    active_flag: FlagLabel,
    /// Absent when the active flag has no known mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    unit: &'static str,
}

/// GET /api/v1/tariffs/:provider/current - the tariff for the currently
/// active flag, from the last successful refresh cycle.
pub async fn get_current(
    State(st): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<CurrentTariffResponse>, ApiError> {
    let Some(result) = st.refresher.latest(&provider).await else {
        return Err(ApiError::NotFound(format!(
            "no completed refresh cycle for {provider}"
        )));
    };

    // Display unit scale conversion, applied exactly once at this boundary;
    // persisted values stay in R$/kWh.
    let value = result
        .active_flag
        .as_flag()
        .and_then(|flag| result.tariffs.get(&flag))
        .map(|v| v / 1000.0);

    Ok(Json(CurrentTariffResponse {
        provider,
        active_flag: result.active_flag,
        value,
        unit: "R$/kWh",
    }))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    provider: String,
    active_flag: FlagLabel,
    unit: &'static str,
    tariffs: BTreeMap<String, f64>,
}

/// POST /api/v1/tariffs/:provider/refresh - run one refresh cycle now.
pub async fn refresh(
    State(st): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let today = Local::now().date_naive();
    let result = st.refresher.refresh_once(&provider, today).await?;
    Ok(Json(RefreshResponse {
        provider,
        active_flag: result.active_flag.clone(),
        unit: "R$/kWh",
        tariffs: by_label(&result.tariffs),
    }))
}

fn by_label(tariffs: &HashMap<TariffFlag, f64>) -> BTreeMap<String, f64> {
    tariffs
        .iter()
        .map(|(flag, value)| (flag.label(), *value))
        .collect()
}
