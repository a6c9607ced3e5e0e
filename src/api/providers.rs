use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::coordinator::AppState;

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    providers: Vec<String>,
}

/// GET /api/v1/providers - known provider names, for the selection flow.
pub async fn list_providers(
    State(st): State<AppState>,
) -> Result<Json<ProvidersResponse>, ApiError> {
    let providers = st.store.providers().list().await?;
    Ok(Json(ProvidersResponse { providers }))
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    added: usize,
}

/// POST /api/v1/providers/sync - refresh the selectable provider universe
/// from upstream. "Cannot connect" and "no providers found" surface as
/// distinct errors.
pub async fn sync_providers(State(st): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let added = st.refresher.sync_providers().await?;
    Ok(Json(SyncResponse { added }))
}
