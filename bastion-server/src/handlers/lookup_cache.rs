use crate::api::{ClearResponse, InvalidateResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use bastion::{CacheStats, EntrySnapshot, Identity};
use tracing::info;

/// GET /admin/lookup-cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.engine.cache().stats())
}

/// GET /admin/lookup-cache/entries
pub async fn cache_entries(State(state): State<AppState>) -> Json<Vec<EntrySnapshot>> {
    Json(state.engine.cache().snapshot())
}

/// DELETE /admin/lookup-cache/entries/{identity}
pub async fn invalidate_entry(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.engine.cache().invalidate(&Identity::new(identity.clone()));
    info!(identity = %identity, removed, "Invalidated admin lookup entry");
    Json(InvalidateResponse { identity, removed })
}

/// DELETE /admin/lookup-cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearResponse> {
    let cache = state.engine.cache();
    let removed = cache.len();
    cache.clear();
    info!(removed, "Cleared admin lookup cache");
    Json(ClearResponse { removed })
}
