use crate::api::WhoAmIResponse;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bastion::{Principal, SYSTEM_DATABASE};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WhoAmIQuery {
    pub database: Option<String>,
}

fn kind(principal: &Principal) -> &'static str {
    match principal {
        Principal::Anonymous => "anonymous",
        Principal::Process => "process",
        Principal::Directory(_) => "directory",
        Principal::DatabaseScoped(_) => "database_scoped",
    }
}

/// GET /whoami?database=<name>
pub async fn whoami(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<WhoAmIQuery>,
) -> Json<WhoAmIResponse> {
    let database = query
        .database
        .unwrap_or_else(|| SYSTEM_DATABASE.to_string());

    let is_admin = state
        .engine
        .is_administrator_for(&principal, state.anonymous_access, &database)
        .await;

    Json(WhoAmIResponse {
        kind: kind(&principal).to_string(),
        name: principal.name().map(str::to_string),
        database,
        is_admin,
    })
}
