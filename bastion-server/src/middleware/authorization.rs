use super::authentication::get_principal;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::info;

/// Reject callers who are not server administrators
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let principal = get_principal(&request);

    if state
        .engine
        .is_administrator(&principal, state.anonymous_access)
        .await
    {
        return Ok(next.run(request).await);
    }

    if !principal.is_authenticated() {
        return Err((StatusCode::UNAUTHORIZED, "Authentication required").into_response());
    }

    info!(
        user = principal.name().unwrap_or("<unknown>"),
        path = %request.uri().path(),
        "Denied admin request"
    );
    Err((StatusCode::FORBIDDEN, "Administrator privileges required").into_response())
}
