use crate::handlers;
use crate::middleware::{principal_middleware, require_admin};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/lookup-cache", delete(handlers::clear_cache))
        .route("/admin/lookup-cache/stats", get(handlers::cache_stats))
        .route("/admin/lookup-cache/entries", get(handlers::cache_entries))
        .route(
            "/admin/lookup-cache/entries/{identity}",
            delete(handlers::invalidate_entry),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/whoami", get(handlers::whoami))
        // Admin routes
        .merge(admin)
        // Middleware
        .layer(middleware::from_fn(principal_middleware))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::authentication::{
        REMOTE_ADMIN_DATABASES, REMOTE_ROLES, REMOTE_SID, REMOTE_USER,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use bastion::directory::StaticGroupMembership;
    use bastion::{AccessDecisionEngine, AdminLookupCache, AnonymousAccessMode, LookupSettings};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(anonymous_access: AnonymousAccessMode) -> AppState {
        let directory = StaticGroupMembership::new(["Domain Admins"])
            .with_user("CORP\\alice", ["Domain Admins"])
            .with_user("CORP\\bob", ["Sales"]);
        let engine = AccessDecisionEngine::new(
            Arc::new(directory),
            Arc::new(AdminLookupCache::new(LookupSettings::default())),
        );
        AppState::new(Arc::new(engine), anonymous_access)
    }

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ALICE: [(&str, &str); 2] = [(REMOTE_USER, "CORP\\alice"), (REMOTE_SID, "S-1-5-21-1")];
    const BOB: [(&str, &str); 2] = [(REMOTE_USER, "CORP\\bob"), (REMOTE_SID, "S-1-5-21-2")];

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state(AnonymousAccessMode::None));
        let response = app
            .oneshot(request(Method::GET, "/health", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_require_authentication() {
        let app = build_router(state(AnonymousAccessMode::None));
        let response = app
            .oneshot(request(Method::GET, "/admin/lookup-cache/stats", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_anonymous_admin_mode_opens_admin_routes() {
        let app = build_router(state(AnonymousAccessMode::Admin));
        let response = app
            .oneshot(request(Method::GET, "/admin/lookup-cache/stats", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let app = build_router(state(AnonymousAccessMode::None));
        let response = app
            .oneshot(request(Method::GET, "/admin/lookup-cache/stats", &BOB))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_directory_admin_sees_cache() {
        let state = state(AnonymousAccessMode::None);
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/admin/lookup-cache/stats", &ALICE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats = json(response).await;
        assert_eq!(stats["size"], 1);
        assert_eq!(stats["misses"], 1);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/admin/lookup-cache/entries", &ALICE))
            .await
            .unwrap();
        let entries = json(response).await;
        assert_eq!(entries[0]["identity"], "S-1-5-21-1");
        assert_eq!(entries[0]["is_admin"], true);
        assert_eq!(entries[0]["usage"], 2);

        let response = app
            .oneshot(request(
                Method::DELETE,
                "/admin/lookup-cache/entries/S-1-5-21-2",
                &ALICE,
            ))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["removed"], false);
        assert_eq!(state.engine.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let state = state(AnonymousAccessMode::None);
        let app = build_router(state.clone());

        let response = app
            .oneshot(request(Method::DELETE, "/admin/lookup-cache", &ALICE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["removed"], 1);
        assert!(state.engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_role_marker_admin_skips_cache() {
        let state = state(AnonymousAccessMode::None);
        let app = build_router(state.clone());

        let response = app
            .oneshot(request(
                Method::GET,
                "/admin/lookup-cache/stats",
                &[
                    (REMOTE_USER, "HOST\\carol"),
                    (REMOTE_SID, "S-1-5-21-3"),
                    (REMOTE_ROLES, "BUILTIN\\Administrators"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_whoami_with_database_claims() {
        let app = build_router(state(AnonymousAccessMode::None));
        let claims = [(REMOTE_USER, "api-key"), (REMOTE_ADMIN_DATABASES, "Orders")];

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/whoami?database=orders", &claims))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["kind"], "database_scoped");
        assert_eq!(body["is_admin"], true);

        let response = app
            .oneshot(request(Method::GET, "/whoami", &claims))
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["database"], "<system>");
        assert_eq!(body["is_admin"], false);
    }
}
