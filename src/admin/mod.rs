//! Read-only admin API.
//!
//! Served on its own listener, only when enabled, behind a bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::Readiness;
use crate::routing::RuleSet;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub rules: Arc<RuleSet>,
    pub readiness: Readiness,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(rules: Arc<RuleSet>, readiness: Readiness, api_key: &str) -> Self {
        Self {
            rules,
            readiness,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        let rules = Arc::new(RuleSet::from_config(&ProxyConfig::default()).unwrap());
        let readiness = Readiness::new();
        readiness.mark_ready();
        setup_admin_router(AdminState::new(rules, readiness, "s3cret"))
    }

    #[tokio::test]
    async fn rejects_missing_key() {
        let response = router()
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_wrong_key() {
        let request = Request::get("/admin/routes")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lists_routes_most_specific_first() {
        let request = Request::get("/admin/routes")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let routes: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(routes.len(), 15);
        let lengths: Vec<usize> = routes
            .iter()
            .map(|r| r["prefix"].as_str().unwrap().len())
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn status_reports_readiness() {
        let request = Request::get("/admin/status")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(status["ready"], true);
        assert_eq!(status["routes"], 15);
    }
}
