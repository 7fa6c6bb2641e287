//! Unified API router for DataBot
//!
//! Merges the assistant routes with a health probe, CORS and request tracing.
//!
//! ## Endpoint Map
//!
//! | Prefix                 | Module  | Description                          |
//! |------------------------|---------|--------------------------------------|
//! | `/health`              | api     | Health probe                         |
//! | `/api/v1/ask`          | gateway | Ask a question                       |
//! | `/api/v1/history/*`    | gateway | Conversation window, search, stats   |
//! | `/api/v1/products`     | gateway | Sales table rows                     |
//! | `/api/v1/dashboard`    | gateway | Metrics for the dashboard front-end  |
//! | `/api/v1/report`       | gateway | Commercial report                    |

use crate::gateway::{assistant_router, AppState};
use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete DataBot HTTP application
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(assistant_router(state))
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DataBot;
    use crate::memory::ConversationMemory;
    use crate::sales::SalesTable;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_app(origins: &[String]) -> Router {
        let state = AppState::new(DataBot::new(SalesTable::demo()), ConversationMemory::new(10));
        build_app(state, origins)
    }

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_app_serves_health_and_api() {
        let app = make_app(&[]);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::builder().uri("/api/v1/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = make_app(&["http://localhost:8501".to_string()]);
        let resp = app
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
