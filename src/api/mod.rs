//! REST API layer: route handlers, DTOs, OpenAPI document and router
//! composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_routes())
}

/// Builds the servable application: routes, request tracing, CORS and
/// state.
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(build_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS restricted to `origins`. An empty list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

#[cfg(feature = "swagger-ui")]
fn docs_routes() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;
    use utoipa::OpenApi;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(openapi::ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::oracle::{PriceOracle, StaticPriceOracle};
    use crate::persistence::{InMemoryStore, RewardStore};
    use crate::service::PriceCache;

    fn app_over(store: Arc<InMemoryStore>) -> Router {
        let store: Arc<dyn RewardStore> = store;
        let oracle: Arc<dyn PriceOracle> = Arc::new(StaticPriceOracle::new());
        let prices = Arc::new(PriceCache::new(Arc::clone(&store), oracle));
        build_app(
            AppState::new(store, prices),
            &["http://localhost:3000".to_string()],
        )
    }

    fn app() -> Router {
        app_over(Arc::new(InMemoryStore::new()))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body");
        };
        let Ok(body) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            panic!("json body");
        };
        body
    }

    fn health_request() -> Request<Body> {
        let Ok(request) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("valid request");
        };
        request
    }

    fn preflight(origin: &str) -> Request<Body> {
        let Ok(request) = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/reward")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
        else {
            panic!("valid request");
        };
        request
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_is_granted() {
        let Ok(response) = app().oneshot(preflight("http://localhost:3000")).await;
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some(&HeaderValue::from_static("true"))
        );
    }

    #[tokio::test]
    async fn preflight_from_other_origin_is_not_granted() {
        let Ok(response) = app().oneshot(preflight("http://evil.example")).await;
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_user_reads_return_empty_results() {
        let uri = format!("/api/v1/today-stocks/{}", uuid::Uuid::new_v4());
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = app().oneshot(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["rewards"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn health_reports_database_up() {
        let Ok(response) = app().oneshot(health_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "up");
    }

    #[tokio::test]
    async fn health_degrades_when_store_is_unreachable() {
        let store = Arc::new(InMemoryStore::new());
        store.set_unreachable(true);
        let Ok(response) = app_over(store).oneshot(health_request()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "down");
    }
}
