//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints, the WebSocket upgrade included, are mounted under `/api`.
//! With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;
use crate::ws;

/// Builds the API router with all REST and WebSocket endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new().nest("/api", handlers::routes().merge(ws::routes()))
}

/// Builds the full application around `state`, without middleware layers.
pub fn build_app(state: AppState) -> Router {
    let router = build_router();

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router.with_state(state)
}
