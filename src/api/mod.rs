// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorResponse,
    models::{IntentListResponse, IntentStatus, IntentStatusRecord},
    state::AppState,
};

pub mod health;
pub mod status;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/status", get(status::relay_status))
        .route("/status/{event_id}", get(status::intent_status))
        .route("/intents", get(status::list_intents));

    #[cfg(feature = "dev")]
    let routes = routes.route("/trigger", axum::routing::post(status::trigger_intent));

    Router::new()
        .merge(routes.with_state(state))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi_doc()))
        .layer(CorsLayer::permissive())
}

fn openapi_doc() -> utoipa::openapi::OpenApi {
    let doc = ApiDoc::openapi();
    #[cfg(feature = "dev")]
    let doc = {
        let mut doc = doc;
        doc.merge(TriggerDoc::openapi());
        doc
    };
    doc
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        status::relay_status,
        status::intent_status,
        status::list_intents
    ),
    components(
        schemas(
            health::HealthResponse,
            status::RelayStatusResponse,
            IntentStatus,
            IntentStatusRecord,
            IntentListResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Status", description = "Relay and intent status")
    )
)]
struct ApiDoc;

#[cfg(feature = "dev")]
#[derive(OpenApi)]
#[openapi(
    paths(status::trigger_intent),
    components(schemas(crate::models::TriggerRequest, crate::models::TriggerResponse))
)]
struct TriggerDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::state::RelaySnapshot;
    use crate::status::StatusBoard;
    use tokio::sync::mpsc;

    fn test_state() -> AppState {
        let (tx, _rx) = mpsc::channel(8);
        let config = RelayConfig::from_env();
        let snapshot = RelaySnapshot::new(&config, "0xrelayer".to_string(), "mock".to_string());
        AppState::new(StatusBoard::new(), tx, snapshot)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_doc_includes_status_paths() {
        let doc = openapi_doc();
        assert!(doc.paths.paths.contains_key("/status"));
        assert!(doc.paths.paths.contains_key("/status/{event_id}"));
        assert!(doc.paths.paths.contains_key("/intents"));
    }
}
