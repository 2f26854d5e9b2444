use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;

use super::api::analytics as analytics_handlers;
use super::api::observations as observation_handlers;
use super::api::predict as predict_handlers;
use super::api_doc::ApiDoc;
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Prediction
        .route("/api/predict", post(predict_handlers::predict))
        .route("/api/predictions", get(predict_handlers::list_predictions))
        // Observation log
        .route(
            "/api/observations",
            get(observation_handlers::list_observations)
                .post(observation_handlers::log_observation),
        )
        // Analytics and export
        .route("/api/analytics", get(analytics_handlers::analytics))
        .route("/api/export", post(analytics_handlers::export_all))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let app = router(AppState::new(config));

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
