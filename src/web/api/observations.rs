use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::export;
use crate::observations::ObservationRecord;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::run_blocking;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/api/observations",
    tag = "observations",
    responses(
        (status = 200, description = "Logged observations", body = Vec<ObservationRecord>),
        (status = 500, description = "Observation log unreadable", body = ErrorResponse)
    )
)]
pub async fn list_observations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ObservationRecord>>> {
    let path = state.config.output.observations.clone();
    let observations = run_blocking(move || Ok(export::read_observations(&path)?)).await?;
    Ok(Json(observations))
}

#[utoipa::path(
    post,
    path = "/api/observations",
    tag = "observations",
    request_body = ObservationRecord,
    responses(
        (status = 201, description = "Observation saved", body = ObservationRecord),
        (status = 400, description = "Invalid observation", body = ErrorResponse),
        (status = 500, description = "Observation log unwritable", body = ErrorResponse)
    )
)]
pub async fn log_observation(
    State(state): State<AppState>,
    Json(mut observation): Json<ObservationRecord>,
) -> ApiResult<(StatusCode, Json<ObservationRecord>)> {
    observation.validate().map_err(ApiError::Validation)?;
    observation.observed_at.get_or_insert_with(Utc::now);

    let known = state
        .predictions
        .read()
        .await
        .iter()
        .any(|p| p.pass_id == observation.pass_id);
    if !known {
        log::warn!(
            "Logging observation for pass {} which is not among the current predictions",
            observation.pass_id
        );
    }

    let lock = state.observation_log.clone();
    let path = state.config.output.observations.clone();
    let record = observation.clone();
    let logged = run_blocking(move || {
        let _guard = lock
            .lock()
            .map_err(|_| ApiError::Internal("observation log lock poisoned".into()))?;
        Ok(export::append_observation(&path, record)?.len())
    })
    .await?;

    log::info!(
        "Logged observation for pass {} (success: {}, {} in log)",
        observation.pass_id,
        observation.success,
        logged
    );

    Ok((StatusCode::CREATED, Json(observation)))
}
