use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::config::validate_days;
use crate::export;
use crate::pipeline::predict_passes;
use crate::predict::{best_passes, ObserverLocation, PassSearch, PredictedPass};
use crate::report::passes_per_day;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::run_blocking;
use crate::web::state::AppState;

/// Every field falls back to the server configuration.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub elevation_m: Option<f64>,
    pub days: Option<u32>,
    pub min_altitude_deg: Option<f64>,
    /// Window start, now when omitted.
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    pub location: ObserverLocation,
    pub passes: Vec<PredictedPass>,
    pub passes_per_day: BTreeMap<NaiveDate, usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PredictionsQuery {
    /// Only passes peaking at or above this altitude (degrees).
    pub min_altitude: Option<f64>,
}

#[utoipa::path(
    post,
    path = "/api/predict",
    tag = "predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Passes found", body = PredictResponse),
        (status = 400, description = "Invalid location or window", body = ErrorResponse),
        (status = 502, description = "TLE catalog unreachable or malformed", body = ErrorResponse)
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    let config = &state.config;
    let location = ObserverLocation::new(
        request
            .latitude_deg
            .unwrap_or(config.observer.latitude_deg),
        request
            .longitude_deg
            .unwrap_or(config.observer.longitude_deg),
        request.elevation_m.unwrap_or(config.observer.elevation_m),
    );
    let days = request.days.unwrap_or(config.prediction.days);
    validate_days(days)?;

    let search = PassSearch::days_ahead(
        request.start.unwrap_or_else(Utc::now),
        days,
        config.prediction.step,
        request
            .min_altitude_deg
            .unwrap_or(config.prediction.min_altitude_deg),
    );
    let max_age = config.tle.max_age;
    let predictions_path = config.output.predictions.clone();

    let cache = state.tle_cache.clone();
    let passes = run_blocking(move || {
        let mut cache = cache
            .lock()
            .map_err(|_| ApiError::Internal("TLE cache lock poisoned".into()))?;
        let passes = predict_passes(&mut *cache, max_age, location, search)?;
        export::write_predictions(&predictions_path, &passes)?;
        Ok(passes)
    })
    .await?;

    let response = PredictResponse {
        location,
        passes_per_day: passes_per_day(&passes),
        passes: passes.clone(),
    };
    *state.predictions.write().await = passes;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/predictions",
    tag = "predict",
    params(PredictionsQuery),
    responses(
        (status = 200, description = "Latest predictions", body = Vec<PredictedPass>)
    )
)]
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictionsQuery>,
) -> ApiResult<Json<Vec<PredictedPass>>> {
    let predictions = state.predictions.read().await;
    let passes = match query.min_altitude {
        Some(threshold) => best_passes(&predictions, threshold),
        None => predictions.clone(),
    };
    Ok(Json(passes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::Unreachable;
    use crate::web::api::test_support::{state_in, state_with_source};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::TimeZone;

    fn two_days_after_epoch() -> PredictRequest {
        PredictRequest {
            start: Some(Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()),
            days: Some(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn predicts_stores_and_exports_passes() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        let Json(response) = predict(State(state.clone()), Json(two_days_after_epoch()))
            .await
            .unwrap();

        assert!(!response.passes.is_empty());
        assert_eq!(response.location, ObserverLocation::default());
        assert_eq!(
            response.passes_per_day.values().sum::<usize>(),
            response.passes.len()
        );
        assert_eq!(*state.predictions.read().await, response.passes);
        assert_eq!(
            export::read_predictions(&state.config.output.predictions).unwrap(),
            response.passes
        );
    }

    #[tokio::test]
    async fn window_over_fourteen_days_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = PredictRequest {
            days: Some(15),
            ..two_days_after_epoch()
        };

        let response = predict(State(state_in(dir.path())), Json(request))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_location_and_altitude_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        for request in [
            PredictRequest {
                latitude_deg: Some(91.0),
                ..two_days_after_epoch()
            },
            PredictRequest {
                min_altitude_deg: Some(95.0),
                ..two_days_after_epoch()
            },
        ] {
            let response = predict(State(state.clone()), Json(request))
                .await
                .into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert!(!state.config.output.predictions.exists());
    }

    #[tokio::test]
    async fn catalog_failure_is_a_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_source(dir.path(), Box::new(Unreachable));

        let response = predict(State(state.clone()), Json(two_days_after_epoch()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.predictions.read().await.is_empty());
    }

    #[tokio::test]
    async fn min_altitude_query_keeps_best_passes() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let Json(response) = predict(State(state.clone()), Json(two_days_after_epoch()))
            .await
            .unwrap();

        let Json(all) = list_predictions(
            State(state.clone()),
            Query(PredictionsQuery { min_altitude: None }),
        )
        .await
        .unwrap();
        let Json(best) = list_predictions(
            State(state),
            Query(PredictionsQuery {
                min_altitude: Some(30.0),
            }),
        )
        .await
        .unwrap();

        assert_eq!(all, response.passes);
        assert!(best.len() <= all.len());
        assert!(best.iter().all(|p| p.peak_altitude >= 30.0));
        assert_eq!(
            best.len(),
            all.iter().filter(|p| p.peak_altitude >= 30.0).count()
        );
    }
}
