use axum::{extract::State, Json};
use serde::Serialize;
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::export;
use crate::pipeline::{analyze, Analytics};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::api::run_blocking;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExportResponse {
    #[schema(value_type = Vec<String>)]
    pub files: Vec<PathBuf>,
    pub rows: usize,
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "analytics",
    responses(
        (status = 200, description = "Accuracy and pass statistics", body = Analytics),
        (status = 500, description = "Observation log unreadable", body = ErrorResponse)
    )
)]
pub async fn analytics(State(state): State<AppState>) -> ApiResult<Json<Analytics>> {
    let path = state.config.output.observations.clone();
    let observations = run_blocking(move || Ok(export::read_observations(&path)?)).await?;
    let predictions = state.predictions.read().await;
    Ok(Json(analyze(&predictions, &observations)))
}

#[utoipa::path(
    post,
    path = "/api/export",
    tag = "analytics",
    responses(
        (status = 200, description = "CSV files written", body = ExportResponse),
        (status = 500, description = "Write failed", body = ErrorResponse)
    )
)]
pub async fn export_all(State(state): State<AppState>) -> ApiResult<Json<ExportResponse>> {
    let predictions = state.predictions.read().await.clone();
    let output = state.config.output.clone();
    let lock = state.observation_log.clone();

    let rows = run_blocking(move || {
        let _guard = lock
            .lock()
            .map_err(|_| ApiError::Internal("observation log lock poisoned".into()))?;
        let observations = export::read_observations(&output.observations)?;
        let analytics = analyze(&predictions, &observations);

        export::write_predictions(&output.predictions, &predictions)?;
        export::write_observations(&output.observations, &observations)?;
        export::write_merged(&output.merged, &analytics.merged)?;
        Ok(analytics.merged.len())
    })
    .await?;

    let output = &state.config.output;
    Ok(Json(ExportResponse {
        files: vec![
            output.predictions.clone(),
            output.observations.clone(),
            output.merged.clone(),
        ],
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observations::{ObservationRecord, Weather};
    use crate::web::api::predict::{predict, PredictRequest};
    use crate::web::api::test_support::state_in;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn analytics_and_export_cover_logged_observations() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let request = PredictRequest {
            start: Some(Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()),
            days: Some(1),
            ..Default::default()
        };
        let Json(predicted) = predict(State(state.clone()), Json(request)).await.unwrap();
        let observations = vec![
            ObservationRecord::new(predicted.passes[0].pass_id.clone(), false, Weather::Cloudy),
            ObservationRecord::new("X", true, Weather::Clear),
        ];
        export::write_observations(&state.config.output.observations, &observations).unwrap();

        let Json(report) = analytics(State(state.clone())).await.unwrap();
        assert_eq!(report.accuracy.overall.matched, 1);
        assert_eq!(report.accuracy.overall.ratio, Some(0.0));
        assert_eq!(report.warnings.len(), 1);

        let Json(exported) = export_all(State(state.clone())).await.unwrap();
        assert_eq!(exported.rows, predicted.passes.len() + 1);
        assert!(state.config.output.merged.exists());
        assert_eq!(
            export::read_observations(&state.config.output.observations).unwrap(),
            observations
        );
    }

    #[tokio::test]
    async fn analytics_without_observations_has_undefined_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let Json(report) = analytics(State(state_in(dir.path()))).await.unwrap();
        assert_eq!(report.accuracy.overall.matched, 0);
        assert_eq!(report.accuracy.overall.ratio, None);
    }
}
