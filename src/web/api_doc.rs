use utoipa::OpenApi;

use super::api::analytics::ExportResponse;
use super::api::error::ErrorResponse;
use super::api::predict::{PredictRequest, PredictResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::predict::predict,
        super::api::predict::list_predictions,
        super::api::observations::list_observations,
        super::api::observations::log_observation,
        super::api::analytics::analytics,
        super::api::analytics::export_all,
    ),
    components(
        schemas(
            PredictRequest,
            PredictResponse,
            ExportResponse,
            ErrorResponse,
            crate::predict::ObserverLocation,
            crate::predict::PredictedPass,
            crate::predict::Visibility,
            crate::observations::ObservationRecord,
            crate::observations::Weather,
            crate::observations::Accuracy,
            crate::observations::AccuracyReport,
            crate::observations::DataQualityWarning,
            crate::report::OutcomeBreakdown,
            crate::pipeline::Analytics,
        )
    ),
    info(
        title = "ISS Pass Log API",
        description = "Predict ISS passes, log sightings and compare the two",
        version = "0.1.0"
    ),
    tags(
        (name = "predict", description = "Pass prediction"),
        (name = "observations", description = "Observation log"),
        (name = "analytics", description = "Accuracy and export")
    )
)]
pub struct ApiDoc;
