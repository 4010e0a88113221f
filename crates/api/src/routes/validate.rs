use axum::Json;
use sched_core::{validate, ScheduleError};
use serde::Serialize;
use types::ScheduleRequest;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ValidationReport {
    pub ok: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/v1/validate",
    tag = "timetable",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Structural checks of a schedule request", body = ValidationReport)
    )
)]
pub async fn validate_handler(Json(req): Json<ScheduleRequest>) -> Json<ValidationReport> {
    match validate(&req) {
        Ok(()) => Json(ValidationReport {
            ok: true,
            errors: vec![],
        }),
        Err(ScheduleError::InvalidInput(msg)) | Err(ScheduleError::Invariant(msg)) => {
            let errors = msg
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Json(ValidationReport { ok: false, errors })
        }
    }
}
