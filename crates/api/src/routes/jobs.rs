use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use jobs::JobStatus;
use types::SolverResult;

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}",
    tag = "timetable",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job status", body = JobStatus),
        (status = 404, description = "Unknown job")
    )
)]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    state
        .jobs
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {id} not found")))
}

#[utoipa::path(
    get,
    path = "/v1/jobs/{id}/result",
    tag = "timetable",
    params(("id" = String, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Timetable of a solved job", body = SolverResult),
        (status = 404, description = "Unknown job"),
        (status = 409, description = "Job not solved (yet)")
    )
)]
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SolverResult>, ApiError> {
    match state.jobs.get(&id) {
        Some(JobStatus::Solved { result }) => Ok(Json(result)),
        Some(JobStatus::Failed { message }) => {
            Err(ApiError::NotReady(format!("job {id} failed: {message}")))
        }
        Some(_) => Err(ApiError::NotReady(format!("job {id} is still running"))),
        None => Err(ApiError::NotFound(format!("job {id} not found"))),
    }
}
