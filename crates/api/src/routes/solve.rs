use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use sched_core::Solver;
use types::{SolveEnvelope, SolverResult};
use utoipa::ToSchema;

#[derive(serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: String,
    pub status: &'static str,
}

#[utoipa::path(
    post,
    path = "/v1/solve",
    tag = "timetable",
    request_body = SolveEnvelope,
    responses((status = 200, description = "Job enqueued", body = JobCreated))
)]
pub async fn solve(
    State(state): State<AppState>,
    Json(env): Json<SolveEnvelope>,
) -> Json<JobCreated> {
    let id = state.jobs.enqueue(env);
    Json(JobCreated {
        job_id: id.0,
        status: "queued",
    })
}

/// Runs the engine inline; structural problems still come back as a
/// `FAILED` result.
#[utoipa::path(
    post,
    path = "/v1/schedule",
    tag = "timetable",
    request_body = SolveEnvelope,
    responses(
        (status = 200, description = "Generated timetable", body = SolverResult),
        (status = 500, description = "Internal invariant violated")
    )
)]
pub async fn schedule(
    State(state): State<AppState>,
    Json(env): Json<SolveEnvelope>,
) -> Result<Json<SolverResult>, ApiError> {
    let result = state.solver.solve(env).await?;
    Ok(Json(result))
}
