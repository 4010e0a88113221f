use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use sched_core::scoring::{audit as run_audit, Audit};
use types::{ScheduleRequest, SolverResult};

use crate::error::ApiError;

#[derive(Deserialize, ToSchema)]
pub struct AuditIn {
    pub request: ScheduleRequest,
    pub result: SolverResult,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub clean: bool,
    pub lecturer_loads: BTreeMap<String, u32>,
    pub load_difference: u32,
    pub double_bookings: Vec<String>,
    pub capacity_violations: Vec<String>,
    pub calendar_violations: Vec<String>,
}

impl From<Audit> for AuditReport {
    fn from(a: Audit) -> Self {
        Self {
            clean: a.is_clean(),
            lecturer_loads: a.lecturer_loads,
            load_difference: a.load_difference,
            double_bookings: a.double_bookings,
            capacity_violations: a.capacity_violations,
            calendar_violations: a.calendar_violations,
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/audit",
    tag = "timetable",
    request_body = AuditIn,
    responses(
        (status = 200, description = "Conflicts and loads found in a timetable", body = AuditReport),
        (status = 400, description = "Request calendar is unusable")
    )
)]
pub async fn audit(Json(input): Json<AuditIn>) -> Result<Json<AuditReport>, ApiError> {
    let a = run_audit(&input.request, &input.result)?;
    Ok(Json(a.into()))
}
