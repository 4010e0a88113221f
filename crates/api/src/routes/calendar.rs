use axum::Json;
use sched_core::calendar::SemesterCalendar;
use types::{ScheduleRequest, TeachingWeek};

use crate::error::ApiError;

#[utoipa::path(
    post,
    path = "/v1/calendar",
    tag = "timetable",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Teaching weeks of the semester", body = [TeachingWeek]),
        (status = 400, description = "Dates or weekdays are unusable")
    )
)]
pub async fn calendar(
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<Vec<TeachingWeek>>, ApiError> {
    let cal = SemesterCalendar::from_request(&req)?;
    Ok(Json(cal.weeks().to_vec()))
}
