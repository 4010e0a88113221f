mod config;
mod error;
mod state;
mod telemetry;
pub mod routes {
    pub mod audit;
    pub mod calendar;
    pub mod health;
    pub mod jobs;
    pub mod solve;
    pub mod validate;
}

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::validate::validate_handler,
        routes::calendar::calendar,
        routes::solve::schedule,
        routes::solve::solve,
        routes::jobs::status,
        routes::jobs::result,
        routes::audit::audit,
    ),
    components(schemas(
        types::ScheduleRequest, types::CourseDemand, types::Room, types::TimeSlot,
        types::OccupiedSlot, types::ResourceType, types::DayOfWeek, types::SolveParams,
        types::SolveMode, types::SolveEnvelope, types::SolverResult, types::SolverStatus,
        types::ScheduledCourse, types::CourseStatus, types::ClassGroup,
        types::WeeklyScheduleDetail, types::TeachingWeek, types::TeachingDay, types::DayStatus,
        types::SemesterId, types::CourseId, types::RoomId, types::LecturerId, types::TimeslotId,
        jobs::JobId, jobs::JobStatus,
        routes::validate::ValidationReport,
        routes::solve::JobCreated,
        routes::audit::AuditIn,
        routes::audit::AuditReport
    )),
    tags(
        (name = "timetable", description = "Class-group timetable generation")
    )
)]
struct ApiDoc;

fn app(state: state::AppState, cfg: &config::Config) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/validate", post(routes::validate::validate_handler))
        .route("/v1/calendar", post(routes::calendar::calendar))
        .route("/v1/schedule", post(routes::solve::schedule))
        .route("/v1/solve", post(routes::solve::solve))
        .route("/v1/jobs/:id", get(routes::jobs::status))
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .route("/v1/audit", post(routes::audit::audit))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack(cfg.body_limit))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::Config::from_env()?;
    telemetry::init_tracing(&cfg);

    let app = app(state::AppState::new(&cfg), &cfg);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, body_limit = cfg.body_limit, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
