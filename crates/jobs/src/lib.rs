use parking_lot::RwLock;
use sched_core::{SolveEnvelope, Solver, SolverResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, ToSchema)]
#[serde(tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Solved { result: SolverResult },
    Failed { message: String },
}

pub struct InMemJobs<S: Solver> {
    inner: Arc<RwLock<HashMap<String, JobStatus>>>,
    solver: Arc<S>,
}

impl<S: Solver> Clone for InMemJobs<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            solver: self.solver.clone(),
        }
    }
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self::with_shared(Arc::new(solver))
    }

    pub fn with_shared(solver: Arc<S>) -> Self {
        Self {
            inner: Default::default(),
            solver,
        }
    }

    pub fn enqueue(&self, env: SolveEnvelope) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.inner.write().insert(id.clone(), JobStatus::Queued);

        let map = self.inner.clone();
        let solver = self.solver.clone();
        let id_for_task = id.clone();
        let semester = env.request.semester_id.clone();

        tokio::spawn(async move {
            map.write()
                .insert(id_for_task.clone(), JobStatus::Running);
            match solver.solve(env).await {
                Ok(result) => {
                    info!(job = %id_for_task, %semester, status = ?result.solver_status, "job solved");
                    map.write()
                        .insert(id_for_task, JobStatus::Solved { result });
                }
                Err(e) => {
                    error!(job = %id_for_task, ?e, "job failed");
                    map.write().insert(
                        id_for_task,
                        JobStatus::Failed {
                            message: e.to_string(),
                        },
                    );
                }
            }
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;
    use types::{ScheduleRequest, SolveParams, SolverStatus};

    struct Echo {
        fail: bool,
    }

    #[async_trait]
    impl Solver for Echo {
        async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolverResult> {
            if self.fail {
                anyhow::bail!("internal invariant violated: test");
            }
            let req = env.request;
            Ok(SolverResult {
                semester_id: req.semester_id,
                semester_start_date: req.semester_start_date,
                semester_end_date: req.semester_end_date,
                scheduled_courses: vec![],
                load_difference: 0,
                total_original_sessions_to_schedule: 0,
                total_sessions_scheduled: 0,
                solver_duration_seconds: 0.0,
                solver_status: SolverStatus::Success,
                solver_message: String::new(),
            })
        }
    }

    fn envelope() -> SolveEnvelope {
        let json = serde_json::json!({
            "semesterId": "2025-fall",
            "semesterStartDate": "2025-09-01",
            "semesterEndDate": "2026-01-31",
            "teachableWeekdays": ["monday"],
            "timeSlots": [],
            "rooms": [],
            "lecturerIds": [],
            "courses": []
        });
        let request: ScheduleRequest = serde_json::from_value(json).unwrap();
        SolveEnvelope {
            request,
            params: SolveParams::default(),
        }
    }

    async fn settle<S: Solver>(jobs: &InMemJobs<S>, id: &JobId) -> JobStatus {
        for _ in 0..100 {
            match jobs.get(&id.0) {
                Some(JobStatus::Queued) | Some(JobStatus::Running) | None => {
                    tokio::time::sleep(Duration::from_millis(10)).await
                }
                Some(done) => return done,
            }
        }
        panic!("job {} did not finish", id.0);
    }

    #[tokio::test]
    async fn solved_job_keeps_its_result() {
        let jobs = InMemJobs::new(Echo { fail: false });
        let id = jobs.enqueue(envelope());
        match settle(&jobs, &id).await {
            JobStatus::Solved { result } => {
                assert_eq!(result.semester_id.as_str(), "2025-fall");
                assert_eq!(
                    result.semester_start_date,
                    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn solver_error_marks_the_job_failed() {
        let jobs = InMemJobs::new(Echo { fail: true });
        let id = jobs.enqueue(envelope());
        match settle(&jobs, &id).await {
            JobStatus::Failed { message } => assert!(message.contains("invariant")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(jobs.get("missing").is_none());
    }
}
