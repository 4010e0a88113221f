//! Greedy class-group placement over a semester calendar.
//!
//! Courses are taken heaviest first; each of their groups gets one
//! lecturer and a fixed weekly pattern that stays conflict-free for every
//! teaching week the group runs.

mod assemble;
mod assign;
pub mod balance;
pub mod ledger;
mod merge;
mod problem;

use async_trait::async_trait;
use sched_core::{ScheduleError, SolveEnvelope, SolveParams, Solver, SolverResult};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::{ScheduleRequest, SolveMode};

use balance::LoadBalancer;
use ledger::ConflictLedger;
use problem::Problem;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: SolveMode,
    /// Wall-clock budget for the placement phase.
    pub time_budget: Option<Duration>,
}

impl From<&SolveParams> for EngineOptions {
    fn from(p: &SolveParams) -> Self {
        Self {
            mode: p.mode,
            time_budget: p.time_limit_sec.map(Duration::from_secs),
        }
    }
}

pub fn generate_schedule(req: &ScheduleRequest) -> Result<SolverResult, ScheduleError> {
    generate_schedule_with(req, &EngineOptions::default())
}

/// Structural problems in `req` come back as a `FAILED` result; `Err` is
/// reserved for internal invariant violations.
pub fn generate_schedule_with(
    req: &ScheduleRequest,
    opts: &EngineOptions,
) -> Result<SolverResult, ScheduleError> {
    let problem = match Problem::build(req) {
        Ok(p) => p,
        Err(e) if e.is_structural() => {
            warn!(semester = %req.semester_id, error = %e, "request rejected");
            return Ok(assemble::failed(req, &e));
        }
        Err(e) => return Err(e),
    };
    info!(
        semester = %req.semester_id,
        courses = problem.plans.len(),
        weeks = problem.cal.week_count(),
        mode = ?opts.mode,
        "scheduling"
    );

    let mut ledger = ConflictLedger::new(problem.cal.clone());
    let occupied = problem.occupied();
    debug!(count = occupied.len(), "preloading occupied slots");
    for (key, range) in occupied {
        ledger.preload(key, range);
    }
    let mut balancer = LoadBalancer::new(problem.lecturers.len(), problem.rooms.len());

    let started = Instant::now();
    let deadline = opts.time_budget.map(|b| started + b);
    let outcomes = match opts.mode {
        SolveMode::Sequential => {
            assign::run_sequential(&problem, &mut ledger, &mut balancer, deadline)?
        }
        SolveMode::Parallel => merge::run_parallel(&problem, &mut ledger, &mut balancer, deadline)?,
    };
    let elapsed = started.elapsed();

    let result = assemble::assemble(&problem, outcomes, &balancer, elapsed);
    info!(
        status = ?result.solver_status,
        sessions = result.total_sessions_scheduled,
        required = result.total_original_sessions_to_schedule,
        load_difference = result.load_difference,
        elapsed_ms = elapsed.as_millis() as u64,
        "schedule generated"
    );
    Ok(result)
}

/// [`Solver`] over the placement engine. Runs on the blocking pool.
#[derive(Clone, Debug, Default)]
pub struct GroupSolver {
    default_time_limit: Option<Duration>,
}

impl GroupSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Budget applied when a job does not carry its own `timeLimitSec`.
    pub fn with_time_limit(limit: Option<Duration>) -> Self {
        Self {
            default_time_limit: limit,
        }
    }
}

#[async_trait]
impl Solver for GroupSolver {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolverResult> {
        let mut opts = EngineOptions::from(&env.params);
        if opts.time_budget.is_none() {
            opts.time_budget = self.default_time_limit;
        }
        let result =
            tokio::task::spawn_blocking(move || generate_schedule_with(&env.request, &opts))
                .await??;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::fixtures::*;
    use types::SolverStatus;

    #[test]
    fn empty_rooms_fail_before_search() {
        let mut req = request();
        req.rooms.clear();
        let res = generate_schedule(&req).unwrap();
        assert_eq!(res.solver_status, SolverStatus::Failed);
        assert!(res.solver_message.contains("rooms is empty"));
    }

    #[test]
    fn params_convert_to_options() {
        let params = SolveParams {
            mode: SolveMode::Parallel,
            time_limit_sec: Some(3),
        };
        assert_eq!(
            EngineOptions::from(&params),
            EngineOptions {
                mode: SolveMode::Parallel,
                time_budget: Some(Duration::from_secs(3)),
            }
        );
    }

    #[tokio::test]
    async fn solver_trait_runs_the_engine() {
        let solver = GroupSolver::with_time_limit(Some(Duration::from_secs(30)));
        let res = solver
            .solve(SolveEnvelope {
                request: request(),
                params: SolveParams::default(),
            })
            .await
            .unwrap();
        assert_eq!(res.solver_status, SolverStatus::Success);
        assert_eq!(res.total_sessions_scheduled, 30);
    }
}
