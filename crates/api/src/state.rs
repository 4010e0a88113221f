use group_solver::GroupSolver;
use jobs::InMemJobs;
use std::sync::Arc;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<GroupSolver>>,
    pub solver: Arc<GroupSolver>,
}

impl AppState {
    pub fn new(cfg: &Config) -> Self {
        let solver = Arc::new(GroupSolver::with_time_limit(cfg.solver_time_limit));
        let jobs = InMemJobs::with_shared(solver.clone());
        Self {
            jobs: Arc::new(jobs),
            solver,
        }
    }
}
