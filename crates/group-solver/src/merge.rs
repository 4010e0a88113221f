//! Parallel mode: every course is searched speculatively against the same
//! starting ledger, then the results are merged in processing order.
//!
//! A speculative placement is kept only when the search would have reached
//! it on the real ledger too: same lecturer and room orderings, and every
//! key still free. The real ledger only ever gains bookings over the
//! snapshot, so a free chosen combination stays the first one the search
//! finds. Anything else is searched again, which keeps the output equal to
//! the sequential run.

use rayon::prelude::*;
use sched_core::ScheduleError;
use std::time::Instant;
use tracing::debug;

use crate::assign::{
    self, expired, orderings, search_group, settle, GroupOutcome, Placement, SearchTrace, Unplaced,
};
use crate::balance::LoadBalancer;
use crate::ledger::ConflictLedger;
use crate::problem::{GroupTask, Problem};

struct Speculation {
    task: GroupTask,
    found: Result<Placement, Unplaced>,
    trace: SearchTrace,
}

/// Searches one course's groups in order against a private copy of the
/// starting state.
fn speculate(
    problem: &Problem<'_>,
    ledger: &ConflictLedger,
    balancer: &LoadBalancer,
    tasks: &[GroupTask],
    deadline: Option<Instant>,
) -> Result<Vec<Speculation>, ScheduleError> {
    let mut ledger = ledger.clone();
    let mut balancer = balancer.clone();
    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        let (found, trace) = if expired(deadline) {
            (Err(Unplaced::TimeBudget), SearchTrace::default())
        } else {
            search_group(problem, &ledger, &balancer, task)
        };
        if let Ok(p) = &found {
            assign::commit(problem, &mut ledger, &mut balancer, task, p)?;
        }
        out.push(Speculation {
            task: *task,
            found,
            trace,
        });
    }
    Ok(out)
}

fn reusable(
    problem: &Problem<'_>,
    ledger: &ConflictLedger,
    balancer: &LoadBalancer,
    spec: &Speculation,
) -> bool {
    match &spec.found {
        // Depend on the request alone.
        Err(Unplaced::NoLecturer)
        | Err(Unplaced::NoRoomCapacity { .. })
        | Err(Unplaced::TooFewWeekdays { .. }) => true,
        Err(Unplaced::SearchBudget) | Err(Unplaced::TimeBudget) => false,
        Err(Unplaced::NoFreeCombination) => {
            orderings(problem, balancer, &spec.task).as_ref() == Ok(&spec.trace)
        }
        Ok(p) => {
            orderings(problem, balancer, &spec.task).as_ref() == Ok(&spec.trace)
                && p.keys().into_iter().all(|k| ledger.is_free(k, p.range))
        }
    }
}

pub(crate) fn run_parallel(
    problem: &Problem<'_>,
    ledger: &mut ConflictLedger,
    balancer: &mut LoadBalancer,
    deadline: Option<Instant>,
) -> Result<Vec<GroupOutcome>, ScheduleError> {
    let courses = problem.tasks();
    let snapshot_ledger = ledger.clone();
    let snapshot_balancer = balancer.clone();

    let speculated: Vec<Vec<Speculation>> = courses
        .par_iter()
        .map(|tasks| speculate(problem, &snapshot_ledger, &snapshot_balancer, tasks, deadline))
        .collect::<Result<_, _>>()?;

    let mut out = Vec::new();
    let mut reused = 0usize;
    let mut searched = 0usize;
    for course in speculated {
        let mut diverged = false;
        for spec in course {
            let found = if expired(deadline) {
                Err(Unplaced::TimeBudget)
            } else if !diverged && reusable(problem, ledger, balancer, &spec) {
                reused += 1;
                spec.found
            } else {
                diverged = true;
                searched += 1;
                search_group(problem, ledger, balancer, &spec.task).0
            };
            out.push(settle(problem, ledger, balancer, spec.task, found)?);
        }
    }
    debug!(reused, searched, "speculative results merged");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::run_sequential;
    use crate::problem::fixtures::*;
    use types::{OccupiedSlot, ResourceType};

    fn placements(out: &[GroupOutcome]) -> Vec<Result<Placement, Unplaced>> {
        out.iter()
            .map(|o| o.result.clone().map(|(p, _)| p))
            .collect()
    }

    fn both(req: &types::ScheduleRequest) -> (Vec<GroupOutcome>, Vec<GroupOutcome>) {
        let p = Problem::build(req).unwrap();
        let fresh = || {
            let mut l = ConflictLedger::new(p.cal.clone());
            for (k, r) in p.occupied() {
                l.preload(k, r);
            }
            (l, LoadBalancer::new(p.lecturers.len(), p.rooms.len()))
        };
        let (mut l1, mut b1) = fresh();
        let seq = run_sequential(&p, &mut l1, &mut b1, None).unwrap();
        let (mut l2, mut b2) = fresh();
        let par = run_parallel(&p, &mut l2, &mut b2, None).unwrap();
        assert_eq!(b1, b2);
        assert_eq!(l1.booking_count(), l2.booking_count());
        (seq, par)
    }

    #[test]
    fn competing_courses_match_the_sequential_run() {
        let mut req = request();
        req.courses = vec![
            course("c1", 170, 30, &["l1", "l2"]),
            course("c2", 90, 45, &["l1"]),
            course("c3", 35, 15, &["l2"]),
            course("c4", 60, 60, &["l1", "l2"]),
        ];
        let (seq, par) = both(&req);
        assert_eq!(placements(&seq), placements(&par));
        assert_eq!(
            seq.iter().map(|o| o.task).collect::<Vec<_>>(),
            par.iter().map(|o| o.task).collect::<Vec<_>>()
        );
    }

    #[test]
    fn structural_failures_are_reused_as_is() {
        let mut req = request();
        req.courses = vec![course("c1", 50, 30, &["l1"]), course("c2", 130, 30, &["l2"])];
        req.rooms = vec![room("r-mid", 55)];
        let (seq, par) = both(&req);
        assert_eq!(placements(&seq), placements(&par));
        // 130 students split 60/60/10 and only the small group fits r-mid
        let failed: Vec<&Unplaced> = par
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect();
        assert_eq!(
            failed,
            vec![
                &Unplaced::NoRoomCapacity { needed: 60 },
                &Unplaced::NoRoomCapacity { needed: 60 }
            ]
        );
    }

    #[test]
    fn scarce_slots_force_re_search() {
        let mut req = request();
        req.time_slots.truncate(1);
        req.rooms = vec![room("r-only", 200)];
        req.courses = vec![
            course("c1", 50, 30, &["l1"]),
            course("c2", 50, 30, &["l2"]),
            course("c3", 50, 30, &["l1", "l2"]),
        ];
        req.occupied_slots.push(OccupiedSlot {
            resource_type: ResourceType::Room,
            resource_id: "r-only".into(),
            date: date(2025, 9, 3),
            time_slot_id: "am1".into(),
        });
        let (seq, par) = both(&req);
        assert_eq!(placements(&seq), placements(&par));
        assert!(par.iter().any(|o| o.result.is_err()));
    }
}
