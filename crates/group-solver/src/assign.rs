//! Placement search for class groups.
//!
//! For each group: lecturers in load order, then a depth-first walk over
//! the weekly grid picking `sessions_per_week` cells on distinct weekdays
//! where both the lecturer and some sufficient room are free for the
//! group's whole week range. The range starts at the nominal
//! `weeks_for_group` weeks and is stretched over later weeks when
//! holidays on the chosen weekdays would leave the course load short.

use chrono::NaiveDate;
use sched_core::calendar::{SemesterCalendar, WeekRange};
use sched_core::ScheduleError;
use std::fmt;
use std::time::Instant;
use tracing::debug;

use crate::balance::LoadBalancer;
use crate::ledger::{ConflictKey, ConflictLedger};
use crate::problem::{Cell, GroupTask, Problem};

/// DFS nodes one group may expand across all of its lecturers.
pub(crate) const NODE_BUDGET: u64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Unplaced {
    NoLecturer,
    NoRoomCapacity { needed: u32 },
    TooFewWeekdays { open: u32, needed: u32 },
    NoFreeCombination,
    SearchBudget,
    TimeBudget,
}

impl fmt::Display for Unplaced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unplaced::NoLecturer => f.write_str("no potential lecturer"),
            Unplaced::NoRoomCapacity { needed } => {
                write!(f, "no room with capacity >= {needed}")
            }
            Unplaced::TooFewWeekdays { open, needed } => write!(
                f,
                "{needed} weekly meetings need distinct weekdays but only {open} are teachable"
            ),
            Unplaced::NoFreeCombination => {
                f.write_str("no conflict-free lecturer, room and weekly pattern")
            }
            Unplaced::SearchBudget => f.write_str("search budget exhausted"),
            Unplaced::TimeBudget => f.write_str("time budget exhausted"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Meeting {
    pub cell: Cell,
    pub room: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    pub lecturer: u32,
    /// Sorted by weekday, so chronological within a week.
    pub meetings: Vec<Meeting>,
    pub range: WeekRange,
}

impl Placement {
    pub fn keys(&self) -> Vec<ConflictKey> {
        self.meetings
            .iter()
            .flat_map(|m| {
                [
                    ConflictKey::lecturer(self.lecturer, m.cell.day, m.cell.slot),
                    ConflictKey::room(m.room, m.cell.day, m.cell.slot),
                ]
            })
            .collect()
    }
}

/// Sessions a placement actually delivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub per_meeting: Vec<u32>,
    pub total: u32,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

#[derive(Clone, Debug)]
pub(crate) struct GroupOutcome {
    pub task: GroupTask,
    pub result: Result<(Placement, Delivery), Unplaced>,
}

/// Candidate orderings a search consulted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SearchTrace {
    pub lecturers: Vec<u32>,
    pub rooms: Vec<u32>,
}

pub(crate) fn orderings(
    problem: &Problem<'_>,
    balancer: &LoadBalancer,
    task: &GroupTask,
) -> Result<SearchTrace, Unplaced> {
    let plan = &problem.plans[task.plan];
    let capacity = plan.groups[task.group].capacity;

    let lecturers: Vec<u32> = plan
        .potential_lecturers
        .iter()
        .filter_map(|l| problem.lecturer_idx(l.as_str()))
        .collect();
    if lecturers.is_empty() {
        return Err(Unplaced::NoLecturer);
    }

    let rooms: Vec<(u32, u32)> = problem
        .rooms
        .iter()
        .enumerate()
        .filter(|(_, r)| r.capacity >= capacity)
        .map(|(i, r)| (i as u32, r.capacity))
        .collect();
    if rooms.is_empty() {
        return Err(Unplaced::NoRoomCapacity { needed: capacity });
    }

    Ok(SearchTrace {
        lecturers: balancer.lecturer_order(&lecturers),
        rooms: balancer.room_order(&rooms),
    })
}

/// Walks `need`-sized picks of `cells` on pairwise distinct weekdays in
/// lexicographic order of positions and returns the first one `accept`
/// turns into a value. Explicit stack; each examined position costs one
/// unit of `budget`.
fn choose_meetings<T>(
    cells: &[Cell],
    need: usize,
    budget: &mut u64,
    mut accept: impl FnMut(&[usize]) -> Option<T>,
) -> Result<Option<T>, Unplaced> {
    let mut stack: Vec<usize> = Vec::with_capacity(need);
    if need == 0 {
        return Ok(accept(&stack[..]));
    }
    let mut used_days: u8 = 0;
    let mut next = 0usize;

    loop {
        if stack.len() == need {
            if let Some(found) = accept(&stack[..]) {
                return Ok(Some(found));
            }
            if let Some(i) = stack.pop() {
                used_days &= !(1u8 << cells[i].day);
                next = i + 1;
            }
        }
        let mut pushed = false;
        while next < cells.len() && cells.len() - next >= need - stack.len() {
            if *budget == 0 {
                return Err(Unplaced::SearchBudget);
            }
            *budget -= 1;
            let i = next;
            next += 1;
            let bit = 1u8 << cells[i].day;
            if used_days & bit == 0 {
                used_days |= bit;
                stack.push(i);
                pushed = true;
                break;
            }
        }
        if !pushed {
            match stack.pop() {
                Some(i) => {
                    used_days &= !(1u8 << cells[i].day);
                    next = i + 1;
                }
                None => return Ok(None),
            }
        }
    }
}

pub(crate) fn search_group(
    problem: &Problem<'_>,
    ledger: &ConflictLedger,
    balancer: &LoadBalancer,
    task: &GroupTask,
) -> (Result<Placement, Unplaced>, SearchTrace) {
    let trace = match orderings(problem, balancer, task) {
        Ok(t) => t,
        Err(u) => return (Err(u), SearchTrace::default()),
    };
    let plan = &problem.plans[task.plan];
    let need = plan.sessions_per_week as usize;
    let open = problem.open_days().len();
    if open < need {
        return (
            Err(Unplaced::TooFewWeekdays {
                open: open as u32,
                needed: need as u32,
            }),
            trace,
        );
    }

    let nominal = problem.group_range(plan);
    let cells = problem.candidate_cells(task.seq, nominal);
    let mut budget = NODE_BUDGET;

    for &lecturer in &trace.lecturers {
        // Anything busy inside the nominal weeks is busy in every extension.
        let feasible: Vec<Cell> = cells
            .iter()
            .copied()
            .filter(|c| ledger.is_free(ConflictKey::lecturer(lecturer, c.day, c.slot), nominal))
            .filter(|c| {
                trace
                    .rooms
                    .iter()
                    .any(|&r| ledger.is_free(ConflictKey::room(r, c.day, c.slot), nominal))
            })
            .collect();

        let found = choose_meetings(&feasible, need, &mut budget, |picked| {
            let mut chosen: Vec<Cell> = picked.iter().map(|&i| feasible[i]).collect();
            chosen.sort();
            let days: Vec<u8> = chosen.iter().map(|c| c.day).collect();
            let range = problem.cal.cover(&days, nominal, plan.total_sessions);
            let meetings = chosen
                .into_iter()
                .map(|cell| {
                    if !ledger.is_free(ConflictKey::lecturer(lecturer, cell.day, cell.slot), range) {
                        return None;
                    }
                    trace
                        .rooms
                        .iter()
                        .find(|&&r| ledger.is_free(ConflictKey::room(r, cell.day, cell.slot), range))
                        .map(|&room| Meeting { cell, room })
                })
                .collect::<Option<Vec<Meeting>>>()?;
            Some(Placement {
                lecturer,
                meetings,
                range,
            })
        });

        match found {
            Ok(Some(placement)) => return (Ok(placement), trace),
            Ok(None) => continue,
            Err(u) => return (Err(u), trace),
        }
    }
    (Err(Unplaced::NoFreeCombination), trace)
}

/// Walks the group's weeks in order and counts meetings until `required`
/// sessions are reached; the last week may hold fewer meetings than the
/// pattern.
pub(crate) fn deliver(cal: &SemesterCalendar, placement: &Placement, required: u32) -> Delivery {
    let mut out = Delivery {
        per_meeting: vec![0; placement.meetings.len()],
        total: 0,
        first: None,
        last: None,
    };
    'weeks: for week in placement.range.first..=placement.range.last {
        for (i, m) in placement.meetings.iter().enumerate() {
            if out.total >= required {
                break 'weeks;
            }
            if !cal.is_usable(week, m.cell.day) {
                continue;
            }
            if let Some(date) = cal.date_of(week, m.cell.day) {
                out.per_meeting[i] += 1;
                out.total += 1;
                out.first.get_or_insert(date);
                out.last = Some(date);
            }
        }
    }
    out
}

pub(crate) fn commit(
    problem: &Problem<'_>,
    ledger: &mut ConflictLedger,
    balancer: &mut LoadBalancer,
    task: &GroupTask,
    placement: &Placement,
) -> Result<Delivery, ScheduleError> {
    ledger.commit_group(&placement.keys(), placement.range, task.handle())?;
    let plan = &problem.plans[task.plan];
    let delivery = deliver(&problem.cal, placement, plan.total_sessions);
    let rooms: Vec<(u32, u32)> = placement
        .meetings
        .iter()
        .zip(&delivery.per_meeting)
        .map(|(m, &n)| (m.room, n))
        .collect();
    balancer.record(placement.lecturer, delivery.total, &rooms);
    Ok(delivery)
}

pub(crate) fn settle(
    problem: &Problem<'_>,
    ledger: &mut ConflictLedger,
    balancer: &mut LoadBalancer,
    task: GroupTask,
    found: Result<Placement, Unplaced>,
) -> Result<GroupOutcome, ScheduleError> {
    let result = match found {
        Ok(p) => {
            let delivery = commit(problem, ledger, balancer, &task, &p)?;
            Ok((p, delivery))
        }
        Err(u) => Err(u),
    };
    let plan = &problem.plans[task.plan];
    match &result {
        Ok((p, d)) => debug!(
            course = %plan.course_id,
            group = plan.groups[task.group].number,
            lecturer = %problem.lecturers[p.lecturer as usize],
            sessions = d.total,
            "group placed"
        ),
        Err(u) => debug!(
            course = %plan.course_id,
            group = plan.groups[task.group].number,
            reason = %u,
            "group left unscheduled"
        ),
    }
    Ok(GroupOutcome { task, result })
}

pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

pub(crate) fn run_sequential(
    problem: &Problem<'_>,
    ledger: &mut ConflictLedger,
    balancer: &mut LoadBalancer,
    deadline: Option<Instant>,
) -> Result<Vec<GroupOutcome>, ScheduleError> {
    let mut out = Vec::new();
    for task in problem.tasks().into_iter().flatten() {
        let found = if expired(deadline) {
            Err(Unplaced::TimeBudget)
        } else {
            search_group(problem, ledger, balancer, &task).0
        };
        out.push(settle(problem, ledger, balancer, task, found)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::fixtures::*;
    use std::sync::Arc;
    use types::{DayOfWeek, OccupiedSlot, ResourceType};

    fn cell(day: u8, slot: u32) -> Cell {
        Cell { day, slot }
    }

    fn any_pick(picked: &[usize]) -> Option<Vec<usize>> {
        Some(picked.to_vec())
    }

    #[test]
    fn dfs_picks_distinct_weekdays_in_order() {
        let cells = [cell(0, 0), cell(0, 1), cell(1, 0), cell(2, 0)];
        let mut budget = 100;
        assert_eq!(choose_meetings(&cells, 2, &mut budget, any_pick), Ok(Some(vec![0, 2])));
        assert_eq!(choose_meetings(&cells, 3, &mut budget, any_pick), Ok(Some(vec![0, 2, 3])));
        assert_eq!(choose_meetings(&cells, 4, &mut budget, any_pick), Ok(None));
    }

    #[test]
    fn dfs_backtracks_past_same_day_dead_ends() {
        let cells = [cell(0, 0), cell(1, 0), cell(1, 1), cell(1, 2)];
        let mut budget = 100;
        assert_eq!(choose_meetings(&cells, 3, &mut budget, any_pick), Ok(None));
        assert_eq!(choose_meetings(&cells, 2, &mut budget, any_pick), Ok(Some(vec![0, 1])));
    }

    #[test]
    fn dfs_moves_on_from_rejected_picks() {
        let cells = [cell(0, 0), cell(1, 0), cell(1, 1), cell(2, 0)];
        let mut budget = 100;
        let mut seen = Vec::new();
        let found = choose_meetings(&cells, 2, &mut budget, |picked| {
            seen.push(picked.to_vec());
            (!picked.contains(&1) && !picked.contains(&2)).then(|| picked.to_vec())
        });
        assert_eq!(found, Ok(Some(vec![0, 3])));
        assert_eq!(seen, vec![vec![0, 1], vec![0, 2], vec![0, 3]]);
    }

    #[test]
    fn dfs_respects_the_budget() {
        let cells = [cell(0, 0), cell(0, 1), cell(0, 2), cell(0, 3)];
        let mut budget = 2;
        assert_eq!(
            choose_meetings(&cells, 2, &mut budget, any_pick),
            Err(Unplaced::SearchBudget)
        );
    }

    #[test]
    fn holiday_on_a_chosen_weekday_stretches_the_range() {
        let mut req = request();
        req.teachable_weekdays = vec![DayOfWeek::Monday, DayOfWeek::Wednesday];
        req.exception_dates = vec![date(2025, 10, 13)];
        req.courses[0].potential_lecturer_ids = vec!["l1".into()];
        let p = Problem::build(&req).unwrap();
        let ledger = ConflictLedger::new(p.cal.clone());
        let task = p.tasks()[0][0];
        let (found, _) = search_group(&p, &ledger, &LoadBalancer::new(2, 2), &task);
        let placement = found.unwrap();
        // 14 Mondays and 15 Wednesdays in weeks 1-15 leave one session over.
        assert_eq!(placement.range, WeekRange::new(0, 15));
        let d = deliver(&p.cal, &placement, 30);
        assert_eq!(d.total, 30);
        assert_eq!(d.last, Some(date(2025, 12, 15)));
    }

    #[test]
    fn stretched_range_skips_cells_booked_in_the_extra_week() {
        let mut req = request();
        req.teachable_weekdays = vec![DayOfWeek::Monday, DayOfWeek::Wednesday];
        req.exception_dates = vec![date(2025, 10, 13)];
        req.courses[0].potential_lecturer_ids = vec!["l1".into()];
        // l1 teaches elsewhere on the Monday of week 16 in the first slot.
        req.occupied_slots.push(OccupiedSlot {
            resource_type: ResourceType::Lecturer,
            resource_id: "l1".into(),
            date: date(2025, 12, 15),
            time_slot_id: "am1".into(),
        });
        let p = Problem::build(&req).unwrap();
        let mut ledger = ConflictLedger::new(p.cal.clone());
        for (k, r) in p.occupied() {
            ledger.preload(k, r);
        }
        let task = p.tasks()[0][0];
        let (found, _) = search_group(&p, &ledger, &LoadBalancer::new(2, 2), &task);
        let placement = found.unwrap();
        assert_eq!(placement.range, WeekRange::new(0, 15));
        assert_ne!(placement.meetings[0].cell, Cell { day: 0, slot: 0 });
        assert!(placement
            .keys()
            .into_iter()
            .all(|k| ledger.is_free(k, placement.range)));
    }

    #[test]
    fn first_group_takes_first_cells_with_smallest_room() {
        let req = request();
        let p = Problem::build(&req).unwrap();
        let ledger = ConflictLedger::new(p.cal.clone());
        let balancer = LoadBalancer::new(2, 2);
        let task = p.tasks()[0][0];
        let (found, trace) = search_group(&p, &ledger, &balancer, &task);
        let placement = found.unwrap();
        assert_eq!(trace.lecturers, vec![0, 1]);
        // r-small seats 40 < 50, so only r-big qualifies.
        assert_eq!(trace.rooms, vec![0]);
        assert_eq!(placement.lecturer, 0);
        assert_eq!(
            placement.meetings.iter().map(|m| m.cell).collect::<Vec<_>>(),
            vec![Cell { day: 0, slot: 0 }, Cell { day: 1, slot: 0 }]
        );
        assert_eq!(placement.range, WeekRange::new(0, 14));
    }

    #[test]
    fn busy_cells_push_the_group_to_later_slots() {
        let mut req = request();
        req.courses[0].potential_lecturer_ids = vec!["l1".into()];
        // l1 is booked on every Monday-Friday early slot of week 3
        for day in 15..=19 {
            req.occupied_slots.push(OccupiedSlot {
                resource_type: ResourceType::Lecturer,
                resource_id: "l1".into(),
                date: date(2025, 9, day),
                time_slot_id: "am1".into(),
            });
        }
        let p = Problem::build(&req).unwrap();
        let mut ledger = ConflictLedger::new(p.cal.clone());
        for (k, r) in p.occupied() {
            ledger.preload(k, r);
        }
        let task = p.tasks()[0][0];
        let (found, _) = search_group(&p, &ledger, &LoadBalancer::new(2, 2), &task);
        let placement = found.unwrap();
        assert_eq!(placement.lecturer, 0);
        // am1 is gone, the next cells in order are the afternoon ones
        assert!(placement.meetings.iter().all(|m| m.cell.slot == 2));
    }

    #[test]
    fn delivery_stops_at_the_required_sessions() {
        let mut req = request();
        req.courses[0].total_semester_sessions = Some(5);
        req.exception_dates = vec![date(2025, 9, 9)];
        let p = Problem::build(&req).unwrap();
        let cal = Arc::clone(&p.cal);
        let placement = Placement {
            lecturer: 0,
            meetings: vec![
                Meeting { cell: Cell { day: 0, slot: 0 }, room: 0 },
                Meeting { cell: Cell { day: 1, slot: 0 }, room: 0 },
            ],
            range: WeekRange::new(0, 2),
        };
        let d = deliver(&cal, &placement, 5);
        // The second Tuesday is a holiday: Mon, Tue / Mon / Mon, Tue
        assert_eq!(d.total, 5);
        assert_eq!(d.per_meeting, vec![3, 2]);
        assert_eq!(d.first, Some(date(2025, 9, 1)));
        assert_eq!(d.last, Some(date(2025, 9, 16)));

        let short = deliver(&cal, &placement, 6);
        assert_eq!(short.total, 5);
    }

    #[test]
    fn sequential_run_commits_and_balances() {
        let mut req = request();
        req.courses.push(course("c2", 45, 30, &["l1", "l2"]));
        let p = Problem::build(&req).unwrap();
        let mut ledger = ConflictLedger::new(p.cal.clone());
        let mut balancer = LoadBalancer::new(2, 2);
        let out = run_sequential(&p, &mut ledger, &mut balancer, None).unwrap();
        assert_eq!(out.len(), 2);
        let lecturers: Vec<u32> = out
            .iter()
            .map(|o| o.result.as_ref().unwrap().0.lecturer)
            .collect();
        assert_eq!(lecturers, vec![0, 1]);
        assert_eq!(balancer.lecturer_totals(), &[30, 30]);
        assert_eq!(ledger.booking_count(), 8);
    }

    #[test]
    fn expired_deadline_skips_every_group() {
        let req = request();
        let p = Problem::build(&req).unwrap();
        let mut ledger = ConflictLedger::new(p.cal.clone());
        let mut balancer = LoadBalancer::new(2, 2);
        let out = run_sequential(&p, &mut ledger, &mut balancer, Some(Instant::now())).unwrap();
        assert_eq!(out[0].result.as_ref().unwrap_err(), &Unplaced::TimeBudget);
        assert_eq!(ledger.booking_count(), 0);
    }
}
