use sched_core::ScheduleError;
use std::time::Duration;
use types::{
    ClassGroup, CourseStatus, ScheduleRequest, ScheduledCourse, SolverResult, SolverStatus,
    WeeklyScheduleDetail,
};

use crate::assign::{GroupOutcome, Unplaced};
use crate::balance::LoadBalancer;
use crate::problem::Problem;

#[derive(Default)]
struct Report {
    infeasible: Vec<String>,
    shortfall: Vec<String>,
    timed_out: Vec<String>,
}

impl Report {
    fn is_empty(&self) -> bool {
        self.infeasible.is_empty() && self.shortfall.is_empty() && self.timed_out.is_empty()
    }

    fn message(&self) -> String {
        let mut parts = Vec::new();
        if !self.infeasible.is_empty() {
            parts.push(format!("Unscheduled groups: {}.", self.infeasible.join("; ")));
        }
        if !self.shortfall.is_empty() {
            parts.push(format!("Session shortfall: {}.", self.shortfall.join("; ")));
        }
        if !self.timed_out.is_empty() {
            parts.push(format!(
                "Time budget exhausted before placing: {}.",
                self.timed_out.join(", ")
            ));
        }
        parts.join(" ")
    }
}

pub(crate) fn assemble(
    problem: &Problem<'_>,
    outcomes: Vec<GroupOutcome>,
    balancer: &LoadBalancer,
    duration: Duration,
) -> SolverResult {
    let req = problem.req;
    let mut groups: Vec<Vec<Option<ClassGroup>>> = problem
        .plans
        .iter()
        .map(|p| vec![None; p.groups.len()])
        .collect();
    let mut report = Report::default();

    for outcome in outcomes {
        let plan = &problem.plans[outcome.task.plan];
        let gp = &plan.groups[outcome.task.group];
        let label = format!("{} group {}", plan.course_id, gp.number);
        let mut group = ClassGroup {
            group_number: gp.number,
            capacity: gp.capacity,
            lecturer_id: None,
            group_start_date: None,
            group_end_date: None,
            // Placed groups report the weeks they actually span.
            total_teaching_weeks_for_group: plan.weeks_for_group,
            sessions_per_week_for_group: plan.sessions_per_week,
            scheduled_sessions: 0,
            weekly_schedule_details: Vec::new(),
            unscheduled_reason: None,
        };
        match outcome.result {
            Ok((placement, delivery)) => {
                if delivery.total < plan.total_sessions {
                    report.shortfall.push(format!(
                        "{label} ({} of {} sessions)",
                        delivery.total, plan.total_sessions
                    ));
                }
                group.lecturer_id = Some(problem.lecturers[placement.lecturer as usize].clone());
                group.total_teaching_weeks_for_group = placement.range.week_span();
                group.group_start_date = delivery.first;
                group.group_end_date = delivery.last;
                group.scheduled_sessions = delivery.total;
                group.weekly_schedule_details = placement
                    .meetings
                    .iter()
                    .map(|m| WeeklyScheduleDetail {
                        day_of_week: problem.cal.weekdays()[m.cell.day as usize],
                        time_slot_id: problem.slots[m.cell.slot as usize].id.clone(),
                        room_id: problem.rooms[m.room as usize].id.clone(),
                    })
                    .collect();
            }
            Err(Unplaced::TimeBudget) => {
                report.timed_out.push(label);
                group.unscheduled_reason = Some(Unplaced::TimeBudget.to_string());
            }
            Err(reason) => {
                report.infeasible.push(format!("{label} ({reason})"));
                group.unscheduled_reason = Some(reason.to_string());
            }
        }
        groups[outcome.task.plan][outcome.task.group] = Some(group);
    }

    let scheduled_courses: Vec<ScheduledCourse> = problem
        .plans
        .iter()
        .zip(groups)
        .map(|(plan, slots)| {
            let class_groups: Vec<ClassGroup> = slots.into_iter().flatten().collect();
            let complete = class_groups.len() == plan.groups.len()
                && class_groups
                    .iter()
                    .all(|g| g.is_scheduled() && g.scheduled_sessions >= plan.total_sessions);
            ScheduledCourse {
                course_id: plan.course_id.clone(),
                total_registered_students: plan.registered_students,
                total_sessions_for_course: plan.total_sessions,
                status: if complete {
                    CourseStatus::Complete
                } else {
                    CourseStatus::Partial
                },
                class_groups,
            }
        })
        .collect();

    let total_sessions_scheduled = scheduled_courses
        .iter()
        .flat_map(|c| &c.class_groups)
        .map(|g| g.scheduled_sessions)
        .sum();
    let partial = !report.is_empty()
        || scheduled_courses
            .iter()
            .any(|c| c.status == CourseStatus::Partial);

    SolverResult {
        semester_id: req.semester_id.clone(),
        semester_start_date: req.semester_start_date,
        semester_end_date: req.semester_end_date,
        scheduled_courses,
        load_difference: balancer.load_difference(),
        total_original_sessions_to_schedule: problem
            .plans
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.required_sessions())),
        total_sessions_scheduled,
        solver_duration_seconds: duration.as_secs_f64(),
        solver_status: if partial {
            SolverStatus::Partial
        } else {
            SolverStatus::Success
        },
        solver_message: report.message(),
    }
}

/// Result for a request rejected before search.
pub(crate) fn failed(req: &ScheduleRequest, err: &ScheduleError) -> SolverResult {
    SolverResult {
        semester_id: req.semester_id.clone(),
        semester_start_date: req.semester_start_date,
        semester_end_date: req.semester_end_date,
        scheduled_courses: Vec::new(),
        load_difference: 0,
        total_original_sessions_to_schedule: 0,
        total_sessions_scheduled: 0,
        solver_duration_seconds: 0.0,
        solver_status: SolverStatus::Failed,
        solver_message: match err {
            ScheduleError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        },
    }
}
