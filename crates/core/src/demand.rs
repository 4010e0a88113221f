//! Per-course demand: number of class groups, their sizes, and the weekly
//! meeting pattern each group needs to cover the course's session load.

use types::{CourseDemand, CourseId, LecturerId, ScheduleRequest};

use crate::calendar::SemesterCalendar;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupPlan {
    /// 1-based, unique within the course.
    pub number: u32,
    pub capacity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoursePlan {
    pub course_id: CourseId,
    /// Position of the course in the request.
    pub position: usize,
    pub registered_students: u32,
    pub total_sessions: u32,
    pub sessions_per_week: u32,
    pub weeks_for_group: u32,
    /// `sessions_per_week * weeks_for_group` cannot reach `total_sessions`
    /// even at the weekly maximum; groups are still placed best-effort.
    pub pattern_shortfall: bool,
    pub potential_lecturers: Vec<LecturerId>,
    pub groups: Vec<GroupPlan>,
}

impl CoursePlan {
    pub fn demand_weight(&self) -> u64 {
        self.registered_students as u64 * self.total_sessions as u64
    }

    /// Sessions owed across all groups of the course.
    pub fn required_sessions(&self) -> u32 {
        self.total_sessions.saturating_mul(self.groups.len() as u32)
    }

    pub fn nominal_sessions_per_group(&self) -> u32 {
        self.sessions_per_week * self.weeks_for_group
    }
}

pub fn group_count(registered: u32, target: u32) -> u32 {
    registered.div_ceil(target.max(1)).max(1)
}

pub fn group_capacities(registered: u32, target: u32) -> Vec<GroupPlan> {
    let target = target.max(1);
    let mut remaining = registered;
    (1..=group_count(registered, target))
        .map(|number| {
            let capacity = target.min(remaining);
            remaining -= capacity;
            GroupPlan { number, capacity }
        })
        .collect()
}

/// Smallest weekly pattern in `1..=max` that covers `total` sessions within
/// `weeks`; `None` when even `max` falls short.
pub fn sessions_per_week(total: u32, weeks: u32, max: u32) -> Option<u32> {
    (1..=max).find(|spw| spw.saturating_mul(weeks) >= total)
}

pub fn weeks_for_group(total: u32, sessions_per_week: u32, available_weeks: u32) -> u32 {
    total.div_ceil(sessions_per_week.max(1)).min(available_weeks)
}

pub fn plan_course(
    course: &CourseDemand,
    position: usize,
    req: &ScheduleRequest,
    available_weeks: u32,
) -> CoursePlan {
    let total = course.resolved_sessions(req.sessions_per_credit);
    let max = req.max_sessions_per_week_allowed;
    let (spw, shortfall) = match sessions_per_week(total, available_weeks, max) {
        Some(spw) => (spw, false),
        None => (max, true),
    };
    CoursePlan {
        course_id: course.course_id.clone(),
        position,
        registered_students: course.registered_students,
        total_sessions: total,
        sessions_per_week: spw,
        weeks_for_group: weeks_for_group(total, spw, available_weeks),
        pattern_shortfall: shortfall,
        potential_lecturers: course.potential_lecturer_ids.clone(),
        groups: group_capacities(course.registered_students, req.group_size_target),
    }
}

pub fn plan(req: &ScheduleRequest, cal: &SemesterCalendar) -> Vec<CoursePlan> {
    let weeks = cal.week_count();
    req.courses
        .iter()
        .enumerate()
        .map(|(i, c)| plan_course(c, i, req, weeks))
        .collect()
}

/// Heaviest demand first; ties by course id so the order never depends on
/// input position.
pub fn processing_order(plans: &[CoursePlan]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..plans.len()).collect();
    order.sort_by(|&a, &b| {
        plans[b]
            .demand_weight()
            .cmp(&plans[a].demand_weight())
            .then_with(|| plans[a].course_id.cmp(&plans[b].course_id))
    });
    order
}
