pub mod calendar;
pub mod demand;
pub mod scoring;

use async_trait::async_trait;
use chrono::NaiveTime;
use std::collections::HashSet;
use thiserror::Error;

pub use types::{
    ClassGroup, CourseDemand, DayOfWeek, OccupiedSlot, Room, ScheduleRequest, ScheduledCourse,
    SolveEnvelope, SolveParams, SolverResult, SolverStatus, TimeSlot, MAX_SESSIONS_PER_WEEK_BOUND,
};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl ScheduleError {
    pub fn is_structural(&self) -> bool {
        matches!(self, ScheduleError::InvalidInput(_))
    }
}

/// Parses `"HH:MM"` or `"HH:MM:SS"`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Structural checks run before any resource is touched. Every problem
/// found is reported, joined with `"; "`.
pub fn validate(req: &ScheduleRequest) -> Result<(), ScheduleError> {
    let mut errors: Vec<String> = Vec::new();

    if req.semester_end_date <= req.semester_start_date {
        errors.push(format!(
            "semesterEndDate {} is not after semesterStartDate {}",
            req.semester_end_date, req.semester_start_date
        ));
    }
    if req.teachable_weekdays.is_empty() {
        errors.push("teachableWeekdays is empty".into());
    }
    if req.time_slots.is_empty() {
        errors.push("timeSlots is empty".into());
    }
    if req.rooms.is_empty() {
        errors.push("rooms is empty".into());
    }
    if req.group_size_target == 0 {
        errors.push("groupSizeTarget must be positive".into());
    }
    if !(1..=MAX_SESSIONS_PER_WEEK_BOUND).contains(&req.max_sessions_per_week_allowed) {
        errors.push(format!(
            "maxSessionsPerWeekAllowed {} is outside 1..={}",
            req.max_sessions_per_week_allowed, MAX_SESSIONS_PER_WEEK_BOUND
        ));
    }

    fn chk_unique<I: ToString>(name: &str, ids: impl Iterator<Item = I>, errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for id in ids {
            let s = id.to_string();
            if !seen.insert(s.clone()) {
                errors.push(format!("duplicate {name} id: {s}"));
            }
        }
    }
    chk_unique("weekday", req.teachable_weekdays.iter(), &mut errors);
    chk_unique("timeslot", req.time_slots.iter().map(|t| &t.id), &mut errors);
    chk_unique("room", req.rooms.iter().map(|r| &r.id), &mut errors);
    chk_unique("lecturer", req.lecturer_ids.iter(), &mut errors);
    chk_unique("course", req.courses.iter().map(|c| &c.course_id), &mut errors);

    for t in &req.time_slots {
        match (parse_clock(&t.start_time), parse_clock(&t.end_time)) {
            (Some(start), Some(end)) if start < end => {}
            (Some(_), Some(_)) => errors.push(format!(
                "timeslot {} ends at {} which is not after its start {}",
                t.id, t.end_time, t.start_time
            )),
            _ => errors.push(format!(
                "timeslot {} has an unreadable clock time ({} - {})",
                t.id, t.start_time, t.end_time
            )),
        }
    }

    for r in &req.rooms {
        if r.capacity == 0 {
            errors.push(format!("room {} has capacity 0", r.id));
        }
    }

    let lecturers: HashSet<&str> = req.lecturer_ids.iter().map(|l| l.as_str()).collect();
    for c in &req.courses {
        if c.credits == 0 {
            errors.push(format!("course {} has credits=0", c.course_id));
        }
        if c.registered_students == 0 {
            errors.push(format!("course {} has registeredStudents=0", c.course_id));
        }
        if c.resolved_sessions(req.sessions_per_credit) == 0 {
            errors.push(format!("course {} requires 0 sessions", c.course_id));
        }
        for l in &c.potential_lecturer_ids {
            if !lecturers.contains(l.as_str()) {
                errors.push(format!(
                    "course {} references missing lecturer {}",
                    c.course_id, l
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScheduleError::InvalidInput(errors.join("; ")))
    }
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolverResult>;
}
