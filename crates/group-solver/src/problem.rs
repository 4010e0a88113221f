use chrono::NaiveTime;
use sched_core::calendar::{SemesterCalendar, WeekRange};
use sched_core::demand::{self, CoursePlan};
use sched_core::{parse_clock, validate, ScheduleError};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use types::{LecturerId, ResourceType, Room, ScheduleRequest, TimeSlot};

use crate::ledger::{ConflictKey, GroupHandle};

/// One cell of the weekly grid: a teachable weekday (calendar index) and a
/// timeslot (index in start-time order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Cell {
    pub day: u8,
    pub slot: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GroupTask {
    pub plan: usize,
    pub group: usize,
    /// Global position in processing order.
    pub seq: u32,
}

impl GroupTask {
    pub fn handle(&self) -> GroupHandle {
        GroupHandle(self.seq)
    }
}

/// The request re-indexed for the search: every resource is addressed by a
/// dense integer id.
pub(crate) struct Problem<'a> {
    pub req: &'a ScheduleRequest,
    pub cal: Arc<SemesterCalendar>,
    pub lecturers: Vec<&'a LecturerId>,
    lecturer_index: HashMap<&'a str, u32>,
    pub rooms: Vec<&'a Room>,
    room_index: HashMap<&'a str, u32>,
    pub slots: Vec<&'a TimeSlot>,
    slot_index: HashMap<&'a str, u32>,
    /// Per slot: (position within its shift, shift order).
    slot_rank: Vec<(u32, u32)>,
    shift_count: u32,
    open_days: Vec<u8>,
    pub plans: Vec<CoursePlan>,
    pub order: Vec<usize>,
}

impl<'a> Problem<'a> {
    pub fn build(req: &'a ScheduleRequest) -> Result<Self, ScheduleError> {
        validate(req)?;
        let cal = SemesterCalendar::from_request(req)?;

        let mut lecturers: Vec<&LecturerId> = req.lecturer_ids.iter().collect();
        lecturers.sort();
        let lecturer_index = lecturers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i as u32))
            .collect();

        let mut rooms: Vec<&Room> = req.rooms.iter().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        let room_index = rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i as u32))
            .collect();

        let mut slots: Vec<&TimeSlot> = req.time_slots.iter().collect();
        slots.sort_by_key(|t| {
            (
                parse_clock(&t.start_time).unwrap_or(NaiveTime::MIN),
                t.id.clone(),
            )
        });
        let slot_index = slots
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i as u32))
            .collect();

        let mut shifts: Vec<(&str, u32)> = Vec::new();
        let mut slot_rank = Vec::with_capacity(slots.len());
        for t in &slots {
            let shift_no = match shifts.iter().position(|(s, _)| *s == t.shift) {
                Some(i) => i,
                None => {
                    shifts.push((t.shift.as_str(), 0));
                    shifts.len() - 1
                }
            };
            let seen = &mut shifts[shift_no].1;
            slot_rank.push((*seen, shift_no as u32));
            *seen += 1;
        }

        let open_days = (0..cal.weekdays().len() as u8)
            .filter(|&d| cal.usable_count(d) > 0)
            .collect();

        let plans = demand::plan(req, &cal);
        let order = demand::processing_order(&plans);

        Ok(Self {
            req,
            cal: Arc::new(cal),
            lecturers,
            lecturer_index,
            rooms,
            room_index,
            slots,
            slot_index,
            slot_rank,
            shift_count: shifts.len() as u32,
            open_days,
            plans,
            order,
        })
    }

    pub fn lecturer_idx(&self, id: &str) -> Option<u32> {
        self.lecturer_index.get(id).copied()
    }

    pub fn room_idx(&self, id: &str) -> Option<u32> {
        self.room_index.get(id).copied()
    }

    pub fn slot_idx(&self, id: &str) -> Option<u32> {
        self.slot_index.get(id).copied()
    }

    pub fn open_days(&self) -> &[u8] {
        &self.open_days
    }

    /// Class groups course by course in processing order.
    pub fn tasks(&self) -> Vec<Vec<GroupTask>> {
        let mut seq = 0u32;
        self.order
            .iter()
            .map(|&plan| {
                (0..self.plans[plan].groups.len())
                    .map(|group| {
                        let task = GroupTask { plan, group, seq };
                        seq += 1;
                        task
                    })
                    .collect()
            })
            .collect()
    }

    pub fn group_range(&self, plan: &CoursePlan) -> WeekRange {
        WeekRange::new(0, plan.weeks_for_group.max(1) - 1)
    }

    /// Weekly grid cells in the order a group tries them. Weekdays with
    /// more usable dates inside `range` come first. Then early slots of
    /// every shift come before later ones; which shift leads rotates with
    /// the group's sequence number so consecutive groups land in
    /// different shifts.
    pub fn candidate_cells(&self, seq: u32, range: WeekRange) -> Vec<Cell> {
        let n = self.shift_count.max(1);
        let lead = seq % n;
        let mut cells: Vec<Cell> = self
            .open_days
            .iter()
            .flat_map(|&day| (0..self.slots.len() as u32).map(move |slot| Cell { day, slot }))
            .collect();
        cells.sort_by_key(|c| {
            let (pos, shift) = self.slot_rank[c.slot as usize];
            (
                Reverse(self.cal.usable_in(c.day, range)),
                pos,
                (shift + n - lead) % n,
                c.day,
                c.slot,
            )
        });
        cells
    }

    /// Occupied slots mapped onto ledger keys. Bookings that can never
    /// collide with a placement are dropped.
    pub fn occupied(&self) -> Vec<(ConflictKey, WeekRange)> {
        let mut out = Vec::with_capacity(self.req.occupied_slots.len());
        for o in &self.req.occupied_slots {
            let resource = match o.resource_type {
                ResourceType::Room => self.room_idx(&o.resource_id),
                ResourceType::Lecturer => self.lecturer_idx(&o.resource_id),
            };
            let Some(resource) = resource else {
                warn!(resource = %o.resource_id, kind = ?o.resource_type, "occupied slot for unknown resource ignored");
                continue;
            };
            let Some(slot) = self.slot_idx(o.time_slot_id.as_str()) else {
                warn!(slot = %o.time_slot_id, "occupied slot for unknown timeslot ignored");
                continue;
            };
            let Some((week, day)) = self.cal.locate(o.date) else {
                warn!(date = %o.date, "occupied slot outside teaching days ignored");
                continue;
            };
            let key = ConflictKey {
                kind: o.resource_type,
                resource,
                day,
                slot,
            };
            out.push((key, WeekRange::single(week)));
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use types::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn slot(id: &str, start: &str, end: &str, shift: &str) -> TimeSlot {
        TimeSlot {
            id: id.into(),
            start_time: start.into(),
            end_time: end.into(),
            shift: shift.into(),
        }
    }

    pub fn room(id: &str, capacity: u32) -> Room {
        Room {
            id: id.into(),
            number: id.to_uppercase(),
            building: None,
            floor: None,
            kind: None,
            capacity,
        }
    }

    pub fn course(id: &str, students: u32, sessions: u32, lecturers: &[&str]) -> CourseDemand {
        CourseDemand {
            course_id: id.into(),
            credits: 2,
            total_semester_sessions: Some(sessions),
            registered_students: students,
            potential_lecturer_ids: lecturers.iter().map(|&l| l.into()).collect(),
        }
    }

    pub fn request() -> ScheduleRequest {
        ScheduleRequest {
            semester_id: "2025-fall".into(),
            semester_start_date: date(2025, 9, 1),
            semester_end_date: date(2026, 1, 31),
            teachable_weekdays: vec![
                DayOfWeek::Monday,
                DayOfWeek::Tuesday,
                DayOfWeek::Wednesday,
                DayOfWeek::Thursday,
                DayOfWeek::Friday,
            ],
            time_slots: vec![
                slot("am1", "07:00", "09:30", "morning"),
                slot("am2", "09:45", "12:15", "morning"),
                slot("pm1", "13:00", "15:30", "afternoon"),
            ],
            rooms: vec![room("r-small", 40), room("r-big", 120)],
            lecturer_ids: vec!["l1".into(), "l2".into()],
            exception_dates: vec![],
            occupied_slots: vec![],
            group_size_target: DEFAULT_GROUP_SIZE_TARGET,
            max_sessions_per_week_allowed: DEFAULT_MAX_SESSIONS_PER_WEEK,
            sessions_per_credit: DEFAULT_SESSIONS_PER_CREDIT,
            courses: vec![course("c1", 50, 30, &["l1", "l2"])],
        }
    }
}
