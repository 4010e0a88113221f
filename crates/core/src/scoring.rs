use std::collections::{BTreeMap, HashMap};
use types::{ResourceType, ScheduleRequest, SolverResult};

use crate::calendar::{SemesterCalendar, WeekRange};
use crate::ScheduleError;

#[derive(Clone, Debug, Default)]
pub struct Audit {
    pub lecturer_loads: BTreeMap<String, u32>,
    pub load_difference: u32,
    pub double_bookings: Vec<String>,
    pub capacity_violations: Vec<String>,
    pub calendar_violations: Vec<String>,
}

impl Audit {
    pub fn is_clean(&self) -> bool {
        self.double_bookings.is_empty()
            && self.capacity_violations.is_empty()
            && self.calendar_violations.is_empty()
    }
}

/// Spread between the busiest and least busy lecturer. Idle lecturers are
/// left out.
pub fn load_difference(loads: impl IntoIterator<Item = u32>) -> u32 {
    let mut busy = loads.into_iter().filter(|&l| l > 0);
    let Some(first) = busy.next() else {
        return 0;
    };
    let (lo, hi) = busy.fold((first, first), |(lo, hi), l| (lo.min(l), hi.max(l)));
    hi - lo
}

struct Booking {
    range: WeekRange,
    label: String,
}

fn kind_tag(kind: ResourceType) -> &'static str {
    match kind {
        ResourceType::Room => "room",
        ResourceType::Lecturer => "lecturer",
    }
}

/// Re-checks a finished schedule against the request it was built from.
pub fn audit(req: &ScheduleRequest, result: &SolverResult) -> Result<Audit, ScheduleError> {
    let cal = SemesterCalendar::from_request(req)?;
    let room_caps: HashMap<&str, u32> = req
        .rooms
        .iter()
        .map(|r| (r.id.as_str(), r.capacity))
        .collect();

    let mut out = Audit::default();
    let mut lanes: BTreeMap<(&'static str, &str, u8, &str), Vec<Booking>> = BTreeMap::new();

    for o in &req.occupied_slots {
        let Some((week, day)) = cal.locate(o.date) else {
            continue;
        };
        lanes
            .entry((kind_tag(o.resource_type), o.resource_id.as_str(), day, o.time_slot_id.as_str()))
            .or_default()
            .push(Booking {
                range: WeekRange::single(week),
                label: format!("occupied slot on {}", o.date),
            });
    }

    for course in &result.scheduled_courses {
        let capacity: u32 = course.class_groups.iter().map(|g| g.capacity).sum();
        if capacity < course.total_registered_students {
            out.capacity_violations.push(format!(
                "course {} seats {} of {} students",
                course.course_id, capacity, course.total_registered_students
            ));
        }

        for g in course.class_groups.iter().filter(|g| g.is_scheduled()) {
            let label = format!("{} group {}", course.course_id, g.group_number);
            let Some(lecturer) = &g.lecturer_id else {
                continue;
            };
            *out.lecturer_loads.entry(lecturer.to_string()).or_default() += g.scheduled_sessions;

            let (Some(start), Some(end)) = (g.group_start_date, g.group_end_date) else {
                if g.scheduled_sessions > 0 {
                    out.calendar_violations
                        .push(format!("{label} delivers sessions without dates"));
                }
                continue;
            };
            let (Some((first, _)), Some((last, _))) = (cal.locate(start), cal.locate(end)) else {
                out.calendar_violations
                    .push(format!("{label} starts or ends outside a teaching day"));
                continue;
            };
            if last < first {
                out.calendar_violations
                    .push(format!("{label} ends before it starts"));
                continue;
            }
            let range = WeekRange::new(first, last);

            for d in &g.weekly_schedule_details {
                let Some(day) = cal.day_index(d.day_of_week) else {
                    out.calendar_violations
                        .push(format!("{label} meets on non-teachable {}", d.day_of_week));
                    continue;
                };
                match room_caps.get(d.room_id.as_str()) {
                    Some(&cap) if cap >= g.capacity => {}
                    Some(&cap) => out.capacity_violations.push(format!(
                        "{label} ({} students) placed in room {} seating {}",
                        g.capacity, d.room_id, cap
                    )),
                    None => out
                        .capacity_violations
                        .push(format!("{label} placed in unknown room {}", d.room_id)),
                }
                for (kind, id) in [("lecturer", lecturer.as_str()), ("room", d.room_id.as_str())] {
                    lanes
                        .entry((kind, id, day, d.time_slot_id.as_str()))
                        .or_default()
                        .push(Booking {
                            range,
                            label: label.clone(),
                        });
                }
            }
        }
    }

    for ((kind, id, day, slot), bookings) in &lanes {
        for (i, a) in bookings.iter().enumerate() {
            for b in &bookings[i + 1..] {
                let clash = a
                    .range
                    .intersect(&b.range)
                    .is_some_and(|r| cal.usable_in(*day, r) > 0);
                if clash {
                    out.double_bookings.push(format!(
                        "{kind} {id} on {} slot {slot}: {} and {}",
                        cal.weekdays()[*day as usize],
                        a.label,
                        b.label
                    ));
                }
            }
        }
    }

    out.load_difference = load_difference(out.lecturer_loads.values().copied());
    Ok(out)
}
