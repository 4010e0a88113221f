//! Occupancy of (resource, weekday, timeslot) keys across teaching weeks.
//!
//! Keys map to lanes in an arena; each lane is a list of committed week
//! ranges sorted by first week. Two bookings collide only if their ranges
//! share a week on which the key's weekday is actually taught.

use sched_core::calendar::{SemesterCalendar, WeekRange};
use sched_core::ScheduleError;
use std::collections::HashMap;
use std::sync::Arc;
use types::ResourceType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConflictKey {
    pub kind: ResourceType,
    pub resource: u32,
    pub day: u8,
    pub slot: u32,
}

impl ConflictKey {
    pub fn lecturer(resource: u32, day: u8, slot: u32) -> Self {
        Self {
            kind: ResourceType::Lecturer,
            resource,
            day,
            slot,
        }
    }

    pub fn room(resource: u32, day: u8, slot: u32) -> Self {
        Self {
            kind: ResourceType::Room,
            resource,
            day,
            slot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    /// Published before the run; never released.
    Occupied,
    Group(GroupHandle),
}

#[derive(Clone, Copy, Debug)]
struct Booking {
    range: WeekRange,
    owner: Owner,
}

#[derive(Clone, Debug)]
pub struct ConflictLedger {
    cal: Arc<SemesterCalendar>,
    index: HashMap<ConflictKey, u32>,
    lanes: Vec<Vec<Booking>>,
}

impl ConflictLedger {
    pub fn new(cal: Arc<SemesterCalendar>) -> Self {
        Self {
            cal,
            index: HashMap::new(),
            lanes: Vec::new(),
        }
    }

    fn lane_mut(&mut self, key: ConflictKey) -> &mut Vec<Booking> {
        let next = self.lanes.len() as u32;
        let id = *self.index.entry(key).or_insert(next);
        if id == next {
            self.lanes.push(Vec::new());
        }
        &mut self.lanes[id as usize]
    }

    fn insert(&mut self, key: ConflictKey, booking: Booking) {
        let lane = self.lane_mut(key);
        let at = lane.partition_point(|b| b.range.first <= booking.range.first);
        lane.insert(at, booking);
    }

    /// Loads a pre-existing booking. No freedom check: published timetables
    /// may already overlap each other.
    pub fn preload(&mut self, key: ConflictKey, range: WeekRange) {
        self.insert(
            key,
            Booking {
                range,
                owner: Owner::Occupied,
            },
        );
    }

    pub fn is_free(&self, key: ConflictKey, range: WeekRange) -> bool {
        let Some(&id) = self.index.get(&key) else {
            return true;
        };
        for b in &self.lanes[id as usize] {
            if b.range.first > range.last {
                break;
            }
            if let Some(common) = b.range.intersect(&range) {
                if self.cal.usable_in(key.day, common) > 0 {
                    return false;
                }
            }
        }
        true
    }

    pub fn commit(
        &mut self,
        key: ConflictKey,
        range: WeekRange,
        owner: GroupHandle,
    ) -> Result<(), ScheduleError> {
        if !self.is_free(key, range) {
            return Err(ScheduleError::Invariant(format!(
                "group {} committed {key:?} over weeks {}..={} while it was taken",
                owner.0, range.first, range.last
            )));
        }
        self.insert(
            key,
            Booking {
                range,
                owner: Owner::Group(owner),
            },
        );
        Ok(())
    }

    /// All keys of a group or none of them.
    pub fn commit_group(
        &mut self,
        keys: &[ConflictKey],
        range: WeekRange,
        owner: GroupHandle,
    ) -> Result<(), ScheduleError> {
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(ScheduleError::Invariant(format!(
                    "group {} books {key:?} twice",
                    owner.0
                )));
            }
            if !self.is_free(*key, range) {
                return Err(ScheduleError::Invariant(format!(
                    "group {} placement on {key:?} was not checked free",
                    owner.0
                )));
            }
        }
        for key in keys {
            if let Err(e) = self.commit(*key, range, owner) {
                self.release(owner);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drops every booking of `owner`; returns how many were removed.
    pub fn release(&mut self, owner: GroupHandle) -> usize {
        let mut removed = 0;
        for lane in &mut self.lanes {
            let before = lane.len();
            lane.retain(|b| b.owner != Owner::Group(owner));
            removed += before - lane.len();
        }
        removed
    }

    pub fn owners(&self, key: ConflictKey) -> Vec<Owner> {
        self.index
            .get(&key)
            .map(|&id| self.lanes[id as usize].iter().map(|b| b.owner).collect())
            .unwrap_or_default()
    }

    pub fn booking_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }
}
