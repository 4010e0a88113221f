//! Semester calendar resolution.
//!
//! Week 1 is anchored on the first teachable weekday on or after the
//! semester start. Every teachable weekday of a week gets a concrete date;
//! dates listed as exceptions, or past the semester end, are suppressed.
//! Weeks without a single usable day are not teaching weeks and are
//! skipped, so teaching-week ordinals are dense while `calendar_week`
//! keeps the gap.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::{BTreeSet, HashMap};
use types::{DayOfWeek, DayStatus, ScheduleRequest, TeachingDay, TeachingWeek};

use crate::ScheduleError;

/// Inclusive range of 0-based teaching-week ordinals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekRange {
    pub first: u32,
    pub last: u32,
}

impl WeekRange {
    pub fn new(first: u32, last: u32) -> Self {
        debug_assert!(first <= last);
        Self { first, last }
    }

    pub fn single(week: u32) -> Self {
        Self::new(week, week)
    }

    pub fn week_span(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn intersect(&self, other: &WeekRange) -> Option<WeekRange> {
        let first = self.first.max(other.first);
        let last = self.last.min(other.last);
        (first <= last).then_some(WeekRange { first, last })
    }
}

#[derive(Clone, Debug)]
pub struct SemesterCalendar {
    /// Teachable weekdays, chronological within a week.
    weekdays: Vec<DayOfWeek>,
    weeks: Vec<TeachingWeek>,
    /// `usable_prefix[d][w]` = usable occurrences of weekday `d` in weeks `0..w`.
    usable_prefix: Vec<Vec<u32>>,
    by_date: HashMap<NaiveDate, (u32, u8)>,
}

impl SemesterCalendar {
    pub fn from_request(req: &ScheduleRequest) -> Result<Self, ScheduleError> {
        Self::resolve(
            req.semester_start_date,
            req.semester_end_date,
            &req.teachable_weekdays,
            &req.exception_dates,
        )
    }

    pub fn resolve(
        start: NaiveDate,
        end: NaiveDate,
        teachable: &[DayOfWeek],
        exceptions: &[NaiveDate],
    ) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::InvalidInput(format!(
                "semester end {end} is not after start {start}"
            )));
        }
        let wanted: BTreeSet<DayOfWeek> = teachable.iter().copied().collect();
        if wanted.is_empty() {
            return Err(ScheduleError::InvalidInput(
                "no teachable weekday given".into(),
            ));
        }
        let exceptions: BTreeSet<NaiveDate> = exceptions.iter().copied().collect();

        let anchor = (0..7u64)
            .filter_map(|k| start.checked_add_days(Days::new(k)))
            .find(|d| wanted.contains(&DayOfWeek::from(d.weekday())))
            .ok_or_else(|| ScheduleError::InvalidInput("semester start is out of range".into()))?;
        let anchor_dow = anchor.weekday().num_days_from_monday();

        let mut with_offsets: Vec<(u32, DayOfWeek)> = wanted
            .iter()
            .map(|&d| ((d.days_from_monday() + 7 - anchor_dow) % 7, d))
            .collect();
        with_offsets.sort();

        let span_days = (end - start).num_days().max(0) as u64;
        let max_weeks = span_days.div_ceil(7);

        let mut weeks: Vec<TeachingWeek> = Vec::new();
        for k in 0..max_weeks {
            let Some(week_start) = anchor.checked_add_days(Days::new(7 * k)) else {
                break;
            };
            if week_start > end {
                break;
            }
            let mut days = Vec::with_capacity(with_offsets.len());
            for &(offset, dow) in &with_offsets {
                let Some(date) = week_start.checked_add_days(Days::new(offset as u64)) else {
                    continue;
                };
                let status = if date > end {
                    DayStatus::OutsideSemester
                } else if exceptions.contains(&date) {
                    DayStatus::Exception
                } else {
                    DayStatus::Teaching
                };
                days.push(TeachingDay {
                    day_of_week: dow,
                    date,
                    status,
                });
            }
            if days.iter().any(TeachingDay::is_usable) {
                weeks.push(TeachingWeek {
                    index: weeks.len() as u32 + 1,
                    calendar_week: k as u32 + 1,
                    days,
                });
            }
        }

        if weeks.is_empty() {
            return Err(ScheduleError::InvalidInput(format!(
                "no teaching week between {start} and {end}"
            )));
        }

        let weekdays: Vec<DayOfWeek> = with_offsets.iter().map(|&(_, d)| d).collect();
        let mut usable_prefix = vec![vec![0u32; weeks.len() + 1]; weekdays.len()];
        let mut by_date = HashMap::new();
        for (w, week) in weeks.iter().enumerate() {
            for (d, prefix) in usable_prefix.iter_mut().enumerate() {
                let day = &week.days[d];
                let hit = day.is_usable() as u32;
                prefix[w + 1] = prefix[w] + hit;
                if hit == 1 {
                    by_date.insert(day.date, (w as u32, d as u8));
                }
            }
        }

        Ok(Self {
            weekdays,
            weeks,
            usable_prefix,
            by_date,
        })
    }

    pub fn weeks(&self) -> &[TeachingWeek] {
        &self.weeks
    }

    pub fn week_count(&self) -> u32 {
        self.weeks.len() as u32
    }

    pub fn weekdays(&self) -> &[DayOfWeek] {
        &self.weekdays
    }

    pub fn day_index(&self, day: DayOfWeek) -> Option<u8> {
        self.weekdays.iter().position(|&d| d == day).map(|i| i as u8)
    }

    pub fn is_usable(&self, week: u32, day: u8) -> bool {
        self.weeks
            .get(week as usize)
            .and_then(|w| w.days.get(day as usize))
            .is_some_and(TeachingDay::is_usable)
    }

    pub fn date_of(&self, week: u32, day: u8) -> Option<NaiveDate> {
        self.weeks
            .get(week as usize)
            .and_then(|w| w.days.get(day as usize))
            .map(|d| d.date)
    }

    /// Usable occurrences of `day` across the whole semester. Zero means the
    /// weekday must never be offered to the search.
    pub fn usable_count(&self, day: u8) -> u32 {
        self.usable_prefix
            .get(day as usize)
            .and_then(|p| p.last().copied())
            .unwrap_or(0)
    }

    /// Usable occurrences of `day` inside `range`, clamped to the semester.
    pub fn usable_in(&self, day: u8, range: WeekRange) -> u32 {
        let Some(prefix) = self.usable_prefix.get(day as usize) else {
            return 0;
        };
        let n = self.weeks.len() as u32;
        if range.first >= n {
            return 0;
        }
        let last = range.last.min(n - 1);
        prefix[last as usize + 1] - prefix[range.first as usize]
    }

    /// Grows `from` one week at a time until `days` together offer
    /// `sessions` usable dates, never past the last teaching week. The
    /// result starts where `from` starts and is never shorter.
    pub fn cover(&self, days: &[u8], from: WeekRange, sessions: u32) -> WeekRange {
        let end = self.week_count().saturating_sub(1).max(from.last);
        let offered = |r: WeekRange| -> u32 { days.iter().map(|&d| self.usable_in(d, r)).sum() };
        let mut range = from;
        while range.last < end && offered(range) < sessions {
            range.last += 1;
        }
        range
    }

    /// Maps a usable teaching date back to `(week ordinal, weekday index)`.
    pub fn locate(&self, date: NaiveDate) -> Option<(u32, u8)> {
        self.by_date.get(&date).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::date;

    fn weekdays() -> Vec<DayOfWeek> {
        vec![
            DayOfWeek::Monday,
            DayOfWeek::Wednesday,
            DayOfWeek::Friday,
        ]
    }

    #[test]
    fn fall_semester_has_twenty_two_weeks() {
        let cal =
            SemesterCalendar::resolve(date(2025, 9, 1), date(2026, 1, 31), &weekdays(), &[])
                .unwrap();
        assert_eq!(cal.week_count(), 22);
        let first = &cal.weeks()[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.days[0].date, date(2025, 9, 1));
        assert_eq!(first.days[1].date, date(2025, 9, 3));
        assert_eq!(first.days[2].date, date(2025, 9, 5));
        let last = cal.weeks().last().unwrap();
        assert_eq!(last.days[0].date, date(2026, 1, 26));
        assert!(last.days.iter().all(|d| d.is_usable()));
    }

    #[test]
    fn anchor_moves_to_first_teachable_day() {
        // 2025-09-02 is a Tuesday, so week 1 starts on Wednesday the 3rd.
        let cal =
            SemesterCalendar::resolve(date(2025, 9, 2), date(2025, 10, 1), &weekdays(), &[])
                .unwrap();
        assert_eq!(cal.weekdays()[0], DayOfWeek::Wednesday);
        assert_eq!(cal.weeks()[0].days[0].date, date(2025, 9, 3));
        assert_eq!(cal.weeks()[0].days[2].date, date(2025, 9, 8));
    }

    #[test]
    fn exceptions_suppress_days_and_whole_weeks() {
        let holidays = [date(2025, 9, 8), date(2025, 9, 10), date(2025, 9, 12), date(2025, 9, 15)];
        let cal =
            SemesterCalendar::resolve(date(2025, 9, 1), date(2025, 9, 30), &weekdays(), &holidays)
                .unwrap();
        // Calendar week 2 is fully suppressed and dropped.
        assert_eq!(cal.weeks()[1].calendar_week, 3);
        assert_eq!(cal.weeks()[1].days[0].status, DayStatus::Exception);
        assert!(!cal.is_usable(1, 0));
        assert!(cal.is_usable(1, 1));
        assert_eq!(cal.locate(date(2025, 9, 17)), Some((1, 1)));
        assert_eq!(cal.locate(date(2025, 9, 15)), None);
    }

    #[test]
    fn dates_past_the_end_are_outside_the_semester() {
        let cal =
            SemesterCalendar::resolve(date(2025, 9, 1), date(2025, 9, 10), &weekdays(), &[])
                .unwrap();
        assert_eq!(cal.week_count(), 2);
        assert_eq!(cal.weeks()[1].days[2].status, DayStatus::OutsideSemester);
        assert_eq!(cal.usable_count(2), 1);
        assert_eq!(cal.usable_count(0), 2);
    }

    #[test]
    fn weekday_that_never_occurs_counts_zero() {
        let mondays: Vec<NaiveDate> = (0..5)
            .map(|k| date(2025, 9, 1) + Days::new(7 * k))
            .collect();
        let cal =
            SemesterCalendar::resolve(date(2025, 9, 1), date(2025, 10, 3), &weekdays(), &mondays)
                .unwrap();
        assert_eq!(cal.usable_count(0), 0);
        assert_eq!(cal.usable_in(0, WeekRange::new(0, 4)), 0);
        assert_eq!(cal.usable_in(1, WeekRange::new(1, 3)), 3);
    }

    #[test]
    fn fully_excepted_semester_is_structural() {
        let all: Vec<NaiveDate> = (0..14).map(|k| date(2025, 9, 1) + Days::new(k)).collect();
        let err =
            SemesterCalendar::resolve(date(2025, 9, 1), date(2025, 9, 14), &weekdays(), &all)
                .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn resolution_is_idempotent() {
        let holidays = [date(2025, 11, 17)];
        let a = SemesterCalendar::resolve(date(2025, 9, 1), date(2026, 1, 31), &weekdays(), &holidays)
            .unwrap();
        let b = SemesterCalendar::resolve(date(2025, 9, 1), date(2026, 1, 31), &weekdays(), &holidays)
            .unwrap();
        assert_eq!(a.weeks(), b.weeks());
    }

    #[test]
    fn cover_makes_up_suppressed_dates_with_later_weeks() {
        let cal = SemesterCalendar::resolve(
            date(2025, 9, 1),
            date(2026, 1, 31),
            &weekdays(),
            &[date(2025, 10, 13)],
        )
        .unwrap();
        let nominal = WeekRange::new(0, 14);
        // Monday of week 7 is a holiday: 14 Mondays + 15 Wednesdays.
        assert_eq!(cal.cover(&[0, 1], nominal, 30), WeekRange::new(0, 15));
        assert_eq!(cal.cover(&[1, 2], nominal, 30), nominal);
        assert_eq!(cal.cover(&[0], nominal, 100), WeekRange::new(0, 21));
        assert_eq!(cal.cover(&[0, 1], WeekRange::new(0, 21), 100), WeekRange::new(0, 21));
    }

    #[test]
    fn week_ranges_intersect() {
        let a = WeekRange::new(2, 6);
        assert_eq!(a.intersect(&WeekRange::new(5, 9)), Some(WeekRange::new(5, 6)));
        assert_eq!(a.intersect(&WeekRange::single(7)), None);
        assert_eq!(a.week_span(), 5);
    }
}
