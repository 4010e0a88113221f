use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone,
            Debug,
            Serialize,
            Deserialize,
            ToSchema,
            JsonSchema,
            Eq,
            PartialEq,
            Hash,
            PartialOrd,
            Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(SemesterId);
id_newtype!(CourseId);
id_newtype!(RoomId);
id_newtype!(LecturerId);
id_newtype!(TimeslotId);

pub const DEFAULT_GROUP_SIZE_TARGET: u32 = 60;
pub const DEFAULT_MAX_SESSIONS_PER_WEEK: u32 = 4;
pub const MAX_SESSIONS_PER_WEEK_BOUND: u32 = 4;
pub const DEFAULT_SESSIONS_PER_CREDIT: u32 = 15;

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    #[serde(alias = "mon", alias = "Monday", alias = "MONDAY")]
    Monday,
    #[serde(alias = "tue", alias = "Tuesday", alias = "TUESDAY")]
    Tuesday,
    #[serde(alias = "wed", alias = "Wednesday", alias = "WEDNESDAY")]
    Wednesday,
    #[serde(alias = "thu", alias = "Thursday", alias = "THURSDAY")]
    Thursday,
    #[serde(alias = "fri", alias = "Friday", alias = "FRIDAY")]
    Friday,
    #[serde(alias = "sat", alias = "Saturday", alias = "SATURDAY")]
    Saturday,
    #[serde(alias = "sun", alias = "Sunday", alias = "SUNDAY")]
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Monday = 0 ... Sunday = 6.
    pub fn days_from_monday(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(w: chrono::Weekday) -> Self {
        DayOfWeek::ALL[w.num_days_from_monday() as usize]
    }
}

impl From<DayOfWeek> for chrono::Weekday {
    fn from(d: DayOfWeek) -> Self {
        match d {
            DayOfWeek::Monday => chrono::Weekday::Mon,
            DayOfWeek::Tuesday => chrono::Weekday::Tue,
            DayOfWeek::Wednesday => chrono::Weekday::Wed,
            DayOfWeek::Thursday => chrono::Weekday::Thu,
            DayOfWeek::Friday => chrono::Weekday::Fri,
            DayOfWeek::Saturday => chrono::Weekday::Sat,
            DayOfWeek::Sunday => chrono::Weekday::Sun,
        }
    }
}

/// A bookable period of the teaching day. Clock times are `"HH:MM"` strings.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: TimeslotId,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub shift: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub capacity: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Room,
    Lecturer,
}

/// A booking published before this run; never reassigned.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupiedSlot {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub date: NaiveDate,
    pub time_slot_id: TimeslotId,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseDemand {
    pub course_id: CourseId,
    pub credits: u32,
    /// Falls back to `credits * sessionsPerCredit` when absent.
    #[serde(default)]
    pub total_semester_sessions: Option<u32>,
    pub registered_students: u32,
    #[serde(default)]
    pub potential_lecturer_ids: Vec<LecturerId>,
}

impl CourseDemand {
    pub fn resolved_sessions(&self, sessions_per_credit: u32) -> u32 {
        self.total_semester_sessions
            .unwrap_or_else(|| self.credits.saturating_mul(sessions_per_credit))
    }
}

fn default_group_size_target() -> u32 {
    DEFAULT_GROUP_SIZE_TARGET
}

fn default_max_sessions_per_week() -> u32 {
    DEFAULT_MAX_SESSIONS_PER_WEEK
}

fn default_sessions_per_credit() -> u32 {
    DEFAULT_SESSIONS_PER_CREDIT
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub semester_id: SemesterId,
    pub semester_start_date: NaiveDate,
    pub semester_end_date: NaiveDate,
    pub teachable_weekdays: Vec<DayOfWeek>,
    pub time_slots: Vec<TimeSlot>,
    pub rooms: Vec<Room>,
    pub lecturer_ids: Vec<LecturerId>,
    #[serde(default)]
    pub exception_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub occupied_slots: Vec<OccupiedSlot>,
    #[serde(default = "default_group_size_target")]
    pub group_size_target: u32,
    #[serde(default = "default_max_sessions_per_week")]
    pub max_sessions_per_week_allowed: u32,
    #[serde(default = "default_sessions_per_credit")]
    pub sessions_per_credit: u32,
    pub courses: Vec<CourseDemand>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyScheduleDetail {
    pub day_of_week: DayOfWeek,
    pub time_slot_id: TimeslotId,
    pub room_id: RoomId,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub group_number: u32,
    pub capacity: u32,
    #[serde(default)]
    pub lecturer_id: Option<LecturerId>,
    #[serde(default)]
    pub group_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub group_end_date: Option<NaiveDate>,
    pub total_teaching_weeks_for_group: u32,
    pub sessions_per_week_for_group: u32,
    #[serde(default)]
    pub scheduled_sessions: u32,
    #[serde(default)]
    pub weekly_schedule_details: Vec<WeeklyScheduleDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unscheduled_reason: Option<String>,
}

impl ClassGroup {
    pub fn is_scheduled(&self) -> bool {
        self.lecturer_id.is_some() && !self.weekly_schedule_details.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    Complete,
    Partial,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCourse {
    pub course_id: CourseId,
    pub total_registered_students: u32,
    pub total_sessions_for_course: u32,
    pub status: CourseStatus,
    pub class_groups: Vec<ClassGroup>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolverResult {
    pub semester_id: SemesterId,
    pub semester_start_date: NaiveDate,
    pub semester_end_date: NaiveDate,
    pub scheduled_courses: Vec<ScheduledCourse>,
    pub load_difference: u32,
    pub total_original_sessions_to_schedule: u32,
    pub total_sessions_scheduled: u32,
    pub solver_duration_seconds: f64,
    pub solver_status: SolverStatus,
    pub solver_message: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Teaching,
    Exception,
    OutsideSemester,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeachingDay {
    pub day_of_week: DayOfWeek,
    pub date: NaiveDate,
    pub status: DayStatus,
}

impl TeachingDay {
    pub fn is_usable(&self) -> bool {
        self.status == DayStatus::Teaching
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeachingWeek {
    /// 1-based position among teaching weeks.
    pub index: u32,
    /// 1-based week counted from the first teachable day, holiday weeks included.
    pub calendar_week: u32,
    pub days: Vec<TeachingDay>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SolveMode {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SolveParams {
    #[serde(default)]
    pub mode: SolveMode,
    #[serde(default)]
    pub time_limit_sec: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveEnvelope {
    pub request: ScheduleRequest,
    #[serde(default)]
    pub params: SolveParams,
}
