use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Placeholder date that defers concrete scheduling. A task carrying this
/// value skips the past-date check entirely.
pub const FUTURE_DATE: &str = "future";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }
}

/// Configured Pomodoro durations. Persisted as minutes; the engine works
/// in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.work_minutes == 0 {
            return Err("settings.work_minutes must be >= 1".to_string());
        }
        if self.short_break_minutes == 0 {
            return Err("settings.short_break_minutes must be >= 1".to_string());
        }
        if self.long_break_minutes == 0 {
            return Err("settings.long_break_minutes must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn duration_seconds(&self, kind: SessionKind) -> u32 {
        let minutes = match kind {
            SessionKind::Work => self.work_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        };
        minutes * 60
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`, or the [`FUTURE_DATE`] sentinel.
    pub scheduled_date: String,
    /// 24-hour `HH:MM`.
    pub scheduled_time: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Validates a task against the calendar day `today`. The sentinel date
    /// bypasses the past-date check; a concrete date must not lie strictly
    /// before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        validate_non_empty(&self.scheduled_date, "task.scheduled_date")?;
        validate_hhmm(&self.scheduled_time, "task.scheduled_time")?;
        if self.scheduled_date != FUTURE_DATE {
            let date = parse_date(&self.scheduled_date, "task.scheduled_date")?;
            if date < today {
                return Err("task.scheduled_date must not be before today".to_string());
            }
        }
        Ok(())
    }

    /// 12-hour display form, e.g. `"13:30"` -> `"1:30 PM"`.
    pub fn display_time(&self) -> String {
        format_time_12h(&self.scheduled_time).unwrap_or_else(|| self.scheduled_time.clone())
    }

    /// Short display form, e.g. `"Wed 5 Feb"`; the sentinel renders as
    /// `"Future"`.
    pub fn display_date(&self) -> String {
        if self.scheduled_date == FUTURE_DATE {
            return "Future".to_string();
        }
        match NaiveDate::parse_from_str(&self.scheduled_date, "%Y-%m-%d") {
            Ok(date) => format_date_short(date),
            Err(_) => self.scheduled_date.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "note.id")?;
        validate_non_empty(&self.text, "note.text")?;
        if self.updated_at < self.created_at {
            return Err("note.updated_at must be >= note.created_at".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub date: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")?;
        validate_non_empty(&self.title, "event.title")?;
        validate_date(&self.date, "event.date")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTask {
    pub id: String,
    pub date: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl CalendarTask {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "calendar_task.id")?;
        validate_non_empty(&self.text, "calendar_task.text")?;
        validate_date(&self.date, "calendar_task.date")?;
        Ok(())
    }
}

/// How a day in the week strip relates to today. Drives styling and the
/// day dropdown (past days are not offered for new tasks).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Past,
    Today,
    Upcoming,
}

pub fn day_status(day: NaiveDate, today: NaiveDate) -> DayStatus {
    if day == today {
        DayStatus::Today
    } else if day < today {
        DayStatus::Past
    } else {
        DayStatus::Upcoming
    }
}

/// The Sunday-based week containing `date`.
pub fn week_of(date: NaiveDate) -> [NaiveDate; 7] {
    let offset = date.weekday().num_days_from_sunday() as i64;
    let sunday = date - Duration::days(offset);
    std::array::from_fn(|index| sunday + Duration::days(index as i64))
}

/// Converts a 24-hour `HH:MM` string to its 12-hour display form. Returns
/// `None` when the input is not a valid `HH:MM` time.
pub fn format_time_12h(value: &str) -> Option<String> {
    let (hour, minute) = parse_hhmm(value)?;
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let mut hour12 = hour % 12;
    if hour12 == 0 {
        hour12 = 12;
    }
    Some(format!("{hour12}:{minute:02} {suffix}"))
}

pub fn format_date_short(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        weekday_short(date.weekday()),
        date.day(),
        month_short(date.month())
    )
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    parse_hhmm(value)
        .map(|_| ())
        .ok_or_else(|| format!("{field_name} must be HH:MM"))
}

pub(crate) fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    parse_date(value, field_name).map(|_| ())
}

pub(crate) fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}

fn parse_hhmm(value: &str) -> Option<(u8, u8)> {
    let (hour_str, minute_str) = value.split_once(':')?;
    let hour = hour_str.parse::<u8>().ok()?;
    let minute = minute_str.parse::<u8>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

fn weekday_short(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn month_short(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "???",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn fixed_date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn sample_task() -> Task {
        Task {
            id: "task-1700000000000001-1".to_string(),
            title: "Revise algebra".to_string(),
            scheduled_date: "2026-03-02".to_string(),
            scheduled_time: "13:30".to_string(),
            completed: false,
            created_at: fixed_time("2026-03-01T08:00:00Z"),
        }
    }

    fn sample_note() -> Note {
        Note {
            id: "note-1700000000000002-2".to_string(),
            text: "Bring calculator to the exam".to_string(),
            created_at: fixed_time("2026-03-01T08:00:00Z"),
            updated_at: fixed_time("2026-03-01T09:00:00Z"),
        }
    }

    fn sample_event() -> CalendarEvent {
        CalendarEvent {
            id: "event-1700000000000003-3".to_string(),
            date: "2026-03-05".to_string(),
            title: "Physics midterm".to_string(),
            created_at: fixed_time("2026-03-01T08:00:00Z"),
        }
    }

    fn sample_calendar_task() -> CalendarTask {
        CalendarTask {
            id: "ctask-1700000000000004-4".to_string(),
            date: "2026-03-04".to_string(),
            text: "Submit lab report".to_string(),
            completed: false,
            created_at: fixed_time("2026-03-01T08:00:00Z"),
        }
    }

    #[test]
    fn task_validate_accepts_today_and_future_dates() {
        let today = fixed_date("2026-03-02");
        let mut task = sample_task();
        assert!(task.validate(today).is_ok());

        task.scheduled_date = "2026-03-09".to_string();
        assert!(task.validate(today).is_ok());
    }

    #[test]
    fn task_validate_rejects_past_date() {
        let today = fixed_date("2026-03-02");
        let mut task = sample_task();
        task.scheduled_date = "2026-03-01".to_string();
        assert!(task.validate(today).is_err());
    }

    #[test]
    fn task_validate_sentinel_bypasses_past_date_check() {
        let today = fixed_date("2026-03-02");
        let mut task = sample_task();
        task.scheduled_date = FUTURE_DATE.to_string();
        assert!(task.validate(today).is_ok());
    }

    #[test]
    fn task_validate_rejects_blank_fields_and_bad_time() {
        let today = fixed_date("2026-03-02");

        let mut task = sample_task();
        task.title = "   ".to_string();
        assert!(task.validate(today).is_err());

        let mut task = sample_task();
        task.scheduled_time = "25:00".to_string();
        assert!(task.validate(today).is_err());

        let mut task = sample_task();
        task.scheduled_time = "noon".to_string();
        assert!(task.validate(today).is_err());
    }

    #[test]
    fn display_time_matches_expected_12_hour_forms() {
        let mut task = sample_task();
        assert_eq!(task.display_time(), "1:30 PM");

        task.scheduled_time = "00:15".to_string();
        assert_eq!(task.display_time(), "12:15 AM");

        task.scheduled_time = "12:00".to_string();
        assert_eq!(task.display_time(), "12:00 PM");
    }

    #[test]
    fn display_date_renders_short_form_and_sentinel() {
        let mut task = sample_task();
        assert_eq!(task.display_date(), "Mon 2 Mar");

        task.scheduled_date = FUTURE_DATE.to_string();
        assert_eq!(task.display_date(), "Future");
    }

    #[test]
    fn note_validate_rejects_reversed_timestamps() {
        let mut note = sample_note();
        note.updated_at = fixed_time("2026-03-01T07:00:00Z");
        assert!(note.validate().is_err());
    }

    #[test]
    fn event_and_calendar_task_validate() {
        assert!(sample_event().validate().is_ok());
        assert!(sample_calendar_task().validate().is_ok());

        let mut event = sample_event();
        event.date = "03/05/2026".to_string();
        assert!(event.validate().is_err());

        let mut calendar_task = sample_calendar_task();
        calendar_task.text = String::new();
        assert!(calendar_task.validate().is_err());
    }

    #[test]
    fn settings_validate_rejects_zero_minutes() {
        let mut settings = PomodoroSettings::default();
        assert!(settings.validate().is_ok());
        settings.short_break_minutes = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_duration_seconds_per_kind() {
        let settings = PomodoroSettings::default();
        assert_eq!(settings.duration_seconds(SessionKind::Work), 25 * 60);
        assert_eq!(settings.duration_seconds(SessionKind::ShortBreak), 5 * 60);
        assert_eq!(settings.duration_seconds(SessionKind::LongBreak), 15 * 60);
    }

    #[test]
    fn week_of_starts_on_sunday_and_contains_the_date() {
        // 2026-03-04 is a Wednesday.
        let week = week_of(fixed_date("2026-03-04"));
        assert_eq!(week[0], fixed_date("2026-03-01"));
        assert_eq!(week[0].weekday(), Weekday::Sun);
        assert_eq!(week[6], fixed_date("2026-03-07"));
        assert!(week.contains(&fixed_date("2026-03-04")));
    }

    #[test]
    fn day_status_classifies_relative_to_today() {
        let today = fixed_date("2026-03-04");
        assert_eq!(day_status(fixed_date("2026-03-03"), today), DayStatus::Past);
        assert_eq!(day_status(today, today), DayStatus::Today);
        assert_eq!(
            day_status(fixed_date("2026-03-05"), today),
            DayStatus::Upcoming
        );
    }

    #[test]
    fn domain_models_support_serde_roundtrip() {
        let task = sample_task();
        let note = sample_note();
        let event = sample_event();
        let calendar_task = sample_calendar_task();
        let settings = PomodoroSettings::default();

        let task_roundtrip: Task =
            serde_json::from_str(&serde_json::to_string(&task).expect("serialize task"))
                .expect("deserialize task");
        let note_roundtrip: Note =
            serde_json::from_str(&serde_json::to_string(&note).expect("serialize note"))
                .expect("deserialize note");
        let event_roundtrip: CalendarEvent =
            serde_json::from_str(&serde_json::to_string(&event).expect("serialize event"))
                .expect("deserialize event");
        let calendar_task_roundtrip: CalendarTask = serde_json::from_str(
            &serde_json::to_string(&calendar_task).expect("serialize calendar task"),
        )
        .expect("deserialize calendar task");
        let settings_roundtrip: PomodoroSettings =
            serde_json::from_str(&serde_json::to_string(&settings).expect("serialize settings"))
                .expect("deserialize settings");

        assert_eq!(task_roundtrip, task);
        assert_eq!(note_roundtrip, note);
        assert_eq!(event_roundtrip, event);
        assert_eq!(calendar_task_roundtrip, calendar_task);
        assert_eq!(settings_roundtrip, settings);
    }

    #[test]
    fn task_serializes_with_camel_case_keys() {
        let raw = serde_json::to_value(sample_task()).expect("serialize task");
        assert!(raw.get("scheduledDate").is_some());
        assert!(raw.get("scheduledTime").is_some());
        assert!(raw.get("createdAt").is_some());
    }

    proptest! {
        #[test]
        fn format_time_12h_accepts_every_valid_minute(hour in 0u8..24, minute in 0u8..60) {
            let formatted = format_time_12h(&format!("{hour:02}:{minute:02}"))
                .expect("valid HH:MM must format");
            let expected_suffix = if hour < 12 { "AM" } else { "PM" };
            prop_assert!(formatted.ends_with(expected_suffix));
            let expected_hour = match hour % 12 {
                0 => 12,
                other => other,
            };
            let expected_prefix = format!("{}:", expected_hour);
            prop_assert!(formatted.starts_with(&expected_prefix));
        }

        #[test]
        fn week_of_always_covers_seven_consecutive_days(offset in 0i64..2000) {
            let date = fixed_date("2026-01-01") + Duration::days(offset);
            let week = week_of(date);
            prop_assert_eq!(week[0].weekday(), Weekday::Sun);
            for pair in week.windows(2) {
                prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
            prop_assert!(week.contains(&date));
        }
    }
}
