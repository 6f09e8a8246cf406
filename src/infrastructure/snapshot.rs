use crate::domain::models::{
    CalendarEvent, CalendarTask, Note, PomodoroSettings, SessionKind, Task, validate_hhmm,
    validate_non_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Pomodoro portion of a snapshot: the persisted configuration plus the
/// session position at export time. `running` is deliberately absent — a
/// restored snapshot always comes back paused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPomodoro {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub current_session_kind: SessionKind,
    pub current_remaining: u32,
}

impl SnapshotPomodoro {
    pub fn settings(&self) -> PomodoroSettings {
        PomodoroSettings {
            work_minutes: self.work_minutes,
            short_break_minutes: self.short_break_minutes,
            long_break_minutes: self.long_break_minutes,
        }
    }
}

/// Consolidated export/import representation of all persisted state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub pomodoro_settings: SnapshotPomodoro,
    pub notes: Vec<Note>,
    pub events: Vec<CalendarEvent>,
    pub calendar_tasks: Vec<CalendarTask>,
    pub last_saved: DateTime<Utc>,
}

impl Snapshot {
    /// Structural validation before an import is allowed to touch any
    /// state. Task dates are checked for shape only — a snapshot may
    /// legitimately carry dates that have since passed.
    pub fn validate(&self) -> Result<(), String> {
        self.pomodoro_settings.settings().validate()?;

        let mut seen = HashSet::new();
        for task in &self.tasks {
            validate_non_empty(&task.id, "snapshot.tasks[].id")?;
            validate_non_empty(&task.title, "snapshot.tasks[].title")?;
            validate_non_empty(&task.scheduled_date, "snapshot.tasks[].scheduledDate")?;
            validate_hhmm(&task.scheduled_time, "snapshot.tasks[].scheduledTime")?;
            if !seen.insert(task.id.as_str()) {
                return Err(format!("snapshot.tasks duplicate id: {}", task.id));
            }
        }

        let mut seen = HashSet::new();
        for note in &self.notes {
            note.validate()?;
            if !seen.insert(note.id.as_str()) {
                return Err(format!("snapshot.notes duplicate id: {}", note.id));
            }
        }

        let mut seen = HashSet::new();
        for event in &self.events {
            event.validate()?;
            if !seen.insert(event.id.as_str()) {
                return Err(format!("snapshot.events duplicate id: {}", event.id));
            }
        }

        let mut seen = HashSet::new();
        for calendar_task in &self.calendar_tasks {
            calendar_task.validate()?;
            if !seen.insert(calendar_task.id.as_str()) {
                return Err(format!(
                    "snapshot.calendarTasks duplicate id: {}",
                    calendar_task.id
                ));
            }
        }

        Ok(())
    }

    /// Parses and fully validates a snapshot blob. Nothing is mutated on
    /// failure; the caller only applies a returned snapshot.
    pub fn decode(blob: &str) -> Result<Self, String> {
        let snapshot: Snapshot = serde_json::from_str(blob)
            .map_err(|error| format!("malformed snapshot: {error}"))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            tasks: vec![Task {
                id: "task-1".to_string(),
                title: "Revise algebra".to_string(),
                scheduled_date: "2020-01-06".to_string(),
                scheduled_time: "13:30".to_string(),
                completed: false,
                created_at: fixed_time("2020-01-01T08:00:00Z"),
            }],
            pomodoro_settings: SnapshotPomodoro {
                work_minutes: 25,
                short_break_minutes: 5,
                long_break_minutes: 15,
                current_session_kind: SessionKind::Work,
                current_remaining: 900,
            },
            notes: vec![Note {
                id: "note-1".to_string(),
                text: "Bring calculator".to_string(),
                created_at: fixed_time("2020-01-01T08:00:00Z"),
                updated_at: fixed_time("2020-01-01T08:00:00Z"),
            }],
            events: vec![CalendarEvent {
                id: "event-1".to_string(),
                date: "2020-01-10".to_string(),
                title: "Physics midterm".to_string(),
                created_at: fixed_time("2020-01-01T08:00:00Z"),
            }],
            calendar_tasks: vec![CalendarTask {
                id: "ctask-1".to_string(),
                date: "2020-01-08".to_string(),
                text: "Submit lab report".to_string(),
                completed: true,
                created_at: fixed_time("2020-01-01T08:00:00Z"),
            }],
            last_saved: fixed_time("2020-01-02T08:00:00Z"),
        }
    }

    #[test]
    fn decode_round_trips_an_exported_snapshot() {
        let snapshot = sample_snapshot();
        let blob = serde_json::to_string(&snapshot).expect("serialize snapshot");
        let decoded = Snapshot::decode(&blob).expect("decode snapshot");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn snapshot_accepts_dates_that_have_since_passed() {
        assert!(sample_snapshot().validate().is_ok());
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let error = Snapshot::decode("{ definitely not json").expect_err("must fail");
        assert!(error.contains("malformed snapshot"));
    }

    #[test]
    fn decode_rejects_missing_fields() {
        assert!(Snapshot::decode(r#"{"tasks": []}"#).is_err());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut snapshot = sample_snapshot();
        let duplicate = snapshot.notes[0].clone();
        snapshot.notes.push(duplicate);
        let error = snapshot.validate().expect_err("duplicate must fail");
        assert!(error.contains("duplicate id"));
    }

    #[test]
    fn validate_rejects_zero_duration_settings() {
        let mut snapshot = sample_snapshot();
        snapshot.pomodoro_settings.work_minutes = 0;
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn snapshot_uses_the_documented_wire_keys() {
        let raw = serde_json::to_value(sample_snapshot()).expect("serialize snapshot");
        assert!(raw.get("pomodoroSettings").is_some());
        assert!(raw.get("calendarTasks").is_some());
        assert!(raw.get("lastSaved").is_some());
        assert!(raw["pomodoroSettings"].get("workMinutes").is_some());
        assert!(raw["pomodoroSettings"].get("currentSessionKind").is_some());
        assert!(raw["pomodoroSettings"].get("currentRemaining").is_some());
    }
}
