use crate::application::pomodoro::{DisplayState, Observer, PomodoroEngine};
use crate::domain::models::{
    CalendarEvent, CalendarTask, Note, PomodoroSettings, SessionKind, Task,
};
use crate::infrastructure::error::StorageError;
use crate::infrastructure::medium::SqliteMedium;
use crate::infrastructure::snapshot::{Snapshot, SnapshotPomodoro};
use crate::infrastructure::store::Store;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const TASKS_KEY: &str = "tasks";
pub const NOTES_KEY: &str = "notes";
pub const EVENTS_KEY: &str = "events";
pub const CALENDAR_TASKS_KEY: &str = "calendar_tasks";
pub const POMODORO_SETTINGS_KEY: &str = "pomodoro_settings";
pub const SNAPSHOT_KEY: &str = "snapshot";

const DATABASE_FILE: &str = "studydesk.sqlite";
const LOG_FILE: &str = "studydesk.log";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
    #[error("Import error: {0}")]
    Import(String),
}

/// Engine position as the presentation layer polls it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PomodoroStatus {
    pub kind: SessionKind,
    pub remaining_seconds: u32,
    pub running: bool,
}

struct RuntimeState {
    tasks: HashMap<String, Task>,
    task_order: Vec<String>,
    notes: Vec<Note>,
    events: Vec<CalendarEvent>,
    calendar_tasks: Vec<CalendarTask>,
    engine: PomodoroEngine,
}

impl RuntimeState {
    fn empty() -> Self {
        Self {
            tasks: HashMap::new(),
            task_order: Vec::new(),
            notes: Vec::new(),
            events: Vec::new(),
            calendar_tasks: Vec::new(),
            engine: PomodoroEngine::new(PomodoroSettings::default()),
        }
    }

    fn tasks_in_order(&self) -> Vec<Task> {
        self.task_order
            .iter()
            .filter_map(|task_id| self.tasks.get(task_id).cloned())
            .collect()
    }
}

/// Facade the presentation layer holds. Owns the registries, the Pomodoro
/// engine, and the persistence wiring; never touches any rendering.
pub struct App {
    store: Store,
    runtime: Mutex<RuntimeState>,
    logs_dir: Option<PathBuf>,
    log_guard: Mutex<()>,
}

impl App {
    /// Bootstraps a durable workspace: `state/` holds the SQLite medium,
    /// `logs/` the diagnostics log. Previously persisted collections and
    /// Pomodoro settings are hydrated; the countdown itself always comes
    /// back idle in a fresh work session.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, AppError> {
        let workspace_root = workspace_root.as_ref();
        let state_dir = workspace_root.join("state");
        let logs_dir = workspace_root.join("logs");
        fs::create_dir_all(&state_dir).map_err(StorageError::from)?;
        fs::create_dir_all(&logs_dir).map_err(StorageError::from)?;

        let medium = SqliteMedium::open(state_dir.join(DATABASE_FILE))?;
        let store = Store::new(Arc::new(medium));
        Ok(Self::from_parts(store, Some(logs_dir)))
    }

    /// Medium-agnostic constructor for tests and embedding hosts; no
    /// diagnostics log.
    pub fn with_store(store: Store) -> Self {
        Self::from_parts(store, None)
    }

    fn from_parts(store: Store, logs_dir: Option<PathBuf>) -> Self {
        let app = Self {
            store,
            runtime: Mutex::new(RuntimeState::empty()),
            logs_dir,
            log_guard: Mutex::new(()),
        };
        app.hydrate();
        app
    }

    fn hydrate(&self) {
        let tasks: Vec<Task> = self.load_or_default(TASKS_KEY);
        let notes: Vec<Note> = self.load_or_default(NOTES_KEY);
        let events: Vec<CalendarEvent> = self.load_or_default(EVENTS_KEY);
        let calendar_tasks: Vec<CalendarTask> = self.load_or_default(CALENDAR_TASKS_KEY);
        let settings: PomodoroSettings = self.load_or_default(POMODORO_SETTINGS_KEY);

        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(error) => {
                self.log_error(POMODORO_SETTINGS_KEY, &error);
                PomodoroSettings::default()
            }
        };

        let Ok(mut runtime) = self.runtime.lock() else {
            return;
        };
        runtime.task_order = tasks.iter().map(|task| task.id.clone()).collect();
        runtime.tasks = tasks
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
        runtime.notes = notes;
        runtime.events = events;
        runtime.calendar_tasks = calendar_tasks;
        runtime.engine = PomodoroEngine::new(settings);
    }

    fn load_or_default<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(error) => {
                self.log_error(key, &format!("falling back to default: {error}"));
                T::default()
            }
        }
    }

    /// A failed write is logged and skipped; the in-memory state stands
    /// and the next successful mutation rewrites the collection anyway.
    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(error) = self.store.save(key, value) {
            self.log_error(key, &format!("save skipped: {error}"));
        }
    }

    fn lock_runtime(&self) -> Result<MutexGuard<'_, RuntimeState>, AppError> {
        self.runtime.lock().map_err(|error| {
            AppError::Persistence(StorageError::Medium(format!(
                "runtime lock poisoned: {error}"
            )))
        })
    }

    // ----- tasks -----

    pub fn add_task(&self, title: &str, date: &str, time: &str) -> Result<Task, AppError> {
        let task = Task {
            id: next_id("task"),
            title: title.trim().to_string(),
            scheduled_date: date.trim().to_string(),
            scheduled_time: time.trim().to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        task.validate(Utc::now().date_naive())
            .map_err(AppError::Validation)?;

        let all_tasks = {
            let mut runtime = self.lock_runtime()?;
            runtime.task_order.push(task.id.clone());
            runtime.tasks.insert(task.id.clone(), task.clone());
            runtime.tasks_in_order()
        };
        self.persist(TASKS_KEY, &all_tasks);
        self.log_info("add_task", &format!("created task_id={}", task.id));
        Ok(task)
    }

    pub fn toggle_completed(&self, task_id: &str) -> Result<Task, AppError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(AppError::Validation("task_id must not be empty".to_string()));
        }

        let (updated, all_tasks) = {
            let mut runtime = self.lock_runtime()?;
            let Some(task) = runtime.tasks.get_mut(task_id) else {
                return Err(AppError::Validation(format!("task not found: {task_id}")));
            };
            task.completed = !task.completed;
            let updated = task.clone();
            (updated, runtime.tasks_in_order())
        };
        self.persist(TASKS_KEY, &all_tasks);
        self.log_info("toggle_completed", &format!("toggled task_id={task_id}"));
        Ok(updated)
    }

    pub fn delete_task(&self, task_id: &str) -> Result<bool, AppError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(AppError::Validation("task_id must not be empty".to_string()));
        }

        let all_tasks = {
            let mut runtime = self.lock_runtime()?;
            if runtime.tasks.remove(task_id).is_none() {
                return Ok(false);
            }
            runtime.task_order.retain(|candidate| candidate != task_id);
            runtime.tasks_in_order()
        };
        self.persist(TASKS_KEY, &all_tasks);
        self.log_info("delete_task", &format!("deleted task_id={task_id}"));
        Ok(true)
    }

    /// Insertion order.
    pub fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.lock_runtime()?.tasks_in_order())
    }

    // ----- notes -----

    pub fn create_note(&self, text: &str) -> Result<Note, AppError> {
        let now = Utc::now();
        let note = Note {
            id: next_id("note"),
            text: text.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        note.validate().map_err(AppError::Validation)?;

        let all_notes = {
            let mut runtime = self.lock_runtime()?;
            runtime.notes.push(note.clone());
            runtime.notes.clone()
        };
        self.persist(NOTES_KEY, &all_notes);
        self.log_info("create_note", &format!("created note_id={}", note.id));
        Ok(note)
    }

    pub fn update_note(&self, note_id: &str, text: &str) -> Result<Note, AppError> {
        let note_id = note_id.trim();
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("note.text must not be empty".to_string()));
        }

        let (updated, all_notes) = {
            let mut runtime = self.lock_runtime()?;
            let Some(note) = runtime.notes.iter_mut().find(|note| note.id == note_id) else {
                return Err(AppError::Validation(format!("note not found: {note_id}")));
            };
            note.text = text.to_string();
            note.updated_at = Utc::now();
            let updated = note.clone();
            (updated, runtime.notes.clone())
        };
        self.persist(NOTES_KEY, &all_notes);
        self.log_info("update_note", &format!("updated note_id={note_id}"));
        Ok(updated)
    }

    pub fn delete_note(&self, note_id: &str) -> Result<bool, AppError> {
        let note_id = note_id.trim();
        let all_notes = {
            let mut runtime = self.lock_runtime()?;
            let before = runtime.notes.len();
            runtime.notes.retain(|note| note.id != note_id);
            if runtime.notes.len() == before {
                return Ok(false);
            }
            runtime.notes.clone()
        };
        self.persist(NOTES_KEY, &all_notes);
        self.log_info("delete_note", &format!("deleted note_id={note_id}"));
        Ok(true)
    }

    /// Insertion order.
    pub fn list_notes(&self) -> Result<Vec<Note>, AppError> {
        Ok(self.lock_runtime()?.notes.clone())
    }

    // ----- calendar events -----

    pub fn create_event(&self, date: &str, title: &str) -> Result<CalendarEvent, AppError> {
        let event = CalendarEvent {
            id: next_id("event"),
            date: date.trim().to_string(),
            title: title.trim().to_string(),
            created_at: Utc::now(),
        };
        event.validate().map_err(AppError::Validation)?;

        let all_events = {
            let mut runtime = self.lock_runtime()?;
            runtime.events.push(event.clone());
            runtime.events.clone()
        };
        self.persist(EVENTS_KEY, &all_events);
        self.log_info("create_event", &format!("created event_id={}", event.id));
        Ok(event)
    }

    pub fn delete_event(&self, event_id: &str) -> Result<bool, AppError> {
        let event_id = event_id.trim();
        let all_events = {
            let mut runtime = self.lock_runtime()?;
            let before = runtime.events.len();
            runtime.events.retain(|event| event.id != event_id);
            if runtime.events.len() == before {
                return Ok(false);
            }
            runtime.events.clone()
        };
        self.persist(EVENTS_KEY, &all_events);
        self.log_info("delete_event", &format!("deleted event_id={event_id}"));
        Ok(true)
    }

    /// Ascending date; re-sorted on every call, never stored sorted. The
    /// stable sort keeps insertion order among equal dates.
    pub fn list_events(&self) -> Result<Vec<CalendarEvent>, AppError> {
        let mut events = self.lock_runtime()?.events.clone();
        events.sort_by(|left, right| left.date.cmp(&right.date));
        Ok(events)
    }

    // ----- calendar tasks -----

    /// `completed` is a creation field: edits are delete-and-recreate, so
    /// a recreated entry must be able to carry its old state.
    pub fn create_calendar_task(
        &self,
        date: &str,
        text: &str,
        completed: bool,
    ) -> Result<CalendarTask, AppError> {
        let calendar_task = CalendarTask {
            id: next_id("ctask"),
            date: date.trim().to_string(),
            text: text.trim().to_string(),
            completed,
            created_at: Utc::now(),
        };
        calendar_task.validate().map_err(AppError::Validation)?;

        let all = {
            let mut runtime = self.lock_runtime()?;
            runtime.calendar_tasks.push(calendar_task.clone());
            runtime.calendar_tasks.clone()
        };
        self.persist(CALENDAR_TASKS_KEY, &all);
        self.log_info(
            "create_calendar_task",
            &format!("created calendar_task_id={}", calendar_task.id),
        );
        Ok(calendar_task)
    }

    pub fn delete_calendar_task(&self, calendar_task_id: &str) -> Result<bool, AppError> {
        let calendar_task_id = calendar_task_id.trim();
        let all = {
            let mut runtime = self.lock_runtime()?;
            let before = runtime.calendar_tasks.len();
            runtime
                .calendar_tasks
                .retain(|calendar_task| calendar_task.id != calendar_task_id);
            if runtime.calendar_tasks.len() == before {
                return Ok(false);
            }
            runtime.calendar_tasks.clone()
        };
        self.persist(CALENDAR_TASKS_KEY, &all);
        self.log_info(
            "delete_calendar_task",
            &format!("deleted calendar_task_id={calendar_task_id}"),
        );
        Ok(true)
    }

    /// Ascending date, stable among equals.
    pub fn list_calendar_tasks(&self) -> Result<Vec<CalendarTask>, AppError> {
        let mut calendar_tasks = self.lock_runtime()?.calendar_tasks.clone();
        calendar_tasks.sort_by(|left, right| left.date.cmp(&right.date));
        Ok(calendar_tasks)
    }

    // ----- pomodoro -----

    pub fn start_pomodoro(&self) -> Result<PomodoroStatus, AppError> {
        let status = {
            let mut runtime = self.lock_runtime()?;
            runtime.engine.start();
            status_of(&runtime.engine)
        };
        self.log_info("start_pomodoro", "timer started");
        Ok(status)
    }

    pub fn pause_pomodoro(&self) -> Result<PomodoroStatus, AppError> {
        let status = {
            let mut runtime = self.lock_runtime()?;
            runtime.engine.pause();
            status_of(&runtime.engine)
        };
        self.log_info("pause_pomodoro", "timer paused");
        Ok(status)
    }

    pub fn reset_pomodoro(&self) -> Result<PomodoroStatus, AppError> {
        let status = {
            let mut runtime = self.lock_runtime()?;
            runtime.engine.reset();
            status_of(&runtime.engine)
        };
        self.log_info("reset_pomodoro", "timer reset to work session");
        Ok(status)
    }

    /// Body of the one-second driver; a tick landing after a pause or
    /// reset falls through the engine's `running` guard.
    pub fn tick_pomodoro(&self) -> Result<PomodoroStatus, AppError> {
        let mut runtime = self.lock_runtime()?;
        runtime.engine.tick();
        Ok(status_of(&runtime.engine))
    }

    /// Parses and applies user-entered durations (minutes). Any
    /// non-numeric or sub-1 field rejects the whole update and the
    /// previous configuration stays authoritative.
    pub fn configure_pomodoro(
        &self,
        work_minutes: &str,
        short_break_minutes: &str,
        long_break_minutes: &str,
    ) -> Result<PomodoroSettings, AppError> {
        let settings = PomodoroSettings {
            work_minutes: parse_minutes(work_minutes, "work")?,
            short_break_minutes: parse_minutes(short_break_minutes, "short break")?,
            long_break_minutes: parse_minutes(long_break_minutes, "long break")?,
        };
        {
            let mut runtime = self.lock_runtime()?;
            runtime
                .engine
                .configure(settings)
                .map_err(AppError::Validation)?;
        }
        self.persist(POMODORO_SETTINGS_KEY, &settings);
        self.log_info(
            "configure_pomodoro",
            &format!(
                "durations set work={} short={} long={}",
                settings.work_minutes, settings.short_break_minutes, settings.long_break_minutes
            ),
        );
        Ok(settings)
    }

    pub fn pomodoro_status(&self) -> Result<PomodoroStatus, AppError> {
        Ok(status_of(&self.lock_runtime()?.engine))
    }

    pub fn pomodoro_display(&self) -> Result<DisplayState, AppError> {
        Ok(self.lock_runtime()?.engine.display_state())
    }

    pub fn pomodoro_settings(&self) -> Result<PomodoroSettings, AppError> {
        Ok(self.lock_runtime()?.engine.settings())
    }

    pub fn subscribe_pomodoro(&self, observer: Observer) -> Result<(), AppError> {
        self.lock_runtime()?.engine.subscribe(observer);
        Ok(())
    }

    // ----- snapshot -----

    pub fn export_snapshot(&self) -> Result<String, AppError> {
        let snapshot = self.current_snapshot()?;
        serde_json::to_string(&snapshot)
            .map_err(|error| AppError::Persistence(StorageError::from(error)))
    }

    /// Body of the periodic auto-save driver: writes the consolidated
    /// snapshot under its own key.
    pub fn save_snapshot(&self) -> Result<(), AppError> {
        let snapshot = self.current_snapshot()?;
        self.persist(SNAPSHOT_KEY, &snapshot);
        Ok(())
    }

    /// Replaces all state from a snapshot blob. The blob is parsed and
    /// validated in full before anything is touched; on failure both the
    /// in-memory and the persisted state are left exactly as they were.
    pub fn import_snapshot(&self, blob: &str) -> Result<(), AppError> {
        let snapshot = Snapshot::decode(blob).map_err(AppError::Import)?;
        let settings = snapshot.pomodoro_settings.settings();

        {
            let mut runtime = self.lock_runtime()?;
            runtime.task_order = snapshot.tasks.iter().map(|task| task.id.clone()).collect();
            runtime.tasks = snapshot
                .tasks
                .iter()
                .cloned()
                .map(|task| (task.id.clone(), task))
                .collect();
            runtime.notes = snapshot.notes.clone();
            runtime.events = snapshot.events.clone();
            runtime.calendar_tasks = snapshot.calendar_tasks.clone();
            runtime.engine = PomodoroEngine::restored(
                settings,
                snapshot.pomodoro_settings.current_session_kind,
                snapshot.pomodoro_settings.current_remaining,
            );
        }

        self.persist(TASKS_KEY, &snapshot.tasks);
        self.persist(NOTES_KEY, &snapshot.notes);
        self.persist(EVENTS_KEY, &snapshot.events);
        self.persist(CALENDAR_TASKS_KEY, &snapshot.calendar_tasks);
        self.persist(POMODORO_SETTINGS_KEY, &settings);
        self.persist(SNAPSHOT_KEY, &snapshot);
        self.log_info("import_snapshot", "replaced all persisted state");
        Ok(())
    }

    fn current_snapshot(&self) -> Result<Snapshot, AppError> {
        let runtime = self.lock_runtime()?;
        let settings = runtime.engine.settings();
        Ok(Snapshot {
            tasks: runtime.tasks_in_order(),
            pomodoro_settings: SnapshotPomodoro {
                work_minutes: settings.work_minutes,
                short_break_minutes: settings.short_break_minutes,
                long_break_minutes: settings.long_break_minutes,
                current_session_kind: runtime.engine.kind(),
                current_remaining: runtime.engine.remaining_seconds(),
            },
            notes: runtime.notes.clone(),
            events: runtime.events.clone(),
            calendar_tasks: runtime.calendar_tasks.clone(),
            last_saved: Utc::now(),
        })
    }

    // ----- diagnostics -----

    pub(crate) fn log_info(&self, event: &str, message: &str) {
        self.append_log("info", event, message);
    }

    pub(crate) fn log_error(&self, event: &str, message: &str) {
        self.append_log("error", event, message);
    }

    fn append_log(&self, level: &str, event: &str, message: &str) {
        let Some(logs_dir) = &self.logs_dir else {
            return;
        };
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = logs_dir.join(LOG_FILE);
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "event": event,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{payload}");
        }
    }
}

fn status_of(engine: &PomodoroEngine) -> PomodoroStatus {
    PomodoroStatus {
        kind: engine.kind(),
        remaining_seconds: engine.remaining_seconds(),
        running: engine.is_running(),
    }
}

fn parse_minutes(value: &str, field: &str) -> Result<u32, AppError> {
    let parsed = value.trim().parse::<i64>().map_err(|_| {
        AppError::Validation(format!("{field} minutes must be a whole number"))
    })?;
    if parsed < 1 {
        return Err(AppError::Validation(format!(
            "{field} minutes must be >= 1"
        )));
    }
    if parsed > i64::from(u32::MAX / 60) {
        return Err(AppError::Validation(format!("{field} minutes too large")));
    }
    Ok(parsed as u32)
}
