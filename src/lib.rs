pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::app::{App, AppError, PomodoroStatus};
pub use application::pomodoro::{
    DisplayState, Observer, PomodoroEngine, PomodoroEvent, Rgb, interpolate_color,
};
pub use application::ticker::{TickerHandle, spawn_interval};
pub use domain::models::{
    CalendarEvent, CalendarTask, DayStatus, FUTURE_DATE, Note, PomodoroSettings, SessionKind, Task,
    day_status, format_date_short, format_time_12h, week_of,
};
pub use infrastructure::error::StorageError;
pub use infrastructure::medium::{InMemoryMedium, SqliteMedium, StorageMedium};
pub use infrastructure::snapshot::{Snapshot, SnapshotPomodoro};
pub use infrastructure::store::Store;
