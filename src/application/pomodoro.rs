use crate::domain::models::{PomodoroSettings, SessionKind};
use serde::Serialize;

pub const GO_COLOR: Rgb = Rgb {
    r: 0x36,
    g: 0xd3,
    b: 0x44,
};
pub const WARNING_COLOR: Rgb = Rgb {
    r: 0xf5,
    g: 0xa6,
    b: 0x23,
};
pub const DANGER_COLOR: Rgb = Rgb {
    r: 0xe7,
    g: 0x4c,
    b: 0x3c,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb {
            r: channel(from.r, to.r),
            g: channel(from.g, to.g),
            b: channel(from.b, to.b),
        }
    }
}

/// Two-stage countdown color: warning at an empty timer, go at the
/// halfway point, danger at a full timer. Continuous across the 0.5
/// boundary; a pure function of the progress fraction.
pub fn interpolate_color(fraction: f64) -> Rgb {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction > 0.5 {
        Rgb::lerp(GO_COLOR, DANGER_COLOR, (fraction - 0.5) * 2.0)
    } else {
        Rgb::lerp(WARNING_COLOR, GO_COLOR, fraction * 2.0)
    }
}

/// Every observable engine state change produces one event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PomodoroEvent {
    Started {
        kind: SessionKind,
        remaining_seconds: u32,
    },
    Tick {
        kind: SessionKind,
        remaining_seconds: u32,
    },
    SessionCompleted {
        from: SessionKind,
        to: SessionKind,
        next_duration_seconds: u32,
    },
    Paused {
        kind: SessionKind,
        remaining_seconds: u32,
    },
    Reset,
}

pub type Observer = Box<dyn FnMut(&PomodoroEvent) + Send>;

/// Render-ready view of the engine for the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayState {
    /// `MM:SS`, zero-padded.
    pub clock: String,
    /// `remaining / duration(current state)`, in `[0, 1]`.
    pub progress: f64,
    pub color: Rgb,
}

/// Countdown session state machine. The engine owns no timer of its own:
/// a driver delivers one `tick()` per second while `running` is true, and
/// a tick that arrives after `pause()`/`reset()` is a no-op.
pub struct PomodoroEngine {
    kind: SessionKind,
    remaining_seconds: u32,
    running: bool,
    settings: PomodoroSettings,
    observers: Vec<Observer>,
}

impl PomodoroEngine {
    pub fn new(settings: PomodoroSettings) -> Self {
        let remaining_seconds = settings.duration_seconds(SessionKind::Work);
        Self {
            kind: SessionKind::Work,
            remaining_seconds,
            running: false,
            settings,
            observers: Vec::new(),
        }
    }

    /// Rebuilds an engine at a saved session position, always paused. An
    /// out-of-range `remaining` value falls back to the full duration of
    /// `kind`.
    pub fn restored(settings: PomodoroSettings, kind: SessionKind, remaining: u32) -> Self {
        let duration = settings.duration_seconds(kind);
        let remaining_seconds = if remaining == 0 || remaining > duration {
            duration
        } else {
            remaining
        };
        Self {
            kind,
            remaining_seconds,
            running: false,
            settings,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn settings(&self) -> PomodoroSettings {
        self.settings
    }

    /// No-op when already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.emit(PomodoroEvent::Started {
            kind: self.kind,
            remaining_seconds: self.remaining_seconds,
        });
    }

    /// Idempotent; retains `remaining` and the current state unchanged.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.emit(PomodoroEvent::Paused {
            kind: self.kind,
            remaining_seconds: self.remaining_seconds,
        });
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.kind = SessionKind::Work;
        self.remaining_seconds = self.settings.duration_seconds(SessionKind::Work);
        self.emit(PomodoroEvent::Reset);
    }

    /// One second elapsed. Decrement-then-check: the displayed value never
    /// drops below zero and the session transition fires exactly once, on
    /// the tick that reaches zero. The engine stops itself after a
    /// transition; the user must start the next session explicitly.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
        if self.remaining_seconds == 0 {
            let from = self.kind;
            let to = match from {
                SessionKind::Work => SessionKind::ShortBreak,
                SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
            };
            self.kind = to;
            self.remaining_seconds = self.settings.duration_seconds(to);
            self.running = false;
            self.emit(PomodoroEvent::SessionCompleted {
                from,
                to,
                next_duration_seconds: self.remaining_seconds,
            });
        } else {
            self.emit(PomodoroEvent::Tick {
                kind: self.kind,
                remaining_seconds: self.remaining_seconds,
            });
        }
    }

    /// Replaces the configured durations. Invalid input never mutates
    /// state. When the engine is idle in a state whose duration changed,
    /// `remaining` is re-based to the new duration; `running` is never
    /// affected.
    pub fn configure(&mut self, settings: PomodoroSettings) -> Result<(), String> {
        settings.validate()?;
        let previous = self.settings.duration_seconds(self.kind);
        self.settings = settings;
        let current = self.settings.duration_seconds(self.kind);
        if !self.running && current != previous {
            self.remaining_seconds = current;
        }
        Ok(())
    }

    pub fn progress_fraction(&self) -> f64 {
        let duration = self.settings.duration_seconds(self.kind);
        if duration == 0 {
            return 0.0;
        }
        (f64::from(self.remaining_seconds) / f64::from(duration)).clamp(0.0, 1.0)
    }

    pub fn display_state(&self) -> DisplayState {
        let progress = self.progress_fraction();
        DisplayState {
            clock: format!(
                "{:02}:{:02}",
                self.remaining_seconds / 60,
                self.remaining_seconds % 60
            ),
            progress,
            color: interpolate_color(progress),
        }
    }

    fn emit(&mut self, event: PomodoroEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}
