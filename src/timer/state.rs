use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer was not running; nothing changed.
    Ignored,
    Decremented,
    Completed,
}

/// Countdown for a single preparation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTimer {
    pub step_number: u32,
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub status: TimerStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepTimer {
    pub fn new(step_number: u32, duration_secs: u32) -> Self {
        Self {
            step_number,
            duration_secs,
            remaining_secs: 0,
            status: TimerStatus::Idle,
            completed_at: None,
        }
    }

    /// Enters Running. An exhausted timer (Idle or Completed) reloads the full
    /// duration; a paused or running one keeps what it has left.
    pub fn arm(&mut self) {
        if self.remaining_secs == 0 {
            self.remaining_secs = self.duration_secs;
        }
        self.status = TimerStatus::Running;
        self.completed_at = None;
    }

    pub fn set_duration(&mut self, duration_secs: u32) {
        self.duration_secs = duration_secs;
        self.remaining_secs = self.remaining_secs.min(duration_secs);
    }

    /// Freezes a running timer. Returns false when there was nothing to pause.
    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn stop(&mut self) {
        self.remaining_secs = 0;
        self.status = TimerStatus::Idle;
        self.completed_at = None;
    }

    /// One clock second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }

        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.status = TimerStatus::Completed;
            self.completed_at = Some(Utc::now());
            TickOutcome::Completed
        } else {
            self.remaining_secs -= 1;
            TickOutcome::Decremented
        }
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            step_number: self.step_number,
            status: self.status,
            remaining_secs: self.remaining_secs,
            duration_secs: self.duration_secs,
            display: format_remaining(self.remaining_secs),
            completed_at: self.completed_at,
        }
    }
}

/// Read-only snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub step_number: u32,
    pub status: TimerStatus,
    pub remaining_secs: u32,
    pub duration_secs: u32,
    pub display: String,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimerView {
    /// Placeholder for a step whose timer has never been started.
    pub fn idle(step_number: u32, duration_secs: u32) -> Self {
        StepTimer::new(step_number, duration_secs).view()
    }
}

/// `m:ss`, e.g. 125 -> "2:05".
pub fn format_remaining(remaining_secs: u32) -> String {
    format!("{}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

/// Converts a duration in (possibly fractional) minutes to whole seconds.
/// `None` when the result would not be at least one second.
pub fn duration_secs_from_minutes(minutes: f64) -> Option<u32> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    let secs = (minutes * 60.0).round();
    if secs < 1.0 || secs > u32::MAX as f64 {
        return None;
    }
    Some(secs as u32)
}
