use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    audio::CompletionCue,
    error::{Result, SessionError},
    events::{EventPublisher, SessionEventKind},
};

use super::state::{duration_secs_from_minutes, StepTimer, TickOutcome, TimerStatus, TimerView};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Live tick schedule for one step. Dropping the entry's schedule without
/// cancelling would leak the task, so every replacement goes through `cancel`.
struct Schedule {
    id: u64,
    token: CancellationToken,
}

impl Schedule {
    fn cancel(self) {
        self.token.cancel();
    }
}

struct TimerEntry {
    timer: StepTimer,
    schedule: Option<Schedule>,
}

#[derive(Default)]
struct Timers {
    entries: HashMap<u32, TimerEntry>,
    next_schedule_id: u64,
}

/// Independent per-step countdowns.
///
/// All timer state lives behind one lock and is only changed through
/// `start`, `pause`, `stop` and the tick tasks this manager spawns. Each step
/// has at most one live schedule; a tick whose schedule has been replaced or
/// cancelled is a no-op.
#[derive(Clone)]
pub struct TimerManager {
    timers: Arc<Mutex<Timers>>,
    root: CancellationToken,
    tick_interval: Duration,
    cue: Arc<dyn CompletionCue>,
    events: EventPublisher,
}

impl TimerManager {
    pub fn new(tick_interval: Duration, cue: Arc<dyn CompletionCue>, events: EventPublisher) -> Self {
        Self {
            timers: Arc::new(Mutex::new(Timers::default())),
            root: CancellationToken::new(),
            tick_interval,
            cue,
            events,
        }
    }

    /// Starts (or restarts) the countdown for a step. A timer with time left
    /// keeps it; an idle or completed one reloads `duration_minutes`.
    pub async fn start(&self, step_number: u32, duration_minutes: f64) -> Result<TimerView> {
        let duration_secs = duration_secs_from_minutes(duration_minutes).ok_or(
            SessionError::InvalidDuration {
                step: step_number,
                minutes: duration_minutes,
            },
        )?;

        let view = {
            let mut timers = self.timers.lock().await;
            self.arm_locked(&mut timers, step_number, duration_secs)
        };

        log_info!(
            "timer step {} running, {} left",
            step_number,
            view.display
        );
        self.events
            .publish(SessionEventKind::TimerChanged { timer: view.clone() });
        Ok(view)
    }

    /// Pause toggle: freezes a running timer, resumes a paused one.
    /// Steps that were never started, or are idle/completed, are left alone.
    pub async fn pause(&self, step_number: u32) -> Option<TimerView> {
        let view = {
            let mut timers = self.timers.lock().await;
            let (status, duration_secs) = match timers.entries.get(&step_number) {
                Some(entry) => (entry.timer.status, entry.timer.duration_secs),
                None => return None,
            };

            match status {
                TimerStatus::Running => {
                    let entry = timers.entries.get_mut(&step_number)?;
                    if let Some(schedule) = entry.schedule.take() {
                        schedule.cancel();
                    }
                    entry.timer.pause();
                    log_info!(
                        "timer step {} paused at {}",
                        step_number,
                        entry.timer.view().display
                    );
                    entry.timer.view()
                }
                TimerStatus::Paused => {
                    let view = self.arm_locked(&mut timers, step_number, duration_secs);
                    log_info!("timer step {} resumed at {}", step_number, view.display);
                    view
                }
                TimerStatus::Idle | TimerStatus::Completed => return None,
            }
        };

        self.events
            .publish(SessionEventKind::TimerChanged { timer: view.clone() });
        Some(view)
    }

    /// Cancels the countdown and clears it back to Idle. No-op for unknown steps.
    pub async fn stop(&self, step_number: u32) -> Option<TimerView> {
        let view = {
            let mut timers = self.timers.lock().await;
            let entry = timers.entries.get_mut(&step_number)?;
            if let Some(schedule) = entry.schedule.take() {
                schedule.cancel();
            }
            entry.timer.stop();
            entry.timer.view()
        };

        log_info!("timer step {} stopped", step_number);
        self.events
            .publish(SessionEventKind::TimerChanged { timer: view.clone() });
        Some(view)
    }

    pub async fn view(&self, step_number: u32) -> Option<TimerView> {
        let timers = self.timers.lock().await;
        timers.entries.get(&step_number).map(|entry| entry.timer.view())
    }

    /// Every step that has timer state, ordered by step number.
    pub async fn views(&self) -> Vec<TimerView> {
        let timers = self.timers.lock().await;
        let mut views: Vec<TimerView> = timers
            .entries
            .values()
            .map(|entry| entry.timer.view())
            .collect();
        views.sort_by_key(|view| view.step_number);
        views
    }

    /// Cancels every live schedule and forgets all timer state. Returns how
    /// many schedules were live. The manager is unusable afterwards.
    pub async fn shutdown(&self) -> usize {
        let mut timers = self.timers.lock().await;
        let live = timers
            .entries
            .drain()
            .filter_map(|(_, entry)| entry.schedule)
            .map(Schedule::cancel)
            .count();
        self.root.cancel();
        live
    }

    fn arm_locked(&self, timers: &mut Timers, step_number: u32, duration_secs: u32) -> TimerView {
        timers.next_schedule_id += 1;
        let schedule_id = timers.next_schedule_id;

        let entry = timers.entries.entry(step_number).or_insert_with(|| TimerEntry {
            timer: StepTimer::new(step_number, duration_secs),
            schedule: None,
        });

        if let Some(old) = entry.schedule.take() {
            log_debug!("timer step {} replacing schedule {}", step_number, old.id);
            old.cancel();
        }

        entry.timer.set_duration(duration_secs);
        entry.timer.arm();
        entry.schedule = Some(self.spawn_ticker(step_number, schedule_id));
        entry.timer.view()
    }

    fn spawn_ticker(&self, step_number: u32, schedule_id: u64) -> Schedule {
        let token = self.root.child_token();
        let task_token = token.clone();
        let manager = self.clone();

        tokio::spawn(async move {
            let period = manager.tick_interval;
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match manager.tick(step_number, schedule_id).await {
                    TickOutcome::Decremented => continue,
                    TickOutcome::Completed | TickOutcome::Ignored => break,
                }
            }
        });

        Schedule {
            id: schedule_id,
            token,
        }
    }

    async fn tick(&self, step_number: u32, schedule_id: u64) -> TickOutcome {
        let (outcome, view) = {
            let mut timers = self.timers.lock().await;
            let Some(entry) = timers.entries.get_mut(&step_number) else {
                return TickOutcome::Ignored;
            };
            // Cancelled or superseded while this tick was queued.
            if entry.schedule.as_ref().map(|s| s.id) != Some(schedule_id) {
                return TickOutcome::Ignored;
            }

            let outcome = entry.timer.tick();
            if outcome != TickOutcome::Decremented {
                entry.schedule = None;
            }
            (outcome, entry.timer.view())
        };

        match outcome {
            TickOutcome::Decremented => {
                self.events
                    .publish(SessionEventKind::TimerChanged { timer: view });
            }
            TickOutcome::Completed => {
                log_info!("timer step {} completed", step_number);
                if let Err(err) = self.cue.play() {
                    log_warn!("completion cue for step {} failed: {}", step_number, err);
                }
                self.events
                    .publish(SessionEventKind::TimerChanged { timer: view });
                self.events
                    .publish(SessionEventKind::TimerCompleted { step_number });
            }
            TickOutcome::Ignored => {}
        }

        outcome
    }
}
