use crate::application::store::TaskerStore;
use crate::domain::models::{
    PomodoroCompletion, PomodoroSettings, PomodoroUpdate, TimerMode, MAX_TIMER_MINUTES,
    MIN_TIMER_MINUTES,
};
use crate::infrastructure::storage::KeyValueStore;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed.
    Idle,
    Running { remaining: u32 },
    Finished { completion_logged: bool },
}

/// Timer controls over the pomodoro slice of the store.
///
/// Holds the completion latch: a finished focus interval bound to a task is logged once,
/// and the latch re-arms only when remaining time becomes positive again or the timer runs.
#[derive(Debug, Default)]
pub struct PomodoroTimer {
    completion_logged: bool,
}

fn is_finished_focus(settings: &PomodoroSettings) -> bool {
    settings.remaining_seconds == 0
        && !settings.is_running
        && settings.current_mode == TimerMode::Focus
        && settings.selected_task_id.is_some()
}

impl PomodoroTimer {
    /// Picks up a timer restored from storage. An interval that had already finished when the
    /// state was saved was logged back then and is not logged again.
    pub fn resume(settings: &PomodoroSettings) -> Self {
        Self {
            completion_logged: is_finished_focus(settings),
        }
    }

    pub fn start<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> bool {
        let changed = store.update_pomodoro(PomodoroUpdate {
            is_running: Some(true),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    pub fn pause<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> bool {
        let changed = store.update_pomodoro(PomodoroUpdate {
            is_running: Some(false),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    /// Stops the timer and refills it with the current mode's duration.
    pub fn reset<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> bool {
        let settings = &store.state().pomodoro;
        let remaining = settings.duration_for(settings.current_mode) * 60;
        let changed = store.update_pomodoro(PomodoroUpdate {
            is_running: Some(false),
            remaining_seconds: Some(remaining),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    pub fn change_mode<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>, mode: TimerMode) -> bool {
        let remaining = store.state().pomodoro.duration_for(mode) * 60;
        let changed = store.update_pomodoro(PomodoroUpdate {
            current_mode: Some(mode),
            remaining_seconds: Some(remaining),
            is_running: Some(false),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    /// Sets the duration for `kind`; minutes outside 1..=180 are ignored. When `kind` is the
    /// current mode the remaining time follows the new duration.
    pub fn set_duration<S: KeyValueStore>(
        &mut self,
        store: &mut TaskerStore<S>,
        kind: TimerMode,
        minutes: u32,
    ) -> bool {
        if !(MIN_TIMER_MINUTES..=MAX_TIMER_MINUTES).contains(&minutes) {
            debug!(minutes, mode = kind.as_str(), "ignored out-of-range timer duration");
            return false;
        }
        let mut update = match kind {
            TimerMode::Focus => PomodoroUpdate {
                focus_duration: Some(minutes),
                ..PomodoroUpdate::default()
            },
            TimerMode::ShortBreak => PomodoroUpdate {
                short_break_duration: Some(minutes),
                ..PomodoroUpdate::default()
            },
            TimerMode::LongBreak => PomodoroUpdate {
                long_break_duration: Some(minutes),
                ..PomodoroUpdate::default()
            },
        };
        if store.state().pomodoro.current_mode == kind {
            update.remaining_seconds = Some(minutes * 60);
        }
        let changed = store.update_pomodoro(update);
        self.observe(store);
        changed
    }

    /// Binds the timer to an existing task. Unknown ids are refused.
    pub fn select_task<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>, task_id: &str) -> bool {
        if !store.state().contains_task(task_id) {
            debug!(task_id, "refused to select unknown task");
            return false;
        }
        let changed = store.update_pomodoro(PomodoroUpdate {
            selected_task_id: Some(Some(task_id.to_string())),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    pub fn clear_task<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> bool {
        let changed = store.update_pomodoro(PomodoroUpdate {
            selected_task_id: Some(None),
            ..PomodoroUpdate::default()
        });
        self.observe(store);
        changed
    }

    /// One elapsed second. Decrements by exactly one and stops the timer at zero.
    pub fn tick<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> TickOutcome {
        let settings = &store.state().pomodoro;
        if !settings.is_running {
            return TickOutcome::Idle;
        }

        let remaining = settings.remaining_seconds.saturating_sub(1);
        let update = if remaining == 0 {
            PomodoroUpdate {
                is_running: Some(false),
                remaining_seconds: Some(0),
                ..PomodoroUpdate::default()
            }
        } else {
            PomodoroUpdate {
                remaining_seconds: Some(remaining),
                ..PomodoroUpdate::default()
            }
        };
        store.update_pomodoro(update);

        let completion_logged = self.observe(store);
        if remaining == 0 {
            info!(mode = store.state().pomodoro.current_mode.as_str(), "pomodoro interval finished");
            TickOutcome::Finished { completion_logged }
        } else {
            TickOutcome::Running { remaining }
        }
    }

    fn observe<S: KeyValueStore>(&mut self, store: &mut TaskerStore<S>) -> bool {
        let settings = &store.state().pomodoro;
        if settings.remaining_seconds > 0 || settings.is_running {
            self.completion_logged = false;
            return false;
        }
        if self.completion_logged || !is_finished_focus(settings) {
            return false;
        }
        let Some(task_id) = settings.selected_task_id.clone() else {
            return false;
        };

        let completion = PomodoroCompletion {
            timestamp: store.now().timestamp_millis(),
            duration: settings.focus_duration,
            mode: TimerMode::Focus,
        };
        self.completion_logged = true;
        let logged = store.log_pomodoro_completion(&task_id, completion);
        if logged {
            info!(task_id = %task_id, minutes = completion.duration, "logged pomodoro completion");
        }
        logged
    }
}

/// Renders seconds as zero-padded `MM:SS`.
pub fn display_time(remaining_seconds: u32) -> String {
    format!("{:02}:{:02}", remaining_seconds / 60, remaining_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Subject, TaskDraft};
    use crate::infrastructure::persistence::StatePersistence;
    use crate::infrastructure::storage::InMemoryKeyValueStore;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    const NOW_MS: i64 = 1_792_389_600_000;

    fn store() -> TaskerStore<InMemoryKeyValueStore> {
        let now = DateTime::<Utc>::from_timestamp_millis(NOW_MS).expect("valid timestamp");
        TaskerStore::hydrate_with_clock(
            StatePersistence::new(Arc::new(InMemoryKeyValueStore::default())),
            chrono_tz::UTC,
            Arc::new(move || now),
        )
    }

    fn store_with_task() -> (TaskerStore<InMemoryKeyValueStore>, String) {
        let mut store = store();
        store.add_day();
        let id = store.add_task(0, TaskDraft::new(Subject::Science)).expect("task added");
        (store, id)
    }

    fn set_remaining(store: &mut TaskerStore<InMemoryKeyValueStore>, seconds: u32) {
        store.update_pomodoro(PomodoroUpdate {
            remaining_seconds: Some(seconds),
            ..PomodoroUpdate::default()
        });
    }

    #[test]
    fn display_time_pads_minutes_and_seconds() {
        assert_eq!(display_time(1500), "25:00");
        assert_eq!(display_time(61), "01:01");
        assert_eq!(display_time(0), "00:00");
        assert_eq!(display_time(10_800), "180:00");
    }

    #[test]
    fn tick_stops_at_zero_and_then_idles() {
        let mut store = store();
        let mut timer = PomodoroTimer::default();
        set_remaining(&mut store, 1);
        timer.start(&mut store);

        assert_eq!(
            timer.tick(&mut store),
            TickOutcome::Finished {
                completion_logged: false
            }
        );
        assert_eq!(store.state().pomodoro.remaining_seconds, 0);
        assert!(!store.state().pomodoro.is_running);

        assert_eq!(timer.tick(&mut store), TickOutcome::Idle);
        assert_eq!(store.state().pomodoro.remaining_seconds, 0);
    }

    #[test]
    fn tick_decrements_by_one() {
        let mut store = store();
        let mut timer = PomodoroTimer::default();
        timer.start(&mut store);
        assert_eq!(timer.tick(&mut store), TickOutcome::Running { remaining: 1499 });
        assert_eq!(timer.tick(&mut store), TickOutcome::Running { remaining: 1498 });
        assert!(store.state().pomodoro.is_running);
    }

    #[test]
    fn finished_focus_interval_logs_once_per_zero_crossing() {
        let (mut store, task_id) = store_with_task();
        let mut timer = PomodoroTimer::default();
        timer.select_task(&mut store, &task_id);
        set_remaining(&mut store, 1);
        timer.start(&mut store);

        assert_eq!(
            timer.tick(&mut store),
            TickOutcome::Finished {
                completion_logged: true
            }
        );
        timer.pause(&mut store);
        timer.tick(&mut store);

        let completions = &store.state().days[0].tasks[0].pomodoro_completions;
        assert_eq!(
            completions,
            &vec![PomodoroCompletion {
                timestamp: NOW_MS,
                duration: 25,
                mode: TimerMode::Focus,
            }]
        );

        timer.reset(&mut store);
        set_remaining(&mut store, 1);
        timer.start(&mut store);
        timer.tick(&mut store);
        assert_eq!(store.state().days[0].tasks[0].pomodoro_completions.len(), 2);
    }

    #[test]
    fn breaks_and_unbound_timers_log_nothing() {
        let (mut store, task_id) = store_with_task();
        let mut timer = PomodoroTimer::default();

        set_remaining(&mut store, 1);
        timer.start(&mut store);
        timer.tick(&mut store);

        timer.change_mode(&mut store, TimerMode::ShortBreak);
        timer.select_task(&mut store, &task_id);
        set_remaining(&mut store, 1);
        timer.start(&mut store);
        assert_eq!(
            timer.tick(&mut store),
            TickOutcome::Finished {
                completion_logged: false
            }
        );
        assert!(store.state().days[0].tasks[0].pomodoro_completions.is_empty());
    }

    #[test]
    fn selecting_a_task_on_a_finished_timer_logs_it() {
        let (mut store, task_id) = store_with_task();
        let mut timer = PomodoroTimer::default();
        set_remaining(&mut store, 0);

        assert!(timer.select_task(&mut store, &task_id));
        assert_eq!(store.state().days[0].tasks[0].pomodoro_completions.len(), 1);
        timer.clear_task(&mut store);
        timer.select_task(&mut store, &task_id);
        assert_eq!(store.state().days[0].tasks[0].pomodoro_completions.len(), 1);
    }

    #[test]
    fn resumed_finished_timer_is_not_logged_again() {
        let (mut store, task_id) = store_with_task();
        let mut first = PomodoroTimer::default();
        first.select_task(&mut store, &task_id);
        set_remaining(&mut store, 1);
        first.start(&mut store);
        first.tick(&mut store);

        let mut resumed = PomodoroTimer::resume(&store.state().pomodoro);
        resumed.pause(&mut store);
        assert_eq!(store.state().days[0].tasks[0].pomodoro_completions.len(), 1);
    }

    #[test]
    fn mode_change_and_reset_refill_remaining() {
        let mut store = store();
        let mut timer = PomodoroTimer::default();
        timer.start(&mut store);

        timer.change_mode(&mut store, TimerMode::LongBreak);
        assert_eq!(store.state().pomodoro.current_mode, TimerMode::LongBreak);
        assert_eq!(store.state().pomodoro.remaining_seconds, 900);
        assert!(!store.state().pomodoro.is_running);

        set_remaining(&mut store, 17);
        timer.reset(&mut store);
        assert_eq!(store.state().pomodoro.remaining_seconds, 900);
    }

    #[test]
    fn duration_changes_are_bounded_and_follow_current_mode() {
        let mut store = store();
        let mut timer = PomodoroTimer::default();

        assert!(!timer.set_duration(&mut store, TimerMode::Focus, 0));
        assert!(!timer.set_duration(&mut store, TimerMode::Focus, 181));
        assert_eq!(store.state().pomodoro.focus_duration, 25);

        assert!(timer.set_duration(&mut store, TimerMode::Focus, 50));
        assert_eq!(store.state().pomodoro.remaining_seconds, 3000);

        assert!(timer.set_duration(&mut store, TimerMode::ShortBreak, 10));
        assert_eq!(store.state().pomodoro.short_break_duration, 10);
        assert_eq!(store.state().pomodoro.remaining_seconds, 3000);
    }

    #[test]
    fn unknown_task_cannot_be_selected() {
        let mut store = store();
        let mut timer = PomodoroTimer::default();
        assert!(!timer.select_task(&mut store, "missing"));
        assert_eq!(store.state().pomodoro.selected_task_id, None);
    }
}
