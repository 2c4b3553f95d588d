use crate::application::analytics::{compute_weekly_analytics, WeeklyAnalytics};
use crate::domain::id::generate_id;
use crate::domain::logic::{
    get_next_date, local_date, local_midnight, sort_tasks_by_priority, update_engagement_streak,
    StreakUpdate,
};
use crate::domain::models::{
    PomodoroCompletion, PomodoroUpdate, StudyDay, Task, TaskDraft, TaskerState, ThemeUpdate,
};
use crate::infrastructure::persistence::StatePersistence;
use crate::infrastructure::storage::KeyValueStore;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const RESET_PROMPT: &str = "Everything will be deleted. Are you sure?";

/// Out-of-band yes/no step guarding destructive operations.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A state transition. Everything non-deterministic (ids, clock) is resolved before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddDay,
    CreateDayForDate(NaiveDate),
    ClearDays,
    ToggleDayCollapse { day_index: usize },
    ExpandDay { day_index: usize },
    AddTask { day_index: usize, task: Task },
    ToggleTask { day_index: usize, task_index: usize },
    DeleteTask { day_index: usize, task_index: usize },
    UpdatePomodoro(PomodoroUpdate),
    UpdateTheme(ThemeUpdate),
    LogPomodoroCompletion {
        task_id: String,
        completion: PomodoroCompletion,
    },
    RecordVisit(StreakUpdate),
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::AddDay => "add_day",
            Self::CreateDayForDate(_) => "create_day_for_date",
            Self::ClearDays => "reset_all",
            Self::ToggleDayCollapse { .. } => "toggle_day_collapse",
            Self::ExpandDay { .. } => "expand_day",
            Self::AddTask { .. } => "add_task",
            Self::ToggleTask { .. } => "toggle_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::UpdatePomodoro(_) => "update_pomodoro",
            Self::UpdateTheme(_) => "update_theme",
            Self::LogPomodoroCompletion { .. } => "log_pomodoro_completion",
            Self::RecordVisit(_) => "record_visit",
        }
    }

    fn touches_days(&self) -> bool {
        !matches!(
            self,
            Self::UpdatePomodoro(_) | Self::UpdateTheme(_) | Self::RecordVisit(_)
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReduceContext {
    pub now: DateTime<Utc>,
    pub timezone: Tz,
}

/// Computes the snapshot following `action`, or `None` when the action does not apply
/// (out-of-range index, unknown task id).
pub fn reduce(state: &TaskerState, action: &Action, context: ReduceContext) -> Option<TaskerState> {
    let mut next = state.clone();
    match action {
        Action::AddDay => {
            let date = get_next_date(&next.days, context.now, context.timezone);
            next.days.push(StudyDay::new(date));
        }
        Action::CreateDayForDate(date) => {
            next.days
                .push(StudyDay::new(local_midnight(*date, context.timezone)));
        }
        Action::ClearDays => next.days.clear(),
        Action::ToggleDayCollapse { day_index } => {
            let day = next.days.get_mut(*day_index)?;
            day.collapsed = !day.collapsed;
        }
        Action::ExpandDay { day_index } => {
            next.days.get_mut(*day_index)?.collapsed = false;
        }
        Action::AddTask { day_index, task } => {
            let day = next.days.get_mut(*day_index)?;
            let mut tasks = std::mem::take(&mut day.tasks);
            tasks.push(task.clone());
            day.tasks = sort_tasks_by_priority(tasks);
        }
        Action::ToggleTask {
            day_index,
            task_index,
        } => {
            let task = next.days.get_mut(*day_index)?.tasks.get_mut(*task_index)?;
            task.done = !task.done;
        }
        Action::DeleteTask {
            day_index,
            task_index,
        } => {
            let day = next.days.get_mut(*day_index)?;
            if *task_index >= day.tasks.len() {
                return None;
            }
            day.tasks.remove(*task_index);
        }
        Action::UpdatePomodoro(update) => {
            next.pomodoro = update.apply_to(&next.pomodoro);
        }
        Action::UpdateTheme(update) => {
            let merged = update.apply_to(&next.theme.clone().unwrap_or_default());
            merged.validate().ok()?;
            next.theme = Some(merged);
        }
        Action::LogPomodoroCompletion {
            task_id,
            completion,
        } => {
            let task = next
                .days
                .iter_mut()
                .flat_map(|day| day.tasks.iter_mut())
                .find(|task| task.id == *task_id)?;
            task.pomodoro_completions.push(*completion);
        }
        Action::RecordVisit(update) => {
            next.last_visit_day = Some(update.today.clone());
            next.engagement_streak = update.new_streak;
        }
    }
    Some(next)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskLocation<'a> {
    pub task: &'a Task,
    pub day_index: usize,
    pub task_index: usize,
}

/// The single owner of [`TaskerState`]. Every mutation goes through [`reduce`] and the
/// resulting snapshot is written to durable storage before the call returns.
pub struct TaskerStore<S: KeyValueStore> {
    state: TaskerState,
    analytics: WeeklyAnalytics,
    persistence: StatePersistence<S>,
    timezone: Tz,
    now_provider: NowProvider,
}

impl<S: KeyValueStore> TaskerStore<S> {
    pub fn hydrate(persistence: StatePersistence<S>, timezone: Tz) -> Self {
        Self::hydrate_with_clock(persistence, timezone, Arc::new(Utc::now))
    }

    pub fn hydrate_with_clock(
        persistence: StatePersistence<S>,
        timezone: Tz,
        now_provider: NowProvider,
    ) -> Self {
        let state = persistence.load();
        let analytics = compute_weekly_analytics(&state.days, now_provider(), timezone);
        info!(days = state.days.len(), "hydrated study state");
        Self {
            state,
            analytics,
            persistence,
            timezone,
            now_provider,
        }
    }

    pub fn state(&self) -> &TaskerState {
        &self.state
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    /// Weekly figures, recomputed whenever the day list changes.
    pub fn weekly_analytics(&self) -> &WeeklyAnalytics {
        &self.analytics
    }

    fn dispatch(&mut self, action: Action) -> bool {
        let context = ReduceContext {
            now: self.now(),
            timezone: self.timezone,
        };
        let Some(next) = reduce(&self.state, &action, context) else {
            debug!(action = action.name(), "ignored action that does not apply");
            return false;
        };

        let days_changed = action.touches_days() && next.days != self.state.days;
        self.state = next;
        if days_changed {
            self.analytics = compute_weekly_analytics(&self.state.days, context.now, self.timezone);
        }
        self.persistence.save(&self.state);
        debug!(action = action.name(), "applied action");
        true
    }

    pub fn add_day(&mut self) -> bool {
        self.dispatch(Action::AddDay)
    }

    /// Clears every study day once `confirmation` agrees; settings and theme are kept.
    pub fn reset_all(&mut self, confirmation: &dyn Confirmation) -> bool {
        if !confirmation.confirm(RESET_PROMPT) {
            info!("reset declined");
            return false;
        }
        info!(days = self.state.days.len(), "clearing all study days");
        self.dispatch(Action::ClearDays)
    }

    pub fn toggle_day_collapse(&mut self, day_index: usize) -> bool {
        self.dispatch(Action::ToggleDayCollapse { day_index })
    }

    pub fn expand_day(&mut self, day_index: usize) -> bool {
        self.dispatch(Action::ExpandDay { day_index })
    }

    /// Returns the id of the new task, or `None` if `day_index` is out of range.
    pub fn add_task(&mut self, day_index: usize, draft: TaskDraft) -> Option<String> {
        if day_index >= self.state.days.len() {
            debug!(day_index, "add_task on missing day ignored");
            return None;
        }
        let task = draft.into_task(generate_id());
        let id = task.id.clone();
        self.dispatch(Action::AddTask { day_index, task }).then_some(id)
    }

    pub fn toggle_task(&mut self, day_index: usize, task_index: usize) -> bool {
        self.dispatch(Action::ToggleTask {
            day_index,
            task_index,
        })
    }

    pub fn delete_task(&mut self, day_index: usize, task_index: usize) -> bool {
        self.dispatch(Action::DeleteTask {
            day_index,
            task_index,
        })
    }

    pub fn update_pomodoro(&mut self, update: PomodoroUpdate) -> bool {
        self.dispatch(Action::UpdatePomodoro(update))
    }

    pub fn update_theme(&mut self, update: ThemeUpdate) -> bool {
        self.dispatch(Action::UpdateTheme(update))
    }

    pub fn log_pomodoro_completion(&mut self, task_id: &str, completion: PomodoroCompletion) -> bool {
        self.dispatch(Action::LogPomodoroCompletion {
            task_id: task_id.to_string(),
            completion,
        })
    }

    /// First day (in stored order) falling on `date` in the local calendar.
    pub fn get_day_by_date(&self, date: NaiveDate) -> Option<(usize, &StudyDay)> {
        self.state
            .days
            .iter()
            .enumerate()
            .find(|(_, day)| local_date(day.date, self.timezone) == date)
    }

    /// Appends a day at local midnight of `date` even if one already exists for that date.
    pub fn create_day_for_date(&mut self, date: NaiveDate) -> bool {
        self.dispatch(Action::CreateDayForDate(date))
    }

    pub fn get_selected_task(&self) -> Option<&Task> {
        let selected = self.state.pomodoro.selected_task_id.as_deref()?;
        self.state.find_task(selected)
    }

    pub fn get_all_tasks(&self) -> Vec<TaskLocation<'_>> {
        self.state
            .days
            .iter()
            .enumerate()
            .flat_map(|(day_index, day)| {
                day.tasks
                    .iter()
                    .enumerate()
                    .map(move |(task_index, task)| TaskLocation {
                        task,
                        day_index,
                        task_index,
                    })
            })
            .collect()
    }

    /// Session-start bookkeeping for the engagement streak. Persists only when something changed.
    pub fn record_visit(&mut self) -> StreakUpdate {
        let update = update_engagement_streak(
            self.state.last_visit_day.as_deref(),
            self.state.engagement_streak,
            self.now(),
        );
        let unchanged = self.state.last_visit_day.as_deref() == Some(update.today.as_str())
            && self.state.engagement_streak == update.new_streak;
        if !unchanged {
            info!(streak = update.new_streak, today = %update.today, "recorded visit");
            self.dispatch(Action::RecordVisit(update.clone()));
        }
        update
    }
}
