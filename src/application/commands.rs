use crate::application::analytics::WeeklyAnalytics;
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::error::AppError;
use crate::application::pomodoro::{display_time, PomodoroTimer, TickOutcome};
use crate::application::store::{Confirmation, NowProvider, TaskerStore};
use crate::application::theme;
use crate::domain::logic::{calculate_day_progress, format_date, local_date, xp_summary};
use crate::domain::models::{
    validate_timer_minutes, Priority, StudyDay, Subject, Task, TaskDraft, TaskType, ThemeMode,
    ThemeSettings, TimerMode,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::persistence::StatePersistence;
use crate::infrastructure::storage::SqliteKeyValueStore;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub struct AppState {
    workspace_root: PathBuf,
    database_path: PathBuf,
    config: AppConfig,
    runtime: Mutex<RuntimeState>,
}

struct RuntimeState {
    store: TaskerStore<SqliteKeyValueStore>,
    timer: PomodoroTimer,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, AppError> {
        Self::with_now_provider(workspace_root, Arc::new(Utc::now))
    }

    /// Opens the workspace, hydrates the store and records the visit for the engagement streak.
    pub fn with_now_provider(
        workspace_root: PathBuf,
        now_provider: NowProvider,
    ) -> Result<Self, AppError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config;
        let persistence = StatePersistence::new(Arc::new(SqliteKeyValueStore::new(
            &bootstrap.database_path,
        )))
        .with_current_key(config.storage_key.clone());

        let mut store = TaskerStore::hydrate_with_clock(persistence, config.timezone, now_provider);
        store.record_visit();
        let timer = PomodoroTimer::resume(&store.state().pomodoro);

        Ok(Self {
            workspace_root: bootstrap.workspace_root,
            database_path: bootstrap.database_path,
            config,
            runtime: Mutex::new(RuntimeState { store, timer }),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn command_error(&self, command: &str, error: &AppError) -> String {
        error!(command, %error, "command failed");
        error.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub index: usize,
    pub date: NaiveDate,
    pub title: String,
    pub collapsed: bool,
    /// Percentage in 0..=100, XP-weighted when the day carries XP.
    pub progress: f64,
    pub done_count: usize,
    pub total_xp: f64,
    pub completed_xp: f64,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedTaskResponse {
    pub id: String,
    pub subject: Subject,
    pub chapter: String,
    pub completed_pomodoros: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PomodoroStateResponse {
    pub mode: TimerMode,
    pub is_running: bool,
    pub remaining_seconds: u32,
    pub display_time: String,
    pub focus_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub selected_task: Option<SelectedTaskResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub engagement_streak: u32,
    pub last_visit_day: Option<String>,
    pub weekly: WeeklyAnalytics,
}

#[derive(Debug, Clone, Default)]
pub struct AddTaskInput {
    pub day_index: usize,
    pub subject: String,
    pub chapter: String,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub reward: String,
    pub xp: String,
    pub notes: Option<String>,
}

pub fn list_days_impl(state: &AppState) -> Result<Vec<DaySummary>, AppError> {
    let runtime = lock_runtime(state)?;
    let timezone = runtime.store.timezone();
    Ok(runtime
        .store
        .state()
        .days
        .iter()
        .enumerate()
        .map(|(index, day)| to_day_summary(index, day, timezone))
        .collect())
}

pub fn add_day_impl(state: &AppState) -> Result<DaySummary, AppError> {
    let mut runtime = lock_runtime(state)?;
    runtime.store.add_day();
    let index = runtime.store.state().days.len() - 1;
    let summary = day_summary_at(&runtime.store, index)?;
    info!(date = %summary.date, "added study day");
    Ok(summary)
}

/// Returns the day for `date`, creating it when none exists yet.
pub fn add_day_for_impl(state: &AppState, date: String) -> Result<DaySummary, AppError> {
    let date = parse_date_input(&date)?;
    let mut runtime = lock_runtime(state)?;
    if let Some((index, _)) = runtime.store.get_day_by_date(date) {
        return day_summary_at(&runtime.store, index);
    }
    runtime.store.create_day_for_date(date);
    let index = runtime.store.state().days.len() - 1;
    info!(%date, "created study day for date");
    day_summary_at(&runtime.store, index)
}

pub fn toggle_day_collapse_impl(state: &AppState, day_index: usize) -> Result<DaySummary, AppError> {
    let mut runtime = lock_runtime(state)?;
    ensure_day_exists(&runtime.store, day_index)?;
    runtime.store.toggle_day_collapse(day_index);
    day_summary_at(&runtime.store, day_index)
}

pub fn expand_day_impl(state: &AppState, day_index: usize) -> Result<DaySummary, AppError> {
    let mut runtime = lock_runtime(state)?;
    ensure_day_exists(&runtime.store, day_index)?;
    runtime.store.expand_day(day_index);
    day_summary_at(&runtime.store, day_index)
}

pub fn add_task_impl(state: &AppState, input: AddTaskInput) -> Result<Task, AppError> {
    let subject = input.subject.trim();
    if subject.is_empty() {
        return Err(AppError::InvalidInput("subject must not be empty".to_string()));
    }
    let subject = subject.parse::<Subject>().map_err(AppError::InvalidInput)?;
    let task_type = match input.task_type.as_deref() {
        Some(raw) => raw.parse::<TaskType>().map_err(AppError::InvalidInput)?,
        None => TaskType::default(),
    };
    let priority = match input.priority.as_deref() {
        Some(raw) => raw.parse::<Priority>().map_err(AppError::InvalidInput)?,
        None => Priority::default(),
    };

    let draft = TaskDraft {
        subject,
        chapter: input.chapter,
        task_type,
        priority,
        reward: input.reward,
        xp: input.xp,
        notes: input.notes,
    };

    let mut runtime = lock_runtime(state)?;
    ensure_day_exists(&runtime.store, input.day_index)?;
    let task_id = runtime
        .store
        .add_task(input.day_index, draft)
        .ok_or_else(|| AppError::Integration("task was not added to an existing day".to_string()))?;
    let task = runtime
        .store
        .state()
        .find_task(&task_id)
        .cloned()
        .ok_or_else(|| AppError::Integration(format!("added task not found: {task_id}")))?;
    info!(task_id = %task.id, day_index = input.day_index, "added task");
    Ok(task)
}

pub fn toggle_task_impl(state: &AppState, day_index: usize, task_index: usize) -> Result<Task, AppError> {
    let mut runtime = lock_runtime(state)?;
    ensure_task_exists(&runtime.store, day_index, task_index)?;
    runtime.store.toggle_task(day_index, task_index);
    Ok(runtime.store.state().days[day_index].tasks[task_index].clone())
}

pub fn delete_task_impl(state: &AppState, day_index: usize, task_index: usize) -> Result<Task, AppError> {
    let mut runtime = lock_runtime(state)?;
    ensure_task_exists(&runtime.store, day_index, task_index)?;
    let removed = runtime.store.state().days[day_index].tasks[task_index].clone();
    runtime.store.delete_task(day_index, task_index);
    info!(task_id = %removed.id, "deleted task");
    Ok(removed)
}

pub fn reset_all_impl(state: &AppState, confirmation: &dyn Confirmation) -> Result<bool, AppError> {
    let mut runtime = lock_runtime(state)?;
    Ok(runtime.store.reset_all(confirmation))
}

pub fn stats_impl(state: &AppState) -> Result<StatsResponse, AppError> {
    let runtime = lock_runtime(state)?;
    let current = runtime.store.state();
    Ok(StatsResponse {
        engagement_streak: current.engagement_streak,
        last_visit_day: current.last_visit_day.clone(),
        weekly: runtime.store.weekly_analytics().clone(),
    })
}

pub fn get_pomodoro_state_impl(state: &AppState) -> Result<PomodoroStateResponse, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(to_pomodoro_state_response(&runtime.store))
}

pub fn start_pomodoro_impl(state: &AppState) -> Result<PomodoroStateResponse, AppError> {
    with_timer(state, |timer, store| {
        timer.start(store);
        Ok(())
    })
}

pub fn pause_pomodoro_impl(state: &AppState) -> Result<PomodoroStateResponse, AppError> {
    with_timer(state, |timer, store| {
        timer.pause(store);
        Ok(())
    })
}

pub fn reset_pomodoro_impl(state: &AppState) -> Result<PomodoroStateResponse, AppError> {
    with_timer(state, |timer, store| {
        timer.reset(store);
        Ok(())
    })
}

pub fn change_mode_impl(state: &AppState, mode: String) -> Result<PomodoroStateResponse, AppError> {
    let mode = mode.parse::<TimerMode>().map_err(AppError::InvalidInput)?;
    with_timer(state, |timer, store| {
        timer.change_mode(store, mode);
        Ok(())
    })
}

pub fn set_duration_impl(
    state: &AppState,
    mode: String,
    minutes: u32,
) -> Result<PomodoroStateResponse, AppError> {
    let mode = mode.parse::<TimerMode>().map_err(AppError::InvalidInput)?;
    validate_timer_minutes(minutes, mode.as_str()).map_err(AppError::InvalidInput)?;
    with_timer(state, |timer, store| {
        timer.set_duration(store, mode, minutes);
        Ok(())
    })
}

pub fn select_task_impl(state: &AppState, task_id: String) -> Result<PomodoroStateResponse, AppError> {
    let task_id = task_id.trim().to_string();
    if task_id.is_empty() {
        return Err(AppError::InvalidInput("task_id must not be empty".to_string()));
    }
    with_timer(state, |timer, store| {
        if timer.select_task(store, &task_id) {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!("task not found: {task_id}")))
        }
    })
}

pub fn clear_task_impl(state: &AppState) -> Result<PomodoroStateResponse, AppError> {
    with_timer(state, |timer, store| {
        timer.clear_task(store);
        Ok(())
    })
}

/// Clock driver: ticks once per `period` until the timer stops, then returns the final state.
/// Ticks that fire late are not compensated for.
pub async fn run_pomodoro_impl<F>(
    state: &AppState,
    period: Duration,
    mut on_tick: F,
) -> Result<PomodoroStateResponse, AppError>
where
    F: FnMut(&PomodoroStateResponse),
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let (outcome, snapshot) = {
            let mut runtime = lock_runtime(state)?;
            let RuntimeState { store, timer } = &mut *runtime;
            let outcome = timer.tick(store);
            (outcome, to_pomodoro_state_response(store))
        };
        on_tick(&snapshot);
        if !matches!(outcome, TickOutcome::Running { .. }) {
            return Ok(snapshot);
        }
    }
}

pub fn get_theme_impl(state: &AppState) -> Result<ThemeSettings, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(current_theme(&runtime.store))
}

pub fn set_theme_mode_impl(state: &AppState, mode: String) -> Result<ThemeSettings, AppError> {
    let mode = parse_theme_mode(&mode)?;
    with_store(state, |store| {
        theme::set_mode(store, mode);
        Ok(())
    })
}

pub fn set_accent_color_impl(state: &AppState, color: Option<String>) -> Result<ThemeSettings, AppError> {
    with_store(state, |store| {
        theme::set_accent_color(store, color.as_deref());
        Ok(())
    })
}

/// Expects an image already encoded as a `data:image/...` URL.
pub fn set_background_image_impl(state: &AppState, data_url: String) -> Result<ThemeSettings, AppError> {
    if !data_url.starts_with("data:image/") {
        return Err(AppError::InvalidInput(
            "background image must be a data:image/ URL".to_string(),
        ));
    }
    with_store(state, |store| {
        theme::set_background_image(store, &data_url);
        Ok(())
    })
}

pub fn set_background_url_impl(state: &AppState, url: String) -> Result<ThemeSettings, AppError> {
    if url.trim().is_empty() {
        return Err(AppError::InvalidInput("background url must not be empty".to_string()));
    }
    with_store(state, |store| {
        theme::set_background_url(store, &url);
        Ok(())
    })
}

pub fn reset_background_impl(state: &AppState) -> Result<ThemeSettings, AppError> {
    with_store(state, |store| {
        theme::reset_background(store);
        Ok(())
    })
}

pub fn list_chapters_impl(subject: String) -> Result<Vec<&'static str>, AppError> {
    let subject = subject.parse::<Subject>().map_err(AppError::InvalidInput)?;
    Ok(subject.chapters().to_vec())
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, AppError> {
    state
        .runtime
        .lock()
        .map_err(|error| AppError::Integration(format!("runtime lock poisoned: {error}")))
}

fn with_timer<F>(state: &AppState, operation: F) -> Result<PomodoroStateResponse, AppError>
where
    F: FnOnce(&mut PomodoroTimer, &mut TaskerStore<SqliteKeyValueStore>) -> Result<(), AppError>,
{
    let mut runtime = lock_runtime(state)?;
    let RuntimeState { store, timer } = &mut *runtime;
    operation(timer, store)?;
    Ok(to_pomodoro_state_response(store))
}

fn with_store<F>(state: &AppState, operation: F) -> Result<ThemeSettings, AppError>
where
    F: FnOnce(&mut TaskerStore<SqliteKeyValueStore>) -> Result<(), AppError>,
{
    let mut runtime = lock_runtime(state)?;
    operation(&mut runtime.store)?;
    Ok(current_theme(&runtime.store))
}

fn current_theme(store: &TaskerStore<SqliteKeyValueStore>) -> ThemeSettings {
    store.state().theme.clone().unwrap_or_default()
}

fn ensure_day_exists(store: &TaskerStore<SqliteKeyValueStore>, day_index: usize) -> Result<(), AppError> {
    if day_index >= store.state().days.len() {
        return Err(AppError::InvalidInput(format!("day not found: {day_index}")));
    }
    Ok(())
}

fn ensure_task_exists(
    store: &TaskerStore<SqliteKeyValueStore>,
    day_index: usize,
    task_index: usize,
) -> Result<(), AppError> {
    ensure_day_exists(store, day_index)?;
    if task_index >= store.state().days[day_index].tasks.len() {
        return Err(AppError::InvalidInput(format!(
            "task not found: day {day_index}, task {task_index}"
        )));
    }
    Ok(())
}

fn day_summary_at(
    store: &TaskerStore<SqliteKeyValueStore>,
    index: usize,
) -> Result<DaySummary, AppError> {
    store
        .state()
        .days
        .get(index)
        .map(|day| to_day_summary(index, day, store.timezone()))
        .ok_or_else(|| AppError::Integration(format!("day vanished: {index}")))
}

fn to_day_summary(index: usize, day: &StudyDay, timezone: chrono_tz::Tz) -> DaySummary {
    let xp = xp_summary(day);
    DaySummary {
        index,
        date: local_date(day.date, timezone),
        title: format_date(day.date, timezone),
        collapsed: day.collapsed,
        progress: calculate_day_progress(day),
        done_count: day.done_count(),
        total_xp: xp.total_xp,
        completed_xp: xp.completed_xp,
        tasks: day.tasks.clone(),
    }
}

fn to_pomodoro_state_response(store: &TaskerStore<SqliteKeyValueStore>) -> PomodoroStateResponse {
    let settings = &store.state().pomodoro;
    PomodoroStateResponse {
        mode: settings.current_mode,
        is_running: settings.is_running,
        remaining_seconds: settings.remaining_seconds,
        display_time: display_time(settings.remaining_seconds),
        focus_duration: settings.focus_duration,
        short_break_duration: settings.short_break_duration,
        long_break_duration: settings.long_break_duration,
        selected_task: store.get_selected_task().map(|task| SelectedTaskResponse {
            id: task.id.clone(),
            subject: task.subject,
            chapter: task.chapter.clone(),
            completed_pomodoros: task.pomodoro_completions.len(),
        }),
    }
}

fn parse_date_input(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        AppError::InvalidInput(format!("date must be YYYY-MM-DD: {value} ({error})"))
    })
}

fn parse_theme_mode(value: &str) -> Result<ThemeMode, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "light" => Ok(ThemeMode::Light),
        "dark" => Ok(ThemeMode::Dark),
        _ => Err(AppError::InvalidInput(format!("unsupported theme mode: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PomodoroUpdate;
    use chrono::DateTime;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "study-tasker-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            let now = DateTime::parse_from_rfc3339("2026-10-19T06:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc);
            AppState::with_now_provider(self.path.clone(), Arc::new(move || now))
                .expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn science_task(day_index: usize) -> AddTaskInput {
        AddTaskInput {
            day_index,
            subject: "Science".to_string(),
            chapter: " Light ".to_string(),
            xp: "10".to_string(),
            ..AddTaskInput::default()
        }
    }

    #[test]
    fn app_state_exposes_workspace_layout_and_config() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert_eq!(state.workspace_root(), workspace.path.as_path());
        assert_eq!(
            state.database_path(),
            workspace.path.join("state").join("study-tasker.sqlite")
        );
        assert!(state.database_path().is_file());
        assert_eq!(state.config(), &AppConfig::default());
    }

    #[test]
    fn add_task_rejects_missing_or_unknown_subject() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        add_day_impl(&state).expect("add day");

        let blank = add_task_impl(
            &state,
            AddTaskInput {
                subject: "  ".to_string(),
                ..AddTaskInput::default()
            },
        );
        assert!(matches!(blank, Err(AppError::InvalidInput(_))));

        let unknown = add_task_impl(
            &state,
            AddTaskInput {
                subject: "Astrology".to_string(),
                ..AddTaskInput::default()
            },
        );
        assert!(matches!(unknown, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn add_task_requires_existing_day() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(matches!(
            add_task_impl(&state, science_task(0)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn day_and_task_flow_roundtrip() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let day = add_day_impl(&state).expect("add day");
        assert_eq!(day.title, "Monday, October 19, 2026");

        let created = add_task_impl(&state, science_task(0)).expect("add task");
        assert_eq!(created.chapter, "Light");
        assert_eq!(created.priority, Priority::High);

        let toggled = toggle_task_impl(&state, 0, 0).expect("toggle");
        assert!(toggled.done);

        let listed = list_days_impl(&state).expect("list days");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].done_count, 1);
        assert_eq!(listed[0].progress, 100.0);
        assert_eq!(listed[0].completed_xp, 10.0);

        assert!(matches!(
            toggle_task_impl(&state, 0, 4),
            Err(AppError::InvalidInput(_))
        ));
        let removed = delete_task_impl(&state, 0, 0).expect("delete");
        assert_eq!(removed.id, created.id);
    }

    #[test]
    fn add_day_for_reuses_existing_date() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let created = add_day_for_impl(&state, "2026-11-02".to_string()).expect("create");
        let again = add_day_for_impl(&state, "2026-11-02".to_string()).expect("reuse");
        assert_eq!(created.index, again.index);
        assert_eq!(list_days_impl(&state).expect("list").len(), 1);

        assert!(matches!(
            add_day_for_impl(&state, "02/11/2026".to_string()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn collapse_and_expand_days() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        add_day_impl(&state).expect("add day");

        assert!(toggle_day_collapse_impl(&state, 0).expect("collapse").collapsed);
        assert!(!expand_day_impl(&state, 0).expect("expand").collapsed);
        assert!(matches!(
            expand_day_impl(&state, 3),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn state_persists_across_sessions() {
        let workspace = TempWorkspace::new();
        {
            let state = workspace.app_state();
            add_day_impl(&state).expect("add day");
            add_task_impl(&state, science_task(0)).expect("add task");
            set_theme_mode_impl(&state, "dark".to_string()).expect("theme");
        }

        let reopened = workspace.app_state();
        let days = list_days_impl(&reopened).expect("list days");
        assert_eq!(days[0].tasks.len(), 1);
        assert_eq!(get_theme_impl(&reopened).expect("theme").mode, ThemeMode::Dark);

        let stats = stats_impl(&reopened).expect("stats");
        assert_eq!(stats.engagement_streak, 1);
        assert_eq!(stats.last_visit_day.as_deref(), Some("2026-10-19"));
        assert_eq!(stats.weekly.total_tasks, 1);
    }

    #[test]
    fn reset_keeps_settings() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        add_day_impl(&state).expect("add day");
        set_duration_impl(&state, "focus".to_string(), 45).expect("duration");

        assert!(!reset_all_impl(&state, &|_: &str| false).expect("declined"));
        assert!(reset_all_impl(&state, &|_: &str| true).expect("confirmed"));
        assert!(list_days_impl(&state).expect("list").is_empty());
        assert_eq!(get_pomodoro_state_impl(&state).expect("pomodoro").focus_duration, 45);
    }

    #[test]
    fn pomodoro_inputs_are_validated() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert!(matches!(
            set_duration_impl(&state, "focus".to_string(), 181),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            change_mode_impl(&state, "nap".to_string()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            select_task_impl(&state, "missing".to_string()),
            Err(AppError::InvalidInput(_))
        ));

        let changed = change_mode_impl(&state, "short".to_string()).expect("mode");
        assert_eq!(changed.mode, TimerMode::ShortBreak);
        assert_eq!(changed.display_time, "05:00");
    }

    #[test]
    fn theme_commands_validate_backgrounds() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert!(matches!(
            set_background_url_impl(&state, " ".to_string()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            set_background_image_impl(&state, "https://example.com/x.png".to_string()),
            Err(AppError::InvalidInput(_))
        ));

        let with_url =
            set_background_url_impl(&state, "https://example.com/x.png".to_string()).expect("url");
        assert_eq!(with_url.background_image.as_deref(), Some("https://example.com/x.png"));
        let reset = reset_background_impl(&state).expect("reset");
        assert_eq!(reset.background_image, None);
    }

    #[test]
    fn chapters_are_listed_per_subject() {
        assert!(list_chapters_impl("hindi".to_string()).expect("hindi").is_empty());
        assert!(!list_chapters_impl("Science".to_string()).expect("science").is_empty());
        assert!(list_chapters_impl("Latin".to_string()).is_err());
    }

    #[tokio::test]
    async fn clock_driver_runs_until_finished_and_logs_completion() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        add_day_impl(&state).expect("add day");
        let task = add_task_impl(&state, science_task(0)).expect("add task");
        select_task_impl(&state, task.id.clone()).expect("select task");
        {
            let mut runtime = lock_runtime(&state).expect("lock");
            runtime.store.update_pomodoro(PomodoroUpdate {
                remaining_seconds: Some(3),
                ..PomodoroUpdate::default()
            });
        }
        start_pomodoro_impl(&state).expect("start");

        let mut seen = Vec::new();
        let finished = run_pomodoro_impl(&state, Duration::from_millis(1), |snapshot| {
            seen.push(snapshot.remaining_seconds)
        })
        .await
        .expect("run timer");

        assert_eq!(seen, vec![2, 1, 0]);
        assert!(!finished.is_running);
        assert_eq!(
            finished
                .selected_task
                .map(|selected| selected.completed_pomodoros),
            Some(1)
        );
    }

    #[tokio::test]
    async fn clock_driver_stops_after_one_idle_tick_when_not_running() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let mut ticks = 0;
        let finished = run_pomodoro_impl(&state, Duration::from_millis(1), |_| ticks += 1)
            .await
            .expect("run timer");
        assert_eq!(ticks, 1);
        assert_eq!(finished.remaining_seconds, 1500);
    }
}
