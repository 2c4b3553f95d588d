use crate::domain::id::generate_id;
use crate::domain::models::{
    BackgroundType, PomodoroCompletion, PomodoroSettings, Priority, StudyDay, Subject, Task, TaskType,
    TaskerState, ThemeSettings, TimerMode, MAX_TIMER_MINUTES, MIN_TIMER_MINUTES,
};
use crate::infrastructure::config::DEFAULT_STORAGE_KEY;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::KeyValueStore;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Slots written by earlier schema versions, read in this order when the current slot is empty.
pub const LEGACY_STORAGE_KEYS: [&str; 3] = ["study-tasker-state-v2", "study-tasker-state", "tasker-state"];

/// Loads and saves the whole [`TaskerState`] as one JSON document.
///
/// Storage failures never reach the caller: a failed read yields the default state and a
/// failed write leaves the caller's in-memory state untouched. Both are reported via `tracing`.
pub struct StatePersistence<S: KeyValueStore> {
    store: Arc<S>,
    current_key: String,
    legacy_keys: Vec<String>,
}

impl<S: KeyValueStore> StatePersistence<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            current_key: DEFAULT_STORAGE_KEY.to_string(),
            legacy_keys: LEGACY_STORAGE_KEYS.iter().map(|key| key.to_string()).collect(),
        }
    }

    pub fn with_current_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.legacy_keys.retain(|legacy| *legacy != key);
        self.current_key = key;
        self
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn load(&self) -> TaskerState {
        match self.try_load() {
            Ok(state) => state,
            Err(error) => {
                warn!(%error, key = %self.current_key, "failed to load state; starting from defaults");
                TaskerState::default()
            }
        }
    }

    /// Returns whether the snapshot reached durable storage.
    pub fn save(&self, state: &TaskerState) -> bool {
        match self.write(state) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, key = %self.current_key, "failed to save state; changes kept in memory only");
                false
            }
        }
    }

    fn write(&self, state: &TaskerState) -> Result<(), InfraError> {
        let payload = serde_json::to_string(state)?;
        self.store.set(&self.current_key, &payload)
    }

    fn try_load(&self) -> Result<TaskerState, InfraError> {
        if let Some(raw) = read_slot(self.store.as_ref(), &self.current_key)? {
            return normalize_state_json(&raw);
        }

        for legacy_key in &self.legacy_keys {
            let Some(raw) = read_slot(self.store.as_ref(), legacy_key)? else {
                continue;
            };
            let (migrated, unreadable_days) = normalize_document(&raw)?;
            if unreadable_days > 0 {
                // nothing is written so the legacy document stays the source for the lost days
                warn!(
                    legacy_key = %legacy_key,
                    unreadable_days,
                    "legacy state has days with unreadable dates; keeping the legacy slot"
                );
                return Ok(migrated);
            }
            match self.write(&migrated) {
                Ok(()) => {
                    if let Err(error) = self.store.remove(legacy_key) {
                        warn!(%error, legacy_key = %legacy_key, "migrated state but could not erase legacy slot");
                    }
                    info!(
                        legacy_key = %legacy_key,
                        current_key = %self.current_key,
                        days = migrated.days.len(),
                        "migrated legacy state"
                    );
                }
                // the legacy slot stays put so the next launch retries the migration
                Err(error) => {
                    warn!(%error, legacy_key = %legacy_key, "could not write migrated state");
                }
            }
            return Ok(migrated);
        }

        Ok(TaskerState::default())
    }
}

fn read_slot<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Result<Option<String>, InfraError> {
    Ok(store
        .get(key)?
        .filter(|raw| !raw.trim().is_empty()))
}

pub fn normalize_state_json(raw: &str) -> Result<TaskerState, InfraError> {
    normalize_document(raw).map(|(state, _)| state)
}

/// Normalized state plus the number of stored days dropped for an unreadable date.
fn normalize_document(raw: &str) -> Result<(TaskerState, usize), InfraError> {
    let parsed: Value = serde_json::from_str(raw)?;
    if !parsed.is_object() {
        return Err(InfraError::Storage(
            "stored state is not a JSON object".to_string(),
        ));
    }
    Ok(normalize_with_report(&parsed))
}

/// Coerces an arbitrary, possibly older-shaped state document into a valid [`TaskerState`].
pub fn normalize_state(parsed: &Value) -> TaskerState {
    normalize_with_report(parsed).0
}

fn normalize_with_report(parsed: &Value) -> (TaskerState, usize) {
    let mut seen_ids = HashSet::new();
    let stored_days = parsed
        .get("days")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let days = stored_days
        .iter()
        .enumerate()
        .filter_map(|(index, day)| normalize_day(index, day, &mut seen_ids))
        .collect::<Vec<_>>();
    let unreadable_days = stored_days.len() - days.len();

    let mut pomodoro = normalize_pomodoro(parsed.get("pomodoro"));
    if let Some(selected) = pomodoro.selected_task_id.as_deref() {
        if !seen_ids.contains(selected) {
            pomodoro.selected_task_id = None;
        }
    }

    let state = TaskerState {
        days,
        pomodoro,
        theme: Some(normalize_theme(parsed.get("theme"))),
        last_visit_day: parsed
            .get("lastVisitDay")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        engagement_streak: parsed
            .get("engagementStreak")
            .and_then(whole_number)
            .unwrap_or(0),
    };
    (state, unreadable_days)
}

fn normalize_day(index: usize, day: &Value, seen_ids: &mut HashSet<String>) -> Option<StudyDay> {
    let Some(date) = day.get("date").and_then(parse_instant) else {
        warn!(day_index = index, "dropping stored day without a readable date");
        return None;
    };

    let tasks = day
        .get("tasks")
        .and_then(Value::as_array)
        .map(|tasks| {
            tasks
                .iter()
                .filter(|task| task.is_object())
                .map(|task| normalize_task(task, seen_ids))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Some(StudyDay {
        date,
        tasks,
        collapsed: day.get("collapsed").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn normalize_task(task: &Value, seen_ids: &mut HashSet<String>) -> Task {
    let id = match non_empty_text(task.get("id")) {
        Some(id) if !seen_ids.contains(&id) => id,
        Some(duplicate) => {
            let replacement = generate_id();
            warn!(duplicate = %duplicate, replacement = %replacement, "reassigned duplicate task id");
            replacement
        }
        None => generate_id(),
    };
    seen_ids.insert(id.clone());

    Task {
        id,
        subject: parse_or_default(task.get("subject"), Subject::Science),
        chapter: non_empty_text(task.get("chapter")).unwrap_or_default(),
        task_type: parse_or_default(task.get("type"), TaskType::Revision),
        priority: parse_or_default(task.get("priority"), Priority::High),
        reward: non_empty_text(task.get("reward")).unwrap_or_default(),
        xp: non_empty_text(task.get("xp")).unwrap_or_default(),
        done: task.get("done") == Some(&Value::Bool(true)),
        notes: task
            .get("notes")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        pomodoro_completions: task
            .get("pomodoroCompletions")
            .and_then(Value::as_array)
            .map(|records| records.iter().filter_map(normalize_completion).collect())
            .unwrap_or_default(),
    }
}

fn normalize_completion(record: &Value) -> Option<PomodoroCompletion> {
    match serde_json::from_value::<PomodoroCompletion>(record.clone()) {
        Ok(completion) if completion.validate().is_ok() => Some(completion),
        Ok(_) | Err(_) => {
            warn!("dropping unreadable pomodoro completion record");
            None
        }
    }
}

fn normalize_pomodoro(stored: Option<&Value>) -> PomodoroSettings {
    let defaults = PomodoroSettings::default();
    let Some(stored) = stored.filter(|value| value.is_object()) else {
        return defaults;
    };

    let minutes = |field: &str, fallback: u32| {
        stored
            .get(field)
            .and_then(whole_number)
            .filter(|value| (MIN_TIMER_MINUTES..=MAX_TIMER_MINUTES).contains(value))
            .unwrap_or(fallback)
    };

    PomodoroSettings {
        focus_duration: minutes("focusDuration", defaults.focus_duration),
        short_break_duration: minutes("shortBreakDuration", defaults.short_break_duration),
        long_break_duration: minutes("longBreakDuration", defaults.long_break_duration),
        current_mode: stored
            .get("currentMode")
            .and_then(|value| serde_json::from_value::<TimerMode>(value.clone()).ok())
            .unwrap_or(defaults.current_mode),
        is_running: stored
            .get("isRunning")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.is_running),
        remaining_seconds: stored
            .get("remainingSeconds")
            .and_then(whole_number)
            .unwrap_or(defaults.remaining_seconds),
        selected_task_id: non_empty_text(stored.get("selectedTaskId")),
    }
}

/// An absent or non-object theme is replaced by the default; a stored theme keeps every readable
/// field. A background that names a type but carries no image falls back to the default background.
fn normalize_theme(stored: Option<&Value>) -> ThemeSettings {
    let Some(stored) = stored.filter(|value| value.is_object()) else {
        return ThemeSettings::default();
    };
    let mut theme = match serde_json::from_value::<ThemeSettings>(stored.clone()) {
        Ok(theme) => theme,
        Err(error) => {
            warn!(%error, "stored theme is unreadable; using default theme");
            return ThemeSettings::default();
        }
    };
    if let Err(error) = theme.validate() {
        warn!(%error, "stored background is incomplete; using default background");
        theme.background_type = BackgroundType::Default;
        theme.background_image = None;
    }
    theme
}

/// Accepts RFC 3339 instants, bare `YYYY-MM-DD` dates and offset-less date-times (both read as
/// UTC, the way ISO date-only strings are read by browsers) and epoch milliseconds.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return DateTime::from_timestamp_millis(millis);
    }
    if let Some(millis) = value.as_f64().filter(|number| number.is_finite()) {
        return DateTime::from_timestamp_millis(millis.trunc() as i64);
    }

    let raw = value.as_str()?.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Text of a string or number field; empty strings and other types count as missing.
fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_or_default<T: std::str::FromStr>(value: Option<&Value>, fallback: T) -> T {
    value
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(fallback)
}

fn whole_number(value: &Value) -> Option<u32> {
    if let Some(number) = value.as_u64() {
        return u32::try_from(number).ok();
    }
    value
        .as_f64()
        .filter(|number| number.is_finite() && *number >= 0.0 && *number <= f64::from(u32::MAX))
        .map(|number| number.round() as u32)
}
