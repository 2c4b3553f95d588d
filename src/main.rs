#![forbid(unsafe_code)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use study_tasker::application::commands::{
    add_day_for_impl, add_day_impl, add_task_impl, change_mode_impl, clear_task_impl,
    delete_task_impl, expand_day_impl, get_pomodoro_state_impl, get_theme_impl,
    list_chapters_impl, list_days_impl, pause_pomodoro_impl, reset_all_impl,
    reset_background_impl, reset_pomodoro_impl, run_pomodoro_impl, select_task_impl,
    set_accent_color_impl, set_background_image_impl, set_background_url_impl,
    set_duration_impl, set_theme_mode_impl, start_pomodoro_impl, stats_impl,
    toggle_day_collapse_impl, toggle_task_impl, AddTaskInput, AppState, DaySummary,
    PomodoroStateResponse,
};
use study_tasker::application::error::AppError;
use study_tasker::application::store::Confirmation;
use study_tasker::domain::models::{Task, ThemeSettings};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "study-tasker: study days, tasks, pomodoro focus timer and weekly stats",
    long_about = None
)]
struct Cli {
    /// Workspace holding config/ and state/ (defaults to $STUDY_TASKER_HOME, then the current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List study days with their tasks
    Days,
    /// Append a day after the latest one (or today)
    AddDay,
    /// Open the day for a calendar date (YYYY-MM-DD), creating it if needed
    AddDayFor { date: String },
    /// Toggle whether a day is collapsed
    Collapse { day: usize },
    /// Expand a day
    Expand { day: usize },
    /// Add a task to a day
    AddTask(AddTaskArgs),
    /// Mark a task done or not done
    ToggleTask { day: usize, task: usize },
    /// Delete a task
    DeleteTask { day: usize, task: usize },
    /// Delete every study day, keeping settings
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Engagement streak and this week's completion
    Stats,
    /// Pomodoro focus timer
    Pomodoro {
        #[command(subcommand)]
        command: PomodoroCommand,
    },
    /// Appearance settings
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
    /// List the syllabus chapters of a subject
    Chapters { subject: String },
}

#[derive(Args, Debug)]
struct AddTaskArgs {
    /// Day index as shown by `days`.
    day: usize,
    #[arg(long)]
    subject: String,
    #[arg(long, default_value = "")]
    chapter: String,
    #[arg(long = "type")]
    task_type: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long, default_value = "")]
    reward: String,
    #[arg(long, default_value = "")]
    xp: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand, Debug)]
enum PomodoroCommand {
    Status,
    Start,
    Pause,
    Reset,
    /// Switch to focus, short or long break
    Mode { mode: String },
    /// Set the minutes (1-180) for a mode
    Duration { mode: String, minutes: u32 },
    /// Bind the timer to a task id
    Select { task_id: String },
    Clear,
    /// Start the timer and tick once per second until it stops
    Run,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    Show,
    /// light or dark
    Mode { mode: String },
    /// Set an accent color, or clear it when omitted
    Accent { color: Option<String> },
    /// Use an image given as a data:image/ URL
    Image { data_url: String },
    /// Use an image from a web address
    Url { url: String },
    /// Back to the default background
    Reset,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STUDY_TASKER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("study_tasker=info,warn"));
    let format = env::var("STUDY_TASKER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn resolve_workspace(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = env::var_os("STUDY_TASKER_HOME") {
        return Ok(PathBuf::from(path));
    }
    env::current_dir().context("failed to resolve current directory")
}

struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn print_day(day: &DaySummary) {
    let marker = if day.collapsed { "+" } else { "-" };
    println!(
        "{marker} [{}] {}  {}/{} done, {:.0}%",
        day.index,
        day.title,
        day.done_count,
        day.tasks.len(),
        day.progress
    );
    if day.collapsed {
        return;
    }
    for (index, task) in day.tasks.iter().enumerate() {
        let check = if task.done { "x" } else { " " };
        let chapter = if task.chapter.is_empty() {
            String::new()
        } else {
            format!(" / {}", task.chapter)
        };
        println!(
            "    {index}. [{check}] {} {}{chapter} ({}, {})  id={}",
            task.priority,
            task.subject,
            task.task_type,
            xp_label(task),
            task.id
        );
    }
}

fn xp_label(task: &Task) -> String {
    if task.xp.is_empty() {
        "no xp".to_string()
    } else {
        format!("{} xp", task.xp)
    }
}

fn print_pomodoro(pomodoro: &PomodoroStateResponse) {
    let status = if pomodoro.is_running { "running" } else { "stopped" };
    println!(
        "{} {} ({status})  focus {}m, short {}m, long {}m",
        pomodoro.mode.as_str(),
        pomodoro.display_time,
        pomodoro.focus_duration,
        pomodoro.short_break_duration,
        pomodoro.long_break_duration
    );
    match &pomodoro.selected_task {
        Some(task) => println!(
            "task: {} {} ({} pomodoros)  id={}",
            task.subject, task.chapter, task.completed_pomodoros, task.id
        ),
        None => println!("task: none"),
    }
}

fn print_theme(theme: &ThemeSettings) {
    println!("mode: {:?}", theme.mode);
    println!("accent: {}", theme.accent_color.as_deref().unwrap_or("default"));
    match theme.background_image.as_deref() {
        Some(image) if image.len() > 60 => {
            println!("background: {:?} ({} chars)", theme.background_type, image.len());
        }
        Some(image) => println!("background: {:?} {image}", theme.background_type),
        None => println!("background: {:?}", theme.background_type),
    }
}

fn command_result<T>(state: &AppState, command: &str, result: Result<T, AppError>) -> anyhow::Result<T> {
    result.map_err(|error| anyhow::anyhow!(state.command_error(command, &error)))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let workspace = resolve_workspace(cli.workspace)?;
    let state = AppState::new(workspace.clone())
        .with_context(|| format!("failed to open workspace {}", workspace.display()))?;
    info!(
        workspace = %state.workspace_root().display(),
        database = %state.database_path().display(),
        timezone = %state.config().timezone,
        "opened workspace"
    );
    let json = cli.json;

    match cli.command {
        Commands::Days => {
            let days = command_result(&state, "days", list_days_impl(&state))?;
            emit(json, &days, |days| {
                if days.is_empty() {
                    println!("no study days yet; run `add-day`");
                }
                days.iter().for_each(print_day);
            })
        }
        Commands::AddDay => {
            let day = command_result(&state, "add_day", add_day_impl(&state))?;
            emit(json, &day, print_day)
        }
        Commands::AddDayFor { date } => {
            let day = command_result(&state, "add_day_for", add_day_for_impl(&state, date))?;
            emit(json, &day, print_day)
        }
        Commands::Collapse { day } => {
            let day = command_result(&state, "collapse", toggle_day_collapse_impl(&state, day))?;
            emit(json, &day, print_day)
        }
        Commands::Expand { day } => {
            let day = command_result(&state, "expand", expand_day_impl(&state, day))?;
            emit(json, &day, print_day)
        }
        Commands::AddTask(args) => {
            let input = AddTaskInput {
                day_index: args.day,
                subject: args.subject,
                chapter: args.chapter,
                task_type: args.task_type,
                priority: args.priority,
                reward: args.reward,
                xp: args.xp,
                notes: args.notes,
            };
            let task = command_result(&state, "add_task", add_task_impl(&state, input))?;
            emit(json, &task, |task| println!("added {} task {}", task.subject, task.id))
        }
        Commands::ToggleTask { day, task } => {
            let task = command_result(&state, "toggle_task", toggle_task_impl(&state, day, task))?;
            emit(json, &task, |task| {
                let status = if task.done { "done" } else { "not done" };
                println!("{} marked {status}", task.id);
            })
        }
        Commands::DeleteTask { day, task } => {
            let task = command_result(&state, "delete_task", delete_task_impl(&state, day, task))?;
            emit(json, &task, |task| println!("deleted {}", task.id))
        }
        Commands::Reset { yes } => {
            let cleared = if yes {
                command_result(&state, "reset", reset_all_impl(&state, &|_: &str| true))?
            } else {
                command_result(&state, "reset", reset_all_impl(&state, &StdinConfirmation))?
            };
            emit(json, &cleared, |cleared| {
                println!("{}", if *cleared { "all days deleted" } else { "nothing deleted" });
            })
        }
        Commands::Stats => {
            let stats = command_result(&state, "stats", stats_impl(&state))?;
            emit(json, &stats, |stats| {
                println!("streak: {} day(s)", stats.engagement_streak);
                let weekly = &stats.weekly;
                println!(
                    "week of {}: {}/{} tasks, {}%",
                    weekly.week_start, weekly.completed_tasks, weekly.total_tasks, weekly.completion_rate
                );
                for entry in &weekly.daily {
                    println!("  {} {}/{}", entry.day, entry.completed, entry.total);
                }
                for entry in &weekly.subject_breakdown {
                    println!("  {} {}/{}", entry.subject, entry.completed, entry.total);
                }
            })
        }
        Commands::Pomodoro { command } => {
            let response = match command {
                PomodoroCommand::Status => {
                    command_result(&state, "pomodoro_status", get_pomodoro_state_impl(&state))?
                }
                PomodoroCommand::Start => {
                    command_result(&state, "pomodoro_start", start_pomodoro_impl(&state))?
                }
                PomodoroCommand::Pause => {
                    command_result(&state, "pomodoro_pause", pause_pomodoro_impl(&state))?
                }
                PomodoroCommand::Reset => {
                    command_result(&state, "pomodoro_reset", reset_pomodoro_impl(&state))?
                }
                PomodoroCommand::Mode { mode } => {
                    command_result(&state, "pomodoro_mode", change_mode_impl(&state, mode))?
                }
                PomodoroCommand::Duration { mode, minutes } => command_result(
                    &state,
                    "pomodoro_duration",
                    set_duration_impl(&state, mode, minutes),
                )?,
                PomodoroCommand::Select { task_id } => {
                    command_result(&state, "pomodoro_select", select_task_impl(&state, task_id))?
                }
                PomodoroCommand::Clear => {
                    command_result(&state, "pomodoro_clear", clear_task_impl(&state))?
                }
                PomodoroCommand::Run => {
                    command_result(&state, "pomodoro_run", start_pomodoro_impl(&state))?;
                    info!("pomodoro timer running");
                    let finished = run_pomodoro_impl(&state, Duration::from_secs(1), |snapshot| {
                        if !json {
                            print!("\r{} ", snapshot.display_time);
                            let _ = io::stdout().flush();
                        }
                    })
                    .await;
                    if !json {
                        println!();
                    }
                    command_result(&state, "pomodoro_run", finished)?
                }
            };
            emit(json, &response, print_pomodoro)
        }
        Commands::Theme { command } => {
            let theme = match command {
                ThemeCommand::Show => command_result(&state, "theme_show", get_theme_impl(&state))?,
                ThemeCommand::Mode { mode } => {
                    command_result(&state, "theme_mode", set_theme_mode_impl(&state, mode))?
                }
                ThemeCommand::Accent { color } => {
                    command_result(&state, "theme_accent", set_accent_color_impl(&state, color))?
                }
                ThemeCommand::Image { data_url } => command_result(
                    &state,
                    "theme_image",
                    set_background_image_impl(&state, data_url),
                )?,
                ThemeCommand::Url { url } => {
                    command_result(&state, "theme_url", set_background_url_impl(&state, url))?
                }
                ThemeCommand::Reset => {
                    command_result(&state, "theme_reset", reset_background_impl(&state))?
                }
            };
            emit(json, &theme, print_theme)
        }
        Commands::Chapters { subject } => {
            let chapters = list_chapters_impl(subject)?;
            emit(json, &chapters, |chapters| {
                if chapters.is_empty() {
                    println!("no fixed chapters for this subject");
                }
                chapters.iter().for_each(|chapter| println!("{chapter}"));
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}
