pub mod analytics;
pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod pomodoro;
pub mod store;
pub mod theme;
