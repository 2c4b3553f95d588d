use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const DEFAULT_APP_NAME: &str = "Study Tasker";
const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_STORAGE_KEY: &str = "study-tasker-state-v3";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub app_name: String,
    /// Zone whose calendar defines "a day" for study days and weekly analytics.
    pub timezone: Tz,
    pub storage_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            timezone: chrono_tz::UTC,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

fn default_app_json() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": DEFAULT_APP_NAME,
        "timezone": DEFAULT_TIMEZONE,
        "storageKey": DEFAULT_STORAGE_KEY
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn read_trimmed<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let timezone = match read_trimmed(&app, "timezone") {
        Some(name) => parse_timezone(name)?,
        None => chrono_tz::UTC,
    };

    Ok(AppConfig {
        app_name: read_trimmed(&app, "appName")
            .unwrap_or(DEFAULT_APP_NAME)
            .to_string(),
        timezone,
        storage_key: read_trimmed(&app, "storageKey")
            .unwrap_or(DEFAULT_STORAGE_KEY)
            .to_string(),
    })
}
