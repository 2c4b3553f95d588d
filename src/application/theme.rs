use crate::application::store::TaskerStore;
use crate::domain::models::{BackgroundType, ThemeMode, ThemeUpdate};
use crate::infrastructure::storage::KeyValueStore;
use tracing::debug;

pub fn set_mode<S: KeyValueStore>(store: &mut TaskerStore<S>, mode: ThemeMode) -> bool {
    store.update_theme(ThemeUpdate {
        mode: Some(mode),
        ..ThemeUpdate::default()
    })
}

/// `None` falls back to the built-in accent.
pub fn set_accent_color<S: KeyValueStore>(store: &mut TaskerStore<S>, color: Option<&str>) -> bool {
    let color = color
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    store.update_theme(ThemeUpdate {
        accent_color: Some(color),
        ..ThemeUpdate::default()
    })
}

/// Stores an uploaded image, already encoded as a data URL.
pub fn set_background_image<S: KeyValueStore>(store: &mut TaskerStore<S>, data_url: &str) -> bool {
    if data_url.is_empty() {
        debug!("ignored empty background image");
        return false;
    }
    store.update_theme(ThemeUpdate {
        background_type: Some(BackgroundType::Image),
        background_image: Some(Some(data_url.to_string())),
        ..ThemeUpdate::default()
    })
}

pub fn set_background_url<S: KeyValueStore>(store: &mut TaskerStore<S>, url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        debug!("ignored blank background url");
        return false;
    }
    store.update_theme(ThemeUpdate {
        background_type: Some(BackgroundType::Url),
        background_image: Some(Some(url.to_string())),
        ..ThemeUpdate::default()
    })
}

pub fn reset_background<S: KeyValueStore>(store: &mut TaskerStore<S>) -> bool {
    store.update_theme(ThemeUpdate {
        background_type: Some(BackgroundType::Default),
        background_image: Some(None),
        ..ThemeUpdate::default()
    })
}
