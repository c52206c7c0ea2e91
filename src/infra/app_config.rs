use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::ConfigError;

/// Timing and offload knobs of the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last keystroke before a pane is committed.
    pub commit_debounce_ms: u64,
    /// Quiet period after the last "document changed" before a full re-diff.
    pub refresh_debounce_ms: u64,
    /// Quiet period before classification is requested on large documents.
    pub preview_debounce_ms: u64,
    /// How long after a keystroke a focused pane counts as being edited.
    pub editing_hold_ms: u64,
    /// Retry interval for a result held back while the user types.
    pub deferred_retry_ms: u64,
    /// Row count above which classification leaves the caller's thread.
    /// `0` offloads every keystroke.
    pub offload_threshold_rows: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            commit_debounce_ms: 120,
            refresh_debounce_ms: 220,
            preview_debounce_ms: 60,
            editing_hold_ms: 700,
            deferred_retry_ms: 120,
            offload_threshold_rows: 4000,
        }
    }
}

impl SyncConfig {
    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    pub fn editing_hold(&self) -> Duration {
        Duration::from_millis(self.editing_hold_ms)
    }

    pub fn deferred_retry(&self) -> Duration {
        Duration::from_millis(self.deferred_retry_ms.max(1))
    }

    /// Settings that load fine but work against each other.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.commit_debounce_ms >= self.editing_hold_ms {
            warnings.push(format!(
                "commit_debounce_ms ({}) should be shorter than editing_hold_ms ({})",
                self.commit_debounce_ms, self.editing_hold_ms
            ));
        }
        if self.deferred_retry_ms == 0 {
            warnings.push("deferred_retry_ms of 0 is treated as 1".to_string());
        }
        warnings
    }
}

/// Loads the config, falling back to defaults when the file is missing or
/// unreadable.
pub fn load_config() -> SyncConfig {
    let path = config_path();
    match read_config(&path) {
        Ok(config) => config,
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            SyncConfig::default()
        }
        Err(err) => {
            log::warn!("Ignoring config at {}: {}", path.display(), err);
            SyncConfig::default()
        }
    }
}

pub fn read_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

pub fn save_config(config: &SyncConfig) -> Result<(), ConfigError> {
    write_config(&config_path(), config)
}

pub fn write_config(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PAIRDIFF_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    app_data_dir().join("config.toml")
}

fn app_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("PAIRDIFF_DATA_HOME") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home
                .join("Library")
                .join("Application Support")
                .join("pairdiff");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pairdiff");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("pairdiff");
        }
        if let Some(home) = home::home_dir() {
            return home.join(".config").join("pairdiff");
        }
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".pairdiff")
}
