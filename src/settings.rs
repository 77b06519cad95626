use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::storage::{JsonFileStore, MemoryStore, SharedStore, SqliteStore};

pub const DATA_DIR_ENV: &str = "STUDY_PAL_DATA_DIR";
pub const DEBUG_ENV: &str = "STUDY_PAL_DEBUG";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub default_timer_minutes: u64,
    pub default_study_minutes: u32,
    pub completion_send_delay_ms: u64,
    pub timer_clear_delay_ms: u64,
    pub storage: StorageBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_timer_minutes: 25,
            default_study_minutes: 30,
            completion_send_delay_ms: 500,
            timer_clear_delay_ms: 1500,
            storage: StorageBackend::Json,
        }
    }
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when it is missing or
    /// unparsable.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring invalid settings at {}: {err}", path.display());
                AppConfig::default()
            })
        } else {
            AppConfig::default()
        };
        Ok(config.validated())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Clamps durations to at least a minute and keeps the timer clear
    /// strictly after the completion message.
    pub fn validated(mut self) -> Self {
        if self.default_timer_minutes == 0 {
            warn!("defaultTimerMinutes must be positive; using 1");
            self.default_timer_minutes = 1;
        }
        if self.default_study_minutes == 0 {
            warn!("defaultStudyMinutes must be positive; using 1");
            self.default_study_minutes = 1;
        }
        if self.timer_clear_delay_ms <= self.completion_send_delay_ms {
            let raised = self.completion_send_delay_ms + 1000;
            warn!(
                "timerClearDelayMs ({}) must exceed completionSendDelayMs ({}); using {raised}",
                self.timer_clear_delay_ms, self.completion_send_delay_ms
            );
            self.timer_clear_delay_ms = raised;
        }
        self
    }

    pub fn open_store(&self, data_dir: &Path) -> Result<SharedStore> {
        let store: SharedStore = match self.storage {
            StorageBackend::Json => Arc::new(JsonFileStore::new(data_dir.join("study-pal.json"))?),
            StorageBackend::Sqlite => {
                Arc::new(SqliteStore::new(data_dir.join("study-pal.sqlite3"))?)
            }
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join("study-pal"))
        .ok_or_else(|| anyhow!("could not determine a data directory; set {DATA_DIR_ENV}"))
}
