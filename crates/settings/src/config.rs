use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::atomic::{write_atomic, WriteFailure};

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<WriteFailure> for ConfigError {
    fn from(failure: WriteFailure) -> Self {
        match failure {
            WriteFailure::CreateDir { path, source } => ConfigError::CreateDir { path, source },
            WriteFailure::Write { path, source } => ConfigError::Write { path, source },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub autosave: AutoSaveConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            endpoint: EndpointConfig::default(),
            ui: UiConfig::default(),
            autosave: AutoSaveConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        self.endpoint.sanitize();
        self.ui.sanitize();
        self.autosave.sanitize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn sanitize(&mut self) {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            self.base_url = default_base_url();
        } else if trimmed.len() != self.base_url.len() {
            self.base_url = trimmed.to_string();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.timeout_secs = self.timeout_secs.clamp(1, 600);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_gutter_min_lines")]
    pub gutter_min_lines: usize,
}

fn default_toast_duration_ms() -> u64 {
    4000
}

fn default_gutter_min_lines() -> usize {
    10
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            toast_duration_ms: default_toast_duration_ms(),
            gutter_min_lines: default_gutter_min_lines(),
        }
    }
}

impl UiConfig {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    fn sanitize(&mut self) {
        if self.toast_duration_ms == 0 {
            self.toast_duration_ms = default_toast_duration_ms();
        }
        self.toast_duration_ms = self.toast_duration_ms.clamp(500, 60_000);
        if self.gutter_min_lines == 0 {
            self.gutter_min_lines = default_gutter_min_lines();
        }
        self.gutter_min_lines = self.gutter_min_lines.clamp(1, 1000);
    }
}

/// 載入時如何處理已儲存的草稿。 / What happens to a stored draft on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftLoadPolicy {
    #[default]
    Discard,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub on_load: DraftLoadPolicy,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
            on_load: DraftLoadPolicy::Discard,
        }
    }
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn sanitize(&mut self) {
        if self.debounce_ms == 0 {
            self.debounce_ms = default_debounce_ms();
        }
        self.debounce_ms = self.debounce_ms.clamp(100, 60_000);
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: AppConfig,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            path: path.into(),
            data: config,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = AppConfig::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: AppConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn config(&self) -> &AppConfig {
        &self.data
    }

    pub fn into_config(self) -> AppConfig {
        self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), ConfigError>
    where
        F: FnMut(&mut AppConfig),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let payload =
            serde_json::to_string_pretty(&self.data).map_err(|source| ConfigError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &payload).map_err(ConfigError::from)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_take_defaults() {
        let mut config: AppConfig =
            serde_json::from_str(r#"{"version":0,"endpoint":{"base_url":"  "}}"#).unwrap();
        config.sanitize();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.endpoint.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.endpoint.timeout(), Duration::from_secs(30));
        assert_eq!(config.ui, UiConfig::default());
        assert_eq!(config.autosave.on_load, DraftLoadPolicy::Discard);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut config = AppConfig::default();
        config.endpoint.timeout_secs = 10_000;
        config.ui.toast_duration_ms = 1;
        config.ui.gutter_min_lines = 0;
        config.autosave.debounce_ms = 0;
        config.sanitize();
        assert_eq!(config.endpoint.timeout_secs, 600);
        assert_eq!(config.ui.toast_duration_ms, 500);
        assert_eq!(config.ui.gutter_min_lines, 10);
        assert_eq!(config.autosave.debounce_ms, 1000);
    }

    #[test]
    fn draft_policy_uses_lowercase_names() {
        let config: AutoSaveConfig = serde_json::from_str(r#"{"on_load":"restore"}"#).unwrap();
        assert_eq!(config.on_load, DraftLoadPolicy::Restore);
        assert!(config.enabled);
    }
}
