use crate::errors::SyncError;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 60 * 1000;
pub const DEFAULT_RECORDING_FILE: &str = "sairedis.rec";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub sync_mode: bool,
    pub record: bool,
    pub record_file: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

/// Process-wide switches, fixed once at startup and handed to every request
/// path by value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub sync_mode: bool,
    pub response_timeout_ms: u64,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sync_mode: false,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            recording: RecordingConfig {
                enabled: false,
                path: PathBuf::from(DEFAULT_RECORDING_FILE),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialClientConfig {
    sync_mode: Option<bool>,
    response_timeout_ms: Option<u64>,
    recording: Option<PartialRecordingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialRecordingConfig {
    enabled: Option<bool>,
    path: Option<PathBuf>,
}

pub fn load_config(
    overrides: &CliOverrides,
    fs: &dyn FileSystem,
) -> Result<ClientConfig, SyncError> {
    let mut cfg = ClientConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialClientConfig = toml::from_str(&file_contents)
            .map_err(|e| SyncError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut ClientConfig, partial: PartialClientConfig) {
    if let Some(sync_mode) = partial.sync_mode {
        cfg.sync_mode = sync_mode;
    }
    if let Some(timeout) = partial.response_timeout_ms {
        cfg.response_timeout_ms = timeout;
    }
    if let Some(recording) = partial.recording {
        if let Some(enabled) = recording.enabled {
            cfg.recording.enabled = enabled;
        }
        if let Some(path) = recording.path {
            cfg.recording.path = path;
        }
    }
}

// Flags only ever switch features on; a config file cannot be overridden
// back to off from the command line.
fn apply_cli_overrides(cfg: &mut ClientConfig, overrides: &CliOverrides) {
    if overrides.sync_mode {
        cfg.sync_mode = true;
    }
    if let Some(timeout) = overrides.timeout_ms {
        cfg.response_timeout_ms = timeout;
    }
    if overrides.record || overrides.record_file.is_some() {
        cfg.recording.enabled = true;
    }
    if let Some(path) = &overrides.record_file {
        cfg.recording.path = path.clone();
    }
}

pub fn validate_config(cfg: &ClientConfig) -> Result<(), SyncError> {
    if cfg.response_timeout_ms == 0 {
        return Err(SyncError::InvalidConfig(
            "response_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if cfg.recording.enabled && cfg.recording.path.as_os_str().is_empty() {
        return Err(SyncError::InvalidConfig(
            "recording.path must not be empty when recording is enabled".to_string(),
        ));
    }
    Ok(())
}
