use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::migrate::Granularity;

/// Worker count when nothing else is configured.
pub const DEFAULT_JOBS: usize = 16;

/// Optional run settings, read from a TOML file. Every key has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub compare: CompareSettings,
    pub batch: BatchSettings,
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareSettings {
    /// Compare rule-listed attributes in addition to tag names.
    pub attributes: bool,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self { attributes: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    pub jobs: usize,
    pub granularity: Granularity,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            granularity: Granularity::Token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 200,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid settings in {path}: {reason}")]
    Invalid { path: String, reason: String },
}

pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: display.clone(),
        source,
    })?;
    let settings: Settings = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: display.clone(),
        source,
    })?;

    if settings.batch.jobs == 0 {
        return Err(SettingsError::Invalid {
            path: display,
            reason: "batch.jobs must be at least 1".to_string(),
        });
    }
    if settings.resolver.attempts == 0 {
        return Err(SettingsError::Invalid {
            path: display,
            reason: "resolver.attempts must be at least 1".to_string(),
        });
    }
    Ok(settings)
}
