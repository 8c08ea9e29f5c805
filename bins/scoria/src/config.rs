use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct ScoriaConfig {
    #[serde(default = "defaults::segment")]
    pub segment: String,
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    #[serde(default = "defaults::events_per_sec")]
    pub events_per_sec: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn segment() -> String {
        "/basalt_bus".into()
    }

    pub fn capacity() -> usize {
        1 << 16
    }

    pub fn events_per_sec() -> u64 {
        100_000
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for ScoriaConfig {
    fn default() -> Self {
        Self {
            segment: defaults::segment(),
            capacity: defaults::capacity(),
            events_per_sec: defaults::events_per_sec(),
            log_level: defaults::log_level(),
        }
    }
}

impl ScoriaConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Loads `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
