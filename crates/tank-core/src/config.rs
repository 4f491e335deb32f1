//! Configuration system for tankd and tank-ctl.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TANKD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/tankd/config.toml
//!   3. ~/.config/tankd/config.toml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TankdConfig {
    pub server: ServerConfig,
    pub tank: TankDefaults,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Wall-clock length of one transfer time unit, in milliseconds.
    pub time_unit_ms: u64,
    /// Permission bits for the message queues the server creates.
    pub ipc_mode: u32,
}

/// Initial state applied to every tank at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TankDefaults {
    pub lower_permissible_level: u64,
    pub upper_acceptable_level: u64,
    pub level_of_product: u64,
    /// Volume per time unit. Must be non-zero.
    pub download_speed: u64,
    /// Volume per time unit. Must be non-zero.
    pub unloading_speed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long to wait for the session id after asking for a tank.
    /// 0 = wait forever.
    pub admission_timeout_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            ipc_mode: 0o600,
        }
    }
}

impl Default for TankDefaults {
    fn default() -> Self {
        Self {
            lower_permissible_level: 10,
            upper_acceptable_level: 1000,
            level_of_product: 10,
            download_speed: 100,
            unloading_speed: 100,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            admission_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }
}

impl ClientConfig {
    pub fn admission_timeout(&self) -> Option<Duration> {
        match self.admission_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("tankd")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TankdConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TankdConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TANKD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TankdConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Reject settings that would make transfers never finish.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tank.download_speed == 0 {
            return Err(ConfigError::Invalid("tank.download_speed must be > 0".into()));
        }
        if self.tank.unloading_speed == 0 {
            return Err(ConfigError::Invalid("tank.unloading_speed must be > 0".into()));
        }
        Ok(())
    }

    /// Apply TANKD_* env var overrides.
    fn apply_env_overrides(&mut self) {
        fn number<T: std::str::FromStr>(name: &str, slot: &mut T) {
            if let Ok(v) = std::env::var(name) {
                match v.parse() {
                    Ok(parsed) => *slot = parsed,
                    Err(_) => {
                        tracing::warn!(var = name, value = %v, "ignoring non-numeric override")
                    }
                }
            }
        }

        number("TANKD_SERVER__TIME_UNIT_MS", &mut self.server.time_unit_ms);
        number("TANKD_SERVER__IPC_MODE", &mut self.server.ipc_mode);
        number(
            "TANKD_TANK__LOWER_PERMISSIBLE_LEVEL",
            &mut self.tank.lower_permissible_level,
        );
        number(
            "TANKD_TANK__UPPER_ACCEPTABLE_LEVEL",
            &mut self.tank.upper_acceptable_level,
        );
        number("TANKD_TANK__LEVEL_OF_PRODUCT", &mut self.tank.level_of_product);
        number("TANKD_TANK__DOWNLOAD_SPEED", &mut self.tank.download_speed);
        number("TANKD_TANK__UNLOADING_SPEED", &mut self.tank.unloading_speed);
        number(
            "TANKD_CLIENT__ADMISSION_TIMEOUT_SECS",
            &mut self.client.admission_timeout_secs,
        );
    }
}
