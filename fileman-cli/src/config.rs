// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fileman_exec::ConsoleSettings;
use fileman_sys::DiscoveryConfig;
use fileman_types::AccessMode;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "FILEMAN_CONFIG";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggingLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Access mode used when `--mode` is not given
    pub access_mode: AccessMode,
    pub console: ConsoleSettings,
    pub log_level: LoggingLevel,
    pub log_to_disk: bool,
    /// Directory for rolling log files; `FILEMAN_LOG_DIR` overrides it
    pub log_dir: Option<PathBuf>,
    /// Reject paths outside the discovered storage volumes
    pub confine_to_volumes: bool,
    pub volumes: DiscoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::Safe,
            console: ConsoleSettings::default(),
            log_level: LoggingLevel::Warn,
            log_to_disk: false,
            log_dir: None,
            confine_to_volumes: false,
            volumes: DiscoveryConfig::default(),
        }
    }
}

impl Config {
    /// Load from `explicit`, `$FILEMAN_CONFIG`, or the XDG location, in that
    /// order. Only an explicitly named file has to exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let Some(path) = default_path() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to read {}", path.display()))
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).with_context(|| format!("invalid config {}", path.display()))
    }
}

fn default_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("fileman").join(CONFIG_FILE));
    }

    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("fileman")
            .join(CONFIG_FILE)
    })
}
