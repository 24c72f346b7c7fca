// src/config.rs

use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::core::models::KnownDevices;
use crate::core::scanner::ScannerSettings;
use crate::logging::get_config_dir;

pub const CONFIG_FILE: &str = "config.json";

/// Everything persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Subnets swept by a manual scan. Empty means "detect the local /24".
    pub subnets: Vec<String>,
    pub hosts: KnownDevices,
    pub notification_states: Vec<String>,
    pub log_level: String,
    pub auto_refresh: bool,
    pub auto_refresh_interval_secs: u64,
    pub scanner: ScannerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subnets: Vec::new(),
            hosts: KnownDevices::new(),
            notification_states: Vec::new(),
            log_level: "info".to_string(),
            auto_refresh: true,
            auto_refresh_interval_secs: 5,
            scanner: ScannerSettings::default(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

impl AppConfig {
    /// Reads the config at `path`. A missing file gives defaults; so does a
    /// corrupt one, after logging why.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => {
                debug!(path = %path.display(), hosts = config.hosts.len(), "Configuration loaded.");
                config
            }
            Ok(None) => {
                info!(path = %path.display(), "No configuration file, using defaults.");
                Self::default()
            }
            Err(e) => {
                error!(path = %path.display(), error = ?e, "Failed to load config, using defaults.");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).wrap_err_with(|| format!("cannot read {}", path.display()))?;
        let config = serde_json::from_str(&raw).wrap_err_with(|| format!("cannot parse {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).wrap_err_with(|| format!("cannot create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).wrap_err("cannot serialize configuration")?;
        fs::write(path, raw).wrap_err_with(|| format!("cannot write {}", path.display()))?;
        debug!(path = %path.display(), "Configuration saved.");
        Ok(())
    }

    /// Manual scans sweep the configured subnets, or the detected local one.
    pub fn effective_subnets(&self) -> Vec<String> {
        if self.subnets.is_empty() {
            vec![crate::core::scanner::address_space::detect_local_subnet()]
        } else {
            self.subnets.clone()
        }
    }
}
