//! Configuration file support for lampda-flash.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (`LAMPDA_LANG`, `LAMPDA_NON_INTERACTIVE`)
//! 3. Local config file (./lampda.toml)
//! 4. Global config file (~/.config/lampda/config.toml)
//!
//! `--config <path>` replaces steps 3 and 4 with that single file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use lampda::{CatalogConfig, DEFAULT_SETTLE_DELAY, SerialConfig};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = "lampda.toml";

/// Release catalog endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Releases endpoint.
    pub releases_url: Option<String>,
    /// Rate-limit endpoint.
    pub rate_limit_url: Option<String>,
}

/// Serial settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialSection {
    /// Baud rate used to talk to lamps.
    pub baud: Option<u32>,
    /// Read timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Flash settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashSection {
    /// Seconds to wait for the lamp to reboot into its bootloader.
    pub settle_delay_secs: Option<u64>,
    /// Where downloaded firmware files are stored.
    pub download_dir: Option<PathBuf>,
    /// Label of the bootloader drive.
    pub drive_label: Option<String>,
    /// Fixed mount path of the bootloader drive, bypassing label lookup.
    pub mount_path: Option<PathBuf>,
}

/// User interface settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSection {
    /// Message language (`en` or `fr`).
    pub lang: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog configuration.
    #[serde(default)]
    pub catalog: CatalogSection,
    /// Serial configuration.
    #[serde(default)]
    pub serial: SerialSection,
    /// Flash configuration.
    #[serde(default)]
    pub flash: FlashSection,
    /// UI configuration.
    #[serde(default)]
    pub ui: UiSection,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lampda").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one; values set in `other` win.
    fn merge(&mut self, other: Self) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.catalog.releases_url, other.catalog.releases_url);
        take(&mut self.catalog.rate_limit_url, other.catalog.rate_limit_url);
        take(&mut self.serial.baud, other.serial.baud);
        take(&mut self.serial.timeout_ms, other.serial.timeout_ms);
        take(&mut self.flash.settle_delay_secs, other.flash.settle_delay_secs);
        take(&mut self.flash.download_dir, other.flash.download_dir);
        take(&mut self.flash.drive_label, other.flash.drive_label);
        take(&mut self.flash.mount_path, other.flash.mount_path);
        take(&mut self.ui.lang, other.ui.lang);
    }

    /// Catalog endpoints, defaults filled in.
    pub fn catalog_config(&self) -> CatalogConfig {
        let defaults = CatalogConfig::default();
        CatalogConfig {
            releases_url: self
                .catalog
                .releases_url
                .clone()
                .unwrap_or(defaults.releases_url),
            rate_limit_url: self
                .catalog
                .rate_limit_url
                .clone()
                .unwrap_or(defaults.rate_limit_url),
        }
    }

    /// Serial settings for probing and resetting, defaults filled in.
    pub fn serial_config(&self) -> SerialConfig {
        let defaults = SerialConfig::default();
        SerialConfig {
            baud_rate: self.serial.baud.unwrap_or(defaults.baud_rate),
            timeout: self
                .serial
                .timeout_ms
                .map_or(defaults.timeout, Duration::from_millis),
            ..defaults
        }
    }

    /// Delay between reset and drive lookup.
    pub fn settle_delay(&self) -> Duration {
        self.flash
            .settle_delay_secs
            .map_or(DEFAULT_SETTLE_DELAY, Duration::from_secs)
    }

    /// Directory for downloaded firmware.
    pub fn download_dir(&self) -> PathBuf {
        self.flash
            .download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Bootloader drive label.
    pub fn drive_label(&self) -> String {
        self.flash
            .drive_label
            .clone()
            .unwrap_or_else(|| lampda::BOOTLOADER_LABEL.to_string())
    }
}
