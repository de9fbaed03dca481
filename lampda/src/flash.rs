//! Firmware update orchestration.
//!
//! A flash session walks through fixed stages:
//!
//! ```text
//! Ready -> Resetting -> WaitingForDrive -> ResolvingAsset -> Copying -> Done
//! ```
//!
//! The lamp is rebooted into its bootloader with `DFU`, shows up as a USB
//! drive, and installs whatever UF2 file is copied onto that drive. There are
//! no automatic retries; any failure ends the session.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::device::{LampAddress, LampType};
use crate::drive::{BOOTLOADER_LABEL, DriveLocator};
use crate::error::{Error, Result};
use crate::port::{PortOpener, SerialConfig};
use crate::protocol::command::Command;
use crate::protocol::line::write_line;
use crate::release::{HttpTransport, ReleaseCatalog};

/// Time given to a lamp to reboot and mount its drive.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Progress of a flash session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashStage {
    /// Session accepted, inputs checked.
    Ready,
    /// Rebooting the lamp into its bootloader.
    Resetting,
    /// Waiting for the bootloader drive.
    WaitingForDrive,
    /// Picking and fetching the firmware file.
    ResolvingAsset,
    /// Copying the firmware onto the drive.
    Copying,
    /// Firmware handed over to the bootloader.
    Done,
}

impl fmt::Display for FlashStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Resetting => "resetting",
            Self::WaitingForDrive => "waiting for drive",
            Self::ResolvingAsset => "resolving firmware",
            Self::Copying => "copying",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Where the firmware comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashSource {
    /// Asset URLs of a release; the one matching the lamp type is used.
    Remote {
        /// Download URLs of the release.
        asset_urls: Vec<String>,
    },
    /// A UF2 file on disk.
    Local {
        /// Path to the file.
        path: PathBuf,
    },
}

/// One firmware update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashSession {
    /// Lamp to update.
    pub address: LampAddress,
    /// Firmware variant to install.
    pub lamp_type: LampType,
    /// Firmware source.
    pub source: FlashSource,
    /// Do not send `DFU`; the lamp is put into update mode by hand.
    pub skip_reset: bool,
}

/// Outcome of a successful session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashReport {
    /// Mount path of the bootloader drive.
    pub drive: PathBuf,
    /// Name of the file copied onto the drive.
    pub file_name: String,
    /// Size of the firmware file.
    pub bytes: u64,
    /// The drive disappeared during the copy.
    ///
    /// The bootloader unmounts as soon as it has taken the image, so this is
    /// reported as success.
    pub drive_vanished: bool,
}

/// Fetches a firmware asset into a local file.
pub trait AssetDownloader: Send + Sync {
    /// Download `url` into `path`, returning the number of bytes written.
    fn download_to(&self, url: &str, path: &Path) -> Result<u64>;
}

impl<T: HttpTransport> AssetDownloader for ReleaseCatalog<T> {
    fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        self.download_asset_to(url, path)
    }
}

/// File name part of an asset URL.
fn url_file_name(url: &str) -> &str {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// The single asset whose file name contains the lamp type token.
pub fn resolve_asset<'a>(asset_urls: &'a [String], lamp_type: &LampType) -> Result<&'a str> {
    let token = lamp_type.as_str();
    let matches: Vec<&str> = asset_urls
        .iter()
        .map(String::as_str)
        .filter(|url| url_file_name(url).contains(token))
        .collect();

    match matches.as_slice() {
        [url] => Ok(*url),
        _ => Err(Error::AssetResolution {
            lamp_type: token.to_string(),
            matches: matches.len(),
        }),
    }
}

/// Runs flash sessions.
pub struct Flasher<'a> {
    opener: &'a dyn PortOpener,
    locator: &'a dyn DriveLocator,
    downloader: Option<&'a dyn AssetDownloader>,
    serial: SerialConfig,
    settle_delay: Duration,
    download_dir: PathBuf,
    drive_label: String,
}

impl<'a> Flasher<'a> {
    /// Flasher for local files only.
    pub fn new(opener: &'a dyn PortOpener, locator: &'a dyn DriveLocator) -> Self {
        Self {
            opener,
            locator,
            downloader: None,
            serial: SerialConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            download_dir: PathBuf::from("."),
            drive_label: BOOTLOADER_LABEL.to_string(),
        }
    }

    /// Enable remote sources.
    #[must_use]
    pub fn with_downloader(mut self, downloader: &'a dyn AssetDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Serial settings used to send the reset command.
    #[must_use]
    pub fn with_serial_config(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Wait between the reset and the drive lookup.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Directory receiving downloaded firmware files.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Bootloader drive label.
    #[must_use]
    pub fn with_drive_label(mut self, label: impl Into<String>) -> Self {
        self.drive_label = label.into();
        self
    }

    /// Run one session, reporting each stage to `on_stage`.
    pub fn flash(
        &self,
        session: &FlashSession,
        on_stage: &mut dyn FnMut(FlashStage),
    ) -> Result<FlashReport> {
        on_stage(FlashStage::Ready);
        if let FlashSource::Local { path } = &session.source {
            if !path.is_file() {
                return Err(Error::FileNotFound(path.clone()));
            }
        }

        match &session.address {
            LampAddress::Serial(port) if !session.skip_reset => {
                on_stage(FlashStage::Resetting);
                self.reset(port)?;
            },
            LampAddress::Serial(port) => debug!("Reset of {port} skipped"),
            LampAddress::Drive(_) => debug!("Lamp already in update mode"),
        }

        on_stage(FlashStage::WaitingForDrive);
        if !session.address.is_drive() {
            debug!("Waiting {:?} for the lamp to reboot", self.settle_delay);
            thread::sleep(self.settle_delay);
        }
        let drive = self
            .locator
            .locate(&self.drive_label)
            .ok_or_else(|| Error::DriveNotFound(self.drive_label.clone()))?;
        info!("Update drive at {}", drive.display());

        on_stage(FlashStage::ResolvingAsset);
        let firmware = self.resolve_firmware(session)?;

        on_stage(FlashStage::Copying);
        let report = self.copy_to_drive(&firmware, &drive)?;

        on_stage(FlashStage::Done);
        info!("Firmware {} sent to {}", report.file_name, drive.display());
        Ok(report)
    }

    fn reset(&self, port_name: &str) -> Result<()> {
        info!("Rebooting lamp on {port_name} into update mode");
        let reset_error = |e: Error| Error::ResetFailed(format!("{port_name}: {e}"));

        let mut port = self
            .opener
            .open(&self.serial.for_port(port_name))
            .map_err(reset_error)?;
        write_line(port.as_mut(), Command::Dfu.as_str()).map_err(reset_error)?;
        port.close().map_err(reset_error)
    }

    fn resolve_firmware(&self, session: &FlashSession) -> Result<PathBuf> {
        match &session.source {
            FlashSource::Local { path } => Ok(path.clone()),
            FlashSource::Remote { asset_urls } => {
                let url = resolve_asset(asset_urls, &session.lamp_type)?;
                let downloader = self.downloader.ok_or_else(|| {
                    Error::Unsupported("no release catalog available for remote firmware".to_string())
                })?;

                let target = self
                    .download_dir
                    .join(format!("{}.uf2", session.lamp_type.as_str()));
                let bytes = downloader.download_to(url, &target)?;
                debug!("Saved {bytes} bytes to {}", target.display());
                Ok(target)
            },
        }
    }

    fn copy_to_drive(&self, firmware: &Path, drive: &Path) -> Result<FlashReport> {
        let file_name = firmware
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::FileNotFound(firmware.to_path_buf()))?;
        let destination = drive.join(&file_name);
        info!("Copying {} to {}", firmware.display(), destination.display());

        match fs::copy(firmware, &destination) {
            Ok(bytes) => Ok(FlashReport {
                drive: drive.to_path_buf(),
                file_name,
                bytes,
                drive_vanished: false,
            }),
            Err(e) if self.locator.locate(&self.drive_label).is_none() => {
                warn!("Drive vanished during copy ({e}), assuming the bootloader took the image");
                Ok(FlashReport {
                    drive: drive.to_path_buf(),
                    file_name,
                    bytes: fs::metadata(firmware).map_or(0, |m| m.len()),
                    drive_vanished: true,
                })
            },
            Err(e) => Err(Error::CopyFailed(format!("{}: {e}", destination.display()))),
        }
    }
}
