//! Lamp identity and state.
//!
//! A [`Lamp`] is an immutable snapshot built by a probe. It is addressed by
//! its transport ([`LampAddress`]), never by a persistent ID: a lamp that
//! reboots is probed again from scratch.

pub mod probe;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::protocol::command::VersionField;
use crate::release::Release;

pub use probe::{ProbeOutcome, probe, query_serial_number};

/// Firmware variant running on (or targeted for) a lamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LampType {
    /// No application firmware; the lamp shows up as a USB drive.
    Unflashed,
    /// Single-color lamp.
    Simple,
    /// Addressable LED strip lamp.
    Indexable,
    /// Color-temperature lamp.
    Cct,
    /// The firmware does not know its own type.
    Unknown,
    /// A type this tool does not know about yet.
    Other(String),
}

impl LampType {
    /// Types a release ships a firmware file for.
    pub const FLASHABLE: [Self; 3] = [Self::Simple, Self::Indexable, Self::Cct];

    /// Parse the token reported by the lamp.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "unflashed" => Self::Unflashed,
            "simple" => Self::Simple,
            "indexable" => Self::Indexable,
            "cct" => Self::Cct,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Token used on the wire and in release asset names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unflashed => "unflashed",
            Self::Simple => "simple",
            Self::Indexable => "indexable",
            Self::Cct => "cct",
            Self::Unknown => "unknown",
            Self::Other(token) => token,
        }
    }

    /// Whether a release asset can be picked for this type without asking.
    pub fn is_flashable(&self) -> bool {
        Self::FLASHABLE.contains(self)
    }
}

impl fmt::Display for LampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LampType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where a lamp was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LampAddress {
    /// Running firmware, reachable on a serial port.
    Serial(String),
    /// Bootloader mode, mounted as a removable drive.
    Drive(PathBuf),
}

impl LampAddress {
    /// Serial port name, if the lamp is running firmware.
    pub fn port_name(&self) -> Option<&str> {
        match self {
            Self::Serial(name) => Some(name),
            Self::Drive(_) => None,
        }
    }

    /// True when the lamp is already in bootloader mode.
    pub fn is_drive(&self) -> bool {
        matches!(self, Self::Drive(_))
    }
}

impl fmt::Display for LampAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(name) => f.write_str(name),
            Self::Drive(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Serialize for LampAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a probe learned about a lamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lamp {
    /// Firmware variant, `None` if the type query failed.
    pub lamp_type: Option<LampType>,
    /// Hardware revision.
    pub hardware_version: Option<String>,
    /// Expected firmware version.
    pub firmware_version: Option<String>,
    /// Base software version.
    pub base_software_version: Option<String>,
    /// User software version, compared against release tags.
    pub user_software_version: Option<String>,
}

impl Lamp {
    /// A lamp in bootloader mode: no firmware, nothing to query.
    pub fn unflashed() -> Self {
        Self {
            lamp_type: Some(LampType::Unflashed),
            ..Self::default()
        }
    }

    /// Version for one field.
    pub fn version(&self, field: VersionField) -> Option<&str> {
        match field {
            VersionField::Hardware => self.hardware_version.as_deref(),
            VersionField::Firmware => self.firmware_version.as_deref(),
            VersionField::BaseSoftware => self.base_software_version.as_deref(),
            VersionField::UserSoftware => self.user_software_version.as_deref(),
        }
    }

    pub(crate) fn set_version(&mut self, field: VersionField, value: String) {
        let slot = match field {
            VersionField::Hardware => &mut self.hardware_version,
            VersionField::Firmware => &mut self.firmware_version,
            VersionField::BaseSoftware => &mut self.base_software_version,
            VersionField::UserSoftware => &mut self.user_software_version,
        };
        *slot = Some(value);
    }

    /// True if the lamp runs no application firmware.
    pub fn is_unflashed(&self) -> bool {
        self.lamp_type == Some(LampType::Unflashed)
    }

    /// Compare the lamp against the latest release.
    pub fn update_status(&self, latest: &Release) -> UpdateStatus {
        if self.is_unflashed() {
            return UpdateStatus::NoFirmware;
        }
        match self.user_software_version.as_deref() {
            Some(current) if current == latest.tag => UpdateStatus::UpToDate,
            current => UpdateStatus::Outdated {
                current: current.map(str::to_string),
                target: latest.tag.clone(),
            },
        }
    }
}

/// A lamp together with its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredLamp {
    /// Transport address.
    pub address: LampAddress,
    /// Probe snapshot.
    pub lamp: Lamp,
}

/// How a lamp relates to the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The lamp is in bootloader mode without firmware.
    NoFirmware,
    /// The user software already matches the latest tag.
    UpToDate,
    /// An update is available.
    Outdated {
        /// Current user software version, if known.
        current: Option<String>,
        /// Latest release tag.
        target: String,
    },
}
