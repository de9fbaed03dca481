//! Lamp console commands and reply parsing.

use std::fmt;

use crate::error::{Error, Result};

/// Substring identifying a lamp in the reply to [`Command::Help`].
pub const PRODUCT_MARKER: &str = "Lamp-da";

const SERIAL_NUMBER_LABEL: &str = "Serial number:";

/// Commands understood by the lamp console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Help page; its first line carries [`PRODUCT_MARKER`].
    Help,
    /// Hardware and software versions.
    Version,
    /// Lamp type.
    Type,
    /// Board serial number.
    SerialNumber,
    /// Reboot into the UF2 bootloader. No reply.
    Dfu,
}

impl Command {
    /// Text sent on the wire, without the trailing newline.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Help => "h",
            Self::Version => "v",
            Self::Type => "t",
            Self::SerialNumber => "id",
            Self::Dfu => "DFU",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version fields reported by [`Command::Version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionField {
    /// PCB revision.
    Hardware,
    /// Firmware the base software expects.
    Firmware,
    /// Shared system software.
    BaseSoftware,
    /// Lamp-specific user software, compared against release tags.
    UserSoftware,
}

impl VersionField {
    /// All fields, in the order the lamp prints them.
    pub const ALL: [Self; 4] = [
        Self::Hardware,
        Self::Firmware,
        Self::BaseSoftware,
        Self::UserSoftware,
    ];

    /// Line prefix identifying the field.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::Firmware => "firmware",
            Self::BaseSoftware => "base software",
            Self::UserSoftware => "user software",
        }
    }
}

/// True if a reply line identifies a lamp.
pub fn is_lamp_banner(line: &str) -> bool {
    line.contains(PRODUCT_MARKER)
}

/// Prefix a version with `v` so it reads like a release tag.
pub fn normalize_version(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('v') {
        raw.to_string()
    } else {
        format!("v{raw}")
    }
}

/// Parse one line of the version reply.
///
/// The field name may appear anywhere in the line: the firmware prefixes the
/// first line of every reply with `<millis>> `. Lines without a known field
/// yield `Ok(None)`. A known field without a `:` delimiter or with an empty
/// value is an error.
pub fn parse_version_line(line: &str) -> Result<Option<(VersionField, String)>> {
    let line = line.trim();
    let Some(field) = VersionField::ALL
        .into_iter()
        .find(|f| line.contains(f.prefix()))
    else {
        return Ok(None);
    };

    let value = line
        .rsplit_once(':')
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::Protocol(format!("malformed {} version line: {line:?}", field.prefix()))
        })?;

    Ok(Some((field, normalize_version(value))))
}

/// Extract the lamp type token from the reply to [`Command::Type`].
///
/// Returns `None` for an empty reply.
pub fn parse_type_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else if line.contains("unknown") {
        Some("unknown")
    } else {
        line.split(' ')
            .next_back()
    }
}

/// Extract the number from `Serial number: <n>`, wherever it starts in the
/// line.
pub fn parse_serial_number_line(line: &str) -> Result<String> {
    line.split_once(SERIAL_NUMBER_LABEL)
        .map(|(_, number)| number.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Protocol(format!("unexpected serial number reply: {line:?}")))
}
