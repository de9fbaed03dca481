//! Removable-drive lookup by volume label.
//!
//! In bootloader mode a lamp enumerates as a USB mass-storage device labelled
//! [`BOOTLOADER_LABEL`]. Copying a UF2 file onto it installs the firmware.

use std::path::{Path, PathBuf};

use log::debug;

/// Volume label of a lamp in bootloader mode.
pub const BOOTLOADER_LABEL: &str = "LMBDROOT";

/// Finds a mounted volume by label.
pub trait DriveLocator: Send + Sync {
    /// Mount path of the volume labelled `label`, if mounted.
    fn locate(&self, label: &str) -> Option<PathBuf>;
}

/// Looks the label up in the operating system's mount table.
///
/// Supported on Linux (`/dev/disk/by-label` + `/proc/self/mounts`), macOS
/// (`/Volumes/<label>`) and Windows (volume label of every logical drive).
/// Elsewhere nothing is ever found; use a [`FixedDriveLocator`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDriveLocator;

impl DriveLocator for SystemDriveLocator {
    fn locate(&self, label: &str) -> Option<PathBuf> {
        let found = locate_on_host(label);
        debug!("Drive '{label}': {found:?}");
        found
    }
}

#[cfg(target_os = "linux")]
fn locate_on_host(label: &str) -> Option<PathBuf> {
    let by_label = Path::new("/dev/disk/by-label").join(escape_udev_label(label));
    let device = std::fs::canonicalize(&by_label).ok()?;
    log::trace!("{} -> {}", by_label.display(), device.display());

    let mounts = std::fs::read_to_string("/proc/self/mounts").ok()?;
    find_mount_point(&mounts, &device)
}

#[cfg(target_os = "macos")]
fn locate_on_host(label: &str) -> Option<PathBuf> {
    let volume = Path::new("/Volumes").join(label);
    log::trace!("Checking {}", volume.display());
    volume
        .is_dir()
        .then_some(volume)
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn locate_on_host(label: &str) -> Option<PathBuf> {
    use std::ptr;

    use windows_sys::Win32::Storage::FileSystem::{GetLogicalDriveStringsW, GetVolumeInformationW};

    const ROOTS_LEN: u32 = 512;
    const NAME_LEN: u32 = 261;

    let mut roots = [0u16; ROOTS_LEN as usize];
    // SAFETY: `roots` holds exactly ROOTS_LEN code units.
    let len = unsafe { GetLogicalDriveStringsW(ROOTS_LEN, roots.as_mut_ptr()) };
    if len == 0 || len > ROOTS_LEN {
        log::warn!("Could not list logical drives (returned {len})");
        return None;
    }

    for root in split_drive_strings(&roots[..len as usize]) {
        let wide_root: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
        let mut name = [0u16; NAME_LEN as usize];
        // SAFETY: `wide_root` is NUL-terminated, `name` holds NAME_LEN code
        // units and the optional outputs are null.
        let ok = unsafe {
            GetVolumeInformationW(
                wide_root.as_ptr(),
                name.as_mut_ptr(),
                NAME_LEN,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                0,
            )
        };
        if ok == 0 {
            log::trace!("{root}: no volume information");
            continue;
        }

        let volume = utf16_until_nul(&name);
        log::trace!("{root}: '{volume}'");
        if label_matches(&volume, label) {
            return Some(PathBuf::from(root));
        }
    }
    None
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn locate_on_host(label: &str) -> Option<PathBuf> {
    log::warn!(
        "Looking up drive '{label}' is not supported on this platform, set flash.mount_path in the configuration"
    );
    None
}

/// Escape a label the way udev names `/dev/disk/by-label` entries.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn escape_udev_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "#+-.:=@_".contains(c) {
                c.to_string()
            } else {
                format!("\\x{:02x}", u32::from(c))
            }
        })
        .collect()
}

/// Find where `device` is mounted in a `/proc/mounts` style table.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn find_mount_point(mounts: &str, device: &Path) -> Option<PathBuf> {
    mounts.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let source = fields.next()?;
        let target = fields.next()?;
        let source = Path::new(source);
        let same = source == device
            || std::fs::canonicalize(source).is_ok_and(|s| s == device);
        same.then(|| PathBuf::from(unescape_mount_field(target)))
    })
}

/// Decode the octal escapes (`\040` for space) used in mount tables.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let octal = bytes
                .get(i + 1..i + 4)
                .and_then(|digits| std::str::from_utf8(digits).ok())
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(value) = octal {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split the NUL-separated root list of `GetLogicalDriveStringsW`.
#[cfg_attr(not(windows), allow(dead_code))]
fn split_drive_strings(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&c| c == 0)
        .filter(|root| !root.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg_attr(not(windows), allow(dead_code))]
fn utf16_until_nul(buffer: &[u16]) -> String {
    let end = buffer
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}

/// FAT volume labels are stored upper-case, so compare without case.
#[cfg_attr(not(windows), allow(dead_code))]
fn label_matches(volume: &str, label: &str) -> bool {
    volume.trim().eq_ignore_ascii_case(label)
}

/// Reports a fixed mount path whenever it exists, whatever the label.
///
/// For platforms without label lookup, or when the user knows where the
/// bootloader drive gets mounted.
#[derive(Debug, Clone)]
pub struct FixedDriveLocator {
    path: PathBuf,
}

impl FixedDriveLocator {
    /// Locator for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DriveLocator for FixedDriveLocator {
    fn locate(&self, _label: &str) -> Option<PathBuf> {
        self.path
            .is_dir()
            .then(|| self.path.clone())
    }
}
