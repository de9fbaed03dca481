//! # lampda
//!
//! A library for finding Lamp-da lamps and updating their firmware.
//!
//! A lamp running firmware speaks a small line-based CLI over USB serial
//! (`h`, `v`, `t`, `id`, `DFU`). After `DFU` it reboots into a UF2
//! bootloader and mounts as a removable drive labelled `LMBDROOT`; copying a
//! UF2 file onto that drive installs it.
//!
//! This crate provides:
//!
//! - Lamp probing and discovery over serial ports and the bootloader drive
//! - A client for the GitHub release catalog, with rate-limit gating
//! - Latest-release selection
//! - The reset → drive → download → copy flash sequence
//! - A serial terminal session for the firmware CLI
//!
//! ## Features
//!
//! - `native` (default): serial ports via the `serialport` crate
//! - `http` (default): release catalog transport via `reqwest`
//!
//! ## Example
//!
//! ```rust,no_run
//! use lampda::{Discovery, NativePortEnumerator, NativePortOpener, SystemDriveLocator};
//!
//! let discovery = Discovery::new(&NativePortOpener, &NativePortEnumerator, &SystemDriveLocator);
//! for found in discovery.discover(None) {
//!     println!("{}: {:?}", found.address, found.lamp.lamp_type);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod discovery;
pub mod drive;
pub mod error;
pub mod flash;
pub mod monitor;
pub mod port;
pub mod protocol;
pub mod release;

#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator, NativePortOpener};
#[cfg(feature = "http")]
pub use release::ReqwestTransport;
pub use {
    device::{
        DiscoveredLamp, Lamp, LampAddress, LampType, ProbeOutcome, UpdateStatus, probe,
        query_serial_number,
    },
    discovery::Discovery,
    drive::{BOOTLOADER_LABEL, DriveLocator, FixedDriveLocator, SystemDriveLocator},
    error::{Error, Result},
    flash::{
        AssetDownloader, DEFAULT_SETTLE_DELAY, FlashReport, FlashSession, FlashSource,
        FlashStage, Flasher, resolve_asset,
    },
    monitor::{MonitorSession, clean_monitor_text, drain_utf8_lossy, timestamp_lines},
    port::{Port, PortEnumerator, PortInfo, PortOpener, SerialConfig},
    release::{
        CatalogConfig, HttpTransport, RATE_LIMIT_MARGIN, Release, ReleaseCatalog, compare_tags,
        select_latest, version_score,
    },
};
