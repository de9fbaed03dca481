//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod completions;
pub(crate) mod flash;
pub(crate) mod info;
pub(crate) mod list;
pub(crate) mod monitor;
pub(crate) mod releases;

use lampda::{DiscoveredLamp, Discovery, NativePortEnumerator, NativePortOpener};

use crate::Runtime;

/// Scan for lamps on a worker thread.
///
/// `restrict_to` is passed to [`Discovery::discover`] unchanged.
pub(crate) fn discover_lamps(runtime: &Runtime, restrict_to: Option<&[String]>) -> Vec<DiscoveredLamp> {
    let locator = runtime.locator();
    let discovery = Discovery::new(&NativePortOpener, &NativePortEnumerator, locator.as_ref())
        .with_serial_config(runtime.config.serial_config())
        .with_drive_label(runtime.config.drive_label());

    runtime.with_spinner(runtime.messages.searching(), || discovery.discover(restrict_to))
}
