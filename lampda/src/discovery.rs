//! Lamp discovery across serial ports and the bootloader drive.

use log::{debug, info, warn};

use crate::device::{DiscoveredLamp, Lamp, LampAddress, ProbeOutcome, probe};
use crate::drive::{BOOTLOADER_LABEL, DriveLocator};
use crate::port::{PortEnumerator, PortOpener, SerialConfig};

/// Finds every lamp connected to the host.
pub struct Discovery<'a> {
    opener: &'a dyn PortOpener,
    enumerator: &'a dyn PortEnumerator,
    locator: &'a dyn DriveLocator,
    serial: SerialConfig,
    drive_label: String,
}

impl<'a> Discovery<'a> {
    /// Discovery over the given port and drive backends.
    pub fn new(
        opener: &'a dyn PortOpener,
        enumerator: &'a dyn PortEnumerator,
        locator: &'a dyn DriveLocator,
    ) -> Self {
        Self {
            opener,
            enumerator,
            locator,
            serial: SerialConfig::default(),
            drive_label: BOOTLOADER_LABEL.to_string(),
        }
    }

    /// Use different serial settings for probing.
    #[must_use]
    pub fn with_serial_config(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Look for the bootloader drive under another label.
    #[must_use]
    pub fn with_drive_label(mut self, label: impl Into<String>) -> Self {
        self.drive_label = label.into();
        self
    }

    /// Discover lamps.
    ///
    /// `restrict_to` limits probing to the listed ports (used to re-check
    /// known lamps); `Some(&[])` probes no port at all. The bootloader drive
    /// is always checked and, when present, listed last.
    pub fn discover(&self, restrict_to: Option<&[String]>) -> Vec<DiscoveredLamp> {
        let ports = match restrict_to {
            Some(ports) => ports.to_vec(),
            None => self.host_ports(),
        };

        let mut found: Vec<DiscoveredLamp> = ports
            .iter()
            .filter_map(|port| self.probe_port(port))
            .collect();

        if let Some(path) = self.locator.locate(&self.drive_label) {
            info!("Lamp in update mode at {}", path.display());
            found.push(DiscoveredLamp {
                address: LampAddress::Drive(path),
                lamp: Lamp::unflashed(),
            });
        }

        info!("Discovered {} lamp(s)", found.len());
        found
    }

    fn host_ports(&self) -> Vec<String> {
        match self.enumerator.list_ports() {
            Ok(ports) => ports
                .into_iter()
                .map(|p| p.name)
                .collect(),
            Err(e) => {
                warn!("Failed to enumerate serial ports: {e}");
                Vec::new()
            },
        }
    }

    fn probe_port(&self, port: &str) -> Option<DiscoveredLamp> {
        match probe(self.opener, &self.serial, port) {
            Ok(ProbeOutcome::Lamp(lamp)) => {
                info!(
                    "Lamp on {port}: type {}",
                    lamp.lamp_type
                        .as_ref()
                        .map_or("?", |t| t.as_str())
                );
                Some(DiscoveredLamp {
                    address: LampAddress::Serial(port.to_string()),
                    lamp,
                })
            },
            Ok(ProbeOutcome::NotALamp) => {
                debug!("{port}: no lamp");
                None
            },
            Err(e) => {
                warn!("{port}: probe failed: {e}");
                None
            },
        }
    }
}
