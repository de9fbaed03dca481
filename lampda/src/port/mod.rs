//! Port abstraction for serial communication with lamps.
//!
//! The protocol and orchestration layers never touch the `serialport` crate
//! directly. They go through three small traits:
//!
//! - [`Port`]: an open, byte-oriented connection to one lamp
//! - [`PortOpener`]: opens a [`Port`] from a [`SerialConfig`]
//! - [`PortEnumerator`]: lists the serial ports present on the host
//!
//! ```text
//! +------------------+     +------------------+
//! |  device::probe   |     |  flash::Flasher  |
//! +--------+---------+     +--------+---------+
//!          |                        |
//!          v                        v
//! +--------+------------------------+---------+
//! |        PortOpener  ->  Box<dyn Port>      |
//! +--------+----------------------------------+
//!          |
//!          v
//! +--------+---------+
//! | NativePort       |
//! |   (serialport)   |
//! +------------------+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use lampda::port::{NativePortOpener, PortOpener, SerialConfig};
//!
//! fn example() -> lampda::Result<()> {
//!     let mut port = NativePortOpener.open(&SerialConfig::probe("/dev/ttyACM0"))?;
//!     port.write_all_bytes(b"h\n")?;
//!     port.close()
//! }
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Baud rate spoken by the lamp firmware CLI.
pub const LAMP_BAUD_RATE: u32 = 115_200;

/// Read timeout used while probing and resetting lamps.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial port configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyACM0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: LAMP_BAUD_RATE,
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Configuration used to talk to a lamp: 115200 baud, short timeout.
    pub fn probe(port_name: impl Into<String>) -> Self {
        Self::new(port_name, LAMP_BAUD_RATE)
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same settings, different port.
    #[must_use]
    pub fn for_port(&self, port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..self.clone()
        }
    }
}

/// Serial port information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Product string (if available).
    pub product: Option<String>,
}

impl PortInfo {
    /// Port info carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vid: None,
            pid: None,
            product: None,
        }
    }
}

/// An open connection to a lamp.
pub trait Port: Read + Write + Send {
    /// Set the read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Get the current timeout.
    fn timeout(&self) -> Duration;

    /// Clear input/output buffers.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Close the port and release resources.
    ///
    /// After calling this method, the port cannot be used for further I/O.
    fn close(&mut self) -> Result<()>;

    /// Write all bytes, blocking until complete.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)?;
        Ok(())
    }
}

/// Opens ports by name.
pub trait PortOpener: Send + Sync {
    /// Open the port described by `config`.
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn Port>>;
}

/// Lists the serial ports available on the host.
pub trait PortEnumerator: Send + Sync {
    /// List all available serial ports.
    fn list_ports(&self) -> Result<Vec<PortInfo>>;
}

#[cfg(feature = "native")]
pub use native::{NativePort, NativePortEnumerator, NativePortOpener};

#[cfg(test)]
pub(crate) mod mock;
