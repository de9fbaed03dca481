//! Identify a lamp behind a serial port.
//!
//! The exchange is:
//!
//! ```text
//! host -> h        lamp -> ---Lamp-da CLI--- + help page
//! host -> v        lamp -> 52011> hardware:1.2 / firmware:3.4 / ...
//! host -> t        lamp -> simple
//! ```
//!
//! A failed `v` or `t` query is logged and leaves the matching fields unset;
//! only the identity exchange can fail the probe.

use log::{debug, warn};

use crate::device::{Lamp, LampType};
use crate::error::Result;
use crate::port::{Port, PortOpener, SerialConfig};
use crate::protocol::command::{
    Command, is_lamp_banner, parse_serial_number_line, parse_type_line, parse_version_line,
};
use crate::protocol::line::{read_block, read_line, write_line};

/// Result of probing one serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A lamp answered.
    Lamp(Lamp),
    /// Something else is connected to the port.
    NotALamp,
}

/// Probe `port_name` for a lamp.
///
/// The port is opened with `config` (its `port_name` is replaced) and
/// released before returning, on every path.
pub fn probe(opener: &dyn PortOpener, config: &SerialConfig, port_name: &str) -> Result<ProbeOutcome> {
    debug!("Probing {port_name}");
    let mut port = opener.open(&config.for_port(port_name))?;
    let outcome = probe_port(port.as_mut())?;
    port.close()?;
    Ok(outcome)
}

/// Run the probe exchange on an already open port.
pub fn probe_port(port: &mut dyn Port) -> Result<ProbeOutcome> {
    write_line(port, Command::Help.as_str())?;
    let banner = read_line(port)?.unwrap_or_default();

    if !is_lamp_banner(&banner) {
        debug!("{}: not a lamp ({banner:?})", port.name());
        return Ok(ProbeOutcome::NotALamp);
    }

    // The rest of the help page would otherwise be read as the version reply.
    let mut skipped = 0usize;
    while read_line(port)?.is_some() {
        skipped += 1;
    }
    debug!("{}: lamp found, skipped {skipped} help lines", port.name());

    let mut lamp = Lamp::default();
    if let Err(e) = query_versions(port, &mut lamp) {
        warn!("{}: version query failed: {e}", port.name());
    }
    match query_type(port) {
        Ok(lamp_type) => lamp.lamp_type = lamp_type,
        Err(e) => warn!("{}: type query failed: {e}", port.name()),
    }

    Ok(ProbeOutcome::Lamp(lamp))
}

/// Fill `lamp` from the version reply, stopping at the first bad line.
fn query_versions(port: &mut dyn Port, lamp: &mut Lamp) -> Result<()> {
    write_line(port, Command::Version.as_str())?;
    for line in read_block(port)? {
        if let Some((field, version)) = parse_version_line(&line)? {
            debug!("{}: {} = {version}", port.name(), field.prefix());
            lamp.set_version(field, version);
        }
    }
    Ok(())
}

fn query_type(port: &mut dyn Port) -> Result<Option<LampType>> {
    write_line(port, Command::Type.as_str())?;
    let line = read_line(port)?.unwrap_or_default();
    Ok(parse_type_line(&line).map(LampType::from_token))
}

/// Ask a lamp for its board serial number.
pub fn query_serial_number(port: &mut dyn Port) -> Result<String> {
    write_line(port, Command::SerialNumber.as_str())?;
    let line = read_line(port)?.unwrap_or_default();
    parse_serial_number_line(&line)
}
