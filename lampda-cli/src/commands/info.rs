//! Lamp information command implementation.

use anyhow::{Context, Result};
use console::style;
use lampda::{Lamp, NativePortOpener, PortOpener, ProbeOutcome, probe, query_serial_number};
use log::warn;

use crate::{CliError, Runtime};

/// Read the board serial number on a fresh connection.
fn read_serial_number(runtime: &Runtime, port_name: &str) -> Result<String> {
    let config = runtime.config.serial_config().for_port(port_name);
    let mut port = NativePortOpener
        .open(&config)
        .with_context(|| format!("Failed to open {port_name}"))?;
    let serial = query_serial_number(port.as_mut())?;
    port.close()?;
    Ok(serial)
}

fn print_lamp(runtime: &Runtime, port_name: &str, lamp: &Lamp, serial_number: Option<&str>) {
    let rows = [
        ("Type", runtime.messages.lamp_type(lamp.lamp_type.as_ref())),
        ("Hardware", lamp.hardware_version.clone().unwrap_or_default()),
        ("Firmware", lamp.firmware_version.clone().unwrap_or_default()),
        ("Base software", lamp.base_software_version.clone().unwrap_or_default()),
        ("User software", lamp.user_software_version.clone().unwrap_or_default()),
        ("Serial number", serial_number.unwrap_or_default().to_string()),
    ];

    eprintln!("{}", style(format!("Lamp-da on {port_name}")).bold().underlined());
    for (label, value) in rows {
        let value = if value.is_empty() { "-".to_string() } else { value };
        eprintln!("  {:<14} {}", style(label).dim(), value);
    }
}

/// Info command implementation.
pub(crate) fn cmd_info(runtime: &Runtime, port_name: &str, json: bool) -> Result<()> {
    let config = runtime.config.serial_config();
    let outcome = runtime
        .with_spinner(runtime.messages.searching(), || probe(&NativePortOpener, &config, port_name))
        .with_context(|| format!("Failed to probe {port_name}"))?;

    let lamp = match outcome {
        ProbeOutcome::Lamp(lamp) => lamp,
        ProbeOutcome::NotALamp => {
            return Err(CliError::Usage(runtime.messages.not_a_lamp(port_name)).into());
        },
    };

    let serial_number = match read_serial_number(runtime, port_name) {
        Ok(serial) => Some(serial),
        Err(e) => {
            warn!("Could not read the serial number: {e:#}");
            None
        },
    };

    if json {
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "port": port_name,
                "lamp": lamp,
                "serial_number": serial_number,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_lamp(runtime, port_name, &lamp, serial_number.as_deref());
    Ok(())
}
