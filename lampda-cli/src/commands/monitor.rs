//! Serial monitor command implementation.
//!
//! Lamp output goes to stdout as it arrives; lines typed on stdin are sent to
//! the lamp when Enter is pressed.

use std::io::{self, BufRead, Write as _};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};
use console::style;
use lampda::{MonitorSession, NativePortOpener, timestamp_lines};
use log::{debug, warn};

use crate::commands::discover_lamps;
use crate::select::select_lamp;
use crate::{Runtime, set_interrupted, was_interrupted};

/// Port to monitor: the one given, or a discovered serial lamp.
fn pick_port(runtime: &Runtime, wanted: Option<&str>) -> Result<String> {
    if let Some(port) = wanted {
        return Ok(port.to_string());
    }
    let lamps = discover_lamps(runtime, None)
        .into_iter()
        .filter(|found| !found.address.is_drive())
        .collect();
    let found = select_lamp(runtime, lamps, None)?;
    Ok(found.address.to_string())
}

/// Forward stdin lines until EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Monitor command implementation.
pub(crate) fn cmd_monitor(
    runtime: &Runtime,
    port: Option<&str>,
    baud: u32,
    timestamps: bool,
) -> Result<()> {
    let port_name = pick_port(runtime, port)?;
    let mut session = MonitorSession::open(&NativePortOpener, &port_name, baud)
        .with_context(|| format!("Failed to open {port_name}"))?;

    if let Err(e) = ctrlc::set_handler(set_interrupted) {
        warn!("Could not install the Ctrl+C handler: {e}");
    }
    runtime.status(style(runtime.messages.monitor_hint(&port_name)).dim());

    let input = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut at_line_start = true;
    let mut stdout = io::stdout();

    while !was_interrupted() {
        let text = session.poll()?;
        if !text.is_empty() {
            let text = if timestamps {
                timestamp_lines(&text, &mut at_line_start)
            } else {
                text
            };
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }

        while stdin_open {
            match input.try_recv() {
                Ok(line) => {
                    debug!("Sending {line:?}");
                    session.send_line(&line)?;
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => stdin_open = false,
            }
        }
    }

    eprintln!();
    session.close()?;
    Ok(())
}
