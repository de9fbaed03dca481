//! Newline-framed reads and writes.

use std::io::{ErrorKind, Read};

use log::trace;

use crate::error::Result;
use crate::port::Port;

/// Longest line accepted before it is returned unterminated.
pub const MAX_LINE_LEN: usize = 1024;

/// Send one command line (`command` + `\n`).
pub fn write_line(port: &mut dyn Port, command: &str) -> Result<()> {
    trace!("{} <- {command:?}", port.name());
    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(b'\n');
    port.write_all_bytes(&frame)
}

/// Read one line.
///
/// Returns `Ok(None)` when the port timed out before any byte arrived. A
/// timeout in the middle of a line returns what was received so far. The
/// text is decoded lossily and trimmed.
pub fn read_line(port: &mut dyn Port) -> Result<Option<String>> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                raw.push(byte[0]);
                if raw.len() >= MAX_LINE_LEN {
                    break;
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                if raw.is_empty() {
                    return Ok(None);
                }
                break;
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => return Err(e.into()),
        }
    }

    let line = String::from_utf8_lossy(&raw)
        .trim()
        .to_string();
    trace!("{} -> {line:?}", port.name());
    Ok(Some(line))
}

/// Read lines until a blank line or a timeout, returning the non-blank ones.
pub fn read_block(port: &mut dyn Port) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Some(line) = read_line(port)? {
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines)
}
