//! Serial terminal on a lamp's firmware CLI.

use std::io::{ErrorKind, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;

use crate::error::Result;
use crate::port::{Port, PortOpener, SerialConfig};
use crate::protocol::line::write_line;

/// Read timeout while monitoring; bounds the latency of outgoing lines.
pub const MONITOR_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// An open terminal session.
pub struct MonitorSession {
    port: Box<dyn Port>,
    pending: Vec<u8>,
}

impl MonitorSession {
    /// Open `port_name` at `baud_rate`.
    pub fn open(opener: &dyn PortOpener, port_name: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig::new(port_name, baud_rate).with_timeout(MONITOR_POLL_TIMEOUT);
        let port = opener.open(&config)?;
        debug!("Monitoring {port_name} at {baud_rate} baud");
        Ok(Self::from_port(port))
    }

    /// Monitor an already open port.
    pub fn from_port(port: Box<dyn Port>) -> Self {
        Self {
            port,
            pending: Vec::new(),
        }
    }

    /// Send one command line.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        write_line(self.port.as_mut(), line.trim_end_matches(['\r', '\n']))
    }

    /// Wait up to the poll timeout for output and return it as display text.
    ///
    /// Returns an empty string when the lamp stayed silent. A multi-byte
    /// character split across reads is held back until it is complete.
    pub fn poll(&mut self) -> Result<String> {
        let mut buf = [0u8; 256];
        match self.port.read(&mut buf) {
            Ok(n) => self.pending.extend_from_slice(&buf[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {},
            Err(e) => return Err(e.into()),
        }
        Ok(clean_monitor_text(&drain_utf8_lossy(&mut self.pending)))
    }

    /// Release the port.
    pub fn close(mut self) -> Result<()> {
        self.port.close()
    }
}

/// Take the decodable prefix of `buffer` as text.
///
/// Invalid sequences become `U+FFFD`; an incomplete trailing sequence stays in
/// `buffer`.
pub fn drain_utf8_lossy(buffer: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut consumed = 0;

    while consumed < buffer.len() {
        match std::str::from_utf8(&buffer[consumed..]) {
            Ok(rest) => {
                text.push_str(rest);
                consumed = buffer.len();
            },
            Err(e) => {
                let valid = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&buffer[consumed..consumed + valid]));
                consumed += valid;
                match e.error_len() {
                    Some(bad) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        consumed += bad;
                    },
                    None => break,
                }
            },
        }
    }

    buffer.drain(..consumed);
    text
}

/// Drop control characters except newlines and tabs; `\r\n` and lone `\r`
/// become `\n`.
pub fn clean_monitor_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter_map(|c| match c {
            '\r' => Some('\n'),
            '\n' | '\t' => Some(c),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Prefix each new line of `text` with a UTC `[hh:mm:ss.mmm]` stamp.
///
/// `at_line_start` carries the line state between calls.
pub fn timestamp_lines(text: &str, at_line_start: &mut bool) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let stamp = format_stamp(now);

    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if *at_line_start && c != '\n' {
            out.push_str(&stamp);
            *at_line_start = false;
        }
        out.push(c);
        if c == '\n' {
            *at_line_start = true;
        }
    }
    out
}

fn format_stamp(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    format!(
        "[{:02}:{:02}:{:02}.{:03}] ",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        since_epoch.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::{MockOpener, Script};

    #[test]
    fn test_drain_utf8_lossy_replaces_invalid_bytes() {
        let mut buf = vec![0xFF, b'A', 0xFE, b'B'];
        assert_eq!(drain_utf8_lossy(&mut buf), "\u{FFFD}A\u{FFFD}B");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_drain_utf8_lossy_keeps_incomplete_suffix() {
        let mut buf = "é".as_bytes()[..1].to_vec();
        buf.insert(0, b'x');
        assert_eq!(drain_utf8_lossy(&mut buf), "x");
        assert_eq!(buf.len(), 1);

        buf.push("é".as_bytes()[1]);
        assert_eq!(drain_utf8_lossy(&mut buf), "é");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clean_monitor_text() {
        assert_eq!(clean_monitor_text("A\x07B\x1bC\tD\r\nE\rF"), "ABC\tD\nE\nF");
    }

    #[test]
    fn test_timestamp_lines_tracks_line_state() {
        let mut at_start = true;
        let out = timestamp_lines("ab\ncd", &mut at_start);
        assert_eq!(out.matches('[').count(), 2);
        assert!(out.ends_with("cd"));
        assert!(!at_start);

        let out = timestamp_lines("\n", &mut at_start);
        assert_eq!(out, "\n");
        assert!(at_start);
    }

    #[test]
    fn test_format_stamp() {
        let t = Duration::from_millis(((13 * 3600 + 5 * 60 + 9) * 1000) + 42);
        assert_eq!(format_stamp(t), "[13:05:09.042] ");
    }

    #[test]
    fn test_session_sends_lines_and_reads_replies() {
        let opener = MockOpener::new().with_port("COM3", Script::lamp("simple"));
        let mut session = MonitorSession::open(&opener, "COM3", 115_200).unwrap();

        assert_eq!(session.poll().unwrap(), "");
        session.send_line("t\r\n").unwrap();
        assert_eq!(session.poll().unwrap(), "simple\n");
        session.close().unwrap();

        assert_eq!(opener.written_text("COM3"), "t\n");
        assert_eq!(opener.released(), 1);
    }
}
