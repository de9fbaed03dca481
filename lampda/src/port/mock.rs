//! Scripted in-memory ports for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port::{Port, PortEnumerator, PortInfo, PortOpener, SerialConfig};

/// Canned replies of one simulated lamp, keyed by command (without newline).
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    replies: HashMap<String, Vec<u8>>,
    fail_writes: bool,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, command: &str, response: &str) -> Self {
        self.replies
            .insert(command.to_string(), response.as_bytes().to_vec());
        self
    }

    pub(crate) fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// A lamp answering the way the firmware CLI does, `<millis>> ` prefix
    /// included on the first line of each reply.
    pub(crate) fn lamp(lamp_type: &str) -> Self {
        Self::new()
            .reply(
                "h",
                "1200> ---Lamp-da CLI---\nh: this page\nv: hardware & software version\nt: return the lamp type\n-----------------\n",
            )
            .reply(
                "v",
                "52011> hardware:1.2\nfirmware:3.4\nbase software:5.6\nuser software:7.8\n",
            )
            .reply("t", &format!("52012> {lamp_type}\n"))
            .reply("id", "52013> Serial number: 123456\n")
    }
}

/// Observations shared between a test and the ports it handed out.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub(crate) opened: Vec<String>,
    pub(crate) released: usize,
    pub(crate) written: HashMap<String, Vec<u8>>,
}

impl Journal {
    pub(crate) fn written_text(&self, port: &str) -> String {
        self.written
            .get(port)
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .unwrap_or_default()
    }
}

pub(crate) struct MockPort {
    name: String,
    script: Script,
    read_buf: VecDeque<u8>,
    pending: Vec<u8>,
    timeout: Duration,
    closed: bool,
    journal: Arc<Mutex<Journal>>,
}

impl MockPort {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.journal
                .lock()
                .unwrap()
                .released += 1;
        }
    }
}

impl io::Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.read_buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.read_buf.len());
        for b in buf.iter_mut().take(n) {
            *b = self.read_buf.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl io::Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.script.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
        }
        self.journal
            .lock()
            .unwrap()
            .written
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(buf);

        for &b in buf {
            if b == b'\n' {
                let command = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                if let Some(reply) = self.script.replies.get(&command) {
                    self.read_buf.extend(reply.iter().copied());
                }
            } else {
                self.pending.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.read_buf.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens [`MockPort`]s for the scripted port names, fails for the rest.
#[derive(Default)]
pub(crate) struct MockOpener {
    scripts: HashMap<String, Script>,
    pub(crate) journal: Arc<Mutex<Journal>>,
}

impl MockOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_port(mut self, name: &str, script: Script) -> Self {
        self.scripts
            .insert(name.to_string(), script);
        self
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap()
            .opened
            .clone()
    }

    pub(crate) fn released(&self) -> usize {
        self.journal
            .lock()
            .unwrap()
            .released
    }

    pub(crate) fn written_text(&self, port: &str) -> String {
        self.journal
            .lock()
            .unwrap()
            .written_text(port)
    }
}

impl PortOpener for MockOpener {
    fn open(&self, config: &SerialConfig) -> Result<Box<dyn Port>> {
        self.journal
            .lock()
            .unwrap()
            .opened
            .push(config.port_name.clone());

        let script = self
            .scripts
            .get(&config.port_name)
            .cloned()
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such port: {}", config.port_name),
                ))
            })?;

        Ok(Box::new(MockPort {
            name: config.port_name.clone(),
            script,
            read_buf: VecDeque::new(),
            pending: Vec::new(),
            timeout: config.timeout,
            closed: false,
            journal: Arc::clone(&self.journal),
        }))
    }
}

/// Enumerator returning a fixed port list.
pub(crate) struct MockEnumerator(pub(crate) Vec<String>);

impl PortEnumerator for MockEnumerator {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(self
            .0
            .iter()
            .map(PortInfo::named)
            .collect())
    }
}
