//! Lamp firmware CLI protocol.
//!
//! The lamp exposes a line-oriented text console on its USB serial port.
//! - `line`: newline framing on top of a [`Port`](crate::port::Port)
//! - `command`: commands and reply parsing

pub mod command;
pub mod line;
