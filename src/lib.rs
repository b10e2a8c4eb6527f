//! Serial protocol core for [FAST pinball](https://fastpinball.com) controllers.
//!
//! A FAST controller exposes one serial port per processor.
//! Every processor speaks a line based ASCII protocol where each command is terminated by a carriage return.
//! Replies arrive asynchronously and may be interleaved with unsolicited messages, such as switch events.
//!
//! This crate implements:
//!  * the handshake that identifies the processor behind a port and checks its firmware version,
//!  * a flow controlled command queue that writes commands in order,
//!  * a dispatcher that forwards received messages to a [`MessageRouter`],
//!  * a [`Driver`] command encoder that avoids redundant reconfiguration of coils.
//!
//! Use [`Connection::open()`] to connect to a serial port,
//! or [`Connection::establish()`] to run the protocol over any other [`Transport`].
//!
//! # Optional features
//!
//! * `serial`: open serial ports with the `tokio-serial` crate (enabled by default).
//! * `log`: emit log messages using the `log` crate.

#[macro_use]
mod log;

pub mod connection;
pub mod dispatch;
pub mod driver;
pub mod firmware;
pub mod flow_control;
pub mod framing;
pub mod handshake;
pub mod identity;
pub mod platform;
pub mod transport;

mod error;

pub use connection::{CommandSender, Connection, ConnectionConfig};
pub use dispatch::{MessageRouter, ReceivedMessage};
pub use driver::{CommandPrefixes, CommandSink, Driver, DriverSettings, Drivers, HoldSettings, PulseSettings};
pub use error::*;
pub use firmware::FirmwareVersion;
pub use identity::{Identity, Processor};
pub use platform::Platform;
pub use transport::Transport;

#[cfg(feature = "serial")]
pub use transport::serial::tokio_serial;
