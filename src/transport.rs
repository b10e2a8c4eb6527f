//! [`Transport`] trait to support different byte stream implementations.

use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(feature = "serial")]
pub mod serial;

/// A duplex byte stream connected to one processor of a FAST controller.
///
/// The implementor must configure a serial line for 8 bit characters, 1 stop bit, no parity and no flow control.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
	/// Discard any data received but not yet read. Maybe a no-op on some platforms.
	fn discard_input_buffer(&mut self) -> std::io::Result<()>;
}
