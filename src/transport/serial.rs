//! Transport implementation using the `tokio-serial` crate.

use tokio_serial::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, StopBits};

/// Re-exported `tokio-serial` crate in case you need to modify serial port settings.
pub use tokio_serial;

/// Open a serial port for use as a [`Transport`](crate::Transport).
pub fn open(path: &str, baud_rate: u32) -> std::io::Result<tokio_serial::SerialStream> {
	let port = tokio_serial::new(path, baud_rate)
		.data_bits(DataBits::Eight)
		.parity(Parity::None)
		.stop_bits(StopBits::One)
		.flow_control(FlowControl::None)
		.open_native_async()?;
	Ok(port)
}

impl crate::Transport for tokio_serial::SerialStream {
	fn discard_input_buffer(&mut self) -> std::io::Result<()> {
		self.clear(ClearBuffer::Input)?;
		Ok(())
	}
}
