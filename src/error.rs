use crate::firmware::FirmwareVersion;
use crate::identity::Processor;

/// An error that prevents a connection from being established.
#[derive(Debug)]
pub enum ConnectError {
	/// The serial port could not be opened or used during the handshake.
	Transport(TransportError),

	/// The identity reply of the board could not be understood.
	Protocol(ProtocolError),

	/// The board runs firmware that is older than the supported minimum.
	FirmwareTooOld(FirmwareTooOld),
}

/// The reason a running connection stopped.
#[derive(Debug)]
pub enum LinkClosed {
	/// The remote end closed the serial port (a read returned no data).
	Eof,

	/// Reading from the serial port failed.
	Read(std::io::Error),

	/// Writing to the serial port failed.
	Write(std::io::Error),

	/// The connection was shut down locally.
	Shutdown,

	/// A background task of the connection panicked.
	TaskFailed(String),
}

/// An error from the underlying serial port.
#[derive(Debug)]
pub enum TransportError {
	Open(std::io::Error),
	DiscardBuffer(std::io::Error),
	Read(std::io::Error),
	Write(std::io::Error),
	Closed,
}

/// A message from the board could not be parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ProtocolError {
	InvalidIdentity(InvalidIdentity),
	InvalidFirmwareVersion(InvalidFirmwareVersion),
}

/// The identity reply does not match `ID:<processor> <model> <firmware>` or `ID:<model> <firmware>`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidIdentity {
	pub reply: String,
}

/// A firmware version string is not a list of dot-separated numbers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidFirmwareVersion {
	pub version: String,
}

/// The firmware of a processor is older than the minimum supported version.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FirmwareTooOld {
	pub processor: Processor,
	pub required: FirmwareVersion,
	pub actual: FirmwareVersion,
}

/// A value does not fit in the field of a board command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValueOutOfRange {
	pub name: &'static str,
	pub value: u32,
	pub max: u32,
}

impl FirmwareTooOld {
	pub fn check(processor: &Processor, actual: &FirmwareVersion, required: &FirmwareVersion) -> Result<(), Self> {
		if actual >= required {
			Ok(())
		} else {
			Err(Self {
				processor: processor.clone(),
				required: required.clone(),
				actual: actual.clone(),
			})
		}
	}
}

impl ValueOutOfRange {
	pub fn check(name: &'static str, value: u32, max: u32) -> Result<(), Self> {
		if value <= max {
			Ok(())
		} else {
			Err(Self { name, value, max })
		}
	}
}

impl std::error::Error for ConnectError {}
impl std::error::Error for LinkClosed {}
impl std::error::Error for TransportError {}
impl std::error::Error for ProtocolError {}
impl std::error::Error for InvalidIdentity {}
impl std::error::Error for InvalidFirmwareVersion {}
impl std::error::Error for FirmwareTooOld {}
impl std::error::Error for ValueOutOfRange {}

impl From<TransportError> for ConnectError {
	fn from(other: TransportError) -> Self {
		Self::Transport(other)
	}
}

impl From<ProtocolError> for ConnectError {
	fn from(other: ProtocolError) -> Self {
		Self::Protocol(other)
	}
}

impl From<FirmwareTooOld> for ConnectError {
	fn from(other: FirmwareTooOld) -> Self {
		Self::FirmwareTooOld(other)
	}
}

impl From<InvalidIdentity> for ConnectError {
	fn from(other: InvalidIdentity) -> Self {
		Self::Protocol(other.into())
	}
}

impl From<InvalidFirmwareVersion> for ConnectError {
	fn from(other: InvalidFirmwareVersion) -> Self {
		Self::Protocol(other.into())
	}
}

impl From<InvalidIdentity> for ProtocolError {
	fn from(other: InvalidIdentity) -> Self {
		Self::InvalidIdentity(other)
	}
}

impl From<InvalidFirmwareVersion> for ProtocolError {
	fn from(other: InvalidFirmwareVersion) -> Self {
		Self::InvalidFirmwareVersion(other)
	}
}

impl std::fmt::Display for ConnectError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Transport(e) => write!(f, "{}", e),
			Self::Protocol(e) => write!(f, "{}", e),
			Self::FirmwareTooOld(e) => write!(f, "{}", e),
		}
	}
}

impl std::fmt::Display for LinkClosed {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Eof => write!(f, "serial port closed by remote end"),
			Self::Read(e) => write!(f, "failed to read from serial port: {}", e),
			Self::Write(e) => write!(f, "failed to write to serial port: {}", e),
			Self::Shutdown => write!(f, "connection shut down"),
			Self::TaskFailed(e) => write!(f, "connection task failed: {}", e),
		}
	}
}

impl std::fmt::Display for TransportError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Open(e) => write!(f, "failed to open serial port: {}", e),
			Self::DiscardBuffer(e) => write!(f, "failed to discard input buffer: {}", e),
			Self::Read(e) => write!(f, "failed to read from serial port: {}", e),
			Self::Write(e) => write!(f, "failed to write to serial port: {}", e),
			Self::Closed => write!(f, "serial port closed during handshake"),
		}
	}
}

impl std::fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::InvalidIdentity(e) => write!(f, "{}", e),
			Self::InvalidFirmwareVersion(e) => write!(f, "{}", e),
		}
	}
}

impl std::fmt::Display for InvalidIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "invalid identity reply: {:?}", self.reply)
	}
}

impl std::fmt::Display for InvalidFirmwareVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "invalid firmware version: {:?}", self.version)
	}
}

impl std::fmt::Display for FirmwareTooOld {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"firmware version mismatch: the {} processor requires firmware {}, but the board reports {}",
			self.processor, self.required, self.actual
		)
	}
}

impl std::fmt::Display for ValueOutOfRange {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{} out of range, expected at most {}, got {}", self.name, self.max, self.value)
	}
}
