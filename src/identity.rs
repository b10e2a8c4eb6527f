use crate::error::{InvalidIdentity, ProtocolError};
use crate::firmware::FirmwareVersion;

/// The kind of processor on the other end of a serial port.
///
/// A FAST controller exposes one serial port per processor.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Processor {
	/// The network processor that drives coils and reads switches.
	Net,

	/// The audio processor.
	Aud,

	/// The DMD processor.
	Dmd,

	/// The expansion processor.
	Exp,

	/// A processor this crate has no special knowledge of, in upper case.
	Other(String),
}

impl Processor {
	/// Interpret a processor name from an identity reply.
	pub fn from_name(name: &str) -> Self {
		match name.to_ascii_uppercase().as_str() {
			"NET" => Self::Net,
			"AUD" => Self::Aud,
			"DMD" => Self::Dmd,
			"EXP" => Self::Exp,
			other => Self::Other(other.into()),
		}
	}

	/// The upper case name used on the wire.
	pub fn name(&self) -> &str {
		match self {
			Self::Net => "NET",
			Self::Aud => "AUD",
			Self::Dmd => "DMD",
			Self::Exp => "EXP",
			Self::Other(name) => name,
		}
	}

	/// The lower case name used in machine variable names.
	pub fn lower(&self) -> String {
		self.name().to_ascii_lowercase()
	}

	/// The oldest firmware this crate can talk to.
	pub fn minimum_firmware(&self) -> FirmwareVersion {
		match self {
			Self::Net => FirmwareVersion::known("2.06", &[2, 6]),
			Self::Aud => FirmwareVersion::known("0.10", &[0, 10]),
			Self::Dmd => FirmwareVersion::known("0.88", &[0, 88]),
			Self::Exp | Self::Other(_) => FirmwareVersion::known("0.00", &[0, 0]),
		}
	}
}

impl std::fmt::Display for Processor {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// The identity a board reports in reply to `ID:`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Identity {
	pub processor: Processor,
	pub model: String,
	pub firmware: FirmwareVersion,
}

impl Identity {
	/// Parse an identity reply, including the `ID:` prefix.
	///
	/// The reply is either `ID:<processor> <model> <firmware>`,
	/// or `ID:<model> <firmware>` for boards that do not report a processor.
	/// The processor defaults to [`Processor::Net`] for the second form.
	pub fn parse(reply: &str) -> Result<Self, ProtocolError> {
		let invalid = || InvalidIdentity { reply: reply.into() };
		let body = reply.trim_end_matches('\r').strip_prefix("ID:").ok_or_else(invalid)?;
		let fields: Vec<&str> = body.split_whitespace().collect();

		let (processor, model, firmware) = match fields[..] {
			[processor, model, firmware] => (Processor::from_name(processor), model, firmware),
			[model, firmware] => (Processor::Net, model, firmware),
			_ => return Err(invalid().into()),
		};

		let firmware = FirmwareVersion::parse(firmware)?;

		Ok(Self {
			processor,
			model: model.into(),
			firmware,
		})
	}
}
