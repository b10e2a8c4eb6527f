use crate::error::InvalidFirmwareVersion;

/// A firmware version as reported by the board, like `02.06`.
///
/// Versions are compared as tuples of numbers, so `2.06` and `02.6` are equal,
/// and missing trailing components count as zero.
#[derive(Debug, Clone)]
pub struct FirmwareVersion {
	text: String,
	components: Vec<u32>,
}

impl FirmwareVersion {
	/// Parse a dot-separated list of decimal numbers.
	pub fn parse(text: &str) -> Result<Self, InvalidFirmwareVersion> {
		let invalid = || InvalidFirmwareVersion { version: text.into() };
		let text = text.trim();
		if text.is_empty() {
			return Err(invalid());
		}
		let components = text
			.split('.')
			.map(|component| component.parse::<u32>().map_err(|_| invalid()))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			text: text.into(),
			components,
		})
	}

	/// A version known at compile time, for built-in minimum versions.
	pub(crate) fn known(text: &str, components: &[u32]) -> Self {
		Self {
			text: text.into(),
			components: components.into(),
		}
	}

	/// The version as it was reported.
	pub fn as_str(&self) -> &str {
		&self.text
	}

	/// The numeric components of the version.
	pub fn components(&self) -> &[u32] {
		&self.components
	}

	fn component(&self, index: usize) -> u32 {
		self.components.get(index).copied().unwrap_or(0)
	}
}

impl std::str::FromStr for FirmwareVersion {
	type Err = InvalidFirmwareVersion;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		Self::parse(text)
	}
}

impl Ord for FirmwareVersion {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		let len = self.components.len().max(other.components.len());
		(0..len)
			.map(|i| self.component(i).cmp(&other.component(i)))
			.find(|ordering| ordering.is_ne())
			.unwrap_or(std::cmp::Ordering::Equal)
	}
}

impl PartialOrd for FirmwareVersion {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for FirmwareVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other).is_eq()
	}
}

impl Eq for FirmwareVersion {}

impl std::fmt::Display for FirmwareVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(&self.text)
	}
}
