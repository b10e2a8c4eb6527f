#[cfg(feature = "log")]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { ::log::trace!($($args)*) }
	}

	macro_rules! debug {
		($($args:tt)*) => { ::log::debug!($($args)*) }
	}

	macro_rules! info {
		($($args:tt)*) => { ::log::info!($($args)*) }
	}

	macro_rules! warn {
		($($args:tt)*) => { ::log::warn!($($args)*) }
	}

	macro_rules! error {
		($($args:tt)*) => { ::log::error!($($args)*) }
	}
}

// The arguments are still type checked, so disabling logging can not hide a broken format string.
#[cfg(not(feature = "log"))]
#[allow(unused)]
#[macro_use]
mod log {
	macro_rules! trace {
		($($args:tt)*) => { if false { let _ = ::core::format_args!($($args)*); } }
	}

	macro_rules! debug {
		($($args:tt)*) => { if false { let _ = ::core::format_args!($($args)*); } }
	}

	macro_rules! info {
		($($args:tt)*) => { if false { let _ = ::core::format_args!($($args)*); } }
	}

	macro_rules! warn {
		($($args:tt)*) => { if false { let _ = ::core::format_args!($($args)*); } }
	}

	macro_rules! error {
		($($args:tt)*) => { if false { let _ = ::core::format_args!($($args)*); } }
	}
}

/// Formats raw serial data as ` 0x0d 0x0a` for byte dumps.
pub(crate) struct HexBytes<'a>(pub &'a [u8]);

impl std::fmt::Display for HexBytes<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for byte in self.0 {
			write!(f, " 0x{:02x}", byte)?;
		}
		Ok(())
	}
}
