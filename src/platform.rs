//! The hosting machine framework, as seen by a connection.

use crate::connection::CommandSender;
use crate::identity::{Identity, Processor};

/// Callbacks into the machine that owns the connections.
///
/// All methods have empty default implementations,
/// so an implementation only needs to override what it cares about.
pub trait Platform {
	/// Publish a machine-wide variable.
	fn set_machine_var(&mut self, name: &str, value: &str) {
		let _ = (name, value);
	}

	/// Make a new connection available for sending commands to a processor.
	fn register_processor_connection(&mut self, processor: &Processor, sender: CommandSender) {
		let _ = (processor, sender);
	}
}

/// A platform that ignores everything.
impl Platform for () {}

/// Publish the firmware version and board model of an identified processor.
///
/// The variables are named `fast_<processor>_firmware` and `fast_<processor>_model`.
pub fn publish_identity<P: Platform + ?Sized>(platform: &mut P, identity: &Identity) {
	let processor = identity.processor.lower();
	platform.set_machine_var(&format!("fast_{}_firmware", processor), identity.firmware.as_str());
	platform.set_machine_var(&format!("fast_{}_model", processor), &identity.model);
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::firmware::FirmwareVersion;
	use assert2::{assert, let_assert};
	use std::collections::BTreeMap;

	#[derive(Default)]
	struct Variables(BTreeMap<String, String>);

	impl Platform for Variables {
		fn set_machine_var(&mut self, name: &str, value: &str) {
			self.0.insert(name.into(), value.into());
		}
	}

	#[test]
	fn test_publish_identity() {
		let_assert!(Ok(firmware) = FirmwareVersion::parse("02.06"));
		let identity = Identity {
			processor: Processor::Net,
			model: "FP-CPU-2000".into(),
			firmware,
		};
		let mut variables = Variables::default();
		publish_identity(&mut variables, &identity);
		assert!(variables.0.len() == 2);
		assert!(variables.0["fast_net_firmware"] == "02.06");
		assert!(variables.0["fast_net_model"] == "FP-CPU-2000");
	}
}
