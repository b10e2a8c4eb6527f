//! Command encoding for coils and other driver outputs.
//!
//! The board keeps a configuration per driver output.
//! A [`Driver`] remembers what it last wrote, so that repeated pulses with the same settings
//! only need a short trigger command instead of a full reconfiguration.
//!
//! A driver can also have an autofire rule: a configuration that the board fires on its own,
//! for example when a switch closes.
//! Any one-off operation with different settings overwrites that rule on the board,
//! so the driver rewrites the rule afterwards.

use std::collections::BTreeMap;

use crate::error::ValueOutOfRange;

pub mod pwm;

/// Destination for encoded driver commands.
pub trait CommandSink {
	/// Queue a command that the board answers with a reply starting with `expected_response`.
	fn send_with_confirmation(&mut self, command: String, expected_response: &str);

	/// Queue a command without caring about the reply.
	fn send_and_forget(&mut self, command: String);
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
	fn send_with_confirmation(&mut self, command: String, expected_response: &str) {
		(**self).send_with_confirmation(command, expected_response)
	}

	fn send_and_forget(&mut self, command: String) {
		(**self).send_and_forget(command)
	}
}

/// The command names for configuring and triggering drivers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandPrefixes {
	/// Writes a driver configuration.
	pub driver: &'static str,

	/// Triggers a driver with its current configuration.
	pub trigger: &'static str,
}

impl CommandPrefixes {
	/// Drivers on the local board.
	pub const LOCAL: Self = Self {
		driver: "DL",
		trigger: "TL",
	};

	/// Drivers on boards connected through the I/O network.
	pub const NETWORK: Self = Self {
		driver: "DN",
		trigger: "TN",
	};
}

impl Default for CommandPrefixes {
	fn default() -> Self {
		Self::LOCAL
	}
}

/// Encode the control byte of a switch-triggered rule.
///
/// The driver is always enabled, and either switch can be inverted.
pub fn control_for_cmd(switch1_inverted: bool, switch2_inverted: bool) -> String {
	let mut control = 0x01u8;
	if switch1_inverted {
		control += 0x10;
	}
	if switch2_inverted {
		control += 0x20;
	}
	format!("{:02X}", control)
}

/// Per-output settings that change how commands are encoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverSettings {
	/// Enforce a recycle time after the driver fired.
	pub recycle: bool,

	/// The recycle time in milliseconds, instead of twice the pulse time.
	pub recycle_ms: Option<u8>,

	/// A raw hold PWM pattern, instead of the one computed from the hold power.
	pub hold_pwm_pattern: Option<String>,
}

/// The initial pulse of a driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSettings {
	/// The pulse duration in milliseconds.
	pub duration_ms: u32,

	/// The pulse power between 0.0 and 1.0.
	pub power: f64,
}

/// The hold phase after the initial pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldSettings {
	/// The hold duration in milliseconds, for timed enables.
	pub duration_ms: u32,

	/// The hold power between 0.0 and 1.0.
	pub power: f64,
}

/// The configuration a driver believes is loaded on the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfigState {
	pub pulse_ms: u32,
	pub pulse_power: f64,
	pub hold_power: f64,
}

impl DriverConfigState {
	fn same_pulse(&self, other: &Self) -> bool {
		self.pulse_ms == other.pulse_ms && self.pulse_power == other.pulse_power
	}
}

/// A board-resident rule that fires the driver automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct Autofire {
	/// The full configuration command for the rule.
	pub command: String,

	/// The configuration the rule loads.
	pub state: DriverConfigState,

	/// The rule was overwritten by a one-off operation and must be rewritten.
	pub suspended: bool,
}

/// A single driver output.
#[derive(Debug, Clone)]
pub struct Driver {
	number: u8,
	prefixes: CommandPrefixes,
	settings: DriverSettings,
	config_state: Option<DriverConfigState>,
	autofire: Option<Autofire>,
}

impl Driver {
	pub fn new(number: u8, prefixes: CommandPrefixes, settings: DriverSettings) -> Self {
		Self {
			number,
			prefixes,
			settings,
			config_state: None,
			autofire: None,
		}
	}

	pub fn number(&self) -> u8 {
		self.number
	}

	pub fn settings(&self) -> &DriverSettings {
		&self.settings
	}

	/// The configuration believed to be loaded on the board, if known.
	pub fn config_state(&self) -> Option<&DriverConfigState> {
		self.config_state.as_ref()
	}

	pub fn autofire(&self) -> Option<&Autofire> {
		self.autofire.as_ref()
	}

	/// Encode a power level for the pulse phase.
	pub fn pwm_for_cmd(&self, power: f64) -> String {
		pwm::pwm_pattern(power)
	}

	/// Encode a power level for the hold phase, honoring the hold pattern override.
	pub fn hold_pwm_for_cmd(&self, power: f64) -> String {
		match &self.settings.hold_pwm_pattern {
			Some(pattern) => pattern.clone(),
			None => pwm::pwm_pattern(power),
		}
	}

	/// Encode the recycle time for a pulse of `pulse_ms` milliseconds.
	pub fn recycle_for_cmd(&self, pulse_ms: u32) -> String {
		if !self.settings.recycle {
			return "00".into();
		}
		if let Some(recycle_ms) = self.settings.recycle_ms {
			return format!("{:02X}", recycle_ms);
		}
		format!("{:02X}", pulse_ms.saturating_mul(2).min(0xFF))
	}

	/// Reset the driver on the board to an unconfigured state.
	pub fn reset(&mut self, sink: &mut impl CommandSink) {
		let command = format!("{}:{:02X},00,00,00", self.prefixes.driver, self.number);
		debug!("resetting driver {:02X}: {}", self.number, command);
		sink.send_with_confirmation(command, self.prefixes.driver);
		self.config_state = None;
	}

	/// Turn the driver off.
	///
	/// If the driver has an autofire rule, the rule is restored and armed again.
	pub fn disable(&mut self, sink: &mut impl CommandSink) {
		let command = format!("{}:{:02X},02", self.prefixes.trigger, self.number);
		debug!("sending disable command: {}", command);
		sink.send_and_forget(command);

		self.rearm_autofire(sink);

		if self.autofire.is_some() {
			let command = format!("{}:{:02X},00", self.prefixes.trigger, self.number);
			debug!("re-enabling autofire mode: {}", command);
			sink.send_and_forget(command);
		}
	}

	/// Turn the driver on until it is disabled.
	///
	/// If the autofire rule has the requested settings, it is restored if needed and triggered manually.
	/// Otherwise the driver is configured for a latched pulse-then-hold, suspending the autofire rule.
	/// A latched configuration never counts as a loaded pulse, so the next pulse reconfigures the driver.
	pub fn enable(&mut self, sink: &mut impl CommandSink, pulse: PulseSettings, hold: HoldSettings) -> Result<(), ValueOutOfRange> {
		let state = DriverConfigState {
			pulse_ms: pulse.duration_ms,
			pulse_power: pulse.power,
			hold_power: hold.power,
		};

		let autofire_matches = self.autofire.as_ref().map_or(false, |autofire| autofire.state == state);
		let command = if autofire_matches {
			self.rearm_autofire(sink);
			format!("{}:{:02X},03", self.prefixes.trigger, self.number)
		} else {
			ValueOutOfRange::check("pulse duration", pulse.duration_ms, 0xFF)?;
			let command = format!(
				"{}:{:02X},C1,00,18,{:02X},{},{},{}",
				self.prefixes.driver,
				self.number,
				pulse.duration_ms,
				self.pwm_for_cmd(pulse.power),
				self.hold_pwm_for_cmd(hold.power),
				self.recycle_for_cmd(pulse.duration_ms),
			);
			self.suspend_autofire();
			self.config_state = None;
			command
		};

		debug!("sending enable command: {}", command);
		sink.send_and_forget(command);
		Ok(())
	}

	/// Pulse the driver once.
	///
	/// Returns the pulse duration in milliseconds.
	pub fn pulse(&mut self, sink: &mut impl CommandSink, pulse: PulseSettings) -> Result<u32, ValueOutOfRange> {
		self.fire(sink, pulse, None)
	}

	/// Pulse the driver and hold it for a limited time.
	///
	/// Returns the pulse duration in milliseconds.
	pub fn timed_enable(&mut self, sink: &mut impl CommandSink, pulse: PulseSettings, hold: HoldSettings) -> Result<u32, ValueOutOfRange> {
		self.fire(sink, pulse, Some(hold))
	}

	/// Write an autofire rule and remember it.
	///
	/// `command` is the full configuration command for the rule,
	/// the other arguments describe the configuration it loads.
	pub fn set_autofire(&mut self, sink: &mut impl CommandSink, command: String, pulse_ms: u32, pulse_power: f64, hold_power: f64) {
		let state = DriverConfigState {
			pulse_ms,
			pulse_power,
			hold_power,
		};
		debug!("writing hardware rule: {}", command);
		self.autofire = Some(Autofire {
			command: command.clone(),
			state,
			suspended: false,
		});
		self.config_state = Some(state);
		sink.send_with_confirmation(command, self.prefixes.driver);
	}

	/// Remove the autofire rule from the board.
	pub fn clear_autofire(&mut self, sink: &mut impl CommandSink) {
		let command = format!("{}:{:02X},81", self.prefixes.driver, self.number);
		debug!("clearing hardware rule: {}", command);
		sink.send_with_confirmation(command, self.prefixes.driver);
		self.autofire = None;
		self.config_state = None;
	}

	fn fire(&mut self, sink: &mut impl CommandSink, pulse: PulseSettings, hold: Option<HoldSettings>) -> Result<u32, ValueOutOfRange> {
		ValueOutOfRange::check("pulse duration", pulse.duration_ms, 0xFF)?;

		let (hold_ms, hold_pwm, hold_power) = match hold {
			Some(hold) => (format!("{:02X}", hold.duration_ms), self.hold_pwm_for_cmd(hold.power), hold.power),
			None => ("00".into(), "00".into(), 0.0),
		};
		let state = DriverConfigState {
			pulse_ms: pulse.duration_ms,
			pulse_power: pulse.power,
			hold_power,
		};

		let unchanged = self.config_state.as_ref().map_or(false, |current| current.same_pulse(&state));
		if unchanged {
			let command = format!("{}:{:02X},01", self.prefixes.trigger, self.number);
			sink.send_and_forget(command);
		} else {
			// 89: write the configuration and fire it immediately.
			let command = format!(
				"{}:{:02X},89,00,10,{:02X},{},{},{},00",
				self.prefixes.driver,
				self.number,
				pulse.duration_ms,
				self.pwm_for_cmd(pulse.power),
				hold_ms,
				hold_pwm,
			);
			self.config_state = Some(state);
			self.suspend_autofire();
			sink.send_with_confirmation(command, self.prefixes.driver);
		}

		self.rearm_autofire(sink);
		Ok(pulse.duration_ms)
	}

	fn suspend_autofire(&mut self) {
		if let Some(autofire) = &mut self.autofire {
			autofire.suspended = true;
		}
	}

	fn rearm_autofire(&mut self, sink: &mut impl CommandSink) {
		let Some(autofire) = &mut self.autofire else { return };
		if !autofire.suspended {
			return;
		}
		autofire.suspended = false;
		self.config_state = Some(autofire.state);
		debug!("re-enabling autofire mode: {}", autofire.command);
		sink.send_with_confirmation(autofire.command.clone(), self.prefixes.driver);
	}
}

/// All driver outputs of one connection, indexed by number.
#[derive(Debug, Clone, Default)]
pub struct Drivers {
	prefixes: CommandPrefixes,
	drivers: BTreeMap<u8, Driver>,
}

impl Drivers {
	pub fn new(prefixes: CommandPrefixes) -> Self {
		Self {
			prefixes,
			drivers: BTreeMap::new(),
		}
	}

	/// Add a driver output, replacing any previous driver with the same number.
	pub fn add(&mut self, number: u8, settings: DriverSettings) -> &mut Driver {
		self.drivers.remove(&number);
		self.drivers.entry(number).or_insert(Driver::new(number, self.prefixes, settings))
	}

	pub fn get(&self, number: u8) -> Option<&Driver> {
		self.drivers.get(&number)
	}

	pub fn get_mut(&mut self, number: u8) -> Option<&mut Driver> {
		self.drivers.get_mut(&number)
	}

	pub fn len(&self) -> usize {
		self.drivers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.drivers.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Driver> {
		self.drivers.values()
	}

	/// Reset every driver.
	pub fn reset_all(&mut self, sink: &mut impl CommandSink) {
		for driver in self.drivers.values_mut() {
			driver.reset(sink);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::{assert, let_assert};

	#[derive(Debug, Clone, Eq, PartialEq)]
	enum Sent {
		Confirmed(String, String),
		Forgotten(String),
	}

	#[derive(Default)]
	struct Recorder(Vec<Sent>);

	impl Recorder {
		fn commands(&self) -> Vec<&str> {
			self.0
				.iter()
				.map(|sent| match sent {
					Sent::Confirmed(command, _) => command.as_str(),
					Sent::Forgotten(command) => command.as_str(),
				})
				.collect()
		}

		fn clear(&mut self) {
			self.0.clear();
		}
	}

	impl CommandSink for Recorder {
		fn send_with_confirmation(&mut self, command: String, expected_response: &str) {
			self.0.push(Sent::Confirmed(command, expected_response.into()));
		}

		fn send_and_forget(&mut self, command: String) {
			self.0.push(Sent::Forgotten(command));
		}
	}

	fn driver() -> Driver {
		Driver::new(0x04, CommandPrefixes::LOCAL, DriverSettings::default())
	}

	fn pulse(duration_ms: u32, power: f64) -> PulseSettings {
		PulseSettings { duration_ms, power }
	}

	fn hold(duration_ms: u32, power: f64) -> HoldSettings {
		HoldSettings { duration_ms, power }
	}

	#[test]
	fn test_reset() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		driver.reset(&mut sink);
		assert!(sink.0 == [Sent::Confirmed("DL:04,00,00,00".into(), "DL".into())]);
	}

	#[test]
	fn test_network_prefixes() {
		let mut sink = Recorder::default();
		let mut driver = Driver::new(0x2A, CommandPrefixes::NETWORK, DriverSettings::default());
		driver.reset(&mut sink);
		driver.disable(&mut sink);
		assert!(sink.commands() == ["DN:2A,00,00,00", "TN:2A,02"]);
	}

	#[test]
	fn test_repeated_pulse_retriggers() {
		let mut sink = Recorder::default();
		let mut driver = driver();

		let_assert!(Ok(10) = driver.pulse(&mut sink, pulse(10, 1.0)));
		assert!(sink.0 == [Sent::Confirmed("DL:04,89,00,10,0A,FF,00,00,00".into(), "DL".into())]);
		sink.clear();

		let_assert!(Ok(10) = driver.pulse(&mut sink, pulse(10, 1.0)));
		assert!(sink.0 == [Sent::Forgotten("TL:04,01".into())]);
	}

	#[test]
	fn test_changed_pulse_reconfigures() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(10, 1.0)));
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(20, 1.0)));
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(20, 0.5)));
		assert!(sink.commands() == [
			"DL:04,89,00,10,0A,FF,00,00,00",
			"DL:04,89,00,10,14,FF,00,00,00",
			"DL:04,89,00,10,14,AA,00,00,00",
		]);
	}

	#[test]
	fn test_timed_enable_ignores_hold_for_cache() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Ok(15) = driver.timed_enable(&mut sink, pulse(15, 1.0), hold(500, 0.25)));
		let_assert!(Ok(15) = driver.timed_enable(&mut sink, pulse(15, 1.0), hold(300, 0.5)));
		assert!(sink.commands() == ["DL:04,89,00,10,0F,FF,1F4,88,00", "TL:04,01"]);
	}

	#[test]
	fn test_pulse_out_of_range() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Err(e) = driver.pulse(&mut sink, pulse(256, 1.0)));
		assert!(e.value == 256);
		assert!(e.max == 255);
		assert!(sink.0.is_empty());
		assert!(driver.config_state().is_none());
	}

	#[test]
	fn test_enable() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(20, 1.0), hold(0, 0.375)));
		assert!(sink.0 == [Sent::Forgotten("DL:04,C1,00,18,14,FF,92,00".into())]);
		assert!(driver.config_state().is_none());
	}

	#[test]
	fn test_pulse_after_enable_reconfigures() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(20, 1.0), hold(0, 0.5)));
		driver.disable(&mut sink);
		let_assert!(Ok(20) = driver.pulse(&mut sink, pulse(20, 1.0)));
		assert!(sink.commands() == ["DL:04,C1,00,18,14,FF,AA,00", "TL:04,02", "DL:04,89,00,10,14,FF,00,00,00"]);
	}

	#[test]
	fn test_enable_recycle() {
		let mut sink = Recorder::default();
		let settings = DriverSettings {
			recycle: true,
			..DriverSettings::default()
		};
		let mut driver = Driver::new(0x01, CommandPrefixes::LOCAL, settings);
		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(20, 1.0), hold(0, 0.0)));
		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(200, 1.0), hold(0, 0.0)));
		assert!(sink.commands() == ["DL:01,C1,00,18,14,FF,00,28", "DL:01,C1,00,18,C8,FF,00,FF"]);

		assert!(driver.recycle_for_cmd(10) == "14");
		let settings = DriverSettings {
			recycle: true,
			recycle_ms: Some(0x30),
			hold_pwm_pattern: Some("0F".into()),
		};
		let driver = Driver::new(0x01, CommandPrefixes::LOCAL, settings);
		assert!(driver.recycle_for_cmd(10) == "30");
		assert!(driver.hold_pwm_for_cmd(1.0) == "0F");
	}

	#[test]
	fn test_control_byte() {
		assert!(control_for_cmd(false, false) == "01");
		assert!(control_for_cmd(true, false) == "11");
		assert!(control_for_cmd(false, true) == "21");
		assert!(control_for_cmd(true, true) == "31");
	}

	#[test]
	fn test_recycle_disabled() {
		let driver = driver();
		assert!(driver.recycle_for_cmd(10) == "00");
		assert!(driver.recycle_for_cmd(200) == "00");
	}

	#[test]
	fn test_enable_with_matching_autofire_triggers_manually() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		driver.set_autofire(&mut sink, "DL:04,01,1A,10,14,FF,00,00,00".into(), 20, 1.0, 0.0);
		sink.clear();

		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(20, 1.0), hold(0, 0.0)));
		assert!(sink.0 == [Sent::Forgotten("TL:04,03".into())]);
		let_assert!(Some(autofire) = driver.autofire());
		assert!(!autofire.suspended);
	}

	#[test]
	fn test_enable_then_disable_restores_autofire() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let rule = "DL:04,01,1A,10,14,FF,00,00,00";
		driver.set_autofire(&mut sink, rule.into(), 20, 1.0, 0.0);
		sink.clear();

		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(30, 1.0), hold(0, 0.5)));
		let_assert!(Some(autofire) = driver.autofire());
		assert!(autofire.suspended);

		driver.disable(&mut sink);
		assert!(sink.0 == [
			Sent::Forgotten("DL:04,C1,00,18,1E,FF,AA,00".into()),
			Sent::Forgotten("TL:04,02".into()),
			Sent::Confirmed(rule.into(), "DL".into()),
			Sent::Forgotten("TL:04,00".into()),
		]);
		let_assert!(Some(state) = driver.config_state());
		assert!(state.pulse_ms == 20);
	}

	#[test]
	fn test_enable_with_suspended_autofire_restores_rule_first() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let rule = "DL:04,01,1A,10,14,FF,00,00,00";
		driver.set_autofire(&mut sink, rule.into(), 20, 1.0, 0.0);
		sink.clear();

		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(30, 1.0), hold(0, 0.5)));
		let_assert!(Ok(()) = driver.enable(&mut sink, pulse(20, 1.0), hold(0, 0.0)));
		assert!(sink.commands() == ["DL:04,C1,00,18,1E,FF,AA,00", rule, "TL:04,03"]);
		let_assert!(Some(autofire) = driver.autofire());
		assert!(!autofire.suspended);
		let_assert!(Some(state) = driver.config_state());
		assert!(state.pulse_ms == 20);
	}

	#[test]
	fn test_set_autofire_then_disable() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let rule = "DL:04,01,1A,10,14,FF,00,00,00";
		driver.set_autofire(&mut sink, rule.into(), 20, 1.0, 0.0);
		driver.disable(&mut sink);
		assert!(sink.commands() == [rule, "TL:04,02", "TL:04,00"]);
	}

	#[test]
	fn test_pulse_rearms_autofire() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let rule = "DL:04,01,1A,10,14,FF,00,00,00";
		driver.set_autofire(&mut sink, rule.into(), 20, 1.0, 0.0);
		sink.clear();

		// Same pulse as the rule: no reconfiguration needed.
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(20, 1.0)));
		assert!(sink.commands() == ["TL:04,01"]);
		sink.clear();

		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(40, 1.0)));
		assert!(sink.commands() == ["DL:04,89,00,10,28,FF,00,00,00", rule]);
		let_assert!(Some(state) = driver.config_state());
		assert!(state.pulse_ms == 20);
		let_assert!(Some(autofire) = driver.autofire());
		assert!(!autofire.suspended);
	}

	#[test]
	fn test_clear_autofire() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		driver.set_autofire(&mut sink, "DL:04,01,1A,10,14,FF,00,00,00".into(), 20, 1.0, 0.0);
		sink.clear();

		driver.clear_autofire(&mut sink);
		assert!(sink.0 == [Sent::Confirmed("DL:04,81".into(), "DL".into())]);
		assert!(driver.autofire().is_none());
		assert!(driver.config_state().is_none());

		sink.clear();
		driver.disable(&mut sink);
		assert!(sink.commands() == ["TL:04,02"]);
	}

	#[test]
	fn test_reset_forgets_configuration() {
		let mut sink = Recorder::default();
		let mut driver = driver();
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(10, 1.0)));
		driver.reset(&mut sink);
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(10, 1.0)));
		assert!(sink.commands() == [
			"DL:04,89,00,10,0A,FF,00,00,00",
			"DL:04,00,00,00",
			"DL:04,89,00,10,0A,FF,00,00,00",
		]);
	}

	#[test]
	fn test_drivers_arena() {
		let mut sink = Recorder::default();
		let mut drivers = Drivers::new(CommandPrefixes::NETWORK);
		assert!(drivers.is_empty());
		drivers.add(0x02, DriverSettings::default());
		drivers.add(0x01, DriverSettings::default());
		assert!(drivers.len() == 2);

		let settings = DriverSettings {
			recycle: true,
			..DriverSettings::default()
		};
		let driver = drivers.add(0x01, settings);
		assert!(driver.settings().recycle);
		assert!(drivers.len() == 2);

		let_assert!(Some(driver) = drivers.get_mut(0x02));
		let_assert!(Ok(_) = driver.pulse(&mut sink, pulse(10, 1.0)));
		assert!(drivers.get(0x03).is_none());

		drivers.reset_all(&mut sink);
		assert!(sink.commands() == ["DN:02,89,00,10,0A,FF,00,00,00", "DN:01,00,00,00", "DN:02,00,00,00"]);
		assert!(drivers.iter().all(|driver| driver.config_state().is_none()));
	}
}
