//! In-flight tracking for outbound commands.
//!
//! Processors that acknowledge every command can only buffer a limited number of them.
//! The writer records every sent command and closes the gate when too many are unacknowledged.
//! The reader re-opens the gate as acknowledgements arrive.

use std::time::Duration;
use tokio::sync::watch;

/// How long the writer waits for the gate before assuming acknowledgements were lost.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Gate {
	in_flight: usize,
	open: bool,
}

/// The outcome of waiting for the gate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Readiness {
	/// The gate was open or opened in time.
	Ready,

	/// The gate stayed closed for the whole timeout and was forced open.
	Stalled,
}

/// Counts unacknowledged commands and gates the writer.
///
/// A maximum of 0 disables tracking: the gate stays open and the counter stays at 0.
#[derive(Debug)]
pub struct FlowControl {
	max_in_flight: usize,
	gate: watch::Sender<Gate>,
}

impl FlowControl {
	pub fn new(max_in_flight: usize) -> Self {
		let (gate, _) = watch::channel(Gate { in_flight: 0, open: true });
		Self { max_in_flight, gate }
	}

	/// The maximum number of unacknowledged commands, or 0 if tracking is disabled.
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight
	}

	/// Check if in-flight tracking is enabled.
	pub fn is_tracking(&self) -> bool {
		self.max_in_flight > 0
	}

	/// The number of commands sent but not yet acknowledged.
	pub fn in_flight(&self) -> usize {
		self.gate.borrow().in_flight
	}

	/// Check if the writer may send.
	pub fn is_open(&self) -> bool {
		self.gate.borrow().open
	}

	/// Record that a command was written.
	///
	/// Closes the gate if this puts more than the maximum in flight.
	pub fn on_send(&self) {
		if !self.is_tracking() {
			return;
		}
		let max = self.max_in_flight;
		self.gate.send_modify(|gate| {
			gate.in_flight += 1;
			if gate.in_flight > max && gate.open {
				gate.open = false;
				debug!("enabling flow control: {} messages in flight, maximum is {}", gate.in_flight, max);
			}
		});
	}

	/// Record that the board acknowledged a command.
	///
	/// Re-opens the gate once no more than the maximum is in flight.
	pub fn acknowledge(&self) {
		if !self.is_tracking() {
			return;
		}
		let max = self.max_in_flight;
		self.gate.send_modify(|gate| {
			match gate.in_flight.checked_sub(1) {
				Some(count) => gate.in_flight = count,
				None => warn!("received more acknowledgements than messages were sent"),
			}
			if gate.in_flight <= max {
				gate.open = true;
			}
		});
	}

	/// Forget all in-flight commands and open the gate.
	pub fn reset(&self) {
		self.gate.send_modify(|gate| {
			gate.in_flight = 0;
			gate.open = true;
		});
	}

	/// Wait until the gate is open.
	///
	/// If the gate stays closed for longer than `timeout`,
	/// the counter is reset and the gate is forced open.
	pub async fn wait_until_ready(&self, timeout: Duration) -> Readiness {
		let mut gate = self.gate.subscribe();
		let ready = tokio::time::timeout(timeout, gate.wait_for(|gate| gate.open)).await.is_ok();
		if ready {
			Readiness::Ready
		} else {
			self.reset();
			Readiness::Stalled
		}
	}
}
