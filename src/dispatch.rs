//! Routing of received frames.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::flow_control::FlowControl;
use crate::identity::Processor;

/// Replies that carry no information and are never forwarded.
pub const IGNORED_MESSAGES: &[&str] = &[
	"RX:P", // RGB pass
	"SN:P", // network switch pass
	"SL:P", // local switch pass
	"LX:P", // lamp pass
	"PX:P", // segment pass
	"DN:P", // network driver pass
	"DL:P", // local driver pass
	"XX:F", // unrecognized command
	"R1:F",
	"L1:P",
	"GI:P",
	"TL:P",
	"TN:P",
	"XO:P", // servo and daughterboard pass
	"XX:U",
	"XX:N",
	"WD:P",
];

/// Prefixes of messages the board sends on its own, which do not acknowledge a command.
pub const UNSOLICITED_PREFIXES: &[&str] = &[
	"-N:", // network switch closed
	"/N:", // network switch opened
	"-L:", // local switch closed
	"/L:", // local switch opened
	"!B:", // boot message
	"\x11\x11!", // reboot done
];

/// Check if a message is a reply that is never forwarded.
pub fn is_ignored(message: &str) -> bool {
	IGNORED_MESSAGES.contains(&message)
}

/// Check if a message acknowledges a previously sent command.
pub fn is_acknowledgement(message: &str) -> bool {
	!message.is_empty() && !UNSOLICITED_PREFIXES.iter().any(|prefix| message.starts_with(prefix))
}

/// Receiver of all messages that are not filtered out.
pub trait MessageRouter: Send + 'static {
	/// Handle a message received from a processor, without the trailing delimiter.
	fn process_received_message(&mut self, message: &str, processor: &Processor);
}

/// A message forwarded over a channel by the [`MessageRouter`] implementation for [`mpsc::UnboundedSender`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReceivedMessage {
	pub processor: Processor,
	pub message: String,
}

impl MessageRouter for mpsc::UnboundedSender<ReceivedMessage> {
	fn process_received_message(&mut self, message: &str, processor: &Processor) {
		let received = ReceivedMessage {
			processor: processor.clone(),
			message: message.into(),
		};
		if self.send(received).is_err() {
			trace!("dropping message from {}, nobody is listening: {:?}", processor, message);
		}
	}
}

/// Filters received frames, counts acknowledgements and forwards the rest to a [`MessageRouter`].
pub struct Dispatcher<R> {
	processor: Processor,
	router: R,
	flow_control: Arc<FlowControl>,
}

impl<R: MessageRouter> Dispatcher<R> {
	pub fn new(processor: Processor, router: R, flow_control: Arc<FlowControl>) -> Self {
		Self {
			processor,
			router,
			flow_control,
		}
	}

	/// The processor messages are attributed to.
	pub fn processor(&self) -> &Processor {
		&self.processor
	}

	/// Handle one frame, without the delimiter.
	///
	/// Returns true if the frame was forwarded to the router.
	pub fn dispatch(&mut self, frame: &[u8]) -> bool {
		if frame.is_empty() {
			return false;
		}
		let message = String::from_utf8_lossy(frame);
		if is_acknowledgement(&message) {
			self.flow_control.acknowledge();
		}
		if is_ignored(&message) {
			return false;
		}
		self.router.process_received_message(&message, &self.processor);
		true
	}
}
