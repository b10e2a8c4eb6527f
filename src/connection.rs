//! A running connection to one processor of a FAST controller.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

use crate::dispatch::{Dispatcher, MessageRouter};
use crate::driver::CommandSink;
use crate::error::{ConnectError, LinkClosed, TransportError};
use crate::flow_control::{FlowControl, Readiness, STALL_TIMEOUT};
use crate::framing::{frame, FrameReader};
use crate::handshake;
use crate::identity::{Identity, Processor};
use crate::platform::Platform;
use crate::transport::Transport;

/// Delay between attempts to open a port that is not available.
pub const RETRY_OPEN_DELAY: Duration = Duration::from_millis(100);

/// How long a shutdown waits for queued commands to be written.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// The command that lets the watchdog expire immediately.
pub const WATCHDOG_EXPIRE: &str = "WD:1";

/// Settings for a connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
	/// The path of the serial port.
	pub port: String,

	/// The baud rate of the serial port.
	pub baud_rate: u32,

	/// The maximum number of unacknowledged commands, or 0 to disable tracking.
	pub max_in_flight: usize,

	/// Keep retrying to open the port if it is not available.
	pub retry_open: bool,

	/// The size of the write buffer in bytes.
	pub write_buffer_size: usize,

	/// Keep a hardware watchdog with this timeout alive for as long as the connection runs.
	pub watchdog: Option<Duration>,

	/// Log every received chunk of data including a hex dump.
	pub debug: bool,
}

impl ConnectionConfig {
	pub fn new(port: impl Into<String>) -> Self {
		Self {
			port: port.into(),
			baud_rate: 921_600,
			max_in_flight: 0,
			retry_open: false,
			write_buffer_size: 2048,
			watchdog: None,
			debug: false,
		}
	}

	pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
		self.baud_rate = baud_rate;
		self
	}

	pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
		self.max_in_flight = max_in_flight;
		self
	}

	pub fn with_retry_open(mut self, retry_open: bool) -> Self {
		self.retry_open = retry_open;
		self
	}

	pub fn with_write_buffer_size(mut self, write_buffer_size: usize) -> Self {
		self.write_buffer_size = write_buffer_size;
		self
	}

	pub fn with_watchdog(mut self, watchdog: Option<Duration>) -> Self {
		self.watchdog = watchdog;
		self
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self::new("")
	}
}

#[derive(Debug)]
enum Outbound {
	Command(String),
	Close,
}

/// A cheap handle for queueing commands on a connection.
///
/// Commands are written in the order they are queued, from any number of handles.
#[derive(Debug, Clone)]
pub struct CommandSender {
	queue: mpsc::UnboundedSender<Outbound>,
	processor: Processor,
}

impl CommandSender {
	/// Queue a command without waiting for it to be written.
	///
	/// The delimiter is added automatically.
	pub fn send(&self, command: impl Into<String>) -> Result<(), TransportError> {
		self.queue
			.send(Outbound::Command(command.into()))
			.map_err(|_| TransportError::Closed)
	}

	/// The processor this handle sends to.
	pub fn processor(&self) -> &Processor {
		&self.processor
	}

	/// Check if the connection has stopped accepting commands.
	pub fn is_closed(&self) -> bool {
		self.queue.is_closed()
	}
}

impl CommandSink for CommandSender {
	fn send_with_confirmation(&mut self, command: String, expected_response: &str) {
		debug!("{} send: {} (expecting {})", self.processor, command, expected_response);
		if self.send(command).is_err() {
			warn!("dropping command for {}: connection closed", self.processor);
		}
	}

	fn send_and_forget(&mut self, command: String) {
		if self.send(command).is_err() {
			warn!("dropping command for {}: connection closed", self.processor);
		}
	}
}

/// A connection to an identified processor.
///
/// Dropping the connection cancels the background tasks without writing queued commands.
/// Use [`Self::shutdown`] to stop them gracefully.
pub struct Connection {
	port: String,
	identity: Identity,
	sender: CommandSender,
	flow_control: Arc<FlowControl>,
	link: JoinHandle<LinkClosed>,
	link_finished: bool,
	writer: AbortHandle,
	reader: AbortHandle,
	watchdog: Option<JoinHandle<()>>,
}

impl Connection {
	/// Open a serial port and establish a connection on it.
	///
	/// If `config.retry_open` is set, this keeps trying to open the port until it succeeds.
	#[cfg(feature = "serial")]
	pub async fn open<R, P>(config: &ConnectionConfig, router: R, platform: &mut P) -> Result<Self, ConnectError>
	where
		R: MessageRouter,
		P: Platform + ?Sized,
	{
		info!("connecting to {} at {} bps", config.port, config.baud_rate);
		let port = open_transport(config, crate::transport::serial::open).await?;
		Self::establish(port, config, router, platform).await
	}

	/// Establish a connection over an already opened transport.
	///
	/// This identifies the processor, verifies its firmware,
	/// registers the connection with the platform and starts the background tasks.
	pub async fn establish<T, R, P>(mut transport: T, config: &ConnectionConfig, router: R, platform: &mut P) -> Result<Self, ConnectError>
	where
		T: Transport,
		R: MessageRouter,
		P: Platform + ?Sized,
	{
		transport.discard_input_buffer().map_err(TransportError::DiscardBuffer)?;
		let (read_half, write_half) = tokio::io::split(transport);
		let mut writer = BufWriter::with_capacity(config.write_buffer_size, write_half);
		let mut reader = FrameReader::new(read_half, config.debug);

		let identity = handshake::identify(&mut writer, &mut reader, &config.port).await?;
		info!(
			"connected to {}: processor {}, board {}, firmware {}",
			config.port, identity.processor, identity.model, identity.firmware
		);
		handshake::register(platform, &identity)?;

		let flow_control = Arc::new(FlowControl::new(config.max_in_flight));
		let (queue, commands) = mpsc::unbounded_channel();
		let sender = CommandSender {
			queue,
			processor: identity.processor.clone(),
		};
		platform.register_processor_connection(&identity.processor, sender.clone());

		let writer = tokio::spawn(write_loop(writer, commands, flow_control.clone(), config.port.clone()));
		let dispatcher = Dispatcher::new(identity.processor.clone(), router, flow_control.clone());
		let reader = tokio::spawn(read_loop(reader, dispatcher, config.port.clone()));
		let writer_abort = writer.abort_handle();
		let reader_abort = reader.abort_handle();
		let link = tokio::spawn(supervise(writer, reader, config.port.clone()));

		let watchdog = config.watchdog.map(|timeout| tokio::spawn(watchdog_loop(sender.clone(), timeout)));

		Ok(Self {
			port: config.port.clone(),
			identity,
			sender,
			flow_control,
			link,
			link_finished: false,
			writer: writer_abort,
			reader: reader_abort,
			watchdog,
		})
	}

	/// The path of the serial port.
	pub fn port(&self) -> &str {
		&self.port
	}

	/// The identity reported by the processor.
	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn processor(&self) -> &Processor {
		&self.identity.processor
	}

	/// Get a new handle for queueing commands.
	pub fn sender(&self) -> CommandSender {
		self.sender.clone()
	}

	/// Queue a command without waiting for it to be written.
	pub fn send(&self, command: impl Into<String>) -> Result<(), TransportError> {
		self.sender.send(command)
	}

	/// The number of commands written but not yet acknowledged.
	pub fn in_flight(&self) -> usize {
		self.flow_control.in_flight()
	}

	/// Record an acknowledgement that was not seen by the connection itself.
	pub fn acknowledge(&self) {
		self.flow_control.acknowledge()
	}

	/// Wait for the connection to stop on its own.
	///
	/// The returned reason explains why the background tasks stopped.
	/// Once the link is closed, further calls return [`LinkClosed::Shutdown`] immediately.
	pub async fn closed(&mut self) -> LinkClosed {
		if self.link_finished {
			return LinkClosed::Shutdown;
		}
		let result = (&mut self.link).await;
		self.link_finished = true;
		task_result(result)
	}

	/// Stop the connection.
	///
	/// If a watchdog is running, it is stopped and told to expire.
	/// Commands that are still queued get a short window to be written before the tasks are cancelled.
	pub async fn shutdown(mut self) -> LinkClosed {
		if let Some(watchdog) = self.watchdog.take() {
			watchdog.abort();
			let _ = self.sender.send(WATCHDOG_EXPIRE);
		}
		let _ = self.sender.queue.send(Outbound::Close);

		let reason = match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.closed()).await {
			Ok(reason) => reason,
			Err(_) => {
				debug!("{}: queue not drained in time, aborting", self.port);
				LinkClosed::Shutdown
			},
		};
		self.abort_tasks();
		info!("connection to {} stopped", self.port);
		reason
	}

	fn abort_tasks(&mut self) {
		if let Some(watchdog) = self.watchdog.take() {
			watchdog.abort();
		}
		self.writer.abort();
		self.reader.abort();
		self.link.abort();
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		self.abort_tasks();
	}
}

/// Open a transport with `open`, using the port and baud rate from `config`.
///
/// If `config.retry_open` is set, failures are retried every [`RETRY_OPEN_DELAY`] until `open` succeeds.
pub async fn open_transport<T, F>(config: &ConnectionConfig, mut open: F) -> Result<T, TransportError>
where
	F: FnMut(&str, u32) -> std::io::Result<T>,
{
	loop {
		match open(&config.port, config.baud_rate) {
			Ok(transport) => return Ok(transport),
			Err(e) if config.retry_open => {
				debug!("connection to {} failed, will retry: {}", config.port, e);
				tokio::time::sleep(RETRY_OPEN_DELAY).await;
			},
			Err(e) => return Err(TransportError::Open(e)),
		}
	}
}

/// Convert the outcome of a background task into the reason the link closed.
fn task_result(result: Result<LinkClosed, JoinError>) -> LinkClosed {
	match result {
		Ok(reason) => reason,
		Err(e) if e.is_cancelled() => LinkClosed::Shutdown,
		Err(e) => LinkClosed::TaskFailed(e.to_string()),
	}
}

/// Wait for either task to stop, then stop the other one too.
async fn supervise(mut writer: JoinHandle<LinkClosed>, mut reader: JoinHandle<LinkClosed>, port: String) -> LinkClosed {
	enum Stopped {
		Writer(Result<LinkClosed, JoinError>),
		Reader(Result<LinkClosed, JoinError>),
	}

	let stopped = tokio::select! {
		result = &mut writer => Stopped::Writer(result),
		result = &mut reader => Stopped::Reader(result),
	};
	let (result, other) = match stopped {
		Stopped::Writer(result) => (result, reader),
		Stopped::Reader(result) => (result, writer),
	};
	other.abort();
	let _ = other.await;

	let reason = task_result(result);
	match &reason {
		LinkClosed::Shutdown => debug!("connection to {} shut down", port),
		reason => error!("connection to {} stopped: {}", port, reason),
	}
	reason
}

/// Write queued commands in order, respecting flow control.
async fn write_loop<W>(mut writer: BufWriter<W>, mut commands: mpsc::UnboundedReceiver<Outbound>, flow_control: Arc<FlowControl>, port: String) -> LinkClosed
where
	W: AsyncWrite + Unpin,
{
	loop {
		let outbound = match commands.try_recv() {
			Ok(outbound) => Some(outbound),
			Err(mpsc::error::TryRecvError::Disconnected) => None,
			Err(mpsc::error::TryRecvError::Empty) => {
				if let Err(e) = writer.flush().await {
					return LinkClosed::Write(e);
				}
				commands.recv().await
			},
		};

		let command = match outbound {
			Some(Outbound::Command(command)) => command,
			Some(Outbound::Close) | None => {
				return match writer.flush().await {
					Ok(()) => LinkClosed::Shutdown,
					Err(e) => LinkClosed::Write(e),
				};
			},
		};

		// The board can only acknowledge what it received.
		if !flow_control.is_open() && !writer.buffer().is_empty() {
			if let Err(e) = writer.flush().await {
				return LinkClosed::Write(e);
			}
		}

		if flow_control.wait_until_ready(STALL_TIMEOUT).await == Readiness::Stalled {
			warn!(
				"port {} was blocked for more than {:?}, resetting send queue! If this happens frequently report a bug!",
				port, STALL_TIMEOUT
			);
		}

		flow_control.on_send();
		if !flow_control.is_tracking() {
			trace!("{} send without flight tracking: {}", port, command);
		} else if !command.starts_with('W') && !command.starts_with('L') {
			debug!("{} send: {}", port, command);
		}

		if let Err(e) = writer.write_all(&frame(&command)).await {
			return LinkClosed::Write(e);
		}
	}
}

/// Read frames and hand them to the dispatcher until the port closes.
async fn read_loop<R, M>(mut reader: FrameReader<R>, mut dispatcher: Dispatcher<M>, port: String) -> LinkClosed
where
	R: AsyncRead + Unpin,
	M: MessageRouter,
{
	loop {
		match reader.read_frames().await {
			Ok(frames) => {
				for frame in frames {
					dispatcher.dispatch(&frame);
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
				warn!("serial port {} closed", port);
				return LinkClosed::Eof;
			},
			Err(e) => {
				warn!("serial error on {}: {}", port, e);
				return LinkClosed::Read(e);
			},
		}
	}
}

/// Format the command that keeps the watchdog alive for `timeout`.
pub fn watchdog_command(timeout: Duration) -> String {
	format!("WD:{:02X}", timeout.as_millis())
}

/// Refresh the watchdog at twice the rate it expires.
async fn watchdog_loop(sender: CommandSender, timeout: Duration) {
	let command = watchdog_command(timeout);
	let mut interval = tokio::time::interval((timeout / 2).max(Duration::from_millis(1)));
	loop {
		interval.tick().await;
		if sender.send(command.as_str()).is_err() {
			break;
		}
	}
}
