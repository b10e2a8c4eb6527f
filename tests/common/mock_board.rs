use fastpinball::framing::Framer;
use fastpinball::{CommandSender, Platform, Processor, Transport};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The host side of an in-memory serial link.
pub struct MockPort {
	stream: DuplexStream,
	pub discarded: Arc<AtomicBool>,
}

impl AsyncRead for MockPort {
	fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
		Pin::new(&mut self.stream).poll_read(cx, buf)
	}
}

impl AsyncWrite for MockPort {
	fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
		Pin::new(&mut self.stream).poll_write(cx, buf)
	}

	fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		Pin::new(&mut self.stream).poll_flush(cx)
	}

	fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		Pin::new(&mut self.stream).poll_shutdown(cx)
	}
}

impl Transport for MockPort {
	fn discard_input_buffer(&mut self) -> std::io::Result<()> {
		self.discarded.store(true, Ordering::Relaxed);
		Ok(())
	}
}

/// A fake FAST processor that answers the handshake and records everything else.
pub struct MockBoard {
	identity: String,
	noise: Vec<String>,
	acknowledge: bool,
}

/// Control over a running [`MockBoard`].
pub struct BoardHandle {
	received: mpsc::UnboundedReceiver<String>,
	output: mpsc::UnboundedSender<Vec<u8>>,
	reader: JoinHandle<()>,
	writer: JoinHandle<()>,
}

impl MockBoard {
	pub fn new(identity: &str) -> Self {
		Self {
			identity: identity.into(),
			noise: Vec::new(),
			acknowledge: false,
		}
	}

	/// Send these replies before the identity.
	pub fn with_noise(mut self, noise: &[&str]) -> Self {
		self.noise = noise.iter().map(|line| line.to_string()).collect();
		self
	}

	/// Answer every command with `<prefix>:P`.
	pub fn with_acknowledge(mut self, acknowledge: bool) -> Self {
		self.acknowledge = acknowledge;
		self
	}

	pub fn spawn(self) -> (MockPort, BoardHandle) {
		let (port, board) = tokio::io::duplex(64 * 1024);
		let (mut board_reader, mut board_writer) = tokio::io::split(board);
		let (output, mut pending_output) = mpsc::unbounded_channel::<Vec<u8>>();
		let (record, received) = mpsc::unbounded_channel();

		let writer = tokio::spawn(async move {
			while let Some(data) = pending_output.recv().await {
				if board_writer.write_all(&data).await.is_err() {
					break;
				}
			}
		});

		let reply = output.clone();
		let reader = tokio::spawn(async move {
			let mut framer = Framer::new();
			let mut buffer = [0; 1024];
			loop {
				let count = match board_reader.read(&mut buffer).await {
					Ok(0) | Err(_) => break,
					Ok(count) => count,
				};
				for frame in framer.push(&buffer[..count]) {
					let line = String::from_utf8_lossy(&frame).into_owned();
					if !line.is_empty() && line.bytes().all(|b| b == b' ') {
						let _ = reply.send(b"XX:F\r".to_vec());
					} else if line == "ID:" {
						for noise in &self.noise {
							let _ = reply.send(format!("{}\r", noise).into_bytes());
						}
						let _ = reply.send(format!("{}\r", self.identity).into_bytes());
					} else {
						if self.acknowledge {
							let prefix = line.split(':').next().unwrap_or_default();
							let _ = reply.send(format!("{}:P\r", prefix).into_bytes());
						}
						let _ = record.send(line);
					}
				}
			}
		});

		let port = MockPort {
			stream: port,
			discarded: Arc::new(AtomicBool::new(false)),
		};
		let handle = BoardHandle {
			received,
			output,
			reader,
			writer,
		};
		(port, handle)
	}
}

impl BoardHandle {
	/// Wait for the next command the board received, excluding the handshake.
	pub async fn next_command(&mut self) -> Option<String> {
		tokio::time::timeout(Duration::from_secs(10), self.received.recv()).await.ok().flatten()
	}

	/// Wait for `count` commands.
	pub async fn commands(&mut self, count: usize) -> Vec<String> {
		let mut commands = Vec::with_capacity(count);
		while commands.len() < count {
			match self.next_command().await {
				Some(command) => commands.push(command),
				None => break,
			}
		}
		commands
	}

	/// Send raw data to the host.
	pub fn inject(&self, data: &[u8]) {
		let _ = self.output.send(data.to_vec());
	}

	/// Disconnect the board, closing the link.
	pub async fn close(self) {
		self.reader.abort();
		self.writer.abort();
		let _ = self.reader.await;
		let _ = self.writer.await;
	}
}

/// A platform that remembers everything it was told.
#[derive(Default)]
pub struct RecordingPlatform {
	pub variables: BTreeMap<String, String>,
	pub connections: Vec<(Processor, CommandSender)>,
}

impl Platform for RecordingPlatform {
	fn set_machine_var(&mut self, name: &str, value: &str) {
		self.variables.insert(name.into(), value.into());
	}

	fn register_processor_connection(&mut self, processor: &Processor, sender: CommandSender) {
		self.connections.push((processor.clone(), sender));
	}
}
