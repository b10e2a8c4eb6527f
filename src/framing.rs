//! Carriage-return delimited framing.
//!
//! Every message exchanged with the board is ASCII text terminated by `\r`.
//! There is no length prefix, so incoming data is split purely on the delimiter.

use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::log::HexBytes;

/// The byte that terminates every frame.
pub const DELIMITER: u8 = b'\r';

/// The number of bytes requested from the serial port per read.
pub const READ_CHUNK_SIZE: usize = 128;

/// Encode a command as a frame by appending the delimiter.
pub fn frame(command: &str) -> Vec<u8> {
	let mut data = Vec::with_capacity(command.len() + 1);
	data.extend_from_slice(command.as_bytes());
	data.push(DELIMITER);
	data
}

/// Split a buffer into complete frames and the unconsumed remainder.
///
/// The returned frames do not include the delimiter.
/// Two consecutive delimiters produce an empty frame.
/// The remainder must be kept and prefixed to the next chunk of data.
pub fn split(buffer: &[u8]) -> (Vec<&[u8]>, &[u8]) {
	let mut frames = Vec::new();
	let mut rest = buffer;
	while let Some(pos) = rest.iter().position(|&byte| byte == DELIMITER) {
		frames.push(&rest[..pos]);
		rest = &rest[pos + 1..];
	}
	(frames, rest)
}

/// Incremental frame splitter that retains partial frames between chunks.
#[derive(Debug, Default)]
pub struct Framer {
	received: Vec<u8>,
}

impl Framer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a chunk of received data and return all frames it completed.
	pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
		self.received.extend_from_slice(chunk);
		let (frames, rest) = split(&self.received);
		let frames: Vec<Vec<u8>> = frames.into_iter().map(|frame| frame.to_vec()).collect();
		let consumed = self.received.len() - rest.len();
		self.received.drain(..consumed);
		frames
	}

	/// The bytes of the incomplete frame received so far.
	pub fn remainder(&self) -> &[u8] {
		&self.received
	}

	/// Forget any partially received frame.
	pub fn clear(&mut self) {
		self.received.clear();
	}
}

/// Reads whole frames from the receiving half of a transport.
///
/// Frames that arrive together with an awaited frame are kept,
/// so the reader can be handed from the handshake to the dispatcher without losing data.
pub struct FrameReader<R> {
	reader: R,
	framer: Framer,
	pending: VecDeque<Vec<u8>>,
	debug: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
	pub fn new(reader: R, debug: bool) -> Self {
		Self {
			reader,
			framer: Framer::new(),
			pending: VecDeque::new(),
			debug,
		}
	}

	/// Drop all buffered data, complete or not.
	pub fn discard_buffered(&mut self) {
		self.framer.clear();
		self.pending.clear();
	}

	/// Read the next frame, which may be empty.
	///
	/// Returns an [`std::io::ErrorKind::UnexpectedEof`] error if the transport is closed.
	pub async fn read_frame(&mut self) -> std::io::Result<Vec<u8>> {
		loop {
			if let Some(frame) = self.pending.pop_front() {
				return Ok(frame);
			}
			self.read_chunk().await?;
		}
	}

	/// Read at least one chunk of data and return all frames available after it.
	///
	/// The returned list may be empty if the chunk did not complete a frame.
	pub async fn read_frames(&mut self) -> std::io::Result<Vec<Vec<u8>>> {
		if self.pending.is_empty() {
			self.read_chunk().await?;
		}
		Ok(self.pending.drain(..).collect())
	}

	async fn read_chunk(&mut self) -> std::io::Result<()> {
		let mut chunk = [0u8; READ_CHUNK_SIZE];
		let count = self.reader.read(&mut chunk).await?;
		if count == 0 {
			return Err(std::io::ErrorKind::UnexpectedEof.into());
		}
		let chunk = &chunk[..count];
		if self.debug {
			debug!("received: {:?} ({})", String::from_utf8_lossy(chunk), HexBytes(chunk));
		} else {
			trace!("received: {:02X?}", chunk);
		}
		self.pending.extend(self.framer.push(chunk));
		Ok(())
	}
}
