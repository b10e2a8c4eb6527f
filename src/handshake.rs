//! Identification of the processor behind a freshly opened port.
//!
//! The board may still be waiting for the rest of a command from a previous session.
//! A long line of spaces terminates whatever it has buffered,
//! after which it is asked to identify itself until it answers.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::{FirmwareTooOld, TransportError};
use crate::framing::{frame, FrameReader};
use crate::identity::Identity;
use crate::{ConnectError, Platform};

/// The number of spaces sent to flush a partially received command on the board.
pub const FILLER_LENGTH: usize = 1024;

/// The identity query.
pub const ID_QUERY: &str = "ID:";

/// How long to wait for a reply to the identity query.
pub const ID_TIMEOUT: Duration = Duration::from_millis(500);

/// How long to wait before repeating an unanswered identity query.
pub const ID_RETRY_DELAY: Duration = Duration::from_millis(500);

/// The filler line sent before the first identity query.
pub fn filler() -> Vec<u8> {
	let mut data = vec![b' '; FILLER_LENGTH];
	data.push(crate::framing::DELIMITER);
	data
}

/// Ask the board to identify itself until it gives a valid answer.
///
/// Any data already buffered by `reader` is discarded first.
/// Replies other than an identity are ignored and the query is repeated.
pub async fn identify<W, R>(writer: &mut W, reader: &mut FrameReader<R>, port: &str) -> Result<Identity, ConnectError>
where
	W: AsyncWrite + Unpin,
	R: AsyncRead + Unpin,
{
	reader.discard_buffered();
	write(writer, &filler()).await?;

	loop {
		debug!("sending {:?} to {}", ID_QUERY, port);
		write(writer, &frame(ID_QUERY)).await?;

		if let Some(reply) = read_reply(reader, ID_TIMEOUT).await? {
			if reply.starts_with(ID_QUERY) {
				return Ok(Identity::parse(&reply)?);
			}
			debug!("unexpected reply to identity query from {}: {:?}", port, reply);
		}

		tokio::time::sleep(ID_RETRY_DELAY).await;
	}
}

/// Publish the identity of a processor and verify its firmware is supported.
pub fn register<P: Platform + ?Sized>(platform: &mut P, identity: &Identity) -> Result<(), FirmwareTooOld> {
	crate::platform::publish_identity(platform, identity);
	FirmwareTooOld::check(&identity.processor, &identity.firmware, &identity.processor.minimum_firmware())
}

async fn write<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), TransportError> {
	writer.write_all(data).await.map_err(TransportError::Write)?;
	writer.flush().await.map_err(TransportError::Write)?;
	Ok(())
}

/// Read the first reply that is not an `XX:` error before the timeout expires.
///
/// Returns `None` if no such reply arrived in time.
async fn read_reply<R: AsyncRead + Unpin>(reader: &mut FrameReader<R>, timeout: Duration) -> Result<Option<String>, TransportError> {
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		let frame = match tokio::time::timeout_at(deadline, reader.read_frame()).await {
			Err(_elapsed) => return Ok(None),
			Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(TransportError::Closed),
			Ok(Err(e)) => return Err(TransportError::Read(e)),
			Ok(Ok(frame)) => frame,
		};
		let reply = String::from_utf8_lossy(&frame).into_owned();
		if reply.starts_with("XX:") {
			trace!("ignoring {:?} while waiting for identity", reply);
			continue;
		}
		return Ok(Some(reply));
	}
}
