//! Byte-stream transport to the sampling server.
//!
//! A transport has two halves: the writer kept by the session, and a
//! reader task that forwards every chunk it reads as a [`TransportEvent`]
//! into the session's event channel. Framing is left to the counter
//! client library.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Result, RuntimeError};

const READ_CHUNK: usize = 64 * 1024;

/// Events produced by a transport's reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	/// Bytes in arrival order.
	Data(Vec<u8>),
	/// The peer closed the connection; carries the error, if any.
	Closed(Option<String>),
}

/// Outbound half of a connection.
pub trait Transport: Send {
	/// Writes one encoded frame.
	fn send<'a>(&'a mut self, frame: &'a [u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

	/// Shuts the connection down and stops the reader.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// TCP connection to a sampling server.
pub struct TcpTransport {
	writer: Option<OwnedWriteHalf>,
	reader: JoinHandle<()>,
}

impl TcpTransport {
	/// Connects to `host:port` and starts forwarding received chunks to `events`.
	pub async fn connect<E>(host: &str, port: u16, events: mpsc::UnboundedSender<E>) -> Result<Self>
	where
		E: From<TransportEvent> + Send + 'static,
	{
		let stream = TcpStream::connect((host, port)).await.map_err(|source| RuntimeError::Connect {
			addr: format!("{host}:{port}"),
			source,
		})?;
		stream.set_nodelay(true)?;
		debug!(host, port, "connected");
		Ok(Self::from_stream(stream, events))
	}

	/// Wraps an already connected stream.
	pub fn from_stream<E>(stream: TcpStream, events: mpsc::UnboundedSender<E>) -> Self
	where
		E: From<TransportEvent> + Send + 'static,
	{
		let (read_half, write_half) = stream.into_split();
		let reader = tokio::spawn(read_loop(read_half, events));
		Self {
			writer: Some(write_half),
			reader,
		}
	}
}

async fn read_loop<E>(mut stream: OwnedReadHalf, events: mpsc::UnboundedSender<E>)
where
	E: From<TransportEvent> + Send + 'static,
{
	let mut buf = vec![0u8; READ_CHUNK];
	loop {
		let event = match stream.read(&mut buf).await {
			Ok(0) => TransportEvent::Closed(None),
			Ok(n) => {
				trace!(bytes = n, "received chunk");
				TransportEvent::Data(buf[..n].to_vec())
			}
			Err(err) => TransportEvent::Closed(Some(err.to_string())),
		};
		let closed = matches!(event, TransportEvent::Closed(_));
		if events.send(E::from(event)).is_err() || closed {
			break;
		}
	}
	debug!("transport reader finished");
}

impl Transport for TcpTransport {
	fn send<'a>(&'a mut self, frame: &'a [u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
		Box::pin(async move {
			let writer = self.writer.as_mut().ok_or(RuntimeError::ConnectionClosed)?;
			writer.write_all(frame).await?;
			writer.flush().await?;
			Ok(())
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			self.reader.abort();
			if let Some(mut writer) = self.writer.take() {
				writer.shutdown().await?;
			}
			Ok(())
		})
	}
}

impl Drop for TcpTransport {
	fn drop(&mut self) {
		self.reader.abort();
	}
}
