//! Fake transport for unit testing session flows without a server.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new().build();
//! session.attach(Box::new(transport))?;
//! session.handle_event(SessionEvent::Transport(TransportEvent::Data(bytes))).await;
//! assert_eq!(controller.take_sent().len(), 1);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Shared {
	sent: Vec<Vec<u8>>,
	closed: bool,
	fail_sends: bool,
}

/// Builder for creating fake transport instances.
#[derive(Debug, Default)]
pub struct FakeTransportBuilder {
	fail_sends: bool,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every `send` fail as if the peer had gone away.
	pub fn failing_sends(mut self) -> Self {
		self.fail_sends = true;
		self
	}

	/// Returns the transport and a controller for inspecting what was sent.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let shared = Arc::new(Mutex::new(Shared {
			fail_sends: self.fail_sends,
			..Default::default()
		}));
		(
			FakeTransport {
				shared: Arc::clone(&shared),
			},
			FakeTransportController { shared },
		)
	}
}

/// In-memory transport recording every frame it is asked to send.
#[derive(Debug)]
pub struct FakeTransport {
	shared: Arc<Mutex<Shared>>,
}

impl Transport for FakeTransport {
	fn send<'a>(&'a mut self, frame: &'a [u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
		let mut shared = self.shared.lock();
		let result = if shared.closed || shared.fail_sends {
			Err(RuntimeError::ConnectionClosed)
		} else {
			shared.sent.push(frame.to_vec());
			Ok(())
		};
		Box::pin(std::future::ready(result))
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		self.shared.lock().closed = true;
		Box::pin(std::future::ready(Ok(())))
	}
}

/// Inspects a [`FakeTransport`] after it has been handed to a session.
#[derive(Debug, Clone)]
pub struct FakeTransportController {
	shared: Arc<Mutex<Shared>>,
}

impl FakeTransportController {
	/// Takes all sent frames, clearing the buffer.
	pub fn take_sent(&self) -> Vec<Vec<u8>> {
		std::mem::take(&mut self.shared.lock().sent)
	}

	pub fn is_closed(&self) -> bool {
		self.shared.lock().closed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn sent_frames_are_captured_until_close() {
		let (mut transport, controller) = FakeTransportBuilder::new().build();
		transport.send(b"one\n").await.unwrap();
		transport.send(b"two\n").await.unwrap();
		assert_eq!(controller.take_sent(), vec![b"one\n".to_vec(), b"two\n".to_vec()]);
		assert!(controller.take_sent().is_empty());

		transport.close().await.unwrap();
		assert!(controller.is_closed());
		assert!(matches!(transport.send(b"late\n").await, Err(RuntimeError::ConnectionClosed)));
	}

	#[tokio::test]
	async fn failing_sends_report_closed_connection() {
		let (mut transport, controller) = FakeTransportBuilder::new().failing_sends().build();
		assert!(transport.send(b"x").await.is_err());
		assert!(controller.take_sent().is_empty());
	}
}
