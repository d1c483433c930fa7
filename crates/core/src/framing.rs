//! Newline-delimited frame reassembly.

use serde::Serialize;
use tracing::warn;

/// Longest frame accepted before it is dropped.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Buffers partial frames across transport chunks.
#[derive(Debug)]
pub struct FrameDecoder {
	buf: Vec<u8>,
	/// Prefix of `buf` known to hold no terminator.
	scanned: usize,
	/// Set while skipping the rest of an oversized frame.
	discarding: bool,
	max_frame_len: usize,
}

impl Default for FrameDecoder {
	fn default() -> Self {
		Self::with_max_frame_len(MAX_FRAME_LEN)
	}
}

impl FrameDecoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_max_frame_len(max_frame_len: usize) -> Self {
		Self {
			buf: Vec::new(),
			scanned: 0,
			discarding: false,
			max_frame_len,
		}
	}

	/// Appends a chunk as received from the transport.
	pub fn push(&mut self, chunk: &[u8]) {
		self.buf.extend_from_slice(chunk);
	}

	/// Pops the next complete frame without its terminator.
	///
	/// Blank lines are skipped. Frames longer than the limit are logged and
	/// dropped, including their tail once it arrives.
	pub fn next_frame(&mut self) -> Option<Vec<u8>> {
		loop {
			let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
				self.scanned = self.buf.len();
				if self.buf.len() > self.max_frame_len {
					warn!(len = self.buf.len(), max = self.max_frame_len, "frame too long, dropping it");
					self.buf.clear();
					self.scanned = 0;
					self.discarding = true;
				}
				return None;
			};
			let end = self.scanned + offset;
			self.scanned = 0;
			let mut frame: Vec<u8> = self.buf.drain(..=end).collect();
			if std::mem::take(&mut self.discarding) {
				continue;
			}
			frame.pop();
			if frame.last() == Some(&b'\r') {
				frame.pop();
			}
			if frame.len() > self.max_frame_len {
				warn!(len = frame.len(), max = self.max_frame_len, "frame too long, dropping it");
				continue;
			}
			if !frame.iter().all(u8::is_ascii_whitespace) {
				return Some(frame);
			}
		}
	}

	/// Bytes held for a frame that has not been terminated yet.
	pub fn pending(&self) -> usize {
		self.buf.len()
	}

	pub fn clear(&mut self) {
		self.buf.clear();
		self.scanned = 0;
		self.discarding = false;
	}
}

/// Serializes `message` as a single terminated frame.
pub fn encode_frame<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
	let mut frame = serde_json::to_vec(message)?;
	frame.push(b'\n');
	Ok(frame)
}
