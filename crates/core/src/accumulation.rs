//! Ordered, bounded lists of accumulation windows.

use std::collections::VecDeque;

/// Default number of windows retained per list.
pub const DEFAULT_HISTORY: usize = 256;

/// One accumulation window for a device or hardware context.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedSamples {
	/// Monotonically increasing within the owning list.
	pub seq: u64,
	pub first_timestamp: u64,
	pub last_timestamp: u64,
	values: Vec<f64>,
}

impl AccumulatedSamples {
	/// Value of the counter at `index` in the active metric set.
	pub fn value(&self, index: usize) -> Option<f64> {
		self.values.get(index).copied()
	}
}

/// Accumulation windows ordered oldest first.
///
/// Consumers track their position by sequence number, so eviction of old
/// windows never invalidates what they hold.
#[derive(Debug, Clone)]
pub struct AccumulationList {
	entries: VecDeque<AccumulatedSamples>,
	next_seq: u64,
	capacity: usize,
}

impl Default for AccumulationList {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_HISTORY)
	}
}

impl AccumulationList {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			entries: VecDeque::new(),
			next_seq: 0,
			capacity: capacity.max(1),
		}
	}

	/// Appends a window and returns its sequence number.
	pub fn push(&mut self, first_timestamp: u64, last_timestamp: u64, values: Vec<f64>) -> u64 {
		let seq = self.next_seq;
		self.next_seq += 1;
		if self.entries.len() == self.capacity {
			self.entries.pop_front();
		}
		self.entries.push_back(AccumulatedSamples {
			seq,
			first_timestamp,
			last_timestamp,
			values,
		});
		seq
	}

	pub fn iter(&self) -> impl Iterator<Item = &AccumulatedSamples> {
		self.entries.iter()
	}

	pub fn newest(&self) -> Option<&AccumulatedSamples> {
		self.entries.back()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn eviction_keeps_sequence_numbers_stable() {
		let mut list = AccumulationList::with_capacity(2);
		list.push(0, 10, vec![]);
		list.push(10, 20, vec![]);
		let third = list.push(20, 30, vec![1.0]);

		assert_eq!(list.len(), 2);
		assert_eq!(list.iter().map(|s| s.seq).collect::<Vec<_>>(), vec![1, 2]);
		assert_eq!(list.newest().map(|s| s.seq), Some(third));
		assert_eq!(list.newest().and_then(|s| s.value(0)), Some(1.0));
	}
}
