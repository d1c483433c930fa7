//! Counter unit kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unit of a counter value as reported in the metric-set catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterUnits {
	Bytes,
	Hz,
	Ns,
	Us,
	Pixels,
	Texels,
	Threads,
	Percent,
	Messages,
	Number,
	Cycles,
	Events,
	Utilization,
	EuSendsToL3CacheLines,
	EuAtomicRequestsToL3CacheLines,
	EuRequestsToL3CacheLines,
	EuBytesPerL3CacheLine,
}

impl CounterUnits {
	/// Every unit kind, in wire declaration order.
	pub const ALL: [CounterUnits; 17] = [
		CounterUnits::Bytes,
		CounterUnits::Hz,
		CounterUnits::Ns,
		CounterUnits::Us,
		CounterUnits::Pixels,
		CounterUnits::Texels,
		CounterUnits::Threads,
		CounterUnits::Percent,
		CounterUnits::Messages,
		CounterUnits::Number,
		CounterUnits::Cycles,
		CounterUnits::Events,
		CounterUnits::Utilization,
		CounterUnits::EuSendsToL3CacheLines,
		CounterUnits::EuAtomicRequestsToL3CacheLines,
		CounterUnits::EuRequestsToL3CacheLines,
		CounterUnits::EuBytesPerL3CacheLine,
	];

	/// Short unit string used in column headers.
	pub fn as_str(self) -> &'static str {
		match self {
			CounterUnits::Bytes => "B",
			CounterUnits::Hz => "Hz",
			CounterUnits::Ns => "ns",
			CounterUnits::Us => "us",
			CounterUnits::Pixels => "pixels",
			CounterUnits::Texels => "texels",
			CounterUnits::Threads => "threads",
			CounterUnits::Percent => "%",
			CounterUnits::Messages => "messages/s",
			CounterUnits::Number => "/s",
			CounterUnits::Cycles => "cycles/s",
			CounterUnits::Events => "events/s",
			CounterUnits::Utilization => "utilization",
			CounterUnits::EuSendsToL3CacheLines => "sends-to-L3-CL",
			CounterUnits::EuAtomicRequestsToL3CacheLines => "atomics-to-L3-CL",
			CounterUnits::EuRequestsToL3CacheLines => "requests-to-L3-CL",
			CounterUnits::EuBytesPerL3CacheLine => "bytes-per-L3-CL",
		}
	}

	/// Returns `true` for units derived from pixel, texel or L3 cache-line traffic.
	pub fn is_surface_or_cache_line(self) -> bool {
		matches!(
			self,
			CounterUnits::Pixels
				| CounterUnits::Texels
				| CounterUnits::EuSendsToL3CacheLines
				| CounterUnits::EuAtomicRequestsToL3CacheLines
				| CounterUnits::EuRequestsToL3CacheLines
				| CounterUnits::EuBytesPerL3CacheLine
		)
	}
}

impl fmt::Display for CounterUnits {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
