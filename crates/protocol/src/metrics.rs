//! Metric-set catalog entries.

use serde::{Deserialize, Serialize};

use crate::units::CounterUnits;

/// Storage type of a counter value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterDataType {
	Bool32,
	Uint32,
	#[default]
	Uint64,
	Float,
	Double,
}

/// Counter descriptor within a metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterInfo {
	/// Identifier used on the command line (e.g. `GpuCoreClocks`).
	pub symbol_name: String,
	/// Human readable name.
	pub name: String,
	#[serde(default)]
	pub desc: String,
	pub units: CounterUnits,
	#[serde(default)]
	pub data_type: CounterDataType,
}

/// Named collection of counters the server can sample together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSetInfo {
	pub symbol_name: String,
	pub name: String,
	/// Kernel configuration GUID used to open the OA stream.
	pub hw_config_guid: String,
	#[serde(default)]
	pub counters: Vec<CounterInfo>,
}

impl MetricSetInfo {
	/// Returns the index of the counter with `symbol`, matched case-sensitively.
	pub fn counter_index(&self, symbol: &str) -> Option<usize> {
		self.counters.iter().position(|counter| counter.symbol_name == symbol)
	}
}
