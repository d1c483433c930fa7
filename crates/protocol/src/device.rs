//! Device and host feature records sent once per connection.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricSetInfo;

/// GPU device description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
	/// PCI device id.
	pub devid: u32,
	/// Hardware generation (8 = Broadwell, 9 = Skylake, ...).
	#[serde(rename = "gen")]
	pub generation: u32,
	/// Marketing name of the GT.
	pub prettyname: String,
	pub eu_threads_count: u64,
	pub n_eus: u64,
	pub n_slices: u64,
	pub n_subslices: u64,
	/// Minimum GT frequency in Hz.
	pub gt_min_freq: u64,
	/// Maximum GT frequency in Hz.
	pub gt_max_freq: u64,
	/// Command streamer timestamp frequency in Hz.
	pub timestamp_frequency: u64,
}

/// Host and device features, including the metric-set catalog.
///
/// ```json
/// {
///   "type": "features",
///   "kernel_release": "6.1.0",
///   "cpu_model": "Intel(R) Core(TM) i7-8650U",
///   "n_cpus": 8,
///   "devinfo": { "devid": 22807, "gen": 9, ... },
///   "metric_sets": [ { "symbol_name": "RenderBasic", ... } ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
	#[serde(default)]
	pub kernel_release: String,
	#[serde(default)]
	pub kernel_build: String,
	#[serde(default)]
	pub cpu_model: String,
	#[serde(default)]
	pub n_cpus: u32,
	pub devinfo: DeviceInfo,
	#[serde(default)]
	pub metric_sets: Vec<MetricSetInfo>,
}
