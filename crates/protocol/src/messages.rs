//! Frames exchanged with the sampling server.
//!
//! Every frame is a single JSON object terminated by `\n`, discriminated
//! by its `type` field.

use serde::{Deserialize, Serialize};

use crate::device::Features;

/// Hardware context an accumulation is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwContextInfo {
	/// Server-side context id.
	pub id: u32,
	/// Owning process, once the server has correlated it via tracepoints.
	#[serde(default)]
	pub pid: Option<u32>,
}

/// One completed accumulation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulationInfo {
	/// `None` for the system-wide stream.
	#[serde(default)]
	pub hw_context: Option<HwContextInfo>,
	pub first_timestamp: u64,
	pub last_timestamp: u64,
	/// One value per counter of the active metric set, in catalog order.
	#[serde(default)]
	pub values: Vec<f64>,
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	Features(Features),
	TracepointInfo { id: u32, event_id: u32 },
	Accumulation(AccumulationInfo),
	Error { message: String },
}

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	AddTracepoint {
		id: u32,
		name: String,
	},
	OpenOaStream {
		id: u32,
		hw_config_guid: String,
		oa_exponent: u32,
		period_ns: u64,
		per_context: bool,
	},
	CloseStream {
		id: u32,
	},
}
