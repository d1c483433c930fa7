//! Client-side view of a sampling session.
//!
//! [`ClientContext`] owns everything negotiated with the server: device
//! features, the metric-set catalog, the active metric set, registered
//! tracepoints and the accumulation lists for the whole device and for
//! every hardware context seen so far.
//!
//! # Message Flow
//!
//! 1. Caller passes each received chunk to [`ClientContext::handle_incoming_bytes`]
//! 2. Complete frames are decoded in arrival order; partial frames stay buffered
//! 3. `accumulation` frames are appended to the owning list, then the
//!    [`AccumulationHandler`] is invoked with the owning context
//! 4. Requests queued by `register_tracepoint` / `start_sampling` /
//!    `stop_sampling` are drained by the caller with
//!    [`ClientContext::take_outgoing_frames`]

use std::time::Duration;

use gpuwrap_protocol::{
	AccumulationInfo, ClientMessage, DeviceInfo, Features, MetricSetInfo, ServerMessage,
};
use tracing::{debug, trace, warn};

use crate::accumulation::{AccumulatedSamples, AccumulationList, DEFAULT_HISTORY};
use crate::error::{ClientError, Result};
use crate::framing::{FrameDecoder, encode_frame};
use crate::oa;

/// Receives a notification for every completed accumulation window.
pub trait AccumulationHandler {
	/// `context` is `None` for the system-wide stream.
	fn on_accumulation(&mut self, ctx: &ClientContext, context: Option<&HwContext>) -> std::io::Result<()>;
}

/// A GPU execution context the server attributes samples to.
#[derive(Debug, Clone)]
pub struct HwContext {
	pub id: u32,
	/// Owning process once known.
	pub pid: Option<u32>,
	samples: AccumulationList,
}

impl HwContext {
	pub fn samples(&self) -> &AccumulationList {
		&self.samples
	}
}

/// A kernel tracepoint subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracepoint {
	/// Client-allocated request id.
	pub id: u32,
	pub name: String,
	/// Server identifier; 0 until assigned.
	pub event_id: u32,
}

/// Negotiated state for one connection.
#[derive(Debug)]
pub struct ClientContext {
	decoder: FrameDecoder,
	accumulation_period: Duration,
	history: usize,
	features: Option<Features>,
	metric_set: Option<usize>,
	tracepoints: Vec<Tracepoint>,
	stream_id: Option<u32>,
	next_request_id: u32,
	system: AccumulationList,
	hw_contexts: Vec<HwContext>,
	outgoing: Vec<ClientMessage>,
}

impl ClientContext {
	/// Creates a context for sessions accumulating over `accumulation_period`.
	pub fn new(accumulation_period: Duration) -> Self {
		Self::with_history(accumulation_period, DEFAULT_HISTORY)
	}

	/// Like [`ClientContext::new`] with a custom per-list retention bound.
	pub fn with_history(accumulation_period: Duration, history: usize) -> Self {
		Self {
			decoder: FrameDecoder::new(),
			accumulation_period,
			history,
			features: None,
			metric_set: None,
			tracepoints: Vec::new(),
			stream_id: None,
			next_request_id: 1,
			system: AccumulationList::with_capacity(history),
			hw_contexts: Vec::new(),
			outgoing: Vec::new(),
		}
	}

	/// Drops all negotiated state, keeping the configured period.
	pub fn reset(&mut self) {
		*self = Self::with_history(self.accumulation_period, self.history);
	}

	pub fn accumulation_period(&self) -> Duration {
		self.accumulation_period
	}

	/// Decodes every complete frame in `chunk` and invokes `handler` for
	/// each accumulation.
	///
	/// Malformed frames are logged and skipped. A handler failure stops
	/// processing; the remaining frames stay buffered.
	pub fn handle_incoming_bytes(&mut self, chunk: &[u8], handler: &mut dyn AccumulationHandler) -> Result<()> {
		self.decoder.push(chunk);
		while let Some(frame) = self.decoder.next_frame() {
			let message = match serde_json::from_slice::<ServerMessage>(&frame) {
				Ok(message) => message,
				Err(err) => {
					warn!(error = %err, len = frame.len(), "skipping malformed frame");
					continue;
				}
			};
			self.apply(message, handler)?;
		}
		Ok(())
	}

	fn apply(&mut self, message: ServerMessage, handler: &mut dyn AccumulationHandler) -> Result<()> {
		match message {
			ServerMessage::Features(features) => {
				debug!(
					devid = features.devinfo.devid,
					generation = features.devinfo.generation,
					metric_sets = features.metric_sets.len(),
					"features received"
				);
				self.features = Some(features);
				self.metric_set = None;
			}
			ServerMessage::TracepointInfo { id, event_id } => {
				match self.tracepoints.iter_mut().find(|tp| tp.id == id) {
					Some(tp) => {
						debug!(name = %tp.name, event_id, "tracepoint assigned");
						tp.event_id = event_id;
					}
					None => warn!(id, "tracepoint info for unknown request"),
				}
			}
			ServerMessage::Accumulation(info) => self.accumulate(info, handler)?,
			ServerMessage::Error { message } => warn!(%message, "server reported an error"),
		}
		Ok(())
	}

	fn accumulate(&mut self, info: AccumulationInfo, handler: &mut dyn AccumulationHandler) -> Result<()> {
		let AccumulationInfo {
			hw_context,
			first_timestamp,
			last_timestamp,
			values,
		} = info;

		let index = match hw_context {
			None => {
				self.system.push(first_timestamp, last_timestamp, values);
				None
			}
			Some(hw) => {
				let index = match self.hw_contexts.iter().position(|c| c.id == hw.id) {
					Some(index) => index,
					None => {
						self.hw_contexts.push(HwContext {
							id: hw.id,
							pid: None,
							samples: AccumulationList::with_capacity(self.history),
						});
						self.hw_contexts.len() - 1
					}
				};
				let context = &mut self.hw_contexts[index];
				if hw.pid.is_some() {
					context.pid = hw.pid;
				}
				context.samples.push(first_timestamp, last_timestamp, values);
				Some(index)
			}
		};
		trace!(hw_context = ?index.map(|i| self.hw_contexts[i].id), first_timestamp, "accumulation ready");

		let ctx: &ClientContext = self;
		let context = index.map(|i| &ctx.hw_contexts[i]);
		handler.on_accumulation(ctx, context).map_err(ClientError::Handler)
	}

	pub fn features(&self) -> Option<&Features> {
		self.features.as_ref()
	}

	pub fn devinfo(&self) -> Option<&DeviceInfo> {
		self.features.as_ref().map(|features| &features.devinfo)
	}

	/// Metric-set catalog in server order.
	pub fn metric_sets(&self) -> &[MetricSetInfo] {
		self.features.as_ref().map(|features| features.metric_sets.as_slice()).unwrap_or_default()
	}

	/// Selects the metric set whose symbol is exactly `name`.
	pub fn resolve_metric_set_by_name(&mut self, name: &str) -> Option<&MetricSetInfo> {
		let index = self.metric_sets().iter().position(|set| set.symbol_name == name)?;
		self.metric_set = Some(index);
		self.metric_sets().get(index)
	}

	pub fn metric_set(&self) -> Option<&MetricSetInfo> {
		self.metric_set.and_then(|index| self.metric_sets().get(index))
	}

	/// Windows accumulated for the whole device.
	pub fn system_samples(&self) -> &AccumulationList {
		&self.system
	}

	pub fn hw_contexts(&self) -> &[HwContext] {
		&self.hw_contexts
	}

	/// Subscribes to a kernel tracepoint and returns the request id.
	pub fn register_tracepoint(&mut self, name: &str) -> u32 {
		let id = self.allocate_id();
		self.tracepoints.push(Tracepoint {
			id,
			name: name.to_string(),
			event_id: 0,
		});
		self.outgoing.push(ClientMessage::AddTracepoint {
			id,
			name: name.to_string(),
		});
		id
	}

	pub fn tracepoints(&self) -> &[Tracepoint] {
		&self.tracepoints
	}

	/// Returns `true` once every registered tracepoint has a server id.
	pub fn tracepoints_ready(&self) -> bool {
		self.tracepoints.iter().all(|tp| tp.event_id != 0)
	}

	/// OA exponent derived from the accumulation period, 0 before features.
	pub fn oa_exponent(&self) -> u32 {
		self.devinfo()
			.map(|devinfo| oa::period_to_oa_exponent(devinfo, self.accumulation_period))
			.unwrap_or(0)
	}

	/// Requests an OA stream for the active metric set.
	///
	/// Per-context attribution is requested whenever tracepoints are
	/// registered.
	pub fn start_sampling(&mut self) -> Result<()> {
		if self.features.is_none() {
			return Err(ClientError::FeaturesMissing);
		}
		let hw_config_guid = self.metric_set().ok_or(ClientError::NoMetricSet)?.hw_config_guid.clone();
		if self.stream_id.is_some() {
			return Ok(());
		}

		let id = self.allocate_id();
		let message = ClientMessage::OpenOaStream {
			id,
			hw_config_guid,
			oa_exponent: self.oa_exponent(),
			period_ns: self.accumulation_period.as_nanos().min(u64::MAX as u128) as u64,
			per_context: !self.tracepoints.is_empty(),
		};
		debug!(?message, "starting sampling");
		self.outgoing.push(message);
		self.stream_id = Some(id);
		Ok(())
	}

	/// Closes the OA stream if one is open.
	pub fn stop_sampling(&mut self) {
		if let Some(id) = self.stream_id.take() {
			debug!(id, "stopping sampling");
			self.outgoing.push(ClientMessage::CloseStream { id });
		}
	}

	pub fn is_sampling(&self) -> bool {
		self.stream_id.is_some()
	}

	/// Value of the counter at `counter_index` within `samples`.
	pub fn read_counter_value(&self, samples: &AccumulatedSamples, counter_index: usize) -> f64 {
		samples.value(counter_index).unwrap_or(0.0)
	}

	/// Drains queued requests as encoded frames.
	pub fn take_outgoing_frames(&mut self) -> Result<Vec<Vec<u8>>> {
		std::mem::take(&mut self.outgoing)
			.iter()
			.map(|message| encode_frame(message).map_err(ClientError::from))
			.collect()
	}

	fn allocate_id(&mut self) -> u32 {
		let id = self.next_request_id;
		self.next_request_id += 1;
		id
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[derive(Default)]
	struct Recorder {
		seen: Vec<(Option<u32>, usize)>,
	}

	impl AccumulationHandler for Recorder {
		fn on_accumulation(&mut self, ctx: &ClientContext, context: Option<&HwContext>) -> std::io::Result<()> {
			let len = match context {
				Some(c) => c.samples().len(),
				None => ctx.system_samples().len(),
			};
			self.seen.push((context.map(|c| c.id), len));
			Ok(())
		}
	}

	fn frame(value: serde_json::Value) -> Vec<u8> {
		let mut bytes = serde_json::to_vec(&value).unwrap();
		bytes.push(b'\n');
		bytes
	}

	fn features_frame() -> Vec<u8> {
		frame(json!({
			"type": "features",
			"devinfo": { "devid": 0x1916, "gen": 9, "prettyname": "SKL GT2", "eu_threads_count": 168,
				"n_eus": 24, "n_slices": 1, "n_subslices": 3, "gt_min_freq": 300000000u64,
				"gt_max_freq": 1150000000u64, "timestamp_frequency": 12000000u64 },
			"metric_sets": [{
				"symbol_name": "RenderBasic", "name": "Render Basic", "hw_config_guid": "guid-1",
				"counters": [{ "symbol_name": "GpuCoreClocks", "name": "GPU Core Clocks", "units": "cycles" }]
			}]
		}))
	}

	fn sent(ctx: &mut ClientContext) -> Vec<serde_json::Value> {
		ctx.take_outgoing_frames()
			.unwrap()
			.iter()
			.map(|f| serde_json::from_slice(f).unwrap())
			.collect()
	}

	#[test]
	fn features_can_arrive_over_several_chunks() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		let mut recorder = Recorder::default();
		let bytes = features_frame();
		let (head, tail) = bytes.split_at(bytes.len() / 2);

		ctx.handle_incoming_bytes(head, &mut recorder).unwrap();
		assert!(ctx.features().is_none());
		ctx.handle_incoming_bytes(tail, &mut recorder).unwrap();
		assert_eq!(ctx.devinfo().map(|d| d.generation), Some(9));
		assert_eq!(ctx.metric_sets().len(), 1);
	}

	#[test]
	fn malformed_frames_are_skipped() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		let mut recorder = Recorder::default();
		let mut bytes = b"{not json}\n".to_vec();
		bytes.extend(features_frame());
		ctx.handle_incoming_bytes(&bytes, &mut recorder).unwrap();
		assert!(ctx.features().is_some());
	}

	#[test]
	fn metric_set_resolution_is_case_sensitive() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		ctx.handle_incoming_bytes(&features_frame(), &mut Recorder::default()).unwrap();

		assert!(ctx.resolve_metric_set_by_name("renderbasic").is_none());
		assert!(ctx.metric_set().is_none());
		assert_eq!(ctx.resolve_metric_set_by_name("RenderBasic").map(|s| s.hw_config_guid.as_str()), Some("guid-1"));
		assert_eq!(ctx.metric_set().map(|s| s.symbol_name.as_str()), Some("RenderBasic"));
	}

	#[test]
	fn start_sampling_requires_a_metric_set() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		assert!(matches!(ctx.start_sampling(), Err(ClientError::FeaturesMissing)));
		ctx.handle_incoming_bytes(&features_frame(), &mut Recorder::default()).unwrap();
		assert!(matches!(ctx.start_sampling(), Err(ClientError::NoMetricSet)));
	}

	#[test]
	fn sampling_requests_are_queued_once() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		ctx.handle_incoming_bytes(&features_frame(), &mut Recorder::default()).unwrap();
		ctx.resolve_metric_set_by_name("RenderBasic");

		ctx.start_sampling().unwrap();
		ctx.start_sampling().unwrap();
		assert!(ctx.is_sampling());
		let frames = sent(&mut ctx);
		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0]["type"], "open_oa_stream");
		assert_eq!(frames[0]["hw_config_guid"], "guid-1");
		assert_eq!(frames[0]["oa_exponent"], 22);
		assert_eq!(frames[0]["period_ns"], 1_000_000_000u64);
		assert_eq!(frames[0]["per_context"], false);

		ctx.stop_sampling();
		ctx.stop_sampling();
		assert!(!ctx.is_sampling());
		let frames = sent(&mut ctx);
		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0]["type"], "close_stream");
	}

	#[test]
	fn tracepoints_become_ready_when_assigned() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		let mut recorder = Recorder::default();
		ctx.handle_incoming_bytes(&features_frame(), &mut recorder).unwrap();
		let id = ctx.register_tracepoint("i915/i915_gem_request_add");
		assert!(!ctx.tracepoints_ready());

		let frames = sent(&mut ctx);
		assert_eq!(frames[0]["type"], "add_tracepoint");
		assert_eq!(frames[0]["name"], "i915/i915_gem_request_add");

		ctx.handle_incoming_bytes(&frame(json!({"type": "tracepoint_info", "id": id, "event_id": 1234})), &mut recorder)
			.unwrap();
		assert!(ctx.tracepoints_ready());
		assert_eq!(ctx.tracepoints()[0].event_id, 1234);

		ctx.resolve_metric_set_by_name("RenderBasic");
		ctx.start_sampling().unwrap();
		assert_eq!(sent(&mut ctx)[0]["per_context"], true);
	}

	#[test]
	fn accumulations_notify_with_owning_context() {
		let mut ctx = ClientContext::new(Duration::from_secs(1));
		let mut recorder = Recorder::default();
		let mut bytes = frame(json!({"type": "accumulation", "first_timestamp": 1, "last_timestamp": 2, "values": [5.0]}));
		bytes.extend(frame(json!({
			"type": "accumulation", "hw_context": {"id": 7, "pid": 42},
			"first_timestamp": 3, "last_timestamp": 4, "values": [6.0]
		})));
		bytes.extend(frame(json!({
			"type": "accumulation", "hw_context": {"id": 7},
			"first_timestamp": 5, "last_timestamp": 6, "values": [7.0]
		})));

		ctx.handle_incoming_bytes(&bytes, &mut recorder).unwrap();
		assert_eq!(recorder.seen, vec![(None, 1), (Some(7), 1), (Some(7), 2)]);
		assert_eq!(ctx.hw_contexts()[0].pid, Some(42));

		let newest = ctx.hw_contexts()[0].samples().newest().unwrap();
		assert_eq!(ctx.read_counter_value(newest, 0), 7.0);
		assert_eq!(ctx.read_counter_value(newest, 9), 0.0);
	}

	#[test]
	fn handler_failure_is_reported() {
		struct Failing;
		impl AccumulationHandler for Failing {
			fn on_accumulation(&mut self, _: &ClientContext, _: Option<&HwContext>) -> std::io::Result<()> {
				Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
			}
		}

		let mut ctx = ClientContext::new(Duration::from_secs(1));
		let bytes = frame(json!({"type": "accumulation", "first_timestamp": 1, "last_timestamp": 2}));
		assert!(matches!(ctx.handle_incoming_bytes(&bytes, &mut Failing), Err(ClientError::Handler(_))));
	}

	#[test]
	fn reset_clears_negotiated_state() {
		let mut ctx = ClientContext::new(Duration::from_millis(500));
		ctx.handle_incoming_bytes(&features_frame(), &mut Recorder::default()).unwrap();
		ctx.register_tracepoint("i915/i915_gem_request_add");
		ctx.reset();

		assert!(ctx.features().is_none());
		assert!(ctx.tracepoints().is_empty());
		assert!(ctx.take_outgoing_frames().unwrap().is_empty());
		assert_eq!(ctx.accumulation_period(), Duration::from_millis(500));
	}
}
