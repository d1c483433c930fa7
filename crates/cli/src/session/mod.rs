//! Session Orchestrator.
//!
//! A [`Session`] owns the connection, the counter client context and the
//! components that turn accumulations into rows. It is driven by a single
//! loop ([`Session::run`]) that multiplexes:
//!
//! * [`SessionEvent`]s: transport data and close, Ctrl-C, child exit
//! * the child grace deadline
//! * the optional negotiation deadline
//!
//! Every event is handled to completion before the next one is polled, so
//! no state is shared with the producer tasks.
//!
//! # State Flow
//!
//! ```text
//! Disconnected -> AwaitingFeatures -> ResolvingTarget -> StartingMonitor
//!     StartingMonitor -> Sampling                         (system wide)
//!     StartingMonitor -> AwaitingTracepoints -> Sampling  (child process)
//! any state -> Terminating
//! ```

mod event;
mod state;

use std::io::Write;

use gpuwrap::ClientContext;
use gpuwrap_runtime::{ChildExit, Transport, TransportEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace};

pub use event::SessionEvent;
pub use state::{SessionState, Termination};

use crate::child::{ChildMonitor, GraceTick};
use crate::columns::resolve_columns;
use crate::config::{MonitorRequest, WrapperConfig};
use crate::error::{Result, WrapperError};
use crate::report;
use crate::sink::{AccumulationSink, MonitorTarget};

/// Kernel tracepoint correlating GPU requests with processes.
pub const REQUEST_TRACEPOINT: &str = "i915/i915_gem_request_add";

/// Oldest device generation supporting per-process monitoring.
const MIN_PROCESS_MONITORING_GEN: u32 = 8;

/// One wrapper invocation, from connection to termination.
pub struct Session {
	config: WrapperConfig,
	state: SessionState,
	client: ClientContext,
	sink: AccumulationSink,
	child: ChildMonitor,
	transport: Option<Box<dyn Transport>>,
	diag: Box<dyn Write + Send>,
	events: mpsc::UnboundedSender<SessionEvent>,
	negotiation_deadline: Option<Instant>,
	info_printed: bool,
}

impl Session {
	/// Creates a disconnected session writing rows to `output` and
	/// diagnostics to `diag`. Child exits are reported through `events`.
	pub fn new(
		config: WrapperConfig,
		output: Box<dyn Write + Send>,
		diag: Box<dyn Write + Send>,
		events: mpsc::UnboundedSender<SessionEvent>,
	) -> Self {
		let child_spec = match &config.monitor {
			MonitorRequest::SystemWide => None,
			MonitorRequest::Child(spec) => Some(spec.clone()),
		};
		Self {
			client: ClientContext::new(config.accumulation_period),
			sink: AccumulationSink::new(output, config.human_units),
			child: ChildMonitor::new(child_spec),
			config,
			state: SessionState::Disconnected,
			transport: None,
			diag,
			events,
			negotiation_deadline: None,
			info_printed: false,
		}
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Which accumulations are currently reported.
	pub fn target(&self) -> MonitorTarget {
		self.sink.target()
	}

	pub fn client(&self) -> &ClientContext {
		&self.client
	}

	/// Fails the session if device features have not arrived by `deadline`.
	pub fn set_negotiation_deadline(&mut self, deadline: Instant) {
		self.negotiation_deadline = Some(deadline);
	}

	/// Takes ownership of a ready connection.
	pub fn attach(&mut self, transport: Box<dyn Transport>) -> Result<()> {
		writeln!(self.diag, "Connected")?;
		writeln!(self.diag)?;
		self.client.reset();
		self.transport = Some(transport);
		self.set_state(SessionState::AwaitingFeatures);
		Ok(())
	}

	/// Drives the session until it terminates.
	pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> Termination {
		let termination = loop {
			let grace = self.child.grace_deadline();
			let negotiation = self.negotiation_deadline;

			let outcome = tokio::select! {
				event = events.recv() => match event {
					Some(event) => self.handle_event(event).await,
					None => Some(Termination::Failed(WrapperError::ConnectionLost("event channel closed".into()))),
				},
				_ = sleep_until(grace) => self.on_grace_deadline(),
				_ = sleep_until(negotiation) => self.on_negotiation_deadline(),
			};

			if let Some(termination) = outcome {
				break termination;
			}
		};
		self.terminate(termination).await
	}

	/// Applies one event; returns the termination it caused, if any.
	pub async fn handle_event(&mut self, event: SessionEvent) -> Option<Termination> {
		match event {
			SessionEvent::Transport(TransportEvent::Data(bytes)) => self.on_data(&bytes).await,
			SessionEvent::Transport(TransportEvent::Closed(error)) => Some(self.on_close(error)),
			SessionEvent::Interrupt => {
				info!("interrupted");
				Some(Termination::Interrupted)
			}
			SessionEvent::ChildExited(exit) => self.on_child_exit(exit).err().map(Termination::Failed),
		}
	}

	/// Grace timer expiry; ends the session once the child's last
	/// accumulation has been reported.
	pub fn on_grace_deadline(&mut self) -> Option<Termination> {
		match self.child.on_grace_tick(self.sink.accumulations(), Instant::now()) {
			GraceTick::Terminate => Some(Termination::ChildFinished),
			GraceTick::Rearm => None,
		}
	}

	fn on_negotiation_deadline(&mut self) -> Option<Termination> {
		self.negotiation_deadline = None;
		let timeout = self.config.negotiation_timeout.unwrap_or_default();
		Some(Termination::Failed(WrapperError::NegotiationTimeout(timeout)))
	}

	async fn on_data(&mut self, bytes: &[u8]) -> Option<Termination> {
		match self.advance(bytes) {
			Ok(None) => self.flush_outgoing().await.err().map(Termination::Failed),
			Ok(Some(termination)) => Some(termination),
			Err(err) => Some(Termination::Failed(err)),
		}
	}

	fn advance(&mut self, bytes: &[u8]) -> Result<Option<Termination>> {
		self.client.handle_incoming_bytes(bytes, &mut self.sink)?;

		match self.state {
			SessionState::AwaitingFeatures if self.client.features().is_some() => {
				self.negotiation_deadline = None;
				self.set_state(SessionState::ResolvingTarget);
				if let Some(termination) = self.resolve_target()? {
					return Ok(Some(termination));
				}
				self.start_monitor()?;
			}
			SessionState::AwaitingTracepoints if self.client.tracepoints_ready() => self.begin_sampling()?,
			SessionState::Sampling if self.child.needs_start() => self.start_child()?,
			_ => {}
		}
		Ok(None)
	}

	/// Selects the metric set and binds the requested columns.
	fn resolve_target(&mut self) -> Result<Option<Termination>> {
		let Some(name) = self.config.metric.as_deref() else {
			report::write_catalog(&mut *self.diag, self.client.metric_sets())?;
			return Ok(Some(Termination::CatalogListed));
		};
		if self.client.resolve_metric_set_by_name(name).is_none() {
			report::write_catalog(&mut *self.diag, self.client.metric_sets())?;
			return Err(WrapperError::UnknownMetricSet(name.to_string()));
		}

		let Some(names) = self.config.columns.as_deref() else {
			if let Some(metric_set) = self.client.metric_set() {
				report::write_counter_list(&mut *self.diag, metric_set)?;
			}
			return Ok(Some(Termination::CountersListed));
		};
		let columns = resolve_columns(names, self.client.metric_set())?;
		debug!(columns = columns.len(), "columns resolved");

		if !self.info_printed {
			if let Some(features) = self.client.features() {
				report::write_system_info(&mut *self.diag, features, self.client.oa_exponent())?;
			}
			self.info_printed = true;
		}

		self.sink.set_columns(columns);
		if self.config.headers {
			self.sink.write_headers()?;
		}
		self.set_state(SessionState::StartingMonitor);
		Ok(None)
	}

	fn start_monitor(&mut self) -> Result<()> {
		match self.config.monitor {
			MonitorRequest::SystemWide => {
				self.sink.set_target(MonitorTarget::SystemWide);
				self.begin_sampling()
			}
			MonitorRequest::Child(_) => {
				let generation = self.client.devinfo().map(|devinfo| devinfo.generation).unwrap_or(0);
				if generation < MIN_PROCESS_MONITORING_GEN {
					return Err(WrapperError::UnsupportedGeneration(generation));
				}
				self.client.register_tracepoint(REQUEST_TRACEPOINT);
				self.set_state(SessionState::AwaitingTracepoints);
				Ok(())
			}
		}
	}

	fn begin_sampling(&mut self) -> Result<()> {
		self.client.start_sampling()?;
		self.sink.activate();
		self.set_state(SessionState::Sampling);
		Ok(())
	}

	fn start_child(&mut self) -> Result<()> {
		let pid = self.child.start(&self.events)?;
		self.sink.set_target(MonitorTarget::Process(pid));
		let argv = self.child.spec().map(|spec| spec.argv.join(" ")).unwrap_or_default();
		writeln!(self.diag, "Monitoring pid={pid}: {argv}")?;
		Ok(())
	}

	fn on_child_exit(&mut self, exit: ChildExit) -> Result<()> {
		let period = self.config.accumulation_period;
		if self.child.on_exit(exit, self.sink.accumulations(), period, Instant::now()) {
			writeln!(self.diag, "Child exited.")?;
		}
		Ok(())
	}

	fn on_close(&mut self, error: Option<String>) -> Termination {
		self.transport = None;
		match error {
			Some(message) => Termination::Failed(WrapperError::ConnectionLost(message)),
			None if self.state == SessionState::Sampling => Termination::PeerClosed,
			None => Termination::Failed(WrapperError::ClosedBeforeSampling),
		}
	}

	async fn flush_outgoing(&mut self) -> Result<()> {
		let frames = self.client.take_outgoing_frames()?;
		let Some(transport) = self.transport.as_mut() else {
			if !frames.is_empty() {
				debug!(frames = frames.len(), "dropping frames, connection is gone");
			}
			return Ok(());
		};
		for frame in frames {
			trace!(len = frame.len(), "sending frame");
			transport.send(&frame).await?;
		}
		Ok(())
	}

	/// Stops sampling, closes the connection and reports `termination`.
	async fn terminate(&mut self, termination: Termination) -> Termination {
		debug!(?termination, "terminating");
		self.set_state(SessionState::Terminating);

		self.client.stop_sampling();
		if let Err(err) = self.flush_outgoing().await {
			debug!(error = %err, "could not send stop request");
		}
		if let Some(mut transport) = self.transport.take() {
			if let Err(err) = transport.close().await {
				debug!(error = %err, "error closing connection");
			}
		}

		self.child.cancel_grace();
		if !matches!(termination, Termination::ChildFinished) {
			self.child.kill().await;
		}

		if let Termination::Failed(err) = &termination {
			let _ = writeln!(self.diag, "{err}");
		}
		let _ = writeln!(self.diag, "Finished.");
		let _ = self.sink.flush();
		let _ = self.diag.flush();
		termination
	}

	fn set_state(&mut self, next: SessionState) {
		if self.state != next {
			debug!(from = ?self.state, to = ?next, "session state");
			self.state = next;
		}
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}
