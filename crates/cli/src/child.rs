//! Child Process Monitor.
//!
//! Launches the optional monitored program once sampling is running and
//! decides when its exit may end the session. An exit does not stop the
//! session on the spot: the monitor waits, one accumulation period at a
//! time, until at least one more accumulation has been reported so the
//! final window of the child's activity makes it to the output.

use std::time::Duration;

use gpuwrap_runtime::{ChildExit, ChildHandle, ChildSpec, spawn_child};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, WrapperError};

/// Outcome of a grace-period tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceTick {
	/// An accumulation arrived after the exit; the session may end.
	Terminate,
	/// Nothing new yet; the timer was re-armed for another period.
	Rearm,
}

#[derive(Debug)]
enum ChildState {
	NotRequested,
	Pending,
	Running(ChildHandle),
	Exited,
}

#[derive(Debug, Clone, Copy)]
struct GraceTimer {
	recorded: u64,
	period: Duration,
	deadline: Instant,
}

/// Tracks the monitored program and its post-exit grace period.
#[derive(Debug)]
pub struct ChildMonitor {
	spec: Option<ChildSpec>,
	state: ChildState,
	grace: Option<GraceTimer>,
}

impl ChildMonitor {
	/// `spec` is `None` for system-wide sessions.
	pub fn new(spec: Option<ChildSpec>) -> Self {
		let state = if spec.is_some() {
			ChildState::Pending
		} else {
			ChildState::NotRequested
		};
		Self { spec, state, grace: None }
	}

	/// `true` while a requested child has not been launched yet.
	pub fn needs_start(&self) -> bool {
		matches!(self.state, ChildState::Pending)
	}

	pub fn spec(&self) -> Option<&ChildSpec> {
		self.spec.as_ref()
	}

	/// Launches the child; its exit is reported through `events`.
	///
	/// Only the first call launches anything.
	pub fn start<E>(&mut self, events: &mpsc::UnboundedSender<E>) -> Result<u32>
	where
		E: From<ChildExit> + Send + 'static,
	{
		match &self.state {
			ChildState::Pending => {}
			ChildState::Running(handle) => return Ok(handle.pid()),
			ChildState::NotRequested | ChildState::Exited => return Err(WrapperError::ChildNotStartable),
		}
		let spec = self.spec.as_ref().ok_or(WrapperError::ChildNotStartable)?;

		let handle = spawn_child(spec, events.clone()).map_err(WrapperError::Child)?;
		let pid = handle.pid();
		info!(pid, program = %spec.argv[0], "child started");
		self.state = ChildState::Running(handle);
		Ok(pid)
	}

	/// Records the exit and arms the grace timer one `period` from `now`.
	///
	/// Returns `false` for exits of processes this monitor did not start.
	pub fn on_exit(&mut self, exit: ChildExit, accumulations: u64, period: Duration, now: Instant) -> bool {
		match &self.state {
			ChildState::Running(handle) if handle.pid() == exit.pid => {}
			_ => return false,
		}
		debug!(pid = exit.pid, status = ?exit.status, accumulations, "child exit recorded");
		self.state = ChildState::Exited;
		self.grace = Some(GraceTimer {
			recorded: accumulations,
			period,
			deadline: now + period,
		});
		true
	}

	pub fn has_exited(&self) -> bool {
		matches!(self.state, ChildState::Exited)
	}

	/// When the next grace tick is due, if a timer is armed.
	pub fn grace_deadline(&self) -> Option<Instant> {
		self.grace.map(|grace| grace.deadline)
	}

	/// Compares `accumulations` with the count recorded at exit.
	pub fn on_grace_tick(&mut self, accumulations: u64, now: Instant) -> GraceTick {
		let Some(grace) = self.grace.as_mut() else {
			return GraceTick::Terminate;
		};
		if accumulations > grace.recorded {
			self.grace = None;
			return GraceTick::Terminate;
		}
		grace.deadline = now + grace.period;
		debug!(recorded = grace.recorded, "no accumulation since child exit, waiting another period");
		GraceTick::Rearm
	}

	pub fn cancel_grace(&mut self) {
		self.grace = None;
	}

	/// Kills the child if it is still running and waits for it.
	pub async fn kill(&mut self) {
		if let ChildState::Running(handle) = &mut self.state {
			handle.kill_and_wait().await;
		}
	}
}
