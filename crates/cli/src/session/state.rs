use crate::error::WrapperError;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Disconnected,
	/// Connected; forwarding every chunk until device features arrive.
	AwaitingFeatures,
	ResolvingTarget,
	StartingMonitor,
	/// Waiting for the server to assign every registered tracepoint.
	AwaitingTracepoints,
	Sampling,
	Terminating,
}

/// Why a session ended.
#[derive(Debug)]
pub enum Termination {
	/// Ctrl-C.
	Interrupted,
	/// The server closed the connection cleanly while sampling.
	PeerClosed,
	/// No usable metric set was requested; the catalog was printed.
	CatalogListed,
	/// No columns were requested; the counter list was printed.
	CountersListed,
	/// The monitored program exited and its final accumulation was reported.
	ChildFinished,
	Failed(WrapperError),
}

impl Termination {
	pub fn exit_code(&self) -> i32 {
		match self {
			Termination::Failed(_) => 1,
			_ => 0,
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, Termination::Failed(_))
	}
}

impl From<WrapperError> for Termination {
	fn from(err: WrapperError) -> Self {
		Termination::Failed(err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_failures_exit_non_zero() {
		assert_eq!(Termination::Interrupted.exit_code(), 0);
		assert_eq!(Termination::PeerClosed.exit_code(), 0);
		assert_eq!(Termination::CatalogListed.exit_code(), 0);
		assert_eq!(Termination::CountersListed.exit_code(), 0);
		assert_eq!(Termination::ChildFinished.exit_code(), 0);
		let failed = Termination::from(WrapperError::UnknownCounter("Bogus".into()));
		assert!(failed.is_failure());
		assert_eq!(failed.exit_code(), 1);
	}
}
