use gpuwrap_runtime::{ChildExit, TransportEvent};

/// Everything the session loop reacts to besides its own timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	Transport(TransportEvent),
	/// Ctrl-C was pressed.
	Interrupt,
	ChildExited(ChildExit),
}

impl From<TransportEvent> for SessionEvent {
	fn from(event: TransportEvent) -> Self {
		SessionEvent::Transport(event)
	}
}

impl From<ChildExit> for SessionEvent {
	fn from(exit: ChildExit) -> Self {
		SessionEvent::ChildExited(exit)
	}
}
