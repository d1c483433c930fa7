use std::path::PathBuf;
use std::time::Duration;

use gpuwrap::ClientError;
use gpuwrap_runtime::RuntimeError;
use thiserror::Error;

/// Every condition that ends a wrapper session abnormally.
#[derive(Debug, Error)]
pub enum WrapperError {
	#[error("Cannot monitor process on a different host ({0}).")]
	RemoteProcessMonitoring(String),

	#[error("Process monitoring not supported on Gen {0} devices")]
	UnsupportedGeneration(u32),

	#[error("Unknown metric set '{0}'")]
	UnknownMetricSet(String),

	#[error("Unknown counter '{0}'")]
	UnknownCounter(String),

	#[error("Invalid {what}: {value} (must be a positive number of seconds)")]
	InvalidDuration { what: &'static str, value: f64 },

	#[error("Unable to open output file '{}': {source}", path.display())]
	OutputFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Connection error : {0}")]
	Connect(#[source] RuntimeError),

	#[error("Connection error : {0}")]
	ConnectionLost(String),

	#[error("Connection closed before sampling started")]
	ClosedBeforeSampling,

	#[error("No device features received within {0:?}")]
	NegotiationTimeout(Duration),

	#[error("Cannot start child process: {0}")]
	Child(#[source] RuntimeError),

	#[error("No child process to start")]
	ChildNotStartable,

	#[error(transparent)]
	Client(#[from] ClientError),

	#[error(transparent)]
	Transport(#[from] RuntimeError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WrapperError>;
