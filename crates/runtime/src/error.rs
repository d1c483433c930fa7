use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by transports and process supervision.
#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("failed to connect to {addr}: {source}")]
	Connect {
		addr: String,
		#[source]
		source: std::io::Error,
	},

	#[error("connection is closed")]
	ConnectionClosed,

	#[error("Cannot create output file '{}': {source}", path.display())]
	OutputFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to execute '{program}': {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("empty command line")]
	EmptyCommand,

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
