use thiserror::Error;

/// Errors surfaced by the counter client library.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("device features have not been received yet")]
	FeaturesMissing,

	#[error("no metric set selected")]
	NoMetricSet,

	#[error("failed to encode frame: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("accumulation handler failed: {0}")]
	Handler(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
