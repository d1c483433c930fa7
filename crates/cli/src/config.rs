//! Validated wrapper configuration.

use std::path::PathBuf;
use std::time::Duration;

use gpuwrap_runtime::ChildSpec;

use crate::cli::Cli;
use crate::error::{Result, WrapperError};

const LOCAL_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// What the session attributes samples to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorRequest {
	SystemWide,
	/// Launch this program once sampling is running and follow its contexts.
	Child(ChildSpec),
}

/// Everything a session needs, checked for consistency.
#[derive(Debug, Clone)]
pub struct WrapperConfig {
	pub host: String,
	pub port: u16,
	pub accumulation_period: Duration,
	pub metric: Option<String>,
	/// `None` when `--columns` was not given.
	pub columns: Option<Vec<String>>,
	pub human_units: bool,
	pub headers: bool,
	/// `None` writes rows to stdout.
	pub output: Option<PathBuf>,
	pub monitor: MonitorRequest,
	pub negotiation_timeout: Option<Duration>,
}

impl WrapperConfig {
	/// Validates parsed flags.
	///
	/// Process monitoring is refused for hosts other than the local machine
	/// since the server could never see the launched program.
	pub fn from_cli(cli: Cli) -> Result<Self> {
		let accumulation_period = seconds("accumulation period", cli.period)?;
		let negotiation_timeout = cli
			.negotiation_timeout
			.map(|value| seconds("negotiation timeout", value))
			.transpose()?;

		let monitor = if cli.command.is_empty() {
			MonitorRequest::SystemWide
		} else {
			if !is_local_host(&cli.host) {
				return Err(WrapperError::RemoteProcessMonitoring(cli.host));
			}
			MonitorRequest::Child(ChildSpec::new(cli.command, cli.child_output))
		};

		Ok(Self {
			human_units: !cli.no_human_units && cli.output.is_none(),
			host: cli.host,
			port: cli.port,
			accumulation_period,
			metric: cli.metric,
			columns: cli.columns,
			headers: !cli.no_headers,
			output: cli.output,
			monitor,
			negotiation_timeout,
		})
	}

	pub fn monitors_child(&self) -> bool {
		matches!(self.monitor, MonitorRequest::Child(_))
	}
}

fn seconds(what: &'static str, value: f64) -> Result<Duration> {
	if !value.is_finite() || value <= 0.0 {
		return Err(WrapperError::InvalidDuration { what, value });
	}
	Duration::try_from_secs_f64(value).map_err(|_| WrapperError::InvalidDuration { what, value })
}

fn is_local_host(host: &str) -> bool {
	LOCAL_HOSTS.contains(&host)
}
