use std::path::PathBuf;

use clap::Parser;

/// Default file receiving the monitored program's standard output.
pub const DEFAULT_CHILD_OUTPUT: &str = "wrapper_child_output.txt";

#[derive(Parser, Debug)]
#[command(name = "gputop-wrapper")]
#[command(about = "Stream GPU performance counters from a gputop server, optionally scoped to one program")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Host to connect to
	#[arg(short = 'H', long, default_value = "localhost")]
	pub host: String,

	/// Port on which the server is running
	#[arg(short, long, default_value_t = 7890)]
	pub port: u16,

	/// Accumulation period (in seconds, floating point)
	#[arg(short = 'P', long, value_name = "SECONDS", default_value_t = 1.0)]
	pub period: f64,

	/// Metric set to use (listed if this option is missing)
	#[arg(short, long, value_name = "NAME")]
	pub metric: Option<String>,

	/// Columns to print out (listed if this option is missing)
	#[arg(short, long, value_name = "COL0,COL1,..", value_delimiter = ',')]
	pub columns: Option<Vec<String>>,

	/// Disable human readable units (for machine readable output)
	#[arg(short = 'n', long)]
	pub no_human_units: bool,

	/// Disable headers (for machine readable output)
	#[arg(short = 'N', long)]
	pub no_headers: bool,

	/// Write the child's standard output to FILE
	#[arg(short = 'O', long, value_name = "FILE", default_value = DEFAULT_CHILD_OUTPUT)]
	pub child_output: PathBuf,

	/// Write counter rows to FILE (disables human readable units)
	#[arg(short, long, value_name = "FILE")]
	pub output: Option<PathBuf>,

	/// Give up if the server has not sent its features within SECONDS
	#[arg(long, value_name = "SECONDS")]
	pub negotiation_timeout: Option<f64>,

	/// Program to launch and monitor, with its arguments
	#[arg(value_name = "PROGRAM", trailing_var_arg = true, allow_hyphen_values = true)]
	pub command: Vec<String>,
}
