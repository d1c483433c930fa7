//! Tracing subscriber setup.
//!
//! Logs go to stderr alongside the session diagnostics; stdout is reserved
//! for counter rows.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber for `verbosity` (`-v` count).
///
/// The filter is derived from the flag alone; no environment variables
/// are consulted.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::new(filter_directives(verbosity));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbosity > 1)
		.without_time()
		.try_init();
}

/// Directives covering the library crates and the binary itself.
fn filter_directives(verbosity: u8) -> String {
	let level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	format!("gpuwrap={level},gputop_wrapper={level}")
}
