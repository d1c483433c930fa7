use clap::Parser;
use gpuwrap_cli::app::run_wrapper;
use gpuwrap_cli::cli::Cli;
use gpuwrap_cli::config::WrapperConfig;
use gpuwrap_cli::logging;
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let config = match WrapperConfig::from_cli(cli) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("{err}");
			std::process::exit(1);
		}
	};

	let termination = run_wrapper(config, Box::new(std::io::stdout()), Box::new(std::io::stderr())).await;
	debug!(?termination, "wrapper finished");
	std::process::exit(termination.exit_code());
}
