//! Top-level wrapper run: banner, connection, session, exit report.

use std::fs::File;
use std::io::{BufWriter, Write};

use gpuwrap_runtime::TcpTransport;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::WrapperConfig;
use crate::error::{Result, WrapperError};
use crate::report;
use crate::session::{Session, SessionEvent, Termination};

/// Runs one wrapper session.
///
/// Rows go to `stdout` unless the configuration names an output file;
/// banners, listings and errors go to `diag`.
pub async fn run_wrapper(config: WrapperConfig, stdout: Box<dyn Write + Send>, mut diag: Box<dyn Write + Send>) -> Termination {
	let output: Box<dyn Write + Send> = match &config.output {
		Some(path) => match File::create(path) {
			Ok(file) => Box::new(BufWriter::new(file)),
			Err(source) => {
				let err = WrapperError::OutputFile {
					path: path.clone(),
					source,
				};
				let _ = writeln!(diag, "{err}");
				return Termination::Failed(err);
			}
		},
		None => stdout,
	};

	let _ = report::write_banner(
		&mut *diag,
		&config.host,
		config.port,
		config.accumulation_period,
		!config.monitors_child(),
	);

	let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();
	spawn_interrupt_listener(events_tx.clone());

	let deadline = config.negotiation_timeout.map(|timeout| Instant::now() + timeout);
	let timeout = config.negotiation_timeout.unwrap_or_default();
	let connect = async {
		let connect = TcpTransport::connect(&config.host, config.port, events_tx.clone());
		match deadline {
			Some(deadline) => match tokio::time::timeout_at(deadline, connect).await {
				Ok(result) => result.map_err(WrapperError::Connect),
				Err(_) => Err(WrapperError::NegotiationTimeout(timeout)),
			},
			None => connect.await.map_err(WrapperError::Connect),
		}
	};
	let transport = match connect_or_interrupt(connect, &mut events_rx).await {
		Ok(transport) => transport,
		Err(termination) => return finish(diag, termination),
	};
	info!(host = %config.host, port = config.port, "connected");

	let mut session = Session::new(config, output, diag, events_tx);
	if let Some(deadline) = deadline {
		session.set_negotiation_deadline(deadline);
	}
	if let Err(err) = session.attach(Box::new(transport)) {
		debug!(error = %err, "could not report connection");
	}

	session.run(events_rx).await
}

/// Waits for `connect` unless an interrupt arrives first.
async fn connect_or_interrupt<T>(
	connect: impl Future<Output = Result<T>>,
	events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> std::result::Result<T, Termination> {
	tokio::pin!(connect);
	loop {
		tokio::select! {
			result = &mut connect => return result.map_err(Termination::Failed),
			event = events.recv() => match event {
				Some(SessionEvent::Interrupt) => {
					info!("interrupted while connecting");
					return Err(Termination::Interrupted);
				}
				Some(event) => debug!(?event, "event before connection, ignored"),
				None => return Err(Termination::Failed(WrapperError::ConnectionLost("event channel closed".into()))),
			},
		}
	}
}

fn finish(mut diag: Box<dyn Write + Send>, termination: Termination) -> Termination {
	if let Termination::Failed(err) = &termination {
		let _ = writeln!(diag, "{err}");
	}
	let _ = writeln!(diag, "Finished.");
	let _ = diag.flush();
	termination
}

fn spawn_interrupt_listener(events: mpsc::UnboundedSender<SessionEvent>) {
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("received SIGINT, shutting down");
			let _ = events.send(SessionEvent::Interrupt);
		}
	});
}
