//! Child process supervision.
//!
//! A monitored program is spawned with its standard output redirected to a
//! file. A waiter task owns the child and reports its exit as a
//! [`ChildExit`] through the session's event channel; the returned
//! [`ChildHandle`] can ask the waiter to kill it and wait for the reap.

use std::fs::File;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};

/// Program to launch and where its standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
	/// Program followed by its arguments.
	pub argv: Vec<String>,
	/// File receiving the child's standard output.
	pub stdout_path: PathBuf,
}

impl ChildSpec {
	pub fn new(argv: Vec<String>, stdout_path: impl Into<PathBuf>) -> Self {
		Self {
			argv,
			stdout_path: stdout_path.into(),
		}
	}
}

/// Exit notification for a supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
	pub pid: u32,
	/// `None` when the status could not be collected.
	pub status: Option<ExitStatus>,
}

/// Handle to a running child.
#[derive(Debug)]
pub struct ChildHandle {
	pid: u32,
	kill: Option<oneshot::Sender<()>>,
	waiter: Option<JoinHandle<()>>,
}

impl ChildHandle {
	pub fn pid(&self) -> u32 {
		self.pid
	}

	/// Asks the waiter task to kill the child. Idempotent.
	pub fn kill(&mut self) {
		if let Some(kill) = self.kill.take() {
			debug!(pid = self.pid, "killing child");
			let _ = kill.send(());
		}
	}

	/// Kills the child and waits until it has been reaped.
	pub async fn kill_and_wait(&mut self) {
		self.kill();
		if let Some(waiter) = self.waiter.take() {
			if let Err(err) = waiter.await {
				warn!(pid = self.pid, error = %err, "child waiter failed");
			}
		}
	}
}

/// Spawns `spec` and reports its exit to `events`.
///
/// Fails when the output file cannot be created or the program cannot be
/// executed.
pub fn spawn_child<E>(spec: &ChildSpec, events: mpsc::UnboundedSender<E>) -> Result<ChildHandle>
where
	E: From<ChildExit> + Send + 'static,
{
	let (program, args) = spec.argv.split_first().ok_or(RuntimeError::EmptyCommand)?;

	let stdout = File::create(&spec.stdout_path).map_err(|source| RuntimeError::OutputFile {
		path: spec.stdout_path.clone(),
		source,
	})?;

	let mut child = Command::new(program)
		.args(args)
		.stdin(Stdio::inherit())
		.stdout(Stdio::from(stdout))
		.stderr(Stdio::inherit())
		.kill_on_drop(false)
		.spawn()
		.map_err(|source| RuntimeError::Spawn {
			program: program.clone(),
			source,
		})?;

	let pid = child.id().ok_or_else(|| RuntimeError::Spawn {
		program: program.clone(),
		source: std::io::Error::other("child exited before its pid was known"),
	})?;

	let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
	let waiter = tokio::spawn(async move {
		let status = tokio::select! {
			status = child.wait() => status,
			Ok(()) = &mut kill_rx => {
				if let Err(err) = child.start_kill() {
					warn!(pid, error = %err, "failed to kill child");
				}
				child.wait().await
			}
		};
		let status = match status {
			Ok(status) => Some(status),
			Err(err) => {
				warn!(pid, error = %err, "failed to collect child status");
				None
			}
		};
		debug!(pid, ?status, "child exited");
		let _ = events.send(E::from(ChildExit { pid, status }));
	});

	Ok(ChildHandle {
		pid,
		kill: Some(kill_tx),
		waiter: Some(waiter),
	})
}

#[cfg(all(test, unix))]
mod tests {
	use std::time::Duration;

	use super::*;

	fn argv(args: &[&str]) -> Vec<String> {
		args.iter().map(|s| s.to_string()).collect()
	}

	#[tokio::test]
	async fn stdout_is_redirected_and_exit_reported() {
		let tmp = tempfile::tempdir().unwrap();
		let out = tmp.path().join("child.txt");
		let (tx, mut rx) = mpsc::unbounded_channel::<ChildExit>();

		let handle = spawn_child(&ChildSpec::new(argv(&["sh", "-c", "echo hello"]), &out), tx).unwrap();
		let exit = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();

		assert_eq!(exit.pid, handle.pid());
		assert!(exit.status.unwrap().success());
		assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
	}

	#[tokio::test]
	async fn kill_terminates_a_running_child() {
		let tmp = tempfile::tempdir().unwrap();
		let (tx, mut rx) = mpsc::unbounded_channel::<ChildExit>();

		let mut handle = spawn_child(&ChildSpec::new(argv(&["sleep", "30"]), tmp.path().join("out")), tx).unwrap();
		handle.kill();
		handle.kill();

		let exit = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
		assert!(!exit.status.unwrap().success());
	}

	#[tokio::test]
	async fn kill_and_wait_returns_once_reaped() {
		let tmp = tempfile::tempdir().unwrap();
		let (tx, mut rx) = mpsc::unbounded_channel::<ChildExit>();

		let mut handle = spawn_child(&ChildSpec::new(argv(&["sleep", "30"]), tmp.path().join("out")), tx).unwrap();
		tokio::time::timeout(Duration::from_secs(10), handle.kill_and_wait()).await.unwrap();
		handle.kill_and_wait().await;

		let exit = rx.try_recv().unwrap();
		assert_eq!(exit.pid, handle.pid());
	}

	#[tokio::test]
	async fn dropping_the_handle_leaves_the_child_running() {
		let tmp = tempfile::tempdir().unwrap();
		let (tx, mut rx) = mpsc::unbounded_channel::<ChildExit>();

		let handle = spawn_child(&ChildSpec::new(argv(&["sh", "-c", "sleep 0.2"]), tmp.path().join("out")), tx).unwrap();
		drop(handle);

		let exit = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
		assert!(exit.status.unwrap().success());
	}

	#[tokio::test]
	async fn missing_program_fails_to_spawn() {
		let tmp = tempfile::tempdir().unwrap();
		let (tx, _rx) = mpsc::unbounded_channel::<ChildExit>();
		let spec = ChildSpec::new(argv(&["nonexistent_command_12345"]), tmp.path().join("out"));

		assert!(matches!(spawn_child(&spec, tx), Err(RuntimeError::Spawn { .. })));
	}

	#[tokio::test]
	async fn unwritable_output_path_is_reported() {
		let tmp = tempfile::tempdir().unwrap();
		let (tx, _rx) = mpsc::unbounded_channel::<ChildExit>();
		let spec = ChildSpec::new(argv(&["true"]), tmp.path().join("missing").join("out"));

		assert!(matches!(spawn_child(&spec, tx), Err(RuntimeError::OutputFile { .. })));
	}

	#[tokio::test]
	async fn empty_command_is_rejected() {
		let (tx, _rx) = mpsc::unbounded_channel::<ChildExit>();
		let spec = ChildSpec::new(Vec::new(), "unused");
		assert!(matches!(spawn_child(&spec, tx), Err(RuntimeError::EmptyCommand)));
	}
}
