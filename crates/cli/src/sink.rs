//! Accumulation sink: turns "accumulation ready" notifications into rows.

use std::io::Write;

use gpuwrap::{AccumulatedSamples, AccumulationHandler, ClientContext, HwContext};
use tracing::trace;

use crate::columns::Column;
use crate::format::{format_row, header_rows};

/// Which accumulations the session reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorTarget {
	/// The monitored process has not been launched yet; nothing matches.
	Pending,
	/// Only the device-wide stream.
	SystemWide,
	/// Only hardware contexts owned by this process.
	Process(u32),
}

impl MonitorTarget {
	pub fn matches(self, context: Option<&HwContext>) -> bool {
		match (self, context) {
			(MonitorTarget::SystemWide, None) => true,
			(MonitorTarget::Process(pid), Some(context)) => context.pid == Some(pid),
			_ => false,
		}
	}
}

/// Position of the last emitted row: owning context and sequence number.
type Emitted = (Option<u32>, u64);

/// Writes one row per matching accumulation to the session output.
pub struct AccumulationSink {
	output: Box<dyn Write + Send>,
	columns: Vec<Column>,
	human_units: bool,
	target: MonitorTarget,
	active: bool,
	accumulations: u64,
	rows: u64,
	last_emitted: Option<Emitted>,
}

impl AccumulationSink {
	pub fn new(output: Box<dyn Write + Send>, human_units: bool) -> Self {
		Self {
			output,
			columns: Vec::new(),
			human_units,
			target: MonitorTarget::Pending,
			active: false,
			accumulations: 0,
			rows: 0,
			last_emitted: None,
		}
	}

	pub fn set_columns(&mut self, columns: Vec<Column>) {
		self.columns = columns;
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns
	}

	pub fn set_target(&mut self, target: MonitorTarget) {
		self.target = target;
	}

	pub fn target(&self) -> MonitorTarget {
		self.target
	}

	/// Starts emitting; the next matching notification catches up on history.
	pub fn activate(&mut self) {
		self.active = true;
		self.last_emitted = None;
	}

	/// Matching accumulations seen since activation.
	pub fn accumulations(&self) -> u64 {
		self.accumulations
	}

	/// Data rows written so far.
	pub fn rows(&self) -> u64 {
		self.rows
	}

	/// Writes the symbol and unit header rows.
	pub fn write_headers(&mut self) -> std::io::Result<()> {
		let (names, units) = header_rows(&self.columns);
		writeln!(self.output, "{names}")?;
		writeln!(self.output, "{units}")?;
		self.output.flush()
	}

	pub fn flush(&mut self) -> std::io::Result<()> {
		self.output.flush()
	}

	fn emit(&mut self, ctx: &ClientContext, samples: &AccumulatedSamples) -> std::io::Result<()> {
		let row = format_row(&self.columns, ctx, samples, self.human_units);
		writeln!(self.output, "{row}")?;
		self.rows += 1;
		Ok(())
	}
}

impl AccumulationHandler for AccumulationSink {
	fn on_accumulation(&mut self, ctx: &ClientContext, context: Option<&HwContext>) -> std::io::Result<()> {
		if !self.active || !self.target.matches(context) {
			return Ok(());
		}

		self.accumulations += 1;
		let context_id = context.map(|c| c.id);
		let list = match context {
			Some(context) => context.samples(),
			None => ctx.system_samples(),
		};
		let Some(newest) = list.newest() else {
			return Ok(());
		};

		match self.last_emitted {
			None => {
				trace!(queued = list.len(), "catching up on queued accumulations");
				for samples in list.iter() {
					self.emit(ctx, samples)?;
				}
			}
			Some(last) if last == (context_id, newest.seq) => {}
			Some(_) => self.emit(ctx, newest)?,
		}
		self.last_emitted = Some((context_id, newest.seq));
		self.output.flush()
	}
}
