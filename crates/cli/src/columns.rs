//! Column resolution against the active metric set.

use gpuwrap::protocol::{CounterUnits, MetricSetInfo};

use crate::error::{Result, WrapperError};

/// Symbol of the synthetic OA timestamp column.
pub const TIMESTAMP: &str = "Timestamp";

/// Counter a column reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterRef {
	/// Synthetic timestamp, read from the accumulation window itself.
	Timestamp,
	/// Index into the active metric set's counters.
	MetricSet(usize),
}

/// A requested column bound to its counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
	pub symbol: String,
	pub counter: CounterRef,
	pub units: CounterUnits,
	/// Display width including the trailing space.
	pub width: usize,
}

/// Minimum display width for values of `units`.
pub fn unit_min_width(units: CounterUnits) -> usize {
	match units {
		CounterUnits::Ns => 12,
		CounterUnits::Percent => 6,
		units if units.is_surface_or_cache_line() => 10,
		_ => 8,
	}
}

/// Width of a column showing `symbol` in `units`.
pub fn column_width(symbol: &str, units: CounterUnits) -> usize {
	symbol.len().max(units.as_str().len() + 2).max(unit_min_width(units)) + 1
}

/// Resolves one requested name.
///
/// `Timestamp` never consults `metric_set`; every other name must match a
/// counter symbol exactly.
pub fn resolve_column(name: &str, metric_set: Option<&MetricSetInfo>) -> Result<Column> {
	let (counter, units) = if name == TIMESTAMP {
		(CounterRef::Timestamp, CounterUnits::Ns)
	} else {
		let found = metric_set.and_then(|set| set.counter_index(name).map(|index| (index, set.counters[index].units)));
		let (index, units) = found.ok_or_else(|| WrapperError::UnknownCounter(name.to_string()))?;
		(CounterRef::MetricSet(index), units)
	};

	Ok(Column {
		symbol: name.to_string(),
		counter,
		units,
		width: column_width(name, units),
	})
}

/// Resolves `names` in order, failing on the first unknown one.
pub fn resolve_columns(names: &[String], metric_set: Option<&MetricSetInfo>) -> Result<Vec<Column>> {
	names.iter().map(|name| resolve_column(name, metric_set)).collect()
}
