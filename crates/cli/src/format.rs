//! Row and header rendering.

use gpuwrap::{AccumulatedSamples, ClientContext, format_value_for_unit};

use crate::columns::{Column, CounterRef};

/// The two header rows: symbols, then parenthesized unit strings.
pub fn header_rows(columns: &[Column]) -> (String, String) {
	let mut names = String::new();
	let mut units = String::new();
	for column in columns {
		names.push_str(&format!("{:>width$} ", column.symbol, width = column.width));
		let unit = format!("({})", column.units.as_str());
		units.push_str(&format!("{:>width$} ", unit, width = column.width));
	}
	(names, units)
}

/// Renders one accumulation window as a data row.
///
/// Fields are right-aligned to their column width and separated by `,`.
pub fn format_row(columns: &[Column], ctx: &ClientContext, samples: &AccumulatedSamples, human_units: bool) -> String {
	columns
		.iter()
		.map(|column| {
			let value = format_field(column, ctx, samples, human_units);
			format!("{:>width$}", value, width = column.width)
		})
		.collect::<Vec<_>>()
		.join(",")
}

fn format_field(column: &Column, ctx: &ClientContext, samples: &AccumulatedSamples, human_units: bool) -> String {
	match column.counter {
		CounterRef::Timestamp => samples.first_timestamp.to_string(),
		CounterRef::MetricSet(index) => {
			let value = ctx.read_counter_value(samples, index);
			if human_units {
				format_value_for_unit(column.units, value)
			} else {
				format!("{value:.2}")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use gpuwrap::protocol::CounterUnits;
	use gpuwrap::AccumulationList;

	use super::*;
	use crate::columns::column_width;

	fn column(symbol: &str, counter: CounterRef, units: CounterUnits) -> Column {
		Column {
			symbol: symbol.to_string(),
			counter,
			units,
			width: column_width(symbol, units),
		}
	}

	fn columns() -> Vec<Column> {
		vec![
			column("Timestamp", CounterRef::Timestamp, CounterUnits::Ns),
			column("GpuCoreClocks", CounterRef::MetricSet(0), CounterUnits::Cycles),
			column("GpuBusy", CounterRef::MetricSet(1), CounterUnits::Percent),
		]
	}

	fn samples(first_timestamp: u64, values: Vec<f64>) -> AccumulatedSamples {
		let mut list = AccumulationList::default();
		list.push(first_timestamp, first_timestamp + 10, values);
		list.newest().cloned().unwrap()
	}

	#[test]
	fn headers_are_right_aligned_to_column_widths() {
		let (names, units) = header_rows(&columns());
		assert_eq!(names, "    Timestamp  GpuCoreClocks  GpuBusy ");
		assert_eq!(units, "         (ns)     (cycles/s)      (%) ");
		assert_eq!(names.len(), units.len());
	}

	#[test]
	fn raw_rows_use_two_decimals() {
		let ctx = ClientContext::new(Duration::from_secs(1));
		let row = format_row(&columns(), &ctx, &samples(123456, vec![1500000.0, 42.126]), false);
		assert_eq!(row, "       123456,    1500000.00,   42.13");
	}

	#[test]
	fn human_rows_scale_values() {
		let ctx = ClientContext::new(Duration::from_secs(1));
		let row = format_row(&columns(), &ctx, &samples(7, vec![1500000.0, 42.126]), true);
		assert_eq!(row, "            7,          1.5M,  42.1 %");
	}

	#[test]
	fn missing_values_render_as_zero() {
		let ctx = ClientContext::new(Duration::from_secs(1));
		let row = format_row(&columns()[1..], &ctx, &samples(0, vec![]), false);
		assert_eq!(row, "          0.00,    0.00");
	}

	#[test]
	fn overlong_values_are_not_truncated() {
		let ctx = ClientContext::new(Duration::from_secs(1));
		let narrow = vec![column("GpuBusy", CounterRef::MetricSet(0), CounterUnits::Percent)];
		let row = format_row(&narrow, &ctx, &samples(0, vec![123456789.0]), false);
		assert_eq!(row, "123456789.00");
	}
}
