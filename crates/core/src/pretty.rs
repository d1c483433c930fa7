//! Human readable rendering of counter values.

use gpuwrap_protocol::CounterUnits;

const TIMES: [&str; 4] = ["ns", "us", "ms", "s"];
const BYTES: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
const FREQS: [&str; 4] = ["Hz", "KHz", "MHz", "GHz"];
const PREFIXES: [&str; 4] = ["", "K", "M", "G"];

/// Renders `value` for display in a column of `units`.
pub fn format_value_for_unit(units: CounterUnits, value: f64) -> String {
	match units {
		CounterUnits::Ns => scaled(value, 1000.0, &TIMES, " "),
		CounterUnits::Us => scaled(value * 1000.0, 1000.0, &TIMES, " "),
		CounterUnits::Bytes => scaled(value, 1024.0, &BYTES, " "),
		CounterUnits::Hz => scaled(value, 1000.0, &FREQS, " "),
		CounterUnits::Pixels
		| CounterUnits::Texels
		| CounterUnits::Threads
		| CounterUnits::Messages
		| CounterUnits::Number
		| CounterUnits::Cycles
		| CounterUnits::Events => scaled(value, 1000.0, &PREFIXES, ""),
		CounterUnits::Percent => format!("{} %", format_general(value, 3)),
		CounterUnits::Utilization
		| CounterUnits::EuSendsToL3CacheLines
		| CounterUnits::EuAtomicRequestsToL3CacheLines
		| CounterUnits::EuRequestsToL3CacheLines
		| CounterUnits::EuBytesPerL3CacheLine => format_general(value, 4),
	}
}

fn scaled(mut value: f64, base: f64, scales: &[&str; 4], separator: &str) -> String {
	let mut index = 0;
	while value.abs() >= base && index < scales.len() - 1 {
		value /= base;
		index += 1;
	}
	let suffix = scales[index];
	if suffix.is_empty() {
		format_general(value, 4)
	} else {
		format!("{}{}{}", format_general(value, 4), separator, suffix)
	}
}

/// Formats with `precision` significant digits, trimming trailing zeros
/// the way C's `%g` does.
pub fn format_general(value: f64, precision: usize) -> String {
	if value == 0.0 || !value.is_finite() {
		return format!("{value}");
	}

	let precision = precision.max(1);
	let scientific = format!("{:.*e}", precision - 1, value);
	let Some((mantissa, exp)) = scientific.split_once('e') else {
		return scientific;
	};
	// The exponent after rounding decides the notation.
	let exponent: i32 = exp.parse().unwrap_or(0);
	if exponent < -4 || exponent >= precision as i32 {
		let sign = if exponent < 0 { '-' } else { '+' };
		return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs());
	}

	let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
	trim_fraction(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_fraction(s: &str) -> &str {
	if s.contains('.') {
		s.trim_end_matches('0').trim_end_matches('.')
	} else {
		s
	}
}
