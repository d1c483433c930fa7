//! OA unit sampling exponent math.

use std::time::Duration;

use gpuwrap_protocol::DeviceInfo;

const MAX_EXPONENT: u32 = 31;

/// Hardware sampling period in nanoseconds for `exponent`.
///
/// The OA unit samples every `2^(exponent + 1)` timestamp ticks.
pub fn oa_exponent_to_period_ns(devinfo: &DeviceInfo, exponent: u32) -> u64 {
	if devinfo.timestamp_frequency == 0 {
		return 0;
	}
	let ticks = 2u128 << exponent.min(MAX_EXPONENT);
	(ticks * 1_000_000_000 / devinfo.timestamp_frequency as u128) as u64
}

/// Largest exponent whose hardware period does not exceed `period`.
pub fn period_to_oa_exponent(devinfo: &DeviceInfo, period: Duration) -> u32 {
	if devinfo.timestamp_frequency == 0 {
		return 0;
	}
	let period_ns = period.as_nanos().min(u64::MAX as u128) as u64;
	(0..=MAX_EXPONENT)
		.take_while(|&exponent| oa_exponent_to_period_ns(devinfo, exponent) <= period_ns)
		.last()
		.unwrap_or(0)
}
