//! Plain-text reports written to the diagnostic stream.

use std::io::{self, Write};
use std::time::Duration;

use gpuwrap::format_value_for_unit;
use gpuwrap::oa::oa_exponent_to_period_ns;
use gpuwrap::protocol::{CounterUnits, Features, MetricSetInfo};

use crate::columns::TIMESTAMP;

/// Lines printed before connecting.
pub fn write_banner(out: &mut dyn Write, host: &str, port: u16, period: Duration, system_wide: bool) -> io::Result<()> {
	let period_us = period.as_secs_f64() * 1_000_000.0;
	writeln!(out, "Server: {host}:{port}")?;
	writeln!(out, "Sampling period: {}", format_value_for_unit(CounterUnits::Us, period_us))?;
	if system_wide {
		writeln!(out, "Monitoring: system wide")?;
	}
	Ok(())
}

/// One line per selectable metric set, in catalog order.
pub fn write_catalog(out: &mut dyn Write, metric_sets: &[MetricSetInfo]) -> io::Result<()> {
	writeln!(out, "List of metric sets selectable with -m/--metric=...")?;
	for set in metric_sets {
		writeln!(out, "\t{}: {} hw-config-guid={}", set.symbol_name, set.name, set.hw_config_guid)?;
	}
	Ok(())
}

/// Every column name accepted for `metric_set`, then one description per counter.
pub fn write_counter_list(out: &mut dyn Write, metric_set: &MetricSetInfo) -> io::Result<()> {
	let mut all = String::from(TIMESTAMP);
	for counter in &metric_set.counters {
		all.push(',');
		all.push_str(&counter.symbol_name);
	}
	writeln!(out, "ALL: {all}")?;
	writeln!(out)?;
	writeln!(out, "Detailed:")?;

	let longest = metric_set.counters.iter().map(|c| c.symbol_name.len()).max().unwrap_or(0);
	for counter in &metric_set.counters {
		let padding = longest - counter.symbol_name.len();
		writeln!(out, "{}:{:padding$} {}", counter.symbol_name, "", counter.desc)?;
	}
	Ok(())
}

/// Host, device and OA unit details.
pub fn write_system_info(out: &mut dyn Write, features: &Features, oa_exponent: u32) -> io::Result<()> {
	let devinfo = &features.devinfo;

	writeln!(out, "System info:")?;
	writeln!(out, "\tKernel release: {}", features.kernel_release)?;
	writeln!(out, "\tKernel build: {}", features.kernel_build)?;

	writeln!(out, "CPU info:")?;
	writeln!(out, "\tCPU model: {}", features.cpu_model)?;
	writeln!(out, "\tCPU cores: {}", features.n_cpus)?;

	writeln!(out, "GPU info:")?;
	writeln!(out, "\tGT name: {} (Gen {}, PCI {:#x})", devinfo.prettyname, devinfo.generation, devinfo.devid)?;
	writeln!(
		out,
		"\tTopology: {} threads, {} EUs, {} slices, {} subslices",
		devinfo.eu_threads_count, devinfo.n_eus, devinfo.n_slices, devinfo.n_subslices
	)?;
	writeln!(
		out,
		"\tGT frequency range: {:.1}MHz / {:.1}MHz",
		devinfo.gt_min_freq as f64 / 1_000_000.0,
		devinfo.gt_max_freq as f64 / 1_000_000.0
	)?;
	writeln!(
		out,
		"\tCS timestamp frequency: {} Hz / {:.2} ns",
		devinfo.timestamp_frequency,
		1_000_000_000.0 / devinfo.timestamp_frequency as f64
	)?;

	let period_ns = oa_exponent_to_period_ns(devinfo, oa_exponent);
	writeln!(out, "OA info:")?;
	writeln!(out, "\tOA Hardware Sampling Exponent: {oa_exponent}")?;
	writeln!(
		out,
		"\tOA Hardware Period: {period_ns} ns / {}",
		format_value_for_unit(CounterUnits::Ns, period_ns as f64)
	)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use gpuwrap::protocol::{CounterDataType, CounterInfo, DeviceInfo};

	use super::*;

	fn render(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
		let mut buf = Vec::new();
		f(&mut buf).unwrap();
		String::from_utf8(buf).unwrap()
	}

	fn counter(symbol: &str, desc: &str) -> CounterInfo {
		CounterInfo {
			symbol_name: symbol.into(),
			name: symbol.into(),
			desc: desc.into(),
			units: CounterUnits::Number,
			data_type: CounterDataType::Uint64,
		}
	}

	fn render_basic() -> MetricSetInfo {
		MetricSetInfo {
			symbol_name: "RenderBasic".into(),
			name: "Render Metrics Basic Gen9".into(),
			hw_config_guid: "2c5d1ba6".into(),
			counters: vec![counter("GpuTime", "Time elapsed on the GPU."), counter("GpuCoreClocks", "Core clocks.")],
		}
	}

	#[test]
	fn banner_mentions_system_wide_only_without_a_child() {
		let text = render(|out| write_banner(out, "localhost", 7890, Duration::from_secs(1), true));
		assert_eq!(text, "Server: localhost:7890\nSampling period: 1 s\nMonitoring: system wide\n");

		let text = render(|out| write_banner(out, "localhost", 7890, Duration::from_millis(250), false));
		assert_eq!(text, "Server: localhost:7890\nSampling period: 250 ms\n");
	}

	#[test]
	fn catalog_lists_one_line_per_metric_set() {
		let mut compute = render_basic();
		compute.symbol_name = "ComputeBasic".into();
		compute.name = "Compute Metrics Basic Gen9".into();
		compute.hw_config_guid = "ab42".into();

		let text = render(|out| write_catalog(out, &[render_basic(), compute]));
		assert_eq!(
			text,
			"List of metric sets selectable with -m/--metric=...\n\
			 \tRenderBasic: Render Metrics Basic Gen9 hw-config-guid=2c5d1ba6\n\
			 \tComputeBasic: Compute Metrics Basic Gen9 hw-config-guid=ab42\n"
		);
	}

	#[test]
	fn counter_list_aligns_descriptions() {
		let text = render(|out| write_counter_list(out, &render_basic()));
		assert_eq!(
			text,
			"ALL: Timestamp,GpuTime,GpuCoreClocks\n\
			 \n\
			 Detailed:\n\
			 GpuTime:       Time elapsed on the GPU.\n\
			 GpuCoreClocks: Core clocks.\n"
		);
	}

	#[test]
	fn system_info_reports_the_oa_period() {
		let features = Features {
			kernel_release: "6.1.0".into(),
			kernel_build: "#1 SMP".into(),
			cpu_model: "Core i7".into(),
			n_cpus: 8,
			devinfo: DeviceInfo {
				devid: 0x1916,
				generation: 9,
				prettyname: "SKL GT2".into(),
				eu_threads_count: 168,
				n_eus: 24,
				n_slices: 1,
				n_subslices: 3,
				gt_min_freq: 300_000_000,
				gt_max_freq: 1_150_000_000,
				timestamp_frequency: 12_000_000,
			},
			metric_sets: Vec::new(),
		};

		let text = render(|out| write_system_info(out, &features, 22));
		assert!(text.contains("\tGT name: SKL GT2 (Gen 9, PCI 0x1916)\n"));
		assert!(text.contains("\tTopology: 168 threads, 24 EUs, 1 slices, 3 subslices\n"));
		assert!(text.contains("\tGT frequency range: 300.0MHz / 1150.0MHz\n"));
		assert!(text.contains("\tCS timestamp frequency: 12000000 Hz / 83.33 ns\n"));
		assert!(text.contains("\tOA Hardware Sampling Exponent: 22\n"));
		assert!(text.contains("\tOA Hardware Period: 699050666 ns / 699.1 ms\n"));
	}
}
