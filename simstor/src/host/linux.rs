//! procfs readings for the host sampler.

use metrics::gauge;
use procfs::{Current, CurrentSI, KernelStats, LoadAverage, Meminfo};

use crate::telemetry;

#[derive(thiserror::Error, Debug)]
/// Errors produced by functions in this module
pub(super) enum Error {
    /// Wrapper for [`procfs::ProcError`]
    #[error("Unable to read procfs: {0}")]
    Proc(#[from] procfs::ProcError),
}

/// Read `/proc/loadavg`, `/proc/meminfo` and `/proc/stat` once and publish
/// what they hold.
#[allow(clippy::cast_precision_loss)]
pub(super) fn sample() -> Result<(), Error> {
    let load = LoadAverage::current()?;
    gauge!(telemetry::HOST_LOAD, "window" => "1m").set(f64::from(load.one));
    gauge!(telemetry::HOST_LOAD, "window" => "5m").set(f64::from(load.five));
    gauge!(telemetry::HOST_LOAD, "window" => "15m").set(f64::from(load.fifteen));

    let memory = Meminfo::current()?;
    gauge!(telemetry::HOST_MEMORY_TOTAL).set(memory.mem_total as f64);
    if let Some(available) = memory.mem_available {
        gauge!(telemetry::HOST_MEMORY_AVAILABLE).set(available as f64);
    }

    let cpu = KernelStats::current()?.total;
    for (mode, ticks) in [
        ("user", cpu.user),
        ("nice", cpu.nice),
        ("system", cpu.system),
        ("idle", cpu.idle),
    ] {
        gauge!(telemetry::HOST_CPU_TICKS, "mode" => mode).set(ticks as f64);
    }
    if let Some(iowait) = cpu.iowait {
        gauge!(telemetry::HOST_CPU_TICKS, "mode" => "iowait").set(iowait as f64);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::sample;

    #[test]
    fn sampling_procfs_succeeds() {
        sample().expect("procfs is readable on linux");
    }
}
