use super::procfs::{parse_cpu_snapshot, CpuSnapshot, StatReader, StatSource};
use super::CollectError;
use std::thread;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(300);
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

pub fn read_cpu_snapshot(reader: &impl StatReader) -> Result<CpuSnapshot, CollectError> {
    let content = reader.read(StatSource::CpuStats)?;
    Ok(parse_cpu_snapshot(&content)?)
}

/// Takes two snapshots `interval` apart, blocking the calling thread in between.
pub fn sample_cpu_usage(
    reader: &impl StatReader,
    interval: Duration,
) -> Result<f64, CollectError> {
    let first = read_cpu_snapshot(reader)?;
    let interval = if interval.is_zero() {
        MIN_SAMPLE_INTERVAL
    } else {
        interval
    };
    thread::sleep(interval);
    let second = read_cpu_snapshot(reader)?;

    let usage = cpu_usage_between(first, second)?;
    debug!(usage, interval_ms = interval.as_millis() as u64, "загрузка CPU");
    Ok(usage)
}

/// Busy share of the ticks elapsed between two snapshots, clamped to 0..=100.
pub fn cpu_usage_between(first: CpuSnapshot, second: CpuSnapshot) -> Result<f64, CollectError> {
    let invalid = || CollectError::InvalidDelta { first, second };

    let delta_total = second
        .total_ticks
        .checked_sub(first.total_ticks)
        .ok_or_else(invalid)?;
    let delta_idle = second
        .idle_ticks
        .checked_sub(first.idle_ticks)
        .ok_or_else(invalid)?;
    if delta_total == 0 {
        return Err(invalid());
    }

    let busy = delta_total as f64 - delta_idle as f64;
    let usage = busy / delta_total as f64 * 100.0;
    Ok(usage.clamp(0.0, 100.0))
}
