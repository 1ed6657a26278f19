use super::procfs::{parse_meminfo, MemInfo, ReadError, StatReader, StatSource};
use super::CollectError;

pub fn read_memory_usage(reader: &impl StatReader) -> Result<f64, CollectError> {
    let content = reader.read(StatSource::MemoryStats)?;
    memory_usage(parse_meminfo(&content)?)
}

/// Used share of total memory. Missing or zero fields mean the kernel did not
/// report usable totals; `MemAvailable > MemTotal` is rejected rather than clamped.
pub fn memory_usage(info: MemInfo) -> Result<f64, CollectError> {
    let total = info.total_bytes.filter(|v| *v > 0);
    let available = info.available_bytes.filter(|v| *v > 0);
    let (Some(total), Some(available)) = (total, available) else {
        return Err(CollectError::MetricsUnavailable);
    };

    let used = total.checked_sub(available).ok_or_else(|| ReadError::MalformedData {
        kind: StatSource::MemoryStats,
        reason: format!("MemAvailable ({available}) больше MemTotal ({total})"),
    })?;
    Ok(used as f64 / total as f64 * 100.0)
}
