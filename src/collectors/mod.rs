pub mod cpu;
pub mod disk;
pub mod memory;
pub mod procfs;

use disk::{FsStats, FsTypeExclusions, MountUsage};
use procfs::{CpuSnapshot, ReadError, StatReader};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("некорректная дельта счётчиков CPU ({first} -> {second})")]
    InvalidDelta {
        first: CpuSnapshot,
        second: CpuSnapshot,
    },
    #[error("значения meminfo не найдены")]
    MetricsUnavailable,
}

/// Outcome of one collection pass. Each metric fails independently.
#[derive(Debug)]
pub struct Readings {
    pub cpu: Result<f64, CollectError>,
    pub memory: Result<f64, CollectError>,
    pub disks: Result<Vec<MountUsage>, CollectError>,
}

pub struct Probe<R, F> {
    pub reader: R,
    pub fs: F,
    pub exclusions: FsTypeExclusions,
    pub sample_interval: Duration,
}

impl<R: StatReader, F: FsStats> Probe<R, F> {
    /// Runs the collectors in order: CPU, memory, disks. Blocks for the CPU
    /// sampling interval.
    pub fn collect(&self) -> Readings {
        let cpu = cpu::sample_cpu_usage(&self.reader, self.sample_interval);
        if let Err(err) = &cpu {
            warn!(error = %err, "не удалось получить загрузку CPU");
        }

        let memory = memory::read_memory_usage(&self.reader);
        if let Err(err) = &memory {
            warn!(error = %err, "не удалось получить использование RAM");
        }

        let disks = disk::scan_disks(&self.reader, &self.fs, &self.exclusions);
        if let Err(err) = &disks {
            warn!(error = %err, "не удалось просканировать диски");
        }

        Readings { cpu, memory, disks }
    }
}

#[cfg(test)]
mod tests {
    use super::disk::BlockStats;
    use super::procfs::StatSource;
    use super::*;
    use std::fs;

    struct QuarterFree;

    impl FsStats for QuarterFree {
        fn block_stats(&self, _mount_point: &str) -> Option<BlockStats> {
            Some(BlockStats {
                block_size: 1024,
                total_blocks: 4,
                available_blocks: 1,
            })
        }
    }

    #[test]
    fn failures_are_kept_per_metric() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("meminfo"), "MemTotal: 4 kB\nMemAvailable: 1 kB\n").unwrap();
        fs::create_dir(dir.path().join("self")).unwrap();
        fs::write(dir.path().join("self/mounts"), "/dev/vda1 / ext4 rw 0 0\n").unwrap();

        let probe = Probe {
            reader: procfs::ProcFs::new(dir.path()),
            fs: QuarterFree,
            exclusions: FsTypeExclusions::default(),
            sample_interval: Duration::from_millis(1),
        };
        let readings = probe.collect();

        assert!(matches!(
            readings.cpu,
            Err(CollectError::Read(ReadError::SourceUnavailable {
                kind: StatSource::CpuStats,
                ..
            }))
        ));
        assert!((readings.memory.unwrap() - 75.0).abs() < 1e-9);
        let disks = readings.disks.unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].as_ref().unwrap().used_bytes, 3 * 1024);
    }
}
