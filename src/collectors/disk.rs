use super::procfs::{parse_mounts, StatReader, StatSource};
use super::CollectError;
use nix::sys::statvfs::statvfs;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Pseudo and virtual filesystems that never represent real storage.
pub const DEFAULT_EXCLUDED_FS_TYPES: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "tmpfs",
    "devpts",
    "cgroup",
    "cgroup2",
    "mqueue",
    "hugetlbfs",
    "debugfs",
    "tracefs",
    "pstore",
    "securityfs",
    "rpc_pipefs",
    "configfs",
    "fusectl",
    "overlay",
    "squashfs",
    "autofs",
    "binfmt_misc",
    "nsfs",
    "ramfs",
    "efivarfs",
    "bpf",
    "selinuxfs",
    "cgroupfs",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTypeExclusions(HashSet<String>);

impl FsTypeExclusions {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, fs_type: &str) -> bool {
        self.0.contains(fs_type)
    }
}

impl Default for FsTypeExclusions {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_FS_TYPES.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStats {
    /// Unit of the block counts (`f_frsize`).
    pub block_size: u64,
    pub total_blocks: u64,
    /// Blocks available to unprivileged users.
    pub available_blocks: u64,
}

pub trait FsStats {
    fn block_stats(&self, mount_point: &str) -> Option<BlockStats>;
}

/// `statvfs(3)` on the live system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statvfs;

impl FsStats for Statvfs {
    fn block_stats(&self, mount_point: &str) -> Option<BlockStats> {
        match statvfs(mount_point) {
            Ok(stat) => Some(BlockStats {
                block_size: stat.fragment_size() as u64,
                total_blocks: stat.blocks() as u64,
                available_blocks: stat.blocks_available() as u64,
            }),
            Err(err) => {
                debug!(mount = %mount_point, error = %err, "statvfs не удался, точка монтирования пропущена");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub mount_point: String,
    pub used_percent: f64,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// A mount whose statistics claim more free space than capacity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("доступных блоков ({available_blocks}) больше общего числа ({total_blocks})")]
pub struct MalformedMount {
    pub mount_point: String,
    pub total_blocks: u64,
    pub available_blocks: u64,
}

pub type MountUsage = Result<DiskUsage, MalformedMount>;

/// Usage of every distinct real filesystem in mount-table order. Mounts that
/// cannot be statted or report no capacity are skipped; mounts with
/// inconsistent statistics are kept as errors. Only an unreadable mount table
/// fails the scan.
pub fn scan_disks(
    reader: &impl StatReader,
    fs: &impl FsStats,
    exclusions: &FsTypeExclusions,
) -> Result<Vec<MountUsage>, CollectError> {
    let content = reader.read(StatSource::MountTable)?;

    let mut seen = HashSet::new();
    let mut usages = Vec::new();
    for entry in parse_mounts(&content) {
        if exclusions.contains(&entry.fs_type) {
            continue;
        }
        if !seen.insert(entry.mount_point.clone()) {
            continue;
        }
        let Some(stats) = fs.block_stats(&entry.mount_point) else {
            continue;
        };
        if let Some(usage) = disk_usage(&entry.mount_point, stats) {
            usages.push(usage);
        }
    }
    Ok(usages)
}

fn disk_usage(mount_point: &str, stats: BlockStats) -> Option<MountUsage> {
    if stats.total_blocks == 0 {
        return None;
    }
    if stats.available_blocks > stats.total_blocks {
        warn!(
            mount = %mount_point,
            total_blocks = stats.total_blocks,
            available_blocks = stats.available_blocks,
            "доступных блоков больше общего числа"
        );
        return Some(Err(MalformedMount {
            mount_point: mount_point.to_string(),
            total_blocks: stats.total_blocks,
            available_blocks: stats.available_blocks,
        }));
    }

    let total_bytes = stats.total_blocks.saturating_mul(stats.block_size);
    if total_bytes == 0 {
        return None;
    }
    let available_bytes = stats.available_blocks.saturating_mul(stats.block_size);
    let used_bytes = total_bytes - available_bytes;

    Some(Ok(DiskUsage {
        mount_point: mount_point.to_string(),
        used_percent: used_bytes as f64 / total_bytes as f64 * 100.0,
        used_bytes,
        total_bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::procfs::ReadError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    struct MountTable(Option<&'static str>);

    impl StatReader for MountTable {
        fn read(&self, source: StatSource) -> Result<String, ReadError> {
            assert_eq!(source, StatSource::MountTable);
            self.0
                .map(str::to_string)
                .ok_or_else(|| ReadError::SourceUnavailable {
                    kind: source,
                    error: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
                })
        }
    }

    #[derive(Default)]
    struct FakeFs {
        stats: HashMap<&'static str, BlockStats>,
        queried: RefCell<Vec<String>>,
    }

    impl FakeFs {
        fn with(mut self, mount: &'static str, total: u64, available: u64) -> Self {
            self.stats.insert(
                mount,
                BlockStats {
                    block_size: 4096,
                    total_blocks: total,
                    available_blocks: available,
                },
            );
            self
        }
    }

    fn measured(usages: &[MountUsage]) -> Vec<&DiskUsage> {
        usages
            .iter()
            .map(|u| u.as_ref().expect("ожидалось корректное измерение"))
            .collect()
    }

    impl FsStats for FakeFs {
        fn block_stats(&self, mount_point: &str) -> Option<BlockStats> {
            self.queried.borrow_mut().push(mount_point.to_string());
            self.stats.get(mount_point).copied()
        }
    }

    #[test]
    fn duplicate_mount_points_keep_first_row() {
        let table = MountTable(Some(
            "/dev/sda1 / ext4 rw 0 0\n\
/dev/sdb1 /data xfs rw 0 0\n\
/dev/sdc1 /data ext4 rw 0 0\n",
        ));
        let fs = FakeFs::default().with("/", 100, 50).with("/data", 100, 10);

        let usages = scan_disks(&table, &fs, &FsTypeExclusions::default()).unwrap();
        let usages = measured(&usages);
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[1].mount_point, "/data");
        assert_eq!(fs.queried.borrow().as_slice(), ["/", "/data"]);
    }

    #[test]
    fn excluded_types_are_never_measured() {
        let table = MountTable(Some(
            "tmpfs /run tmpfs rw 0 0\n\
overlay /var/lib/docker/overlay2/x overlay rw 0 0\n\
proc /proc proc rw 0 0\n\
/dev/sda1 / ext4 rw 0 0\n",
        ));
        let fs = FakeFs::default()
            .with("/run", 100, 0)
            .with("/var/lib/docker/overlay2/x", 100, 0)
            .with("/proc", 100, 0)
            .with("/", 100, 90);

        let usages = scan_disks(&table, &fs, &FsTypeExclusions::default()).unwrap();
        let usages = measured(&usages);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].mount_point, "/");
        assert_eq!(fs.queried.borrow().as_slice(), ["/"]);
    }

    #[test]
    fn injected_exclusions_replace_defaults() {
        let table = MountTable(Some("tmpfs /run tmpfs rw 0 0\n/dev/sda1 / ext4 rw 0 0\n"));
        let fs = FakeFs::default().with("/run", 10, 5).with("/", 10, 5);

        let usages = scan_disks(&table, &fs, &FsTypeExclusions::new(["ext4"])).unwrap();
        let usages = measured(&usages);
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].mount_point, "/run");
    }

    #[test]
    fn unstattable_and_empty_mounts_are_skipped() {
        let table = MountTable(Some(
            "/dev/sda1 / ext4 rw 0 0\n\
/dev/sdb1 /gone ext4 rw 0 0\n\
/dev/sdc1 /empty ext4 rw 0 0\n",
        ));
        let fs = FakeFs::default().with("/", 1000, 250).with("/empty", 0, 0);

        let usages = scan_disks(&table, &fs, &FsTypeExclusions::default()).unwrap();
        let usages = measured(&usages);
        assert_eq!(usages.len(), 1);
        let root = usages[0];
        assert_eq!(root.total_bytes, 1000 * 4096);
        assert_eq!(root.used_bytes, 750 * 4096);
        assert!((root.used_percent - 75.0).abs() < 1e-9);
        assert_eq!(root.used_bytes + 250 * 4096, root.total_bytes);
    }

    #[test]
    fn more_available_than_total_is_kept_as_error() {
        let table = MountTable(Some(
            "/dev/sda1 / ext4 rw 0 0\n\
/dev/sdd1 /odd ext4 rw 0 0\n",
        ));
        let fs = FakeFs::default().with("/", 10, 5).with("/odd", 10, 20);

        let usages = scan_disks(&table, &fs, &FsTypeExclusions::default()).unwrap();
        assert_eq!(usages.len(), 2);
        assert!(usages[0].is_ok());
        assert_eq!(
            usages[1],
            Err(MalformedMount {
                mount_point: "/odd".to_string(),
                total_blocks: 10,
                available_blocks: 20,
            })
        );
    }

    #[test]
    fn statvfs_counts_in_fragment_units() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let stats = Statvfs.block_stats(path).unwrap();
        let raw = statvfs(path).unwrap();
        assert_eq!(stats.block_size, raw.fragment_size() as u64);
        assert!(stats.total_blocks > 0);
        assert!(Statvfs.block_stats("/nonexistent/hostname-check").is_none());
    }

    #[test]
    fn unreadable_mount_table_fails_scan() {
        let err = scan_disks(&MountTable(None), &FakeFs::default(), &FsTypeExclusions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CollectError::Read(ReadError::SourceUnavailable { .. })
        ));
    }
}
