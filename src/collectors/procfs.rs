//! Readers and line parsers for the kernel text interfaces under `/proc`.
//!
//! Parsers are pure functions over the file content so they can be fed
//! synthetic input in tests; [`ProcFs`] only knows where the files live.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Logical name of a kernel statistics source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatSource {
    CpuStats,
    MemoryStats,
    MountTable,
}

impl StatSource {
    fn relative_path(self) -> &'static str {
        match self {
            Self::CpuStats => "stat",
            Self::MemoryStats => "meminfo",
            Self::MountTable => "self/mounts",
        }
    }
}

impl fmt::Display for StatSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CpuStats => "cpu-stats",
            Self::MemoryStats => "memory-stats",
            Self::MountTable => "mount-table",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("источник {kind} недоступен: {error}")]
    SourceUnavailable {
        kind: StatSource,
        #[source]
        error: io::Error,
    },
    #[error("некорректные данные в {kind}: {reason}")]
    MalformedData { kind: StatSource, reason: String },
}

impl ReadError {
    fn malformed(kind: StatSource, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            kind,
            reason: reason.into(),
        }
    }
}

/// Source of raw kernel statistics text.
pub trait StatReader {
    fn read(&self, source: StatSource) -> Result<String, ReadError>;
}

/// Reads statistics from a procfs mount, `/proc` by default.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl StatReader for ProcFs {
    fn read(&self, source: StatSource) -> Result<String, ReadError> {
        let path = self.root.join(source.relative_path());
        fs::read_to_string(&path).map_err(|error| ReadError::SourceUnavailable {
            kind: source,
            error,
        })
    }
}

/// Cumulative CPU tick counters from the aggregate `cpu ` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// idle + iowait
    pub idle_ticks: u64,
    pub total_ticks: u64,
}

impl fmt::Display for CpuSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total={} idle={}", self.total_ticks, self.idle_ticks)
    }
}

pub fn parse_cpu_snapshot(content: &str) -> Result<CpuSnapshot, ReadError> {
    let kind = StatSource::CpuStats;
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ReadError::malformed(kind, "строка cpu не найдена"))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|_| ReadError::malformed(kind, format!("некорректный счётчик '{field}'")))
        })
        .collect::<Result<Vec<u64>, _>>()?;

    if values.len() < 4 {
        return Err(ReadError::malformed(
            kind,
            format!("ожидалось минимум 4 счётчика, получено {}", values.len()),
        ));
    }

    let idle_ticks = values[3].saturating_add(values.get(4).copied().unwrap_or(0));
    let total_ticks = values.iter().fold(0_u64, |acc, v| acc.saturating_add(*v));

    Ok(CpuSnapshot {
        idle_ticks,
        total_ticks,
    })
}

/// Memory totals in bytes. A field is `None` when its line is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_bytes: Option<u64>,
    pub available_bytes: Option<u64>,
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo, ReadError> {
    let mut info = MemInfo::default();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            info.total_bytes = Some(parse_kib(rest, "MemTotal")?);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            info.available_bytes = Some(parse_kib(rest, "MemAvailable")?);
        }
        if info.total_bytes.is_some() && info.available_bytes.is_some() {
            break;
        }
    }
    Ok(info)
}

fn parse_kib(rest: &str, field: &str) -> Result<u64, ReadError> {
    let kind = StatSource::MemoryStats;
    let raw = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| ReadError::malformed(kind, format!("{field}: нет значения")))?;
    let kib = raw
        .parse::<u64>()
        .map_err(|_| ReadError::malformed(kind, format!("{field}: некорректное значение '{raw}'")))?;
    kib.checked_mul(1024)
        .ok_or_else(|| ReadError::malformed(kind, format!("{field}: переполнение")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_point: String,
    pub fs_type: String,
}

/// Parses `device mountpoint fstype options dump pass` rows. Rows with fewer
/// than three fields are skipped.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                mount_point: unescape_mount_path(mount_point),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

// The kernel writes space, tab, newline and backslash in mount paths as
// three-digit octal escapes (`\040`).
fn unescape_mount_path(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 4])
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(v) = decoded {
                out.push(v);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
