//! Total installed memory of the host, used when no cgroups limit applies.
//!
//! Linux reads `MemTotal` from `/proc/meminfo`. Apple platforms ask `sysinfo`
//! and fall back to a rough estimate derived from this process's own
//! footprint. Everything else reports nothing.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use sysinfo::{MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

use crate::size::{GIB, KIB};

pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";

/// Which data source produced a detected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemorySource {
    CgroupsV2,
    CgroupsV1,
    HostTotal,
    /// Not a measurement; see [`DarwinHeuristicProbe`].
    HostEstimate,
    Undetected,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::CgroupsV2 => "cgroups-v2",
            MemorySource::CgroupsV1 => "cgroups-v1",
            MemorySource::HostTotal => "host-total",
            MemorySource::HostEstimate => "host-estimate",
            MemorySource::Undetected => "undetected",
        }
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LinuxProbe {
    meminfo_path: PathBuf,
}

impl LinuxProbe {
    pub fn new(meminfo_path: impl Into<PathBuf>) -> Self {
        Self {
            meminfo_path: meminfo_path.into(),
        }
    }

    pub fn meminfo_path(&self) -> &Path {
        &self.meminfo_path
    }

    pub fn detect(&self) -> u64 {
        match File::open(&self.meminfo_path) {
            Ok(file) => parse_meminfo_total(BufReader::new(file)).unwrap_or(0),
            Err(_) => 0,
        }
    }
}

impl Default for LinuxProbe {
    fn default() -> Self {
        Self::new(DEFAULT_MEMINFO_PATH)
    }
}

/// Scans meminfo-formatted text for `MemTotal:` and returns it in bytes.
pub fn parse_meminfo_total<R: BufRead>(reader: R) -> Option<u64> {
    for line in reader.lines() {
        // An unreadable line ends the scan the same way EOF does.
        let line = line.ok()?;
        if line.starts_with("MemTotal:") {
            let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
            return kib.checked_mul(KIB);
        }
    }
    None
}

/// Apple host memory. Asks `sysinfo` for the real total first; only when
/// that reads 0 does it fall back to an estimate that scales this process's
/// resident footprint by [`Self::FACTOR`] and clamps the result. The estimate
/// is reported as [`MemorySource::HostEstimate`], never as a measurement.
#[derive(Debug, Clone, Default)]
pub struct DarwinHeuristicProbe;

impl DarwinHeuristicProbe {
    pub const FACTOR: u64 = 32;
    pub const MIN: u64 = GIB;
    pub const MAX: u64 = 128 * GIB;

    pub fn detect(&self) -> (u64, MemorySource) {
        Self::choose(system_total_memory(), current_process_footprint)
    }

    /// Prefers a real total; the footprint is only read when it is missing.
    pub fn choose<F>(total: u64, footprint: F) -> (u64, MemorySource)
    where
        F: FnOnce() -> u64,
    {
        if total > 0 {
            return (total, MemorySource::HostTotal);
        }
        match Self::estimate_from_footprint(footprint()) {
            0 => (0, MemorySource::Undetected),
            estimate => (estimate, MemorySource::HostEstimate),
        }
    }

    /// Zero footprint means the footprint itself could not be read.
    pub fn estimate_from_footprint(footprint: u64) -> u64 {
        if footprint == 0 {
            return 0;
        }
        footprint
            .saturating_mul(Self::FACTOR)
            .clamp(Self::MIN, Self::MAX)
    }
}

fn system_total_memory() -> u64 {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
    );
    sys.refresh_memory();
    sys.total_memory()
}

fn current_process_footprint() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut sys = System::new_with_specifics(RefreshKind::nothing());
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_memory(),
    );
    sys.process(pid).map_or(0, |p| p.memory())
}

/// Platform strategy for reading host memory.
#[derive(Debug, Clone)]
pub enum HostMemoryProbe {
    Linux(LinuxProbe),
    DarwinHeuristic(DarwinHeuristicProbe),
    Unsupported,
}

impl HostMemoryProbe {
    pub fn for_current_platform() -> Self {
        if cfg!(target_os = "linux") {
            HostMemoryProbe::Linux(LinuxProbe::default())
        } else if cfg!(target_vendor = "apple") {
            HostMemoryProbe::DarwinHeuristic(DarwinHeuristicProbe)
        } else {
            HostMemoryProbe::Unsupported
        }
    }

    /// Returns total host memory in bytes, or 0 when it cannot be determined.
    pub fn detect_host_memory(&self) -> u64 {
        self.detect_host_memory_with_source().0
    }

    /// Like [`Self::detect_host_memory`], tagged with where the value came
    /// from. A zero value is always [`MemorySource::Undetected`].
    pub fn detect_host_memory_with_source(&self) -> (u64, MemorySource) {
        match self {
            HostMemoryProbe::Linux(p) => match p.detect() {
                0 => (0, MemorySource::Undetected),
                bytes => (bytes, MemorySource::HostTotal),
            },
            HostMemoryProbe::DarwinHeuristic(p) => p.detect(),
            HostMemoryProbe::Unsupported => (0, MemorySource::Undetected),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, HostMemoryProbe::Unsupported)
    }
}

impl Default for HostMemoryProbe {
    fn default() -> Self {
        Self::for_current_platform()
    }
}
