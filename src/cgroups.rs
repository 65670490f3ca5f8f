use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CgroupsError, CgroupsErrorKind};

pub const DEFAULT_CGROUPS_V2_PATH: &str = "/sys/fs/cgroup/memory.max";
pub const DEFAULT_CGROUPS_V1_PATH: &str = "/sys/fs/cgroup/memory/memory.limit_in_bytes";

/// The content of a memory limit file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupLimit {
    Limited(u64),
    Unlimited,
}

fn read_first_line(path: &Path) -> Result<String, CgroupsError> {
    let file = File::open(path).map_err(|e| CgroupsError::new(path, CgroupsErrorKind::Io(e)))?;
    let mut line = String::new();
    let n = BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| CgroupsError::new(path, CgroupsErrorKind::Io(e)))?;
    if n == 0 {
        return Err(CgroupsError::new(path, CgroupsErrorKind::EmptyFile));
    }
    Ok(line.trim().to_string())
}

fn parse_limit(path: &Path, line: &str) -> Result<CgroupLimit, CgroupsError> {
    line.parse::<u64>()
        .map(CgroupLimit::Limited)
        .map_err(|e| CgroupsError::new(path, CgroupsErrorKind::Parse(e)))
}

/// Reads a cgroups v2 `memory.max` file: either `max` or a byte count.
pub fn read_cgroups_v2(path: &Path) -> Result<CgroupLimit, CgroupsError> {
    let line = read_first_line(path)?;
    if line == "max" {
        return Ok(CgroupLimit::Unlimited);
    }
    parse_limit(path, &line)
}

/// Reads a cgroups v1 `memory.limit_in_bytes` file. There is no `max` token
/// in this format; "unlimited" shows up as a huge integer.
pub fn read_cgroups_v1(path: &Path) -> Result<CgroupLimit, CgroupsError> {
    let line = read_first_line(path)?;
    parse_limit(path, &line)
}
