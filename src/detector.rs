//! The detection cascade: cgroups v2, then cgroups v1, then the host total.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cgroups::{
    CgroupLimit, DEFAULT_CGROUPS_V1_PATH, DEFAULT_CGROUPS_V2_PATH, read_cgroups_v1,
    read_cgroups_v2,
};
use crate::error::CgroupsError;
use crate::events::DetectorEvent;
use crate::host::{HostMemoryProbe, MemorySource};
use crate::size::MAX_REALISTIC_MEMORY;

/// Outcome of consulting a single source.
#[derive(Debug)]
pub enum SourceReading {
    Value(u64),
    /// The source answered, but with "no limit".
    NotPresent,
    Failed(CgroupsError),
}

impl SourceReading {
    /// Cascade rule: only a value stops the search. `NotPresent` and
    /// `Failed` both move on to the next source.
    pub fn accepted(&self) -> Option<u64> {
        match self {
            SourceReading::Value(v) => Some(*v),
            SourceReading::NotPresent | SourceReading::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub bytes: u64,
    pub source: MemorySource,
}

impl Detection {
    pub fn undetected() -> Self {
        Self {
            bytes: 0,
            source: MemorySource::Undetected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerMemoryDetector {
    cgroups_v2_path: PathBuf,
    cgroups_v1_path: PathBuf,
    realistic_limit: u64,
    host: HostMemoryProbe,
}

impl Default for ContainerMemoryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerMemoryDetector {
    pub fn new() -> Self {
        Self {
            cgroups_v2_path: PathBuf::from(DEFAULT_CGROUPS_V2_PATH),
            cgroups_v1_path: PathBuf::from(DEFAULT_CGROUPS_V1_PATH),
            realistic_limit: MAX_REALISTIC_MEMORY,
            host: HostMemoryProbe::for_current_platform(),
        }
    }

    pub fn with_cgroups_v2_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cgroups_v2_path = path.into();
        self
    }

    pub fn with_cgroups_v1_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cgroups_v1_path = path.into();
        self
    }

    /// Limits strictly above this are read as "unlimited".
    pub fn with_realistic_limit(mut self, bytes: u64) -> Self {
        self.realistic_limit = bytes;
        self
    }

    pub fn with_host_probe(mut self, host: HostMemoryProbe) -> Self {
        self.host = host;
        self
    }

    pub fn cgroups_v2_path(&self) -> &Path {
        &self.cgroups_v2_path
    }

    pub fn cgroups_v1_path(&self) -> &Path {
        &self.cgroups_v1_path
    }

    pub fn realistic_limit(&self) -> u64 {
        self.realistic_limit
    }

    pub fn host_probe(&self) -> &HostMemoryProbe {
        &self.host
    }

    /// Memory available to this process in bytes; 0 when nothing is known.
    pub fn detect(&self) -> u64 {
        self.detect_with_source().bytes
    }

    pub fn detect_with_source(&self) -> Detection {
        let v2 = self.reading(MemorySource::CgroupsV2, read_cgroups_v2(&self.cgroups_v2_path));
        if let Some(bytes) = v2.accepted() {
            return self.detected(bytes, MemorySource::CgroupsV2);
        }

        let v1 = self.reading(MemorySource::CgroupsV1, read_cgroups_v1(&self.cgroups_v1_path));
        if let Some(bytes) = v1.accepted() {
            return self.detected(bytes, MemorySource::CgroupsV1);
        }

        let (bytes, source) = self.host.detect_host_memory_with_source();
        if bytes == 0 {
            DetectorEvent::NothingDetected {
                host_supported: self.host.is_supported(),
            }
            .emit();
            return Detection::undetected();
        }
        self.detected(bytes, source)
    }

    /// A zero byte count is the "unknown" sentinel and carries no provenance,
    /// even when a limit file literally contains `0`.
    fn detected(&self, bytes: u64, source: MemorySource) -> Detection {
        if bytes == 0 {
            return Detection::undetected();
        }
        DetectorEvent::MemoryDetected { source, bytes }.emit();
        Detection { bytes, source }
    }

    fn reading(
        &self,
        source: MemorySource,
        result: Result<CgroupLimit, CgroupsError>,
    ) -> SourceReading {
        match &result {
            Ok(CgroupLimit::Limited(bytes)) if *bytes > self.realistic_limit => {
                DetectorEvent::LimitUnrealistic {
                    source,
                    limit_bytes: *bytes,
                    ceiling_bytes: self.realistic_limit,
                }
                .emit()
            }
            Ok(CgroupLimit::Limited(_)) => {}
            Ok(CgroupLimit::Unlimited) => DetectorEvent::LimitUnset { source }.emit(),
            Err(e) => DetectorEvent::SourceUnavailable {
                source,
                reason: e.to_string(),
            }
            .emit(),
        }
        classify(result, self.realistic_limit)
    }
}

/// Maps a raw limit file result onto the cascade's three outcomes.
pub fn classify(result: Result<CgroupLimit, CgroupsError>, realistic_limit: u64) -> SourceReading {
    match result {
        Ok(CgroupLimit::Limited(bytes)) if bytes <= realistic_limit => SourceReading::Value(bytes),
        Ok(CgroupLimit::Limited(_)) | Ok(CgroupLimit::Unlimited) => SourceReading::NotPresent,
        Err(e) => SourceReading::Failed(e),
    }
}
