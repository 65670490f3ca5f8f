use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cgroups::{DEFAULT_CGROUPS_V1_PATH, DEFAULT_CGROUPS_V2_PATH};
use crate::config_error::ConfigError;
use crate::detector::ContainerMemoryDetector;
use crate::events::DetectorEvent;
use crate::host::{DEFAULT_MEMINFO_PATH, HostMemoryProbe, LinuxProbe};
use crate::size::{format_size, parse_size};

pub const TOTAL_MEMORY_ENV: &str = "RAM_DETECTOR_TOTAL_MEMORY";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit size that replaces detection entirely, e.g. "2G".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_memory: Option<String>,

    /// Cgroups limits above this size count as "no limit".
    #[serde(default)]
    pub realistic_limit: Option<String>,

    #[serde(default)]
    pub cgroups_v2_path: Option<PathBuf>,
    #[serde(default)]
    pub cgroups_v1_path: Option<PathBuf>,
    #[serde(default)]
    pub meminfo_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub total_memory: Option<MemoryOverride>,
    pub detector: ContainerMemoryDetector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOverride {
    pub bytes: u64,
    pub origin: String,
}

/// What the CLI reports: either the override or the detection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryReport {
    pub bytes: u64,
    pub formatted: String,
    pub source: String,
    pub overridden: bool,
}

impl Config {
    pub fn load(cli_config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
        match cli_config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::ConfigFileNotFound(path));
                }
                Self::parse_file(&path)
            }
            None => Self::find_and_load_config(),
        }
    }

    fn find_and_load_config() -> Result<Config, ConfigError> {
        if let Some(config_home) = directories::BaseDirs::new().map(|b| b.config_dir().to_path_buf()) {
            let extensions = ["yaml", "yml", "json", "toml"];
            for ext in &extensions {
                let path = config_home.join(format!("ram-detector.{}", ext));
                if path.exists() {
                    return Self::parse_file(&path);
                }
            }
        }

        info!("No configuration file found. Using defaults.");
        Ok(Config::default())
    }

    pub fn parse_file(path: &Path) -> Result<Config, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;

        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("yaml");
        let parse_err = |e: String| ConfigError::FileParse(path.to_path_buf(), e);

        match ext {
            "json" => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
            "toml" => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
            _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Defaults spelled out, for `--print-config`.
    pub fn sane_defaults() -> Config {
        Config {
            total_memory: None,
            realistic_limit: Some("1T".to_string()),
            cgroups_v2_path: Some(PathBuf::from(DEFAULT_CGROUPS_V2_PATH)),
            cgroups_v1_path: Some(PathBuf::from(DEFAULT_CGROUPS_V1_PATH)),
            meminfo_path: Some(PathBuf::from(DEFAULT_MEMINFO_PATH)),
        }
    }

    /// Validates sizes and builds the detector. `env` is `std::env::var`
    /// in production; a non-blank `RAM_DETECTOR_TOTAL_MEMORY` beats the file.
    pub fn into_context<F>(self, env: F) -> Result<RuntimeContext, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let total_memory = match env(TOTAL_MEMORY_ENV).filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(parse_override(&value, TOTAL_MEMORY_ENV)?),
            None => match &self.total_memory {
                Some(value) => Some(parse_override(value, "totalMemory")?),
                None => None,
            },
        };

        let mut detector = ContainerMemoryDetector::new();
        if let Some(limit) = &self.realistic_limit {
            let bytes = parse_size(limit)
                .map_err(|e| ConfigError::InvalidSize("realisticLimit".to_string(), e))?;
            if bytes == 0 {
                return Err(ConfigError::RealisticLimitZero);
            }
            detector = detector.with_realistic_limit(bytes);
        }
        if let Some(path) = self.cgroups_v2_path {
            detector = detector.with_cgroups_v2_path(path);
        }
        if let Some(path) = self.cgroups_v1_path {
            detector = detector.with_cgroups_v1_path(path);
        }
        // Only meaningful where the host probe actually reads meminfo.
        if let Some(path) = self.meminfo_path {
            if let HostMemoryProbe::Linux(_) = detector.host_probe() {
                detector = detector.with_host_probe(HostMemoryProbe::Linux(LinuxProbe::new(path)));
            }
        }

        Ok(RuntimeContext {
            total_memory,
            detector,
        })
    }
}

fn parse_override(value: &str, origin: &str) -> Result<MemoryOverride, ConfigError> {
    let bytes = parse_size(value).map_err(|e| ConfigError::InvalidSize(origin.to_string(), e))?;
    Ok(MemoryOverride {
        bytes,
        origin: origin.to_string(),
    })
}

impl RuntimeContext {
    /// An override from the command line beats every other setting.
    pub fn with_override(mut self, bytes: u64, origin: &str) -> Self {
        self.total_memory = Some(MemoryOverride {
            bytes,
            origin: origin.to_string(),
        });
        self
    }

    pub fn resolve(&self) -> MemoryReport {
        if let Some(o) = &self.total_memory {
            DetectorEvent::OverrideApplied {
                origin: o.origin.clone(),
                bytes: o.bytes,
            }
            .emit();
            return MemoryReport {
                bytes: o.bytes,
                formatted: format_size(o.bytes as i64),
                source: o.origin.clone(),
                overridden: true,
            };
        }

        let detection = self.detector.detect_with_source();
        MemoryReport {
            bytes: detection.bytes,
            formatted: format_size(detection.bytes as i64),
            source: detection.source.to_string(),
            overridden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SizeErrorKind;
    use crate::size::{GIB, MAX_REALISTIC_MEMORY, MIB};
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_each_file_format() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("ram-detector.yaml");
        fs::write(&yaml, "totalMemory: 2G\nrealisticLimit: 512G\n").unwrap();
        let json = dir.path().join("ram-detector.json");
        fs::write(&json, r#"{"totalMemory": "2G", "realisticLimit": "512G"}"#).unwrap();
        let toml_path = dir.path().join("ram-detector.toml");
        fs::write(&toml_path, "totalMemory = \"2G\"\nrealisticLimit = \"512G\"\n").unwrap();

        for path in [yaml, json, toml_path] {
            let config = Config::load(Some(path.clone())).unwrap();
            assert_eq!(config.total_memory.as_deref(), Some("2G"), "{:?}", path);
            assert_eq!(config.realistic_limit.as_deref(), Some("512G"), "{:?}", path);
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigFileNotFound(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ram-detector.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(Some(path)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn env_beats_file() {
        let config = Config {
            total_memory: Some("1G".to_string()),
            ..Config::default()
        };
        let ctx = config
            .into_context(|key| (key == TOTAL_MEMORY_ENV).then(|| "512M".to_string()))
            .unwrap();

        let o = ctx.total_memory.unwrap();
        assert_eq!(o.bytes, 512 * MIB);
        assert_eq!(o.origin, TOTAL_MEMORY_ENV);
    }

    #[test]
    fn blank_env_is_ignored() {
        let config = Config {
            total_memory: Some("1G".to_string()),
            ..Config::default()
        };
        let ctx = config.into_context(|_| Some("  ".to_string())).unwrap();
        assert_eq!(ctx.total_memory.unwrap().bytes, GIB);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let config = Config {
            total_memory: Some("lots".to_string()),
            ..Config::default()
        };
        match config.into_context(no_env).unwrap_err() {
            ConfigError::InvalidSize(field, e) => {
                assert_eq!(field, "totalMemory");
                assert_eq!(e.kind(), SizeErrorKind::NoNumericValue);
            }
            other => panic!("unexpected error: {}", other),
        }

        let zero = Config {
            realistic_limit: Some("0".to_string()),
            ..Config::default()
        };
        assert_eq!(zero.into_context(no_env).unwrap_err().exit_code(), 12);
    }

    #[test]
    fn defaults_build_default_detector() {
        let ctx = Config::sane_defaults().into_context(no_env).unwrap();
        assert!(ctx.total_memory.is_none());
        assert_eq!(ctx.detector.realistic_limit(), MAX_REALISTIC_MEMORY);
        assert_eq!(
            ctx.detector.cgroups_v2_path(),
            Path::new(DEFAULT_CGROUPS_V2_PATH)
        );
    }

    #[test]
    fn sane_defaults_round_trip_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::sane_defaults()).unwrap();
        assert!(!yaml.contains("totalMemory"));
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, Config::sane_defaults());
    }

    #[test]
    fn resolve_prefers_override() {
        let ctx = Config::default()
            .into_context(no_env)
            .unwrap()
            .with_override(2 * GIB, "--total-memory");

        let report = ctx.resolve();
        assert_eq!(report.bytes, 2 * GIB);
        assert_eq!(report.formatted, "2.00 GB");
        assert_eq!(report.source, "--total-memory");
        assert!(report.overridden);
    }

    #[test]
    fn resolve_runs_detection() {
        let dir = tempdir().unwrap();
        let v2 = dir.path().join("memory.max");
        fs::write(&v2, "536870912\n").unwrap();

        let config = Config {
            cgroups_v2_path: Some(v2),
            ..Config::default()
        };
        let report = config.into_context(no_env).unwrap().resolve();
        assert_eq!(report.bytes, 512 * MIB);
        assert_eq!(report.formatted, "512 MB");
        assert_eq!(report.source, "cgroups-v2");
        assert!(!report.overridden);
    }
}
