use byte_unit::{Byte, UnitType};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::host::MemorySource;

// --- Enums ---

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize, ValueEnum)]
#[repr(u8)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn to_log_level(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
#[repr(u8)]
pub enum LogMode {
    Compact = 0,
    Json = 1,
}

impl LogMode {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => LogMode::Json,
            _ => LogMode::Compact,
        }
    }
}

// --- Event Definition ---

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum DetectorEvent {
    // Generic Message Wrapper
    Message {
        #[serde(skip)]
        level: LogLevel,
        text: String,
    },

    SourceUnavailable {
        source: MemorySource,
        reason: String,
    },
    LimitUnrealistic {
        source: MemorySource,
        limit_bytes: u64,
        ceiling_bytes: u64,
    },
    LimitUnset {
        source: MemorySource,
    },
    MemoryDetected {
        source: MemorySource,
        bytes: u64,
    },
    NothingDetected {
        host_supported: bool,
    },
    OverrideApplied {
        origin: String,
        bytes: u64,
    },
}

fn human(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

// --- Display Implementation (for Compact Mode) ---
impl fmt::Display for DetectorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorEvent::Message { text, .. } => write!(f, "{}", text),

            DetectorEvent::SourceUnavailable { source, reason } => {
                write!(f, "{} unavailable: {}", source, reason)
            }
            DetectorEvent::LimitUnrealistic {
                source,
                limit_bytes,
                ceiling_bytes,
            } => write!(
                f,
                "{} limit {} is above {}, treating as unlimited",
                source,
                human(*limit_bytes),
                human(*ceiling_bytes)
            ),
            DetectorEvent::LimitUnset { source } => {
                write!(f, "{} reports no limit", source)
            }
            DetectorEvent::MemoryDetected { source, bytes } => {
                write!(f, "Detected {} from {}", human(*bytes), source)
            }
            DetectorEvent::NothingDetected { host_supported } => {
                if *host_supported {
                    write!(f, "No memory information found")
                } else {
                    write!(f, "No memory information found (platform unsupported)")
                }
            }
            DetectorEvent::OverrideApplied { origin, bytes } => {
                write!(f, "Using total memory {} from {}", human(*bytes), origin)
            }
        }
    }
}

impl DetectorEvent {
    /// Determines the log severity of the current event.
    pub fn severity(&self) -> LogLevel {
        match self {
            DetectorEvent::Message { level, .. } => *level,

            DetectorEvent::SourceUnavailable { .. }
            | DetectorEvent::LimitUnrealistic { .. }
            | DetectorEvent::LimitUnset { .. } => LogLevel::Debug,

            DetectorEvent::MemoryDetected { .. } | DetectorEvent::OverrideApplied { .. } => {
                LogLevel::Info
            }

            DetectorEvent::NothingDetected { .. } => LogLevel::Warn,
        }
    }

    pub fn emit(&self) {
        crate::logging::emit(self);
    }
}
