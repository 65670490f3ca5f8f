use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::error::SizeError;

#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, io::Error),
    FileParse(PathBuf, String),
    ConfigFileNotFound(PathBuf),
    InvalidSize(String, SizeError), // field_name, error
    RealisticLimitZero,
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::FileRead(..) => 2,
            ConfigError::ConfigFileNotFound(_) => 2,
            ConfigError::FileParse(..) => 3,
            ConfigError::InvalidSize(..) => 10,
            ConfigError::RealisticLimitZero => 12,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => write!(f, "Error reading config file {:?}: {}", path, e),
            ConfigError::FileParse(path, e) => write!(f, "Error parsing config file {:?}: {}", path, e),
            ConfigError::ConfigFileNotFound(path) => write!(f, "Config file specified but not found: {:?}", path),
            ConfigError::InvalidSize(field, e) => write!(f, "Invalid size in {}: {}", field, e),
            ConfigError::RealisticLimitZero => write!(f, "realisticLimit must be greater than zero"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::FileRead(_, e) => Some(e),
            ConfigError::InvalidSize(_, e) => Some(e),
            _ => None,
        }
    }
}
