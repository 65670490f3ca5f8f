use std::error::Error;
use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

/// Why a memory size string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeErrorKind {
    Empty,
    NoNumericValue,
    InvalidNumber,
    UnsupportedUnit,
    Negative,
    ExceedsMaximum,
}

impl SizeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeErrorKind::Empty => "empty memory string",
            SizeErrorKind::NoNumericValue => "no numeric value found",
            SizeErrorKind::InvalidNumber => "invalid numeric value",
            SizeErrorKind::UnsupportedUnit => "unsupported unit",
            SizeErrorKind::Negative => "negative memory size not allowed",
            SizeErrorKind::ExceedsMaximum => "memory size exceeds maximum supported size",
        }
    }
}

/// A memory size that could not be parsed or is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeError {
    input: String,
    kind: SizeErrorKind,
}

impl SizeError {
    pub fn new(input: impl Into<String>, kind: SizeErrorKind) -> Self {
        Self {
            input: input.into(),
            kind,
        }
    }

    pub fn kind(&self) -> SizeErrorKind {
        self.kind
    }

    /// The offending input, as the caller supplied it.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}'", self.kind.as_str(), self.input)
    }
}

impl Error for SizeError {}

#[derive(Debug)]
pub enum CgroupsErrorKind {
    Io(io::Error),
    EmptyFile,
    Parse(ParseIntError),
}

/// A cgroups limit file that could not be opened, read or parsed.
#[derive(Debug)]
pub struct CgroupsError {
    path: PathBuf,
    kind: CgroupsErrorKind,
}

impl CgroupsError {
    pub fn new(path: &Path, kind: CgroupsErrorKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &CgroupsErrorKind {
        &self.kind
    }

    pub fn is_not_found(&self) -> bool {
        matches!(&self.kind, CgroupsErrorKind::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

impl fmt::Display for CgroupsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CgroupsErrorKind::Io(e) => {
                write!(f, "Failed to read cgroups file {:?}: {}", self.path, e)
            }
            CgroupsErrorKind::EmptyFile => {
                write!(f, "Cgroups file {:?} has no readable line", self.path)
            }
            CgroupsErrorKind::Parse(e) => {
                write!(f, "Failed to parse cgroups file {:?}: {}", self.path, e)
            }
        }
    }
}

impl Error for CgroupsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            CgroupsErrorKind::Io(e) => Some(e),
            CgroupsErrorKind::Parse(e) => Some(e),
            CgroupsErrorKind::EmptyFile => None,
        }
    }
}
