//! Detects how much memory the current process may use.
//!
//! [`detector::ContainerMemoryDetector`] walks cgroups v2, cgroups v1 and the
//! host total in that order and returns the first usable byte count, with 0
//! meaning "unknown". [`size`] parses and formats the human notation
//! ("2G", "1.5GB") used for overrides and display.

pub mod cgroups;
pub mod config;
pub mod config_error;
pub mod detector;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod size;

pub use detector::{ContainerMemoryDetector, Detection};
pub use error::{CgroupsError, SizeError};
pub use host::{HostMemoryProbe, MemorySource};
pub use size::{MAX_MEMORY_SIZE, MAX_REALISTIC_MEMORY, format_size, parse_size, validate_size};
