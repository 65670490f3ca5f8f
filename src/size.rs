//! Parsing and formatting of human memory sizes ("2G", "512M", "1.5GB").
//!
//! All units are powers of 1024. Parsing is strict about range: anything
//! above [`MAX_MEMORY_SIZE`] is rejected rather than clamped.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{SizeError, SizeErrorKind};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const TIB: u64 = 1024 * GIB;

/// Largest size accepted from user input: 1024 TiB.
pub const MAX_MEMORY_SIZE: u64 = 1024 * TIB;

/// Cgroups limits above this are treated as "no limit configured".
pub const MAX_REALISTIC_MEMORY: u64 = TIB;

static SPLIT_RE: OnceLock<Regex> = OnceLock::new();

fn split_re() -> &'static Regex {
    // Leading number (optional '-', digits, at most one '.'), then the unit.
    SPLIT_RE.get_or_init(|| Regex::new(r"(?s)^(-?[0-9]*\.?[0-9]*)(.*)$").expect("static regex"))
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit {
        "" | "b" => Some(1),
        "k" | "kb" => Some(KIB),
        "m" | "mb" => Some(MIB),
        "g" | "gb" => Some(GIB),
        "t" | "tb" => Some(TIB),
        _ => None,
    }
}

/// Parses a memory size string into a byte count.
///
/// Accepts a bare integer (bytes) or a decimal number followed by one of
/// `B`, `K`/`KB`, `M`/`MB`, `G`/`GB`, `T`/`TB`, case-insensitively. The
/// product is truncated toward zero.
pub fn parse_size(input: &str) -> Result<u64, SizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeError::new(input, SizeErrorKind::Empty));
    }

    let lower = trimmed.to_ascii_lowercase();

    if let Ok(bytes) = lower.parse::<u64>() {
        if bytes > MAX_MEMORY_SIZE {
            return Err(SizeError::new(input, SizeErrorKind::ExceedsMaximum));
        }
        return Ok(bytes);
    }

    let Some(caps) = split_re().captures(&lower) else {
        return Err(SizeError::new(input, SizeErrorKind::InvalidNumber));
    };
    let numeric = caps.get(1).map_or("", |m| m.as_str());
    let unit = caps.get(2).map_or("", |m| m.as_str()).trim();

    if numeric.is_empty() {
        return Err(SizeError::new(input, SizeErrorKind::NoNumericValue));
    }
    let value: f64 = match numeric.parse() {
        Ok(v) if f64::is_finite(v) => v,
        _ => return Err(SizeError::new(input, SizeErrorKind::InvalidNumber)),
    };
    if value < 0.0 {
        return Err(SizeError::new(input, SizeErrorKind::Negative));
    }

    let multiplier = unit_multiplier(unit)
        .ok_or_else(|| SizeError::new(input, SizeErrorKind::UnsupportedUnit))?;

    let product = value * multiplier as f64;
    if product > MAX_MEMORY_SIZE as f64 {
        return Err(SizeError::new(input, SizeErrorKind::ExceedsMaximum));
    }

    Ok(product.trunc() as u64)
}

/// Renders a byte count for humans. Non-positive values render as `Unknown`.
pub fn format_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "Unknown".to_string();
    }
    let bytes = bytes as u64;
    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Checks a byte count obtained without [`parse_size`] against the same bounds.
pub fn validate_size(bytes: i64) -> Result<(), SizeError> {
    if bytes < 0 {
        return Err(SizeError::new(bytes.to_string(), SizeErrorKind::Negative));
    }
    if bytes as u64 > MAX_MEMORY_SIZE {
        return Err(SizeError::new(
            bytes.to_string(),
            SizeErrorKind::ExceedsMaximum,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_ok(s: &str, expected: u64) {
        assert_eq!(parse_size(s).unwrap(), expected, "parsing '{}'", s);
    }

    #[track_caller]
    fn assert_err(s: &str, expected: SizeErrorKind) {
        let err = parse_size(s).unwrap_err();
        assert_eq!(err.kind(), expected, "parsing '{}'", s);
        assert_eq!(err.input(), s);
    }

    #[test]
    fn parses_bare_integers_as_bytes() {
        assert_ok("0", 0);
        assert_ok("1024", 1024);
        assert_ok("  4096 ", 4096);
    }

    #[test]
    fn parses_unit_suffixes() {
        assert_ok("512B", 512);
        assert_ok("1K", KIB);
        assert_ok("1kb", KIB);
        assert_ok("512M", 536_870_912);
        assert_ok("512mb", 512 * MIB);
        assert_ok("2G", 2 * GIB);
        assert_ok("2Gb", 2 * GIB);
        assert_ok("1t", TIB);
        assert_ok("1TB", TIB);
        assert_ok("3 GB", 3 * GIB);
    }

    #[test]
    fn parses_decimals_with_truncation() {
        assert_ok("1.5G", 1_610_612_736);
        assert_ok("0.5k", 512);
        assert_ok("1.0009K", 1024);
        assert_ok(".5M", MIB / 2);
        assert_ok("1.", 1);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_err("", SizeErrorKind::Empty);
        assert_err("   ", SizeErrorKind::Empty);
        assert_err("GB", SizeErrorKind::NoNumericValue);
        assert_err("abc", SizeErrorKind::NoNumericValue);
        assert_err("-1G", SizeErrorKind::Negative);
        assert_err("-5", SizeErrorKind::Negative);
        assert_err("1X", SizeErrorKind::UnsupportedUnit);
        assert_err("1gib", SizeErrorKind::UnsupportedUnit);
        assert_err(".G", SizeErrorKind::InvalidNumber);
        assert_err("-", SizeErrorKind::InvalidNumber);
        assert_err("+1G", SizeErrorKind::NoNumericValue);
    }

    #[test]
    fn everything_after_the_number_is_the_unit() {
        assert_err("1G!", SizeErrorKind::UnsupportedUnit);
        assert_err("1.2.3G", SizeErrorKind::UnsupportedUnit);
        assert_err("12abc3", SizeErrorKind::UnsupportedUnit);
        assert_err("1e3K", SizeErrorKind::UnsupportedUnit);
        assert_err("1 G B", SizeErrorKind::UnsupportedUnit);
    }

    #[test]
    fn units_are_ascii_only() {
        // U+212A KELVIN SIGN lowercases to 'k' under Unicode rules.
        assert_err("1\u{212A}", SizeErrorKind::UnsupportedUnit);
        assert_err("1\u{212A}B", SizeErrorKind::UnsupportedUnit);
    }

    #[test]
    fn enforces_maximum_size() {
        assert_ok("1024T", MAX_MEMORY_SIZE);
        assert_ok(&MAX_MEMORY_SIZE.to_string(), MAX_MEMORY_SIZE);
        assert_err("1025T", SizeErrorKind::ExceedsMaximum);
        assert_err("1024.5TB", SizeErrorKind::ExceedsMaximum);
        assert_err(&(MAX_MEMORY_SIZE + 1).to_string(), SizeErrorKind::ExceedsMaximum);
        assert_err("99999999999999999999999", SizeErrorKind::ExceedsMaximum);
    }

    #[test]
    fn parsing_is_repeatable() {
        assert_eq!(parse_size("1.5G").unwrap(), parse_size("1.5G").unwrap());
    }

    #[test]
    fn formats_for_display() {
        assert_eq!(format_size(0), "Unknown");
        assert_eq!(format_size(-1), "Unknown");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(512 * MIB as i64), "512 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(2 * GIB as i64), "2.00 GB");
        assert_eq!(format_size(1_610_612_736), "1.50 GB");
    }

    #[test]
    fn validates_bounds() {
        assert!(validate_size(0).is_ok());
        assert!(validate_size(MAX_MEMORY_SIZE as i64).is_ok());
        assert_eq!(
            validate_size(-1).unwrap_err().kind(),
            SizeErrorKind::Negative
        );
        assert_eq!(
            validate_size(MAX_MEMORY_SIZE as i64 + 1).unwrap_err().kind(),
            SizeErrorKind::ExceedsMaximum
        );
    }
}
