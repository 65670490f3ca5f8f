use chrono::Utc;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::events::{DetectorEvent, LogLevel, LogMode};

// --- Module Level State ---

static CURRENT_LOG_MODE: AtomicU8 = AtomicU8::new(0); // Default: Compact (0)

pub fn set_logging_mode(m: LogMode) {
    CURRENT_LOG_MODE.store(m as u8, Ordering::Relaxed);
}

fn get_log_mode() -> LogMode {
    LogMode::from_u8(CURRENT_LOG_MODE.load(Ordering::Relaxed))
}

/// Installs `env_logger` on stderr. Stdout is reserved for the report.
pub fn init(level: LogLevel, mode: LogMode) {
    set_logging_mode(mode);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level.to_log_level().to_level_filter())
        .target(env_logger::Target::Stderr);

    match mode {
        // Events arrive already rendered as a JSON object.
        LogMode::Json => builder.format(|buf, record| writeln!(buf, "{}", record.args())),
        // Format: YYYY-MM-DDTHH:MM:SSZ [LEVEL] Message...
        LogMode::Compact => builder.format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Utc::now().to_rfc3339(),
                record.level(),
                record.args()
            )
        }),
    };

    // A second init (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}

/// Primary entry point for logging.
pub fn emit(event: &DetectorEvent) {
    let level = event.severity().to_log_level();
    if !log::log_enabled!(level) {
        return;
    }

    match get_log_mode() {
        LogMode::Json => log::log!(level, "{}", render_json(event)),
        LogMode::Compact => log::log!(level, "{}", event),
    }
}

fn render_json(event: &DetectorEvent) -> String {
    let mut log_entry = serde_json::to_value(event).unwrap_or(json!({
        "event": "SerializationError"
    }));

    // Flatten metadata into the root object
    if let Some(map) = log_entry.as_object_mut() {
        map.insert("timestamp".into(), Utc::now().to_rfc3339().into());
        map.insert("level".into(), event.severity().as_str().into());
        if let DetectorEvent::Message { text, .. } = event {
            map.insert("message".into(), text.as_str().into());
            map.remove("text");
        }
    }

    log_entry.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemorySource;

    #[test]
    fn json_rendering_flattens_metadata() {
        let event = DetectorEvent::MemoryDetected {
            source: MemorySource::HostTotal,
            bytes: 2048,
        };
        let value: serde_json::Value = serde_json::from_str(&render_json(&event)).unwrap();
        assert_eq!(value["message"], "memory_detected");
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["bytes"], 2048);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn json_rendering_of_plain_message() {
        let event = DetectorEvent::Message {
            level: LogLevel::Warn,
            text: "hello".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&render_json(&event)).unwrap();
        assert_eq!(value["message"], "hello");
        assert_eq!(value["level"], "WARN");
        assert!(value.get("text").is_none());
    }
}
