use clap::Parser;

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use ram_detector::config::{Config, MemoryReport};
use ram_detector::events::{DetectorEvent, LogLevel, LogMode};
use ram_detector::logging;
use ram_detector::size::parse_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional Path to configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Optional Log Format. Defaults to "compact".
    #[arg(long, value_name = "LOG_FORMAT", default_value = "compact")]
    log_format: LogMode,

    /// Optional Log Level. Defaults to "warn".
    #[arg(long, value_name = "LOG_LEVEL", default_value = "warn")]
    log_level: LogLevel,

    /// Use this total memory instead of detecting it, e.g. "2G" or "512MB".
    #[arg(long, short = 'm', value_name = "SIZE", value_parser = parse_size)]
    total_memory: Option<u64>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Optional Path to print configuration to. Defaults to stdout.
    #[arg(long, value_name = "FILE", num_args(0..=1), default_missing_value = "-")]
    print_config: Option<PathBuf>,
}

fn handle_output(path: PathBuf, content: &str) {
    // Check for '-' to represent stdout piping
    if path.to_string_lossy() == "-" {
        println!("{}", content);
        exit(0);
    }

    match fs::File::create(&path).and_then(|mut file| file.write_all(content.as_bytes())) {
        Ok(_) => {
            DetectorEvent::Message {
                level: LogLevel::Debug,
                text: format!("Successfully wrote to {:?}", path),
            }
            .emit();
            exit(0);
        }
        Err(e) => {
            DetectorEvent::Message {
                level: LogLevel::Error,
                text: format!("Error writing to file {:?}: {}", path, e),
            }
            .emit();
            exit(1);
        }
    }
}

fn print_report(report: &MemoryReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                DetectorEvent::Message {
                    level: LogLevel::Error,
                    text: format!("Failed to serialize report: {}", e),
                }
                .emit();
                exit(1);
            }
        }
    } else {
        println!("Total memory: {} (source: {})", report.formatted, report.source);
    }
}

fn main() {
    let args = Cli::parse();

    logging::init(args.log_level, args.log_format);

    // --- Handle Utility Flags ---
    if let Some(path) = args.print_config {
        match serde_yaml::to_string(&Config::sane_defaults()) {
            Ok(yaml) => handle_output(path, &yaml),
            Err(e) => {
                DetectorEvent::Message {
                    level: LogLevel::Error,
                    text: format!("Failed to serialize default configuration: {}", e),
                }
                .emit();
                exit(1);
            }
        }
        return;
    }

    let ctx = match Config::load(args.config).and_then(|c| c.into_context(|k| std::env::var(k).ok())) {
        Ok(c) => c,
        Err(e) => {
            DetectorEvent::Message {
                level: LogLevel::Error,
                text: format!("Configuration Error: {}", e),
            }
            .emit();
            exit(e.exit_code());
        }
    };

    let ctx = match args.total_memory {
        Some(bytes) => ctx.with_override(bytes, "--total-memory"),
        None => ctx,
    };

    print_report(&ctx.resolve(), args.json);
}
