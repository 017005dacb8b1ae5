//! Build script for flowlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates link.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Longest idle timeout the firmware's timer queue accepts (one day)
const MAX_IDLE_TIMEOUT_MS: i64 = 24 * 60 * 60 * 1000;

/// Longest frame the firmware buffers, in bytes
const PACKET_LENGTH: i64 = 256;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate link.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=link.toml");

    let config_path = Path::new("link.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: link.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds link.toml as its link configuration.        ║\n\
            ║  Please create one in the flowlink-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read link.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in link.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_link(&config, &mut errors);
    validate_uart(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid link configuration                               ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    warn_slow_link(&config);

    println!("cargo:warning=link.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    config.get(name).and_then(|s| s.as_table())
}

fn validate_link(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(link) = section(config, "link") else {
        return;
    };

    for (key, value) in link {
        match key.as_str() {
            "idle_timeout_ms" => match value.as_integer() {
                Some(ms) if ms > 0 && ms <= MAX_IDLE_TIMEOUT_MS => {}
                _ => errors.push(format!(
                    "[link] idle_timeout_ms must be 1-{}",
                    MAX_IDLE_TIMEOUT_MS
                )),
            },
            "rx_overwrite" | "zero_sync" | "error_replies" => {
                if value.as_bool().is_none() {
                    errors.push(format!("[link] {} must be true or false", key));
                }
            }
            "checksum" => match value.as_str() {
                Some("tag-and-payload") | Some("payload-only") => {}
                _ => errors.push(
                    "[link] checksum must be \"tag-and-payload\" or \"payload-only\"".into(),
                ),
            },
            other => errors.push(format!("[link] unknown key '{}'", other)),
        }
    }
}

fn validate_uart(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(uart) = section(config, "uart") else {
        return;
    };

    for (key, value) in uart {
        match key.as_str() {
            "baudrate" => match value.as_integer() {
                Some(baud) if baud > 0 && baud <= 7_812_500 => {}
                _ => errors.push("[uart] baudrate must be 1-7812500".into()),
            },
            "data_bits" => match value.as_integer() {
                Some(7) | Some(8) => {}
                _ => errors.push("[uart] data_bits must be 7 or 8".into()),
            },
            "parity" => match value.as_str() {
                Some("none") | Some("even") | Some("odd") => {}
                _ => errors.push("[uart] parity must be \"none\", \"even\" or \"odd\"".into()),
            },
            "stop_bits" => match value.as_integer() {
                Some(1) | Some(2) => {}
                _ => errors.push("[uart] stop_bits must be 1 or 2".into()),
            },
            other => errors.push(format!("[uart] unknown key '{}'", other)),
        }
    }
}

/// Warn when a full packet takes longer on the wire than the idle timeout
fn warn_slow_link(config: &toml::Value) {
    let idle_ms = section(config, "link")
        .and_then(|l| l.get("idle_timeout_ms"))
        .and_then(|v| v.as_integer())
        .unwrap_or(2000);
    let baud = section(config, "uart")
        .and_then(|u| u.get("baudrate"))
        .and_then(|v| v.as_integer())
        .unwrap_or(115_200);

    // 8N1 worst case: 10 bits per byte
    let packet_ms = (PACKET_LENGTH * 10 * 1000 + baud - 1) / baud;
    if packet_ms >= idle_ms {
        println!(
            "cargo:warning=idle_timeout_ms ({}) is shorter than one {}-byte packet at {} baud ({} ms)",
            idle_ms, PACKET_LENGTH, baud, packet_ms
        );
    }
}
