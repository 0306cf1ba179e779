use std::fs::OpenOptions;

use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::config::LogConfig;
use crate::utils::ResultV;


const MODULE: &str = "LOGGER";


pub fn init_logger(cfg: Option<&LogConfig>) -> ResultV {
    let (kind, level, file) = match cfg {
        Some(c) => (c.kind.as_str(), parse_level(&c.level), c.file.as_str()),
        None => ("console", LevelFilter::Info, ""),
    };

    match kind {
        "console" => init_term_logger(level),
        "file"    => init_file_logger(level, file),
        _         => {
            eprintln!(
                "Unsupported log kind: {}, only `file` and `console` are supported. Use `console` by default",
                kind
            );
            init_term_logger(level)
        }
    }
}

fn parse_level(level: &str) -> LevelFilter {
    match level {
        "off"   => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn"  => LevelFilter::Warn,
        "info"  => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => {
            eprintln!("[{}] Unknown log level `{}`, falling back to `info`", MODULE, level);
            LevelFilter::Info
        }
    }
}

fn init_term_logger(level: LevelFilter) -> ResultV {
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr, ColorChoice::Auto
    ).map_err(|_| "logger already initialized")
}

fn init_file_logger(level: LevelFilter, filename: &str) -> ResultV {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(filename)
        .map_err(|e| {
            eprintln!("[{}] Could not open log file {}: {}", MODULE, filename, e);
            "log file error"
        })?;

    WriteLogger::init(level, simplelog::Config::default(), file)
        .map_err(|_| "logger already initialized")
}
