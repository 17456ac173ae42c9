use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, OnceLock};

use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);

struct Logger {
    file: File,
    sink: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for embedders rendering the sink channel.
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;

/// Initialize the global logger. Clears the log file.
pub fn init(log_dir: &Path) {
    fs::create_dir_all(log_dir).ok();
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .expect("failed to open log file");

    LOGGER
        .set(Mutex::new(Logger { file, sink: None, prefixes: HashMap::new() }))
        .ok();
}

/// Forward every log line to the given channel (structured, \x1f-separated:
/// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage).
pub fn set_sink(tx: mpsc::Sender<String>) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().unwrap().sink = Some(tx);
    }
}

/// Enable DEBUG lines (off by default).
pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

/// Register a prefix with a color for the `_p` logging variants.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().unwrap().prefixes.insert(prefix.to_string(), color);
    }
}

fn write_log(level: &str, prefix: &str, color: u8, msg: &str) {
    let ts = Local::now().format("%H:%M:%S").to_string();

    let file_line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };
    let sink_line = format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level, prefix, color, ts, msg);

    if let Some(logger) = LOGGER.get() {
        let mut l = logger.lock().unwrap();
        writeln!(l.file, "{}", file_line).ok();
        if let Some(tx) = &l.sink {
            tx.send(sink_line).ok();
        }
    }
}

fn prefix_color(prefix: &str) -> u8 {
    LOGGER
        .get()
        .and_then(|l| l.lock().ok())
        .and_then(|l| l.prefixes.get(prefix).copied())
        .unwrap_or(0)
}

pub fn info(msg: &str) {
    write_log("INFO", "", 0, msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", 0, msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", 0, msg);
}

pub fn debug(msg: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        write_log("DEBUG", "", 0, msg);
    }
}

/// Log with a registered prefix. Looks up the color from registration.
pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, prefix_color(prefix), msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, prefix_color(prefix), msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, prefix_color(prefix), msg);
}

pub fn debug_p(prefix: &str, msg: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        write_log("DEBUG", prefix, prefix_color(prefix), msg);
    }
}
