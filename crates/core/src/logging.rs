//! Category/level logging for the core.
//!
//! All messages go through [`log`], which takes the message as a closure so
//! nothing is formatted unless the category is enabled. Levels live in
//! atomics inside a global [`LogConfig`]; the check on a disabled category is
//! two relaxed loads.
//!
//! Output goes to stderr, or to a file written by a background thread once
//! [`LogConfig::set_log_file`] has been called. Each category is rate limited
//! (60 messages per second by default) so a trace-level stack log cannot
//! drown a long run.
//!
//! ```rust
//! use mos6502_core::logging::{log, LogCategory, LogConfig, LogLevel};
//!
//! LogConfig::global().set_level(LogCategory::Stack, LogLevel::Trace);
//! log(LogCategory::Stack, LogLevel::Trace, || {
//!     format!("push ${:02X} at $01{:02X}", 0x42, 0xFD)
//! });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Prefix for the environment variables read by [`LogConfig::apply_env`].
pub const ENV_PREFIX: &str = "EMU_LOG_";

const DEFAULT_RATE_LIMIT: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level '{}'", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    /// Case-insensitive; accepts names, common abbreviations and 0-5.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(LogLevel::Off),
            "error" | "err" | "1" => Ok(LogLevel::Error),
            "warn" | "warning" | "2" => Ok(LogLevel::Warn),
            "info" | "3" => Ok(LogLevel::Info),
            "debug" | "4" => Ok(LogLevel::Debug),
            "trace" | "5" => Ok(LogLevel::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Log category for the parts of the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Raw byte access (ROM writes)
    Memory,
    /// Stack push/pull and pointer wraparound
    Stack,
    /// Program image loading
    Loader,
    /// Save-state capture and restore
    State,
}

impl LogCategory {
    pub const ALL: [LogCategory; 4] = [
        LogCategory::Memory,
        LogCategory::Stack,
        LogCategory::Loader,
        LogCategory::State,
    ];

    const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        match self {
            LogCategory::Memory => 0,
            LogCategory::Stack => 1,
            LogCategory::Loader => 2,
            LogCategory::State => 3,
        }
    }

    /// Upper-case name used in environment variables and message prefixes.
    pub fn name(self) -> &'static str {
        match self {
            LogCategory::Memory => "MEMORY",
            LogCategory::Stack => "STACK",
            LogCategory::Loader => "LOADER",
            LogCategory::State => "STATE",
        }
    }
}

impl FromStr for LogCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log category '{}'", s))
    }
}

#[derive(Default)]
struct Window {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

/// Sliding one-second window per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    windows: Mutex<[Window; LogCategory::COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            windows: Mutex::new(Default::default()),
        }
    }

    /// Returns whether the message may be written, plus a dropped count to
    /// report if one is due.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut windows = lock(&self.windows);
        let w = &mut windows[category.index()];

        while let Some(&front) = w.timestamps.front() {
            if now.duration_since(front) > Duration::from_secs(1) {
                w.timestamps.pop_front();
            } else {
                break;
            }
        }

        if w.timestamps.len() < self.max_per_second.load(Ordering::Relaxed) {
            w.timestamps.push_back(now);
            if w.dropped > 0 {
                let dropped = std::mem::take(&mut w.dropped);
                w.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        w.dropped += 1;
        let due = w
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= Duration::from_secs(1));
        if due {
            w.last_drop_report = Some(now);
            (false, Some(std::mem::take(&mut w.dropped)))
        } else {
            (false, None)
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding a logging lock leaves nothing half-updated that matters.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    levels: [AtomicU8; LogCategory::COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
        }
    }

    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category level other than Off wins over the global level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        match self.get_level(category) {
            LogLevel::Off => level <= self.get_global_level(),
            category_level => level <= category_level,
        }
    }

    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Apply `EMU_LOG_LEVEL` and `EMU_LOG_<CATEGORY>` from the process environment.
    ///
    /// Returns the variables that were set but could not be parsed.
    pub fn apply_env(&self) -> Vec<String> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an arbitrary variable source.
    pub fn apply_vars<F>(&self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();

        let key = format!("{}LEVEL", ENV_PREFIX);
        if let Some(value) = lookup(&key) {
            match value.parse() {
                Ok(level) => self.set_global_level(level),
                Err(_) => rejected.push(key),
            }
        }

        for category in LogCategory::ALL {
            let key = format!("{}{}", ENV_PREFIX, category.name());
            if let Some(value) = lookup(&key) {
                match value.parse() {
                    Ok(level) => self.set_level(category, level),
                    Err(_) => rejected.push(key),
                }
            }
        }

        rejected
    }

    /// Send output to `path` (appending) from a background writer thread.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop file output; the writer thread exits once its channel closes.
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: String) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = lock(&self.log_sender).as_ref() {
                if let Err(err) = sender.send(message) {
                    eprintln!("{}", err.0);
                }
                return;
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a lazily formatted message under `category` at `level`.
///
/// Messages are prefixed with the category name. When the category exceeds
/// its rate limit the message is dropped and a summary line is written
/// later instead.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(format!(
            "[{}] rate limit exceeded, {} message(s) dropped",
            category.name(),
            count
        ));
    }
    if allowed {
        config.write_message(format!("[{}] {}", category.name(), message_fn()));
    }
}
