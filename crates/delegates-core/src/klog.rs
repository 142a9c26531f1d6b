//! Leveled stderr logging for the delegate core
//!
//! Every line carries a level prefix and the subsystem that emitted it:
//!
//! ```text
//! [DEBUG] multicast: added subscription 7 (3 total)
//! [TRACE] storage: 1032 bytes (align 8) spilled to heap
//! ```
//!
//! # Environment Variables
//!
//! - `DELEGATES_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace
//!   (or 0-5). Defaults to warn.
//! - `DELEGATES_LOG_FLUSH=1` - flush stderr after every line.
//!
//! Both are read once, on the first log call or an explicit [`init`].
//!
//! # Usage
//!
//! ```ignore
//! use delegates_core::{klog_debug, klog_error};
//!
//! klog_debug!("multicast", "removed subscription {}", handle);
//! klog_error!("delegate", "execute on unbound delegate");
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::env::{env_get_bool, env_get_opt};

/// Log levels, most severe first
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit; `None` for anything unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::parse(s).ok_or(())
    }
}

pub const LOG_LEVEL_VAR: &str = "DELEGATES_LOG_LEVEL";
pub const LOG_FLUSH_VAR: &str = "DELEGATES_LOG_FLUSH";

static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Load level and flush settings from the environment.
///
/// Runs at most once; later calls are no-ops. Settings made through
/// [`set_log_level`] or [`set_flush_enabled`] before the first log line are
/// kept unless the corresponding variable is set.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Some(level) = env_get_opt::<LogLevel>(LOG_LEVEL_VAR) {
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    let flush = env_get_bool(LOG_FLUSH_VAR, FLUSH_ENABLED.load(Ordering::Relaxed));
    FLUSH_ENABLED.store(flush, Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn flush_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    FLUSH_ENABLED.load(Ordering::Relaxed)
}

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn set_flush_enabled(enabled: bool) {
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, subsystem: &str, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} {}: ", level.prefix(), subsystem);
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if flush_enabled() {
        let _ = handle.flush();
    }
}

#[macro_export]
macro_rules! klog_error {
    ($subsystem:expr, $($arg:tt)*) => {{
        $crate::klog::_klog_impl(
            $crate::klog::LogLevel::Error,
            $subsystem,
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! klog_warn {
    ($subsystem:expr, $($arg:tt)*) => {{
        $crate::klog::_klog_impl(
            $crate::klog::LogLevel::Warn,
            $subsystem,
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! klog_info {
    ($subsystem:expr, $($arg:tt)*) => {{
        $crate::klog::_klog_impl(
            $crate::klog::LogLevel::Info,
            $subsystem,
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! klog_debug {
    ($subsystem:expr, $($arg:tt)*) => {{
        $crate::klog::_klog_impl(
            $crate::klog::LogLevel::Debug,
            $subsystem,
            format_args!($($arg)*)
        );
    }};
}

/// Most verbose level; used on the storage hot path.
#[macro_export]
macro_rules! klog_trace {
    ($subsystem:expr, $($arg:tt)*) => {{
        $crate::klog::_klog_impl(
            $crate::klog::LogLevel::Trace,
            $subsystem,
            format_args!($($arg)*)
        );
    }};
}
