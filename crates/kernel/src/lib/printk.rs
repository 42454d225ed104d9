// Kernel logging (printk)
//
// Leveled logging over the console sink chain. Formatting happens without
// allocation so the error path stays usable during heap starvation.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Error => "[ERROR] ",
            LogLevel::Warn => "[WARN]  ",
            LogLevel::Info => "[INFO]  ",
            LogLevel::Debug => "[DEBUG] ",
        }
    }
}

/// Global log level (default: INFO).
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

#[inline]
pub fn is_enabled(level: LogLevel) -> bool {
    level <= get_level()
}

pub fn log(level: LogLevel, args: fmt::Arguments) {
    if !is_enabled(level) {
        return;
    }
    use core::fmt::Write;
    let mut writer = crate::console::Writer;
    let _ = writer.write_str(level.prefix());
    let _ = writer.write_fmt(args);
    let _ = writer.write_str("\n");
}

#[macro_export]
macro_rules! printk {
    ($level:expr, $($arg:tt)*) => {
        $crate::lib::printk::log($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::printk!($crate::lib::printk::LogLevel::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::printk!($crate::lib::printk::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::printk!($crate::lib::printk::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::printk!($crate::lib::printk::LogLevel::Debug, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter() {
        set_level(LogLevel::Warn);
        assert!(is_enabled(LogLevel::Error));
        assert!(is_enabled(LogLevel::Warn));
        assert!(!is_enabled(LogLevel::Info));
        set_level(LogLevel::Info);
        assert!(is_enabled(LogLevel::Info));
        assert!(!is_enabled(LogLevel::Debug));
    }

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
        assert_eq!(LogLevel::Debug.as_str(), "DEBUG");
    }
}
