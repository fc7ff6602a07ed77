//! Logging for script output.
//!
//! Scripts reach this through `log.info/warn/error(value)`, `print(value)` and
//! `debug(value)`. Messages go to the `log` facade under the `script` target.
//! A script looping between frames can produce a lot of output, so each frame
//! gets a message budget; the counter resets whenever the run resumes from a
//! frame tick.

use std::cell::Cell;

/// Default number of messages a script may log between two frame ticks.
pub const DEFAULT_LOGS_PER_FRAME: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Render any script value as text. Never fails.
pub fn stringify_dynamic(value: &rhai::Dynamic) -> String {
    if value.is_string() {
        return value.clone().into_string().unwrap_or_default();
    }
    if value.is_unit() {
        return "()".to_string();
    }
    if let Some(items) = value.clone().try_cast::<rhai::Array>() {
        return items.iter().map(stringify_dynamic).collect::<Vec<_>>().join(" ");
    }
    if let Some(map) = value.clone().try_cast::<rhai::Map>() {
        let fields: Vec<String> = map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, stringify_dynamic(v)))
            .collect();
        return format!("{{{}}}", fields.join(", "));
    }
    // Numbers, booleans and host types all have a sensible Display.
    value.to_string()
}

#[derive(Debug)]
pub struct ScriptLogger {
    limit: u32,
    count: Cell<u32>,
    warned: Cell<bool>,
}

impl ScriptLogger {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            count: Cell::new(0),
            warned: Cell::new(false),
        }
    }

    /// Start a new frame's budget.
    pub fn reset_frame(&self) {
        self.count.set(0);
        self.warned.set(false);
    }

    fn admit(&self) -> bool {
        let count = self.count.get();
        self.count.set(count.saturating_add(1));
        if count < self.limit {
            return true;
        }
        if !self.warned.replace(true) {
            log::warn!(
                target: "script",
                "Script log limit exceeded ({} messages/frame). Further logs dropped.",
                self.limit
            );
        }
        false
    }

    /// Log `message` if the frame budget allows. Returns whether it was logged.
    pub fn log(&self, level: LogLevel, message: &str) -> bool {
        if !self.admit() {
            return false;
        }
        log::log!(target: "script", level.as_log_level(), "{}", message);
        true
    }

    pub fn log_value(&self, level: LogLevel, value: &rhai::Dynamic) -> bool {
        self.log(level, &stringify_dynamic(value))
    }
}

impl Default for ScriptLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOGS_PER_FRAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from("hello")), "hello");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(42_i64)), "42");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(true)), "true");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::UNIT), "()");
    }

    #[test]
    fn test_stringify_array() {
        let arr: rhai::Array = vec![rhai::Dynamic::from("mask"), rhai::Dynamic::from(3_i64)];
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(arr)), "mask 3");
    }

    #[test]
    fn test_frame_budget() {
        let logger = ScriptLogger::new(3);
        assert!(logger.log(LogLevel::Info, "a"));
        assert!(logger.log(LogLevel::Info, "b"));
        assert!(logger.log(LogLevel::Info, "c"));
        assert!(!logger.log(LogLevel::Info, "d"));

        logger.reset_frame();
        assert!(logger.log(LogLevel::Warn, "e"));
    }
}
