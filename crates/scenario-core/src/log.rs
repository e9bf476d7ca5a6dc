use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

///
/// Level
///

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug, // least severe
    Info,
    Ok,
    Warn,
    Error, // most severe
}

impl Level {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Ok => 2,
            Self::Warn => 3,
            Self::Error => 4,
        }
    }
}

///
/// Topic
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum Topic {
    Bridge,
    Consistency,
    Dispatch,
    Env,
    ExecutionRoot,
    Runtime,
    Store,
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info.as_u8());

/// Set the process-wide minimum level; lines below it are dropped.
pub fn set_min_level(level: Level) {
    MIN_LEVEL.store(level.as_u8(), Ordering::Relaxed);
}

#[doc(hidden)]
#[must_use]
pub fn __enabled(level: Level) -> bool {
    level.as_u8() >= MIN_LEVEL.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log {
    // =========================================
    // (1) With topic (normal + trailing comma)
    // =========================================
    ($topic:expr, $level:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        $crate::log!(@inner Some(&$topic.to_string()), $crate::log::Level::$level, $fmt $(, $arg)*);
    }};

    // =========================================
    // (2) No topic (normal + trailing comma)
    // =========================================
    ($level:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        $crate::log!(@inner None::<&str>, $crate::log::Level::$level, $fmt $(, $arg)*);
    }};

    // =========================================
    // INTERNAL
    // =========================================
    (@inner $topic:expr, $level:expr, $fmt:expr $(, $arg:expr)*) => {{
        let level = $level;
        if $crate::log::__enabled(level) {
            let topic_opt: Option<&str> = $topic;
            let message = format!($fmt $(, $arg)*);

            let topic_centered = format!("{:^13}", topic_opt.unwrap_or("..."));

            let (color, reset) = match level {
                $crate::log::Level::Ok    => ("\x1b[32m", "\x1b[0m"),
                $crate::log::Level::Info  => ("\x1b[34m", "\x1b[0m"),
                $crate::log::Level::Warn  => ("\x1b[33m", "\x1b[0m"),
                $crate::log::Level::Error => ("\x1b[31m", "\x1b[0m"),
                $crate::log::Level::Debug => ("", ""),
            };

            let label = format!("{color}{:^5}{reset}", level.to_string().to_uppercase());
            eprintln!("{label}|{topic_centered}| {message}");
        }
    }};
}

///
/// TESTS
///
