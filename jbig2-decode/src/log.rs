//! Diagnostics that are forwarded to the `log` crate when the `logging` feature
//! is enabled, and compiled away otherwise.

macro_rules! forward_log {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "logging")]
        ::log::$level!($fmt $(, $arg)*);
        #[cfg(not(feature = "logging"))]
        {
            $(let _ = &$arg;)*
        }
    }};
}

/// Report a violation of the standard that the decoder recovered from.
macro_rules! lwarn {
    ($($tokens:tt)*) => {
        forward_log!(warn, $($tokens)*)
    };
}

/// Report segment-level progress.
macro_rules! ldebug {
    ($($tokens:tt)*) => {
        forward_log!(debug, $($tokens)*)
    };
}

/// Report per-procedure details.
macro_rules! ltrace {
    ($($tokens:tt)*) => {
        forward_log!(trace, $($tokens)*)
    };
}
