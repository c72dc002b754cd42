// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Driver Logging
//!
//! Logging macros used throughout the driver. With the `logging` feature
//! they forward to the `log` facade under the [`LOG_TARGET`] target, so the
//! host kernel (or a test harness) decides where records go and at which
//! level. Without it they compile away; the arguments are still
//! type-checked.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::kernel::debug::{log_error, log_trace};
//!
//! log_error!("failed to allocate buffer for {}", what);
//! log_trace!("KAR <- {:#010x}", addr);
//! ```

/// Target name attached to every record
pub const LOG_TARGET: &str = "simpleaes";

macro_rules! log_at {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        ::log::$level!(target: $crate::kernel::debug::LOG_TARGET, $($arg)*);
        #[cfg(not(feature = "logging"))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log a trace message
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_at!(trace, $($arg)*)
    };
}

/// Log a debug message
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_at!(debug, $($arg)*)
    };
}

/// Log an info message
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_at!(info, $($arg)*)
    };
}

/// Log a warning message
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_at!(warn, $($arg)*)
    };
}

/// Log an error message
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::kernel::debug::log_at!(error, $($arg)*)
    };
}

pub(crate) use {log_at, log_debug, log_error, log_info, log_trace, log_warn};

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
