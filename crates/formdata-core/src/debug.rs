//! Debug logging for the decoder.
//!
//! Decoding failures reach C callers only as a null pointer, so the reason
//! for a failure is reported here instead. Logging is off by default and is
//! enabled with `FORMDATA_DEBUG=1` (or `true`), or programmatically with
//! [`enable_debug`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use formdata_core::{debug_log, debug_part, debug_scan};
//!
//! debug_log!("decoder ready");
//! debug_scan!("delimiter at offset {}", pos);
//! debug_part!("part {} is a file: {}", index, filename);
//! ```

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable that enables debug logging.
pub const DEBUG_ENV_VAR: &str = "FORMDATA_DEBUG";

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize debug logging from the environment.
///
/// Called automatically on first use of any debug macro.
///
/// | Variable | Effect |
/// |----------|--------|
/// | `FORMDATA_DEBUG=1` | Enable all debug logging |
/// | `FORMDATA_DEBUG=true` | Enable all debug logging |
/// | Unset/other | Debug logging disabled |
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let enabled = env::var(DEBUG_ENV_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);

    if enabled {
        eprintln!("[FORMDATA] Debug logging enabled");
    }
}

/// Check if debug logging is enabled, initializing from the environment on
/// first call.
#[must_use]
pub fn is_debug_enabled() -> bool {
    if !INITIALIZED.load(Ordering::SeqCst) {
        init();
    }
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Enable debug logging programmatically.
pub fn enable_debug() {
    INITIALIZED.store(true, Ordering::SeqCst);
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable debug logging programmatically.
pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

/// Reset the debug state so the next check re-reads the environment.
#[doc(hidden)]
pub fn reset_for_test() {
    INITIALIZED.store(false, Ordering::SeqCst);
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

/// Log a general debug message.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[FORMDATA] {}", format!($($arg)*));
        }
    };
}

/// Log boundary scanning events (delimiters, preamble, epilogue).
#[macro_export]
macro_rules! debug_scan {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[FORMDATA:SCAN] {}", format!($($arg)*));
        }
    };
}

/// Log per-part header parsing and classification.
#[macro_export]
macro_rules! debug_part {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[FORMDATA:PART] {}", format!($($arg)*));
        }
    };
}

/// Log runtime handle lifecycle events.
#[macro_export]
macro_rules! debug_runtime {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[FORMDATA:RUNTIME] {}", format!($($arg)*));
        }
    };
}

/// Log C ABI calls and the reason a call returned a failure value.
#[macro_export]
macro_rules! debug_ffi {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[FORMDATA:FFI] {}", format!($($arg)*));
        }
    };
}
