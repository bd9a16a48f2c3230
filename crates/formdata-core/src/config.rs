//! Decoder limits.
//!
//! Every limit is off unless set: a well-formed body always decodes in full
//! under [`MultipartConfig::default`]. The C ABI builds its config once, from
//! the environment, when the runtime handle starts. Rust callers use the
//! builder directly.

use crate::debug_log;

/// Value of a limit that is not enforced.
pub const UNLIMITED: usize = usize::MAX;

/// Environment variable overriding [`MultipartConfig::max_parts`].
pub const MAX_PARTS_ENV_VAR: &str = "FORMDATA_MAX_PARTS";
/// Environment variable overriding [`MultipartConfig::max_file_size`].
pub const MAX_FILE_SIZE_ENV_VAR: &str = "FORMDATA_MAX_FILE_SIZE";
/// Environment variable overriding [`MultipartConfig::max_total_size`].
pub const MAX_TOTAL_SIZE_ENV_VAR: &str = "FORMDATA_MAX_TOTAL_SIZE";

/// Configuration for multipart parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Maximum size per file in bytes.
    max_file_size: usize,
    /// Maximum total payload size in bytes.
    max_total_size: usize,
    /// Maximum number of parts (including files).
    max_parts: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: UNLIMITED,
            max_total_size: UNLIMITED,
            max_parts: UNLIMITED,
        }
    }
}

impl MultipartConfig {
    /// Create a configuration with no limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `FORMDATA_*` environment variables. Unset or
    /// unparsable values leave that limit off.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup_usize(&lookup, MAX_PARTS_ENV_VAR) {
            config.max_parts = v;
        }
        if let Some(v) = lookup_usize(&lookup, MAX_FILE_SIZE_ENV_VAR) {
            config.max_file_size = v;
        }
        if let Some(v) = lookup_usize(&lookup, MAX_TOTAL_SIZE_ENV_VAR) {
            config.max_total_size = v;
        }
        config
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the maximum total payload size.
    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn max_parts(mut self, count: usize) -> Self {
        self.max_parts = count;
        self
    }

    /// Get the maximum file size.
    #[must_use]
    pub fn get_max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Get the maximum total payload size.
    #[must_use]
    pub fn get_max_total_size(&self) -> usize {
        self.max_total_size
    }

    /// Get the maximum number of parts.
    #[must_use]
    pub fn get_max_parts(&self) -> usize {
        self.max_parts
    }
}

/// Read `key` through `lookup` and parse it as a `usize`.
///
/// Unparsable values are logged and treated as unset.
pub fn lookup_usize<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug_log!("ignoring {key}={raw:?}: not an unsigned integer");
            None
        }
    }
}
