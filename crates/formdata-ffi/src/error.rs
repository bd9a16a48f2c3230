//! Errors raised on the C side of the decoder.
//!
//! None of these cross the ABI: every failure becomes a null result, and the
//! reason is written to the debug log.

use formdata_core::MultipartError;

/// Failure of a C ABI operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfiError {
    /// The body could not be decoded.
    Decode(MultipartError),
    /// A text value contains a NUL byte and cannot become a C string.
    InteriorNul { what: &'static str },
    /// An allocation for the C representation failed.
    Allocation,
    /// The runtime handle could not be started.
    RuntimeInit { detail: String },
    /// `shutdown_runtime` has already been called.
    RuntimeShutDown,
    /// A required pointer argument was null.
    NullArgument { what: &'static str },
    /// A C string argument is not valid UTF-8.
    InvalidUtf8 { what: &'static str },
    /// The operation panicked.
    Panic,
}

impl std::fmt::Display for FfiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "decode failed: {err}"),
            Self::InteriorNul { what } => write!(f, "{what} contains a NUL byte"),
            Self::Allocation => write!(f, "allocation failed while building form data"),
            Self::RuntimeInit { detail } => write!(f, "failed to start runtime: {detail}"),
            Self::RuntimeShutDown => write!(f, "runtime has been shut down"),
            Self::NullArgument { what } => write!(f, "{what} is null"),
            Self::InvalidUtf8 { what } => write!(f, "{what} is not valid UTF-8"),
            Self::Panic => write!(f, "operation panicked"),
        }
    }
}

impl std::error::Error for FfiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MultipartError> for FfiError {
    fn from(err: MultipartError) -> Self {
        Self::Decode(err)
    }
}

impl From<std::collections::TryReserveError> for FfiError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::Allocation
    }
}
