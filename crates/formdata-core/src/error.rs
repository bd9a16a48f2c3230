//! Errors that can occur while decoding a multipart body.

/// Errors that can occur during multipart parsing.
///
/// Every variant fails the whole parse; the decoder never returns a partial
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// No boundary delimiter was found in the body (this includes an empty
    /// body), or the boundary could not be inferred from its first line.
    BoundaryNotFound,
    /// The boundary token is empty, too long, or not a multipart Content-Type.
    InvalidBoundary,
    /// A part was opened but the body ended before the next delimiter.
    UnexpectedEof,
    /// Invalid multipart framing.
    InvalidFormat { detail: &'static str },
    /// Missing Content-Disposition header in a part.
    MissingContentDisposition,
    /// Invalid Content-Disposition header (e.g. no `name` parameter).
    InvalidContentDisposition { detail: String },
    /// Invalid part header block.
    InvalidPartHeaders { detail: String },
    /// More parts than the configured limit.
    TooManyParts { count: usize, max: usize },
    /// A file payload exceeds the configured limit.
    FileTooLarge { size: usize, max: usize },
    /// The sum of all payloads exceeds the configured limit.
    TotalTooLarge { size: usize, max: usize },
}

impl std::fmt::Display for MultipartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BoundaryNotFound => write!(f, "no multipart boundary found in body"),
            Self::InvalidBoundary => write!(f, "invalid multipart boundary"),
            Self::UnexpectedEof => write!(f, "unexpected end of multipart data"),
            Self::InvalidFormat { detail } => write!(f, "invalid multipart format: {detail}"),
            Self::MissingContentDisposition => {
                write!(f, "missing Content-Disposition header in part")
            }
            Self::InvalidContentDisposition { detail } => {
                write!(f, "invalid Content-Disposition: {detail}")
            }
            Self::InvalidPartHeaders { detail } => write!(f, "invalid part headers: {detail}"),
            Self::TooManyParts { count, max } => {
                write!(f, "too many parts: {count} exceeds limit of {max}")
            }
            Self::FileTooLarge { size, max } => {
                write!(f, "file too large: {size} bytes exceeds limit of {max}")
            }
            Self::TotalTooLarge { size, max } => {
                write!(
                    f,
                    "total upload too large: {size} bytes exceeds limit of {max}"
                )
            }
        }
    }
}

impl std::error::Error for MultipartError {}
