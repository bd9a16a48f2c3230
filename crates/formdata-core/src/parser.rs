//! Multipart parser: scanner, header parser, classifier and builder in one
//! pass over a complete body.

use crate::config::MultipartConfig;
use crate::debug_log;
use crate::error::MultipartError;
use crate::form::{FormBuilder, MultipartForm};
use crate::headers::{PartHeaders, split_part};
use crate::part::Part;
use crate::scanner::{PartScanner, infer_boundary, validate_boundary};

/// Multipart parser (boundary-based).
#[derive(Debug, Clone)]
pub struct MultipartParser {
    boundary: Vec<u8>,
    config: MultipartConfig,
}

impl MultipartParser {
    /// Create a new parser with the given boundary token (without the leading
    /// `--`).
    #[must_use]
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        Self {
            boundary: boundary.as_bytes().to_vec(),
            config,
        }
    }

    /// Create a parser whose boundary is taken from the first line of `body`.
    pub fn infer(body: &[u8], config: MultipartConfig) -> Result<Self, MultipartError> {
        let boundary = infer_boundary(body)?;
        Ok(Self::new(boundary, config))
    }

    /// Create a parser, rejecting boundary tokens that cannot be delimiters.
    pub fn checked(boundary: &str, config: MultipartConfig) -> Result<Self, MultipartError> {
        validate_boundary(boundary)?;
        Ok(Self::new(boundary, config))
    }

    /// The boundary token.
    #[must_use]
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    /// The limits this parser enforces.
    #[must_use]
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Parse all parts from the body.
    ///
    /// Any malformed part fails the whole parse; no partial form is returned.
    /// Limits are checked against the raw payload before it is copied.
    pub fn parse(&self, body: &[u8]) -> Result<MultipartForm, MultipartError> {
        let mut builder = FormBuilder::new();
        let mut total_size = 0usize;

        for raw in PartScanner::new(body, &self.boundary) {
            let raw = raw?;

            if builder.len() >= self.config.get_max_parts() {
                return Err(MultipartError::TooManyParts {
                    count: builder.len() + 1,
                    max: self.config.get_max_parts(),
                });
            }

            let (block, payload) = split_part(raw.bytes)?;
            let headers = PartHeaders::parse(block)?;
            let size = payload.len();

            if headers.is_file() && size > self.config.get_max_file_size() {
                return Err(MultipartError::FileTooLarge {
                    size,
                    max: self.config.get_max_file_size(),
                });
            }

            total_size = total_size.saturating_add(size);
            if total_size > self.config.get_max_total_size() {
                return Err(MultipartError::TotalTooLarge {
                    size: total_size,
                    max: self.config.get_max_total_size(),
                });
            }

            builder.push(Part::classify(headers, payload, raw.index));
        }

        let form = builder.finish();
        debug_log!(
            "decoded {} field(s) and {} file(s) from {} bytes",
            form.field_count(),
            form.file_count(),
            body.len()
        );
        Ok(form)
    }
}
