//! Part classification and payload extraction.

use crate::debug_part;
use crate::error::MultipartError;
use crate::headers::{PartHeaders, split_part};
use crate::scanner::RawPart;

/// Content type reported for files that do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A plain form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name from Content-Disposition.
    pub name: String,
    /// Payload decoded as UTF-8; invalid sequences become U+FFFD.
    pub value: String,
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// The form field the file was uploaded under.
    pub field_name: String,
    /// The original filename (may be empty).
    pub filename: String,
    /// Content-Type of the file.
    pub content_type: String,
    /// Exact payload bytes.
    pub payload: Vec<u8>,
}

impl FileEntry {
    /// Payload length in bytes.
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.payload.len()
    }

    /// Get the file extension from the filename.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && *ext != self.filename)
    }
}

/// A classified part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// No `filename` parameter.
    Field(Field),
    /// Has a `filename` parameter.
    File(FileEntry),
}

impl Part {
    /// Separate headers from payload and classify a raw part.
    pub fn from_raw(raw: RawPart<'_>) -> Result<Self, MultipartError> {
        let (block, payload) = split_part(raw.bytes)?;
        let headers = PartHeaders::parse(block)?;
        Ok(Self::classify(headers, payload, raw.index))
    }

    /// Build a field or file from parsed headers and payload bytes.
    #[must_use]
    pub fn classify(headers: PartHeaders, payload: &[u8], index: usize) -> Self {
        let PartHeaders {
            name,
            filename,
            content_type,
            headers: _,
        } = headers;

        match filename {
            Some(filename) => {
                debug_part!(
                    "part {index}: file {name:?} ({filename:?}, {} bytes)",
                    payload.len()
                );
                Self::File(FileEntry {
                    field_name: name,
                    filename,
                    content_type: content_type
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                    payload: payload.to_vec(),
                })
            }
            None => {
                debug_part!("part {index}: field {name:?} ({} bytes)", payload.len());
                Self::Field(Field {
                    name,
                    value: String::from_utf8_lossy(payload).into_owned(),
                })
            }
        }
    }

    /// Returns true if this part is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Returns true if this part is a regular form field.
    #[must_use]
    pub fn is_field(&self) -> bool {
        matches!(self, Self::Field(_))
    }

    /// The field name, for either kind of part.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(field) => &field.name,
            Self::File(file) => &file.field_name,
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Field(field) => field.value.len(),
            Self::File(file) => file.content_length(),
        }
    }
}
