//! multipart/form-data decoding engine.
//!
//! This crate turns a complete request body into a [`MultipartForm`]: ordered
//! text fields and ordered file uploads. It is the safe half of the `formdata`
//! decoder; `formdata-ffi` exposes it over the C ABI.
//!
//! # Pipeline
//!
//! - [`PartScanner`] splits the body on boundary delimiters
//! - [`PartHeaders`] parses each part's header block
//! - [`Part`] classifies the part as a field or a file and extracts its payload
//! - [`FormBuilder`] collects parts in body order
//!
//! [`MultipartParser`] runs the whole pipeline and enforces the limits in
//! [`MultipartConfig`].
//!
//! # Example
//!
//! ```
//! use formdata_core::{MultipartConfig, MultipartParser};
//!
//! let body = concat!(
//!     "--XYZ\r\n",
//!     "Content-Disposition: form-data; name=\"username\"\r\n\r\n",
//!     "alice\r\n",
//!     "--XYZ--\r\n",
//! );
//! let parser = MultipartParser::new("XYZ", MultipartConfig::default());
//! let form = parser.parse(body.as_bytes()).unwrap();
//! assert_eq!(form.get_field("username"), Some("alice"));
//! ```

#![forbid(unsafe_code)]

pub mod debug;

pub mod config;
pub mod error;
pub mod form;
pub mod headers;
pub mod parser;
pub mod part;
pub mod scanner;

pub use config::{MultipartConfig, UNLIMITED};
pub use error::MultipartError;
pub use form::{FormBuilder, MultipartForm};
pub use headers::{PartHeaders, parse_content_disposition};
pub use parser::MultipartParser;
pub use part::{DEFAULT_CONTENT_TYPE, Field, FileEntry, Part};
pub use scanner::{
    MAX_BOUNDARY_LEN, PartScanner, RawPart, infer_boundary, parse_boundary, validate_boundary,
};
