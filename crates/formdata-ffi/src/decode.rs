//! The work a parse call runs on the runtime handle.

use std::future::Future;

use formdata_core::{MultipartConfig, MultipartError, MultipartParser, debug_ffi, parse_boundary};

use crate::error::FfiError;
use crate::layout::OwnedFormData;

/// Pick the boundary for `body`.
///
/// `boundary` may be a bare token or a full `multipart/form-data; boundary=…`
/// header value. Without one, the token is read from the body's first line.
pub fn resolve_parser(
    body: &[u8],
    boundary: Option<&str>,
    config: MultipartConfig,
) -> Result<MultipartParser, MultipartError> {
    match boundary.map(str::trim) {
        None => MultipartParser::infer(body, config),
        Some(value) if is_content_type(value) => {
            let token = parse_boundary(value)?;
            Ok(MultipartParser::new(&token, config))
        }
        Some(token) => MultipartParser::checked(token, config),
    }
}

fn is_content_type(value: &str) -> bool {
    value
        .get(.."multipart/".len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

/// Decode `body` and stage the result for the C side.
///
/// Nothing is allocated for the caller until the whole body has decoded.
pub fn decode<'a>(
    body: &'a [u8],
    boundary: Option<&'a str>,
    config: MultipartConfig,
) -> impl Future<Output = Result<OwnedFormData, FfiError>> + 'a {
    async move {
        let parser = resolve_parser(body, boundary, config)?;
        let form = parser.parse(body)?;
        let staged = OwnedFormData::stage(form)?;
        debug_ffi!(
            "staged {} field(s) and {} file(s)",
            staged.field_count(),
            staged.file_count()
        );
        Ok(staged)
    }
}
